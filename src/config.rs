use std::env;
use std::path::PathBuf;

/// Runtime settings, all environment-supplied with workable defaults so a
/// checked-out workbook next to the binary just runs.
#[derive(Clone, Debug)]
pub struct Config {
    /// Local workbook file (`DASHBOARD_WORKBOOK`).
    pub workbook_path: PathBuf,
    /// Cache TTL in seconds (`SHEET_CACHE_TTL`); 0 or less disables
    /// time-based expiry.
    pub cache_ttl_seconds: i64,
    /// Listen address (`DASHBOARD_ADDR`).
    pub bind_addr: String,
    /// Remote spreadsheet id (`GOOGLE_SHEET_ID`). When set and the `remote`
    /// feature is compiled in, the remote service backs the dashboard
    /// instead of the local file.
    pub spreadsheet_id: Option<String>,
    /// Service-account credentials (`GOOGLE_SERVICE_ACCOUNT_FILE`).
    pub service_account_file: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let cache_ttl_seconds = env::var("SHEET_CACHE_TTL")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Config {
            workbook_path: env::var("DASHBOARD_WORKBOOK")
                .unwrap_or_else(|_| "strategic_insight.xlsx".to_string())
                .into(),
            cache_ttl_seconds,
            bind_addr: env::var("DASHBOARD_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string()),
            spreadsheet_id: env::var("GOOGLE_SHEET_ID").ok().filter(|v| !v.is_empty()),
            service_account_file: env::var("GOOGLE_SERVICE_ACCOUNT_FILE")
                .unwrap_or_else(|_| "service_account.json".to_string())
                .into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_environment() {
        // from_env reads real env vars; only assert on the stable defaults
        let config = Config::from_env();
        assert!(config.bind_addr.contains(':'));
        assert!(!config.workbook_path.as_os_str().is_empty());
    }
}
