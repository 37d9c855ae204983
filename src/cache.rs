use chrono::{DateTime, Utc};
use log::warn;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use crate::source::SheetBackend;
use crate::table::Table;

/// Static alias table: logical sheet name (lowercased) to the actual title
/// used in the workbook.
pub const SHEET_ALIASES: &[(&str, &str)] = &[
    ("value_map", "Full price value_map"),
    ("value_map_promo", "promo price value_map"),
    ("top_product", "top_product_full_price"),
    ("top_product_promo", "top_product_promo"),
    ("okr", "2026 OKR"),
    ("2025 okr", "2025 OKR"),
    ("profit_n_loss", "P&L"),
    ("profit per x", "Profit per X"),
    ("cost per x", "Cost per X"),
    ("core -new segments", "Core -New segments"),
];

/// Injected time source so expiry is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Default)]
struct CacheState {
    tables: HashMap<String, Arc<Table>>,
    sheet_names: Vec<String>,
    loaded_at: Option<DateTime<Utc>>,
    seen_mtime: Option<SystemTime>,
}

/// Single-entry memoization of the workbook, keyed by sheet title.
///
/// The whole cache is invalidated (not per-sheet) when the backing file's
/// modification time changes or when `ttl_seconds` have elapsed since the
/// last load; sheets then reload lazily on next access. Loads happen outside
/// the lock, so two racing requests may redundantly load the same sheet —
/// last writer wins, which is harmless for identical read-only content.
pub struct SheetCache<S> {
    source: S,
    ttl_seconds: i64,
    clock: Box<dyn Clock>,
    state: Mutex<CacheState>,
}

impl<S: SheetBackend> SheetCache<S> {
    pub fn new(source: S, ttl_seconds: i64) -> Self {
        Self::with_clock(source, ttl_seconds, Box::new(SystemClock))
    }

    pub fn with_clock(source: S, ttl_seconds: i64, clock: Box<dyn Clock>) -> Self {
        SheetCache {
            source,
            ttl_seconds,
            clock,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Fetch the table for a logical sheet name.
    ///
    /// Resolution order: exact title match, the static alias table, then a
    /// case-insensitive match. A name that resolves to nothing — or a
    /// backing store that cannot be read at all — yields an empty table so
    /// every page can render its empty state; this never returns an error.
    pub async fn get_table(&self, name: &str) -> Arc<Table> {
        self.invalidate_if_stale();

        let names = match self.ensure_sheet_names().await {
            Some(names) => names,
            None => return Arc::new(Table::empty()),
        };

        let title = match resolve_title(&names, name) {
            Some(title) => title,
            None => return Arc::new(Table::empty()),
        };

        if let Some(table) = self.state.lock().unwrap().tables.get(&title) {
            return Arc::clone(table);
        }

        match self.source.read_table(&title).await {
            Ok(table) => {
                let table = Arc::new(table);
                self.state
                    .lock()
                    .unwrap()
                    .tables
                    .insert(title, Arc::clone(&table));
                table
            }
            Err(e) => {
                warn!("failed to load sheet '{title}': {e}");
                Arc::new(Table::empty())
            }
        }
    }

    /// Drop everything when the backing file changed or the TTL ran out.
    fn invalidate_if_stale(&self) {
        let mut state = self.state.lock().unwrap();

        let current_mtime = self.source.last_modified();
        let mtime_changed = current_mtime.is_some() && current_mtime != state.seen_mtime;

        let ttl_expired = match state.loaded_at {
            // TTL at or below zero disables time-based expiry
            Some(loaded_at) if self.ttl_seconds > 0 => {
                (self.clock.now() - loaded_at).num_seconds() > self.ttl_seconds
            }
            _ => false,
        };

        if mtime_changed || ttl_expired {
            state.tables.clear();
            state.sheet_names.clear();
            state.loaded_at = None;
            state.seen_mtime = current_mtime;
        }
    }

    async fn ensure_sheet_names(&self) -> Option<Vec<String>> {
        {
            let state = self.state.lock().unwrap();
            if state.loaded_at.is_some() {
                return Some(state.sheet_names.clone());
            }
        }

        match self.source.sheet_names().await {
            Ok(names) => {
                let mut state = self.state.lock().unwrap();
                state.sheet_names = names.clone();
                state.loaded_at = Some(self.clock.now());
                state.seen_mtime = self.source.last_modified();
                Some(names)
            }
            Err(e) => {
                warn!("workbook unavailable: {e}");
                None
            }
        }
    }
}

fn resolve_title(sheet_names: &[String], requested: &str) -> Option<String> {
    if sheet_names.iter().any(|n| n == requested) {
        return Some(requested.to_string());
    }

    let alias_key = SHEET_ALIASES
        .iter()
        .find(|(logical, _)| *logical == requested.to_lowercase())
        .map(|(_, actual)| (*actual).to_string())
        .unwrap_or_else(|| requested.to_string());

    if sheet_names.iter().any(|n| *n == alias_key) {
        return Some(alias_key);
    }

    let lowered = alias_key.to_lowercase();
    sheet_names
        .iter()
        .find(|n| n.to_lowercase() == lowered)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SheetBackend, SourceError};
    use crate::table::CellValue;
    use chrono::Duration;

    struct FakeClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl FakeClock {
        fn shared(start: DateTime<Utc>) -> Arc<Self> {
            Arc::new(FakeClock {
                now: Mutex::new(start),
            })
        }

        fn advance(&self, seconds: i64) {
            let mut now = self.now.lock().unwrap();
            *now = *now + Duration::seconds(seconds);
        }
    }

    impl Clock for Arc<FakeClock> {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    struct FixtureBackend {
        sheets: Mutex<HashMap<String, Table>>,
        mtime: Mutex<Option<SystemTime>>,
        reads: Mutex<u32>,
    }

    impl FixtureBackend {
        fn new(sheets: Vec<(&str, Table)>) -> Self {
            FixtureBackend {
                sheets: Mutex::new(
                    sheets
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                ),
                mtime: Mutex::new(Some(SystemTime::UNIX_EPOCH)),
                reads: Mutex::new(0),
            }
        }

        fn replace(&self, title: &str, table: Table) {
            self.sheets.lock().unwrap().insert(title.to_string(), table);
        }

        fn touch(&self) {
            let mut mtime = self.mtime.lock().unwrap();
            *mtime = mtime.map(|t| t + std::time::Duration::from_secs(1));
        }

        fn read_count(&self) -> u32 {
            *self.reads.lock().unwrap()
        }
    }

    impl SheetBackend for &FixtureBackend {
        async fn sheet_names(&self) -> Result<Vec<String>, SourceError> {
            Ok(self.sheets.lock().unwrap().keys().cloned().collect())
        }

        async fn read_table(&self, title: &str) -> Result<Table, SourceError> {
            *self.reads.lock().unwrap() += 1;
            Ok(self
                .sheets
                .lock()
                .unwrap()
                .get(title)
                .cloned()
                .unwrap_or_else(Table::empty))
        }

        fn last_modified(&self) -> Option<SystemTime> {
            *self.mtime.lock().unwrap()
        }
    }

    fn one_cell_table(value: &str) -> Table {
        Table::from_cells(
            vec!["A".to_string()],
            vec![vec![CellValue::text(value)]],
        )
    }

    #[tokio::test]
    async fn unknown_sheet_returns_empty_table() {
        let backend = FixtureBackend::new(vec![("P&L", one_cell_table("x"))]);
        let cache = SheetCache::new(&backend, 30);
        let table = cache.get_table("definitely_not_there").await;
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn resolution_exact_then_alias_then_case_insensitive() {
        let backend = FixtureBackend::new(vec![
            ("P&L", one_cell_table("pnl")),
            ("Cost per X", one_cell_table("cpx")),
        ]);
        let cache = SheetCache::new(&backend, 30);

        // exact
        assert!(!cache.get_table("P&L").await.is_empty());
        // alias: profit_n_loss -> P&L
        assert_eq!(cache.get_table("profit_n_loss").await.rows()[0].text("A"), "pnl");
        // case-insensitive on the alias target
        assert_eq!(cache.get_table("cost per x").await.rows()[0].text("A"), "cpx");
        // plain case-insensitive match with no alias involved
        assert_eq!(cache.get_table("p&l").await.rows()[0].text("A"), "pnl");
    }

    #[tokio::test]
    async fn cached_within_ttl_without_reload() {
        let clock = FakeClock::shared(Utc::now());
        let backend = FixtureBackend::new(vec![("okr sheet", one_cell_table("v1"))]);
        let cache = SheetCache::with_clock(&backend, 30, Box::new(Arc::clone(&clock)));

        let first = cache.get_table("okr sheet").await;
        clock.advance(10);
        let second = cache.get_table("okr sheet").await;

        assert_eq!(first, second);
        assert_eq!(backend.read_count(), 1);
    }

    #[tokio::test]
    async fn ttl_expiry_reloads() {
        let clock = FakeClock::shared(Utc::now());
        let backend = FixtureBackend::new(vec![("swot", one_cell_table("old"))]);
        let cache = SheetCache::with_clock(&backend, 30, Box::new(Arc::clone(&clock)));

        assert_eq!(cache.get_table("swot").await.rows()[0].text("A"), "old");

        backend.replace("swot", one_cell_table("new"));
        clock.advance(31);

        assert_eq!(cache.get_table("swot").await.rows()[0].text("A"), "new");
        assert_eq!(backend.read_count(), 2);
    }

    #[tokio::test]
    async fn ttl_zero_disables_time_expiry() {
        let clock = FakeClock::shared(Utc::now());
        let backend = FixtureBackend::new(vec![("dna", one_cell_table("v1"))]);
        let cache = SheetCache::with_clock(&backend, 0, Box::new(Arc::clone(&clock)));

        cache.get_table("dna").await;
        clock.advance(86_400);
        cache.get_table("dna").await;

        assert_eq!(backend.read_count(), 1);
    }

    #[tokio::test]
    async fn mtime_change_invalidates_wholesale() {
        let backend = FixtureBackend::new(vec![
            ("roadmap", one_cell_table("r1")),
            ("swot", one_cell_table("s1")),
        ]);
        let cache = SheetCache::new(&backend, 0);

        cache.get_table("roadmap").await;
        cache.get_table("swot").await;
        assert_eq!(backend.read_count(), 2);

        backend.replace("roadmap", one_cell_table("r2"));
        backend.touch();

        assert_eq!(cache.get_table("roadmap").await.rows()[0].text("A"), "r2");
        // the other sheet was dropped too and reloads on next access
        cache.get_table("swot").await;
        assert_eq!(backend.read_count(), 4);
    }
}
