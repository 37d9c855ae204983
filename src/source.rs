use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use crate::table::{CellValue, Table};

/// Retrieval failures from the backing store. A sheet that simply does not
/// exist is not an error — resolution happens in the cache layer, which
/// substitutes an empty table.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("workbook not found: {0}")]
    Missing(PathBuf),
    #[error(transparent)]
    Workbook(#[from] calamine::XlsxError),
    #[cfg(feature = "remote")]
    #[error("spreadsheet service: {0}")]
    Service(String),
}

/// What the accessor needs from a backing store: the sheet-name list, the
/// rows of a named sheet, and a last-modified signal (file case only).
#[allow(async_fn_in_trait)]
pub trait SheetBackend {
    async fn sheet_names(&self) -> Result<Vec<String>, SourceError>;
    async fn read_table(&self, title: &str) -> Result<Table, SourceError>;
    fn last_modified(&self) -> Option<SystemTime>;
}

/// Local `.xlsx` workbook read from disk.
///
/// The file is reopened on every read; the cache layer in front of this
/// keeps loaded tables around, so reads only happen on cache misses.
pub struct ExcelWorkbook {
    path: PathBuf,
}

impl ExcelWorkbook {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ExcelWorkbook { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<calamine::Xlsx<std::io::BufReader<fs::File>>, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::Missing(self.path.clone()));
        }
        Ok(calamine::open_workbook(&self.path)?)
    }
}

impl SheetBackend for ExcelWorkbook {
    async fn sheet_names(&self) -> Result<Vec<String>, SourceError> {
        let workbook = self.open()?;
        Ok(calamine::Reader::sheet_names(&workbook))
    }

    async fn read_table(&self, title: &str) -> Result<Table, SourceError> {
        let mut workbook = self.open()?;
        let range = calamine::Reader::worksheet_range(&mut workbook, title)?;
        Ok(range_to_table(&range))
    }

    fn last_modified(&self) -> Option<SystemTime> {
        fs::metadata(&self.path).ok().and_then(|m| m.modified().ok())
    }
}

/// Cells parse to best-effort native types where detectable, otherwise stay
/// text; empty cells become the empty-string sentinel.
fn convert_cell(cell: &calamine::Data) -> CellValue {
    match cell {
        calamine::Data::Empty => CellValue::text(""),
        calamine::Data::String(s) => CellValue::Text(s.clone()),
        calamine::Data::Float(f) => CellValue::Number(*f),
        calamine::Data::Int(i) => CellValue::Number(*i as f64),
        calamine::Data::Bool(b) => CellValue::text(b.to_string()),
        calamine::Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        calamine::Data::DateTimeIso(s) | calamine::Data::DurationIso(s) => CellValue::Text(s.clone()),
        calamine::Data::Error(_) => CellValue::text(""),
    }
}

fn range_to_table(range: &calamine::Range<calamine::Data>) -> Table {
    let mut rows_iter = range.rows();
    let headers = match rows_iter.next() {
        Some(header_row) => header_row
            .iter()
            .map(|c| convert_cell(c).as_text())
            .collect(),
        None => return Table::empty(),
    };
    let data = rows_iter
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();
    Table::from_cells(headers, data)
}

#[cfg(feature = "remote")]
pub use remote::RemoteWorkbook;

#[cfg(feature = "remote")]
mod remote {
    use super::{SheetBackend, SourceError};
    use crate::table::{CellValue, Table};
    use google_sheets4::{Sheets, hyper, hyper_rustls};
    use std::path::Path;
    use std::time::SystemTime;
    use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

    type Connector = hyper_rustls::HttpsConnector<hyper::client::HttpConnector>;

    /// Remote spreadsheet reached through the Google Sheets API with
    /// service-account credentials. No modification signal is available, so
    /// freshness is TTL-only.
    pub struct RemoteWorkbook {
        spreadsheet_id: String,
        hub: Sheets<Connector>,
    }

    impl RemoteWorkbook {
        pub async fn connect(
            spreadsheet_id: impl Into<String>,
            service_account_file: &Path,
        ) -> Result<Self, SourceError> {
            let json = std::fs::read_to_string(service_account_file)
                .map_err(|e| SourceError::Service(e.to_string()))?;
            let key: ServiceAccountKey =
                serde_json::from_str(&json).map_err(|e| SourceError::Service(e.to_string()))?;
            let auth = ServiceAccountAuthenticator::builder(key)
                .build()
                .await
                .map_err(|e| SourceError::Service(e.to_string()))?;

            let connector = hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .https_or_http()
                .enable_http1()
                .build();
            let hub = Sheets::new(hyper::Client::builder().build(connector), auth);

            Ok(RemoteWorkbook {
                spreadsheet_id: spreadsheet_id.into(),
                hub,
            })
        }

        fn convert_cell(value: &serde_json::Value) -> CellValue {
            match value {
                serde_json::Value::Null => CellValue::text(""),
                serde_json::Value::String(s) => CellValue::Text(s.clone()),
                serde_json::Value::Number(n) => {
                    CellValue::Number(n.as_f64().unwrap_or_default())
                }
                serde_json::Value::Bool(b) => CellValue::text(b.to_string()),
                other => CellValue::Text(other.to_string()),
            }
        }
    }

    impl SheetBackend for RemoteWorkbook {
        async fn sheet_names(&self) -> Result<Vec<String>, SourceError> {
            let (_, spreadsheet) = self
                .hub
                .spreadsheets()
                .get(&self.spreadsheet_id)
                .doit()
                .await
                .map_err(|e| SourceError::Service(e.to_string()))?;

            let names = spreadsheet
                .sheets
                .unwrap_or_default()
                .into_iter()
                .filter_map(|sheet| sheet.properties.and_then(|p| p.title))
                .collect();
            Ok(names)
        }

        async fn read_table(&self, title: &str) -> Result<Table, SourceError> {
            // Sheet titles with spaces need single quotes in A1 notation
            let range = format!("'{}'!A:ZZ", title.replace('\'', "''"));
            let (_, values) = self
                .hub
                .spreadsheets()
                .values_get(&self.spreadsheet_id, &range)
                .doit()
                .await
                .map_err(|e| SourceError::Service(e.to_string()))?;

            let mut rows = values.values.unwrap_or_default().into_iter();
            let headers = match rows.next() {
                Some(header_row) => header_row
                    .iter()
                    .map(|c| Self::convert_cell(c).as_text())
                    .collect(),
                None => return Ok(Table::empty()),
            };
            let data = rows
                .map(|row| row.iter().map(Self::convert_cell).collect())
                .collect();
            Ok(Table::from_cells(headers, data))
        }

        fn last_modified(&self) -> Option<SystemTime> {
            None
        }
    }
}

/// The concrete backing stores the application composes at startup.
pub enum WorkbookSource {
    Excel(ExcelWorkbook),
    #[cfg(feature = "remote")]
    Remote(RemoteWorkbook),
}

impl SheetBackend for WorkbookSource {
    async fn sheet_names(&self) -> Result<Vec<String>, SourceError> {
        match self {
            WorkbookSource::Excel(wb) => wb.sheet_names().await,
            #[cfg(feature = "remote")]
            WorkbookSource::Remote(wb) => wb.sheet_names().await,
        }
    }

    async fn read_table(&self, title: &str) -> Result<Table, SourceError> {
        match self {
            WorkbookSource::Excel(wb) => wb.read_table(title).await,
            #[cfg(feature = "remote")]
            WorkbookSource::Remote(wb) => wb.read_table(title).await,
        }
    }

    fn last_modified(&self) -> Option<SystemTime> {
        match self {
            WorkbookSource::Excel(wb) => wb.last_modified(),
            #[cfg(feature = "remote")]
            WorkbookSource::Remote(wb) => wb.last_modified(),
        }
    }
}
