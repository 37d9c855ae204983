/*!
# Strategic Insight Dashboard

A read-only reporting web application that renders business-dashboard pages
(P&L, OKRs, SWOT, org chart, roadmap, value maps, product forecasts) from a
spreadsheet workbook.

## Overview

The workbook is the single source of truth: a local `.xlsx` file on disk,
or — with the `remote` feature — a Google Sheets spreadsheet reached with
service-account credentials. Every dashboard page fetches one or more named
sheets through a caching accessor, reshapes the rows for presentation, and
renders an HTML template. There is no write path and no state beyond the
cache.

## Architecture

Control flow for every page:

HTTP GET → route handler → `SheetCache::get_table` → cached or freshly
loaded `Table` → pure view-model builder → Handlebars render → HTML.

### Workbook access

- Logical sheet names resolve via exact match, a static alias table, then a
  case-insensitive match; unknown names yield an empty table instead of an
  error.
- The cache invalidates wholesale when the backing file's modification time
  changes or a configurable TTL elapses, then reloads lazily per sheet.
- A backing store that cannot be read at all degrades the same way: pages
  render their empty state and the failure is logged.

### View handlers

Each page is a stateless reshaping function over loaded tables: fuzzy
column mapping, numeric/LaTeX cleanup, grouping by section or team, and in
one case a reports-to tree with synthesized placeholders for vacant seats.

## Modules

- **table**: tabular data model (`Table`, `Row`, tagged `CellValue`)
- **source**: backing stores (local Excel file, remote spreadsheet service)
- **cache**: sheet cache with alias resolution and TTL/mtime invalidation
- **clean**: numeric, LaTeX, and text formatting glue shared by the pages
- **views**: per-page view-model builders
- **app**: routing and template rendering
- **config**: environment-supplied settings

## Usage

```no_run
use insight_board::{app, config::Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    app::run(Config::from_env()).await
}
```
*/

pub mod app;
pub mod cache;
pub mod clean;
pub mod config;
pub mod source;
pub mod table;
pub mod views;

pub use cache::SheetCache;
pub use source::{ExcelWorkbook, SheetBackend, SourceError, WorkbookSource};
pub use table::{CellValue, Row, Table};
