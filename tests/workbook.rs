//! End-to-end checks of the file-backed workbook path: a real `.xlsx` on
//! disk, read through `ExcelWorkbook` and fronted by `SheetCache`.

use insight_board::cache::SheetCache;
use insight_board::source::ExcelWorkbook;
use insight_board::table::CellValue;
use rust_xlsxwriter::Workbook;
use std::fs::{self, FileTimes};
use std::path::Path;
use std::time::{Duration, SystemTime};

fn write_workbook(path: &Path, revenue: f64) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("P&L").unwrap();
    sheet.write_string(0, 0, "Year").unwrap();
    sheet.write_string(0, 1, "Month").unwrap();
    sheet.write_string(0, 2, "Revenue").unwrap();
    sheet.write_string(1, 0, "2025").unwrap();
    sheet.write_string(1, 1, "Jan").unwrap();
    sheet.write_number(1, 2, revenue).unwrap();

    let okr = workbook.add_worksheet();
    okr.set_name("2026 OKR").unwrap();
    okr.write_string(0, 0, "Years").unwrap();
    okr.write_string(0, 1, "Functional POVs").unwrap();
    okr.write_string(0, 2, "Objective").unwrap();
    okr.write_string(0, 3, "Average").unwrap();
    okr.write_string(1, 0, "2025").unwrap();
    okr.write_string(1, 1, "Marketing").unwrap();
    okr.write_string(1, 2, "Grow reach").unwrap();
    okr.write_number(1, 3, 0.7).unwrap();
    okr.write_string(2, 0, "2026").unwrap();
    okr.write_string(2, 1, "Marketing").unwrap();
    okr.write_string(2, 2, "Grow reach").unwrap();
    okr.write_number(2, 3, 0.9).unwrap();

    workbook.save(path).unwrap();
}

fn bump_mtime(path: &Path, seconds_forward: u64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    let later = SystemTime::now() + Duration::from_secs(seconds_forward);
    file.set_times(FileTimes::new().set_modified(later)).unwrap();
}

#[tokio::test]
async fn loads_sheet_through_alias_with_native_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strategic_insight.xlsx");
    write_workbook(&path, 15750.0);

    let cache = SheetCache::new(ExcelWorkbook::new(&path), 0);
    let table = cache.get_table("profit_n_loss").await;

    assert_eq!(table.rows().len(), 1);
    let row = &table.rows()[0];
    assert_eq!(row.text("Month"), "Jan");
    // numeric cells come back as native numbers, not text
    assert_eq!(row.get("Revenue"), Some(&CellValue::Number(15750.0)));
}

#[tokio::test]
async fn missing_sheet_and_missing_file_both_yield_empty_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strategic_insight.xlsx");
    write_workbook(&path, 1.0);

    let cache = SheetCache::new(ExcelWorkbook::new(&path), 0);
    assert!(cache.get_table("never heard of it").await.is_empty());

    let gone = SheetCache::new(ExcelWorkbook::new(dir.path().join("nope.xlsx")), 0);
    assert!(gone.get_table("P&L").await.is_empty());
}

#[tokio::test]
async fn mtime_change_is_picked_up_on_next_access() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strategic_insight.xlsx");
    write_workbook(&path, 100.0);

    let cache = SheetCache::new(ExcelWorkbook::new(&path), 0);
    let before = cache.get_table("P&L").await;
    assert_eq!(before.rows()[0].get("Revenue"), Some(&CellValue::Number(100.0)));

    write_workbook(&path, 200.0);
    bump_mtime(&path, 5);

    let after = cache.get_table("P&L").await;
    assert_eq!(after.rows()[0].get("Revenue"), Some(&CellValue::Number(200.0)));
}

#[tokio::test]
async fn okr_scenario_groups_by_team_and_year() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("strategic_insight.xlsx");
    write_workbook(&path, 1.0);

    let cache = SheetCache::new(ExcelWorkbook::new(&path), 0);
    let table = cache.get_table("okr").await;
    let comparison = insight_board::views::strategy::build_okr_comparison(&table);

    assert_eq!(comparison.len(), 1);
    assert_eq!(comparison[0].team, "Marketing");
    assert_eq!(comparison[0].objectives.len(), 1);
    assert_eq!(comparison[0].objectives[0].items_2025.len(), 1);
    assert_eq!(comparison[0].objectives[0].items_2026.len(), 1);
    assert_eq!(comparison[0].avg_2025, Some(70.0));
    assert_eq!(comparison[0].avg_2026, Some(90.0));
}
