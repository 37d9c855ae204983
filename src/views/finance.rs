use serde::Serialize;

use crate::clean::{
    self, HeaderPredicate, format_int, format_money, format_number, format_percent, map_headers,
    parse_number, parse_review_text, ReviewChunk,
};
use crate::table::{Row, Table};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PnlRow {
    pub year: String,
    pub month: String,
    pub label: String,
    pub revenue: f64,
    pub cost_of_sales: f64,
    pub gross_profit: f64,
    pub expense: f64,
    pub net_profit: f64,
}

fn to_float_or_zero(raw: &str) -> f64 {
    let s = raw.replace(',', "");
    s.trim().parse::<f64>().unwrap_or(0.0)
}

/// Monthly P&L rows. Year/Month fall back to splitting the Date cell, and
/// rows sort on the (Year, Month) string pair the sheet provides.
pub fn build_profit_n_loss(table: &Table) -> Vec<PnlRow> {
    let mut records = Vec::new();
    for row in table.rows() {
        let date_val = row.trimmed("Date");
        let mut year = row.trimmed("Year");
        let mut month = row.trimmed("Month");
        if !date_val.is_empty() && (year.is_empty() || month.is_empty()) {
            let parts: Vec<&str> = date_val
                .split(['-', '/', ' '])
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() >= 2 {
                if month.is_empty() {
                    month = parts[0].to_string();
                }
                if year.is_empty() {
                    year = parts[1].to_string();
                }
            }
        }
        records.push(PnlRow {
            label: format!("{month} {year}").trim().to_string(),
            year,
            month,
            revenue: to_float_or_zero(&row.text("Revenue")),
            cost_of_sales: to_float_or_zero(&row.text("Cost of Sales")),
            gross_profit: to_float_or_zero(&row.text("Gross Profit")),
            expense: to_float_or_zero(&row.text("Expense")),
            net_profit: to_float_or_zero(&row.text("Net Profit")),
        });
    }
    records.sort_by(|a, b| (&a.year, &a.month).cmp(&(&b.year, &b.month)));
    records
}

#[derive(Clone, Debug, Serialize)]
pub struct Section {
    pub name: String,
    pub rows: Vec<Row>,
}

/// Financial review rows grouped by `Section`, groups ordered by name.
pub fn build_financial_review(table: &Table) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    for row in table.rows() {
        let name = row.text("Section");
        match sections.iter_mut().find(|s| s.name == name) {
            Some(section) => section.rows.push(row.clone()),
            None => sections.push(Section {
                name,
                rows: vec![row.clone()],
            }),
        }
    }
    sections.sort_by(|a, b| a.name.cmp(&b.name));
    sections
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct EcomTarget {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub insight: String,
}

const ECOM_MONEY_KEYWORDS: &[&str] = &["amount", "target", "sales", "moonshot", "fulfillment"];

/// The e-commerce target sheet: tabular rows with money formatting applied
/// to columns whose names look numeric, plus an extracted insight line.
pub fn build_ecom_target(table: &Table) -> EcomTarget {
    if table.is_empty() {
        return EcomTarget::default();
    }

    let columns: Vec<String> = table.columns().to_vec();
    let first_col = &columns[0];

    // The insight row is flagged in the first column, or failing that, the
    // last row that reads like prose rather than data.
    let mut insight = String::new();
    if let Some(row) = table
        .rows()
        .iter()
        .find(|r| r.trimmed(first_col).to_lowercase().contains("insight"))
    {
        let parts: Vec<String> = columns
            .iter()
            .skip(1)
            .map(|c| row.trimmed(c))
            .filter(|v| !v.is_empty())
            .collect();
        insight = parts.join(" ").trim().to_string();
    } else {
        for row in table.rows().iter().rev() {
            let joined: Vec<String> = columns
                .iter()
                .map(|c| row.trimmed(c))
                .filter(|v| !v.is_empty())
                .collect();
            let joined = joined.join(" ");
            if clean::looks_like_prose(&joined) {
                insight = joined;
                break;
            }
        }
    }

    let rows = table
        .rows()
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| {
                    let lc = c.to_lowercase();
                    if ECOM_MONEY_KEYWORDS.iter().any(|k| lc.contains(k)) {
                        match parse_number(&row.text(c)) {
                            Some(n) => format_money(Some(n)),
                            None => String::new(),
                        }
                    } else {
                        row.text(c)
                    }
                })
                .collect()
        })
        .collect();

    EcomTarget {
        columns,
        rows,
        insight,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EcomCompRow {
    pub months: String,
    #[serde(rename = "value_2024")]
    pub v2024: f64,
    #[serde(rename = "value_2025")]
    pub v2025: f64,
    pub fmt_2024: String,
    pub fmt_2025: String,
    pub delta: f64,
    pub delta_fmt: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EcomCompSummary {
    pub total_2024: String,
    pub total_2025: String,
    pub avg_2024: String,
    pub avg_2025: String,
    pub max_month: String,
    pub max_value: String,
    pub min_month: String,
    pub min_value: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct EcomComparison {
    pub rows: Vec<EcomCompRow>,
    pub summary: EcomCompSummary,
}

/// Year-over-year comparison. The minimum-month computation excludes
/// December unless excluding it would leave nothing to compare.
pub fn build_ecom_comparison(table: &Table) -> EcomComparison {
    let mut rows = Vec::new();
    let mut total_2024 = 0.0;
    let mut total_2025 = 0.0;

    for row in table.rows() {
        let month = row.trimmed("Months");
        let v2024 = parse_number(&row.text("2024")).unwrap_or(0.0);
        let v2025 = parse_number(&row.text("2025")).unwrap_or(0.0);
        total_2024 += v2024;
        total_2025 += v2025;
        rows.push(EcomCompRow {
            months: month,
            v2024,
            v2025,
            fmt_2024: format_int(Some(v2024)),
            fmt_2025: format_int(Some(v2025)),
            delta: v2025 - v2024,
            delta_fmt: format_int(Some(v2025 - v2024)),
        });
    }

    let max_row = rows
        .iter()
        .max_by(|a, b| a.v2025.partial_cmp(&b.v2025).unwrap_or(std::cmp::Ordering::Equal));
    let eligible: Vec<&EcomCompRow> = rows
        .iter()
        .filter(|r| !clean::is_december(&r.months))
        .collect();
    let min_pool: Vec<&EcomCompRow> = if eligible.is_empty() {
        rows.iter().collect()
    } else {
        eligible
    };
    let min_row = min_pool
        .iter()
        .min_by(|a, b| a.v2025.partial_cmp(&b.v2025).unwrap_or(std::cmp::Ordering::Equal));

    let count = if rows.is_empty() { 1.0 } else { rows.len() as f64 };
    let summary = EcomCompSummary {
        total_2024: format_int(Some(total_2024)),
        total_2025: format_int(Some(total_2025)),
        avg_2024: format_int(Some(total_2024 / count)),
        avg_2025: format_int(Some(total_2025 / count)),
        max_month: max_row.map(|r| r.months.clone()).unwrap_or_else(|| "-".into()),
        max_value: max_row
            .map(|r| format_int(Some(r.v2025)))
            .unwrap_or_else(|| "0".into()),
        min_month: min_row.map(|r| r.months.clone()).unwrap_or_else(|| "-".into()),
        min_value: min_row
            .map(|r| format_int(Some(r.v2025)))
            .unwrap_or_else(|| "0".into()),
    };

    EcomComparison { rows, summary }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CostPerXRow {
    pub cost_per_x: String,
    pub facts: String,
    pub why: String,
    pub improve: String,
}

const COST_PER_X_RULES: &[(HeaderPredicate, &'static str)] = &[
    (|h: &str| h.contains("cost per x"), "Cost per X"),
    (|h: &str| h.starts_with("facts"), "Facts"),
    (|h: &str| h.starts_with("why"), "Why?"),
    (
        |h: &str| h.contains("what to improve") || h.contains("improve"),
        "What to Improve More?",
    ),
];

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

pub fn build_cost_per_x(table: &Table) -> Vec<CostPerXRow> {
    if table.is_empty() {
        return Vec::new();
    }
    let mapping = map_headers(table.columns(), COST_PER_X_RULES);
    let find = |canonical: &str| {
        table
            .columns()
            .iter()
            .find(|c| mapping.get(*c).map(String::as_str) == Some(canonical))
            .cloned()
    };
    let col_x = find("Cost per X");
    let col_facts = find("Facts");
    let col_why = find("Why?");
    let col_improve = find("What to Improve More?");
    let read = |row: &Row, col: &Option<String>| {
        col.as_ref().map(|c| row.text(c)).unwrap_or_default()
    };

    table
        .rows()
        .iter()
        .map(|row| CostPerXRow {
            cost_per_x: read(row, &col_x),
            facts: normalize_newlines(&read(row, &col_facts)),
            why: normalize_newlines(&read(row, &col_why)),
            improve: normalize_newlines(&read(row, &col_improve)),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProfitXRow {
    pub segment: String,
    pub data: String,
    pub insight: String,
    pub actions: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct ProfitXSection {
    pub name: String,
    pub rows: Vec<ProfitXRow>,
}

/// Profit-per-X rows grouped by non-empty `Section` in first-seen order,
/// with embedded line breaks normalized for display.
pub fn build_profit_per_x(table: &Table) -> Vec<ProfitXSection> {
    let mut sections: Vec<ProfitXSection> = Vec::new();
    for row in table.rows() {
        let section = row.trimmed("Section");
        if section.is_empty() {
            continue;
        }
        let record = ProfitXRow {
            segment: row.text("Segment"),
            data: clean::clean_html_breaks(&row.text("Data")),
            insight: clean::clean_html_breaks(&row.text("Insight")),
            actions: clean::clean_html_breaks(
                &row.text("What to Improve More? (2026 Actions)"),
            ),
        };
        match sections.iter_mut().find(|s| s.name == section) {
            Some(existing) => existing.rows.push(record),
            None => sections.push(ProfitXSection {
                name: section,
                rows: vec![record],
            }),
        }
    }
    sections
}

pub const FNA_PALETTE: &[&str] = &[
    "#1976d2", "#ef6c00", "#2e7d32", "#6a1b9a", "#00838f", "#c62828",
];

#[derive(Clone, Debug, Serialize)]
pub struct CategoryMeta {
    pub name: String,
    pub color: String,
    pub count: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FnaPerformance {
    pub rows: Vec<Row>,
    pub categories: Vec<CategoryMeta>,
}

/// FNA performance rows with LaTeX markup scrubbed from every text cell and
/// per-category counts colored from a fixed palette in first-seen order.
pub fn build_fna_performance(table: &Table) -> FnaPerformance {
    let mut rows = Vec::new();
    let mut categories: Vec<CategoryMeta> = Vec::new();

    for row in table.rows() {
        let category = {
            let c = row.trimmed("KPI Category");
            if c.is_empty() { "General".to_string() } else { c }
        };
        match categories.iter_mut().find(|m| m.name == category) {
            Some(meta) => meta.count += 1,
            None => {
                let color = FNA_PALETTE[categories.len() % FNA_PALETTE.len()].to_string();
                categories.push(CategoryMeta {
                    name: category,
                    color,
                    count: 1,
                });
            }
        }

        let mut cleaned = Row::new();
        for column in table.columns() {
            match row.get(column) {
                Some(crate::table::CellValue::Text(s)) => {
                    cleaned.insert(column.clone(), crate::table::CellValue::Text(clean::clean_latex(s)))
                }
                Some(other) => cleaned.insert(column.clone(), other.clone()),
                None => {}
            }
        }
        rows.push(cleaned);
    }

    FnaPerformance { rows, categories }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BobRow {
    pub months: String,
    pub bob_order: String,
    pub self_order: String,
    pub grand_total: String,
    pub cs: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BobChart {
    pub months: Vec<String>,
    pub bob: Vec<f64>,
    pub self_orders: Vec<f64>,
    pub cs: Vec<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BobSummary {
    pub total_bob: String,
    pub total_self: String,
    pub total_grand: String,
    pub avg_cs: String,
    pub best_month: String,
    pub best_month_value: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct BobReview {
    pub worked: Vec<ReviewChunk>,
    pub scale: Vec<ReviewChunk>,
    pub not_work: Vec<ReviewChunk>,
    pub lesson: Vec<ReviewChunk>,
    pub next_goal: Vec<ReviewChunk>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BobView {
    pub rows: Vec<BobRow>,
    pub chart: BobChart,
    pub reviews: Vec<BobReview>,
    pub summary: BobSummary,
}

const BOB_COLUMN_RULES: &[(HeaderPredicate, &'static str)] = &[
    (|h: &str| h == "months" || h == "month", "Months"),
    (
        |h: &str| h == "bob order" || h == "bob" || h == "boborder",
        "BOB Order",
    ),
    (|h: &str| h == "self order" || h == "self", "Self Order"),
    (|h: &str| h == "grand total" || h == "total", "Grand Total"),
    (
        |h: &str| h == "cs%" || h == "cs %" || h == "cs percentage",
        "CS%",
    ),
];

const BOB_REVIEW_KEYS: &[(&str, usize)] = &[
    ("what worked?", 0),
    ("what needs to scale?", 1),
    ("what did not work?", 2),
    ("what is the lesson learned?", 3),
    ("what is the next goal for bob?", 4),
];

/// BOB order split with qualitative review sections. CS% cells at or below
/// one are fractions; anything larger is already a percentage.
pub fn build_bob(orders: &Table, review: &Table) -> BobView {
    let mapping = map_headers(orders.columns(), BOB_COLUMN_RULES);
    let find = |canonical: &str| {
        orders
            .columns()
            .iter()
            .find(|c| mapping.get(*c).map(String::as_str) == Some(canonical))
            .cloned()
    };
    let col_months = find("Months");
    let col_bob = find("BOB Order");
    let col_self = find("Self Order");
    let col_grand = find("Grand Total");
    let col_cs = find("CS%");
    let read = |row: &Row, col: &Option<String>| -> String {
        col.as_ref().map(|c| row.text(c)).unwrap_or_default()
    };

    let mut view = BobView::default();
    let mut totals = (0.0_f64, 0.0_f64, 0.0_f64);
    let mut cs_fractions: Vec<f64> = Vec::new();
    let mut best: Option<(String, f64)> = None;

    for row in orders.rows() {
        let month = read(row, &col_months).trim().to_string();
        let bob_val = parse_number(&read(row, &col_bob)).unwrap_or(0.0);
        let self_val = parse_number(&read(row, &col_self)).unwrap_or(0.0);
        let grand_val = parse_number(&read(row, &col_grand)).unwrap_or(0.0);
        let cs_val = parse_number(&read(row, &col_cs));

        view.rows.push(BobRow {
            months: month.clone(),
            bob_order: format_number(Some(bob_val)),
            self_order: format_number(Some(self_val)),
            grand_total: format_number(Some(grand_val)),
            cs: format_percent(cs_val),
        });

        view.chart.months.push(month.clone());
        view.chart.bob.push(bob_val);
        view.chart.self_orders.push(self_val);
        view.chart.cs.push(match cs_val {
            Some(v) if v.abs() <= 1.0 => v * 100.0,
            Some(v) => v,
            None => 0.0,
        });

        totals.0 += bob_val;
        totals.1 += self_val;
        totals.2 += grand_val;
        if let Some(v) = cs_val {
            cs_fractions.push(if v.abs() <= 1.0 { v } else { v / 100.0 });
        }
        if best.as_ref().map_or(true, |(_, g)| grand_val > *g) && grand_val > 0.0 {
            best = Some((month, grand_val));
        }
    }

    for row in review.rows() {
        let mut entry: [Vec<ReviewChunk>; 5] = Default::default();
        for column in review.columns() {
            let normalized = column.trim().to_lowercase();
            if let Some((_, idx)) = BOB_REVIEW_KEYS.iter().find(|(k, _)| *k == normalized) {
                entry[*idx] = parse_review_text(&row.text(column));
            }
        }
        if entry.iter().any(|chunks| !chunks.is_empty()) {
            let [worked, scale, not_work, lesson, next_goal] = entry;
            view.reviews.push(BobReview {
                worked,
                scale,
                not_work,
                lesson,
                next_goal,
            });
        }
    }

    let avg_cs = if cs_fractions.is_empty() {
        None
    } else {
        Some(cs_fractions.iter().sum::<f64>() / cs_fractions.len() as f64)
    };
    view.summary = BobSummary {
        total_bob: format_number(Some(totals.0)),
        total_self: format_number(Some(totals.1)),
        total_grand: format_number(Some(totals.2)),
        avg_cs: format_percent(avg_cs),
        best_month: best
            .as_ref()
            .map(|(m, _)| m.clone())
            .unwrap_or_else(|| "-".into()),
        best_month_value: format_number(Some(best.map(|(_, v)| v).unwrap_or(0.0))),
    };

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_cells(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::text(*v)).collect())
                .collect(),
        )
    }

    #[test]
    fn pnl_splits_date_when_year_month_absent() {
        let t = table(
            &["Date", "Year", "Month", "Revenue", "Net Profit"],
            &[&["Jan-2025", "", "", "15,750", "5,000"]],
        );
        let rows = build_profit_n_loss(&t);
        assert_eq!(rows[0].month, "Jan");
        assert_eq!(rows[0].year, "2025");
        assert_eq!(rows[0].label, "Jan 2025");
        assert_eq!(rows[0].revenue, 15750.0);
    }

    #[test]
    fn pnl_defaults_unparsable_numbers_to_zero() {
        let t = table(&["Year", "Month", "Revenue"], &[&["2025", "Feb", "n/a"]]);
        assert_eq!(build_profit_n_loss(&t)[0].revenue, 0.0);
    }

    #[test]
    fn ecom_comp_min_excludes_december() {
        let t = table(
            &["Months", "2024", "2025"],
            &[
                &["Nov", "100", "300"],
                &["Dec", "100", "50"],
                &["Oct", "100", "200"],
            ],
        );
        let view = build_ecom_comparison(&t);
        assert_eq!(view.summary.min_month, "Oct");
        assert_eq!(view.summary.max_month, "Nov");
        assert_eq!(view.summary.total_2025, "550");
    }

    #[test]
    fn ecom_comp_december_is_eligible_when_alone() {
        let t = table(&["Months", "2024", "2025"], &[&["Dec", "10", "20"]]);
        let view = build_ecom_comparison(&t);
        assert_eq!(view.summary.min_month, "Dec");
    }

    #[test]
    fn ecom_target_finds_flagged_insight_row() {
        let t = table(
            &["Brand", "Target Amount"],
            &[
                &["Alpha", "1,000"],
                &["Key Insight", "momentum is holding across brands"],
            ],
        );
        let view = build_ecom_target(&t);
        assert_eq!(view.insight, "momentum is holding across brands");
        // money column formatted, insight row's text cell left alone
        assert_eq!(view.rows[0][1], "1,000.00");
    }

    #[test]
    fn ecom_target_falls_back_to_prose_row() {
        let t = table(
            &["Brand", "Note"],
            &[
                &["Alpha", "12345"],
                &["", "the longer narrative about why the quarter landed well"],
            ],
        );
        let view = build_ecom_target(&t);
        assert!(view.insight.contains("longer narrative"));
    }

    #[test]
    fn cost_per_x_maps_header_variants() {
        let t = table(
            &["Cost per X ", "Facts & Figures", "Why? (root cause)", "What to improve more?"],
            &[&["Delivery", "line1\r\nline2", "because", "do better"]],
        );
        let rows = build_cost_per_x(&t);
        assert_eq!(rows[0].cost_per_x, "Delivery");
        assert_eq!(rows[0].facts, "line1\nline2");
        assert_eq!(rows[0].why, "because");
        assert_eq!(rows[0].improve, "do better");
    }

    #[test]
    fn profit_per_x_groups_by_section_in_order() {
        let t = table(
            &["Section", "Segment", "Data", "Insight", "What to Improve More? (2026 Actions)"],
            &[
                &["B", "s1", "d\\nd", "i", "a"],
                &["A", "s2", "d", "i", "a"],
                &["B", "s3", "d", "i", "a"],
                &["", "skipped", "d", "i", "a"],
            ],
        );
        let sections = build_profit_per_x(&t);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].name, "B");
        assert_eq!(sections[0].rows.len(), 2);
        assert_eq!(sections[0].rows[0].data, "d<br>d");
    }

    #[test]
    fn fna_categories_cycle_palette_in_first_seen_order() {
        let t = table(
            &["KPI Category", "KPI"],
            &[
                &["Growth", "$\\mathbf{x}$"],
                &["", "y"],
                &["Growth", "z"],
            ],
        );
        let view = build_fna_performance(&t);
        assert_eq!(view.categories.len(), 2);
        assert_eq!(view.categories[0].name, "Growth");
        assert_eq!(view.categories[0].count, 2);
        assert_eq!(view.categories[1].name, "General");
        assert_eq!(view.categories[0].color, FNA_PALETTE[0]);
        assert_eq!(view.rows[0].text("KPI"), "x");
    }

    #[test]
    fn bob_totals_and_best_month() {
        let orders = table(
            &["Month", "BOB", "Self", "Total", "CS %"],
            &[
                &["Jan", "1,000", "500", "1,500", "0.8"],
                &["Feb", "2,000", "700", "2,700", "90"],
            ],
        );
        let view = build_bob(&orders, &Table::empty());
        assert_eq!(view.summary.total_bob, "3,000");
        assert_eq!(view.summary.best_month, "Feb");
        assert_eq!(view.summary.best_month_value, "2,700");
        // 0.8 fraction and 90% average to 85%
        assert_eq!(view.summary.avg_cs, "85.0%");
        assert_eq!(view.chart.cs, vec![80.0, 90.0]);
        assert_eq!(view.rows[0].cs, "80.0%");
    }

    #[test]
    fn bob_review_rows_parse_into_chunks() {
        let review = table(
            &["What worked?", "What is the next goal for BOB?"],
            &[&["- fast delivery\nsteady repeat rate", "scale to two cities"]],
        );
        let view = build_bob(&Table::empty(), &review);
        assert_eq!(view.reviews.len(), 1);
        assert_eq!(view.reviews[0].worked.len(), 2);
        assert_eq!(view.reviews[0].worked[0].kind, "bullet");
        assert_eq!(view.reviews[0].next_goal[0].text, "scale to two cities");
    }
}
