use serde::Serialize;
use std::collections::HashMap;

use crate::clean::{HeaderPredicate, map_headers};
use crate::table::{Row, Table};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ProductRow {
    pub no: String,
    pub product: String,
    pub product_key: String,
    pub current_qty: Option<f64>,
    pub sale_total: Option<f64>,
    pub insight: String,
    pub strategy_focus: String,
    pub q1_forecast: Option<f64>,
    pub q2_forecast: Option<f64>,
    pub q3_forecast: Option<f64>,
    pub q4_forecast: Option<f64>,
    pub image_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Offer {
    pub title: String,
    pub img: String,
    pub label: String,
}

/// The sheet headers drift release to release ("2025 Qty Sold", "Qty",
/// "Sales Total (MMK)", ...), so canonical fields are found by keyword.
/// Rule order matters: the qty rule has to run before the quarter rules or
/// a header like "2025 Qty (Q1)" lands in the wrong field.
const PRODUCT_HEADER_RULES: &[(HeaderPredicate, &'static str)] = &[
    (
        |h: &str| h.contains("2025 qty") || h.contains("qty"),
        "Current_Qty",
    ),
    (|h: &str| h.contains("insight"), "Insight"),
    (|h: &str| h.contains("action"), "Strategy_Focus"),
    (|h: &str| h == "no", "No"),
    (|h: &str| h == "product", "Product"),
    (|h: &str| h.contains("sale"), "Sale_Total"),
    (|h: &str| h.contains("q1"), "Q1_Forecast"),
    (|h: &str| h.contains("q2"), "Q2_Forecast"),
    (|h: &str| h.contains("q3"), "Q3_Forecast"),
    (|h: &str| h.contains("q4"), "Q4_Forecast"),
    (
        |h: &str| h.contains("image_url") || h.contains("image"),
        "Image_URL",
    ),
];

fn normalize_product_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn numberish(raw: &str) -> Option<f64> {
    let s = raw.trim().replace(',', "");
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok()
}

/// Top-product forecast rows with fuzzy header mapping and numeric cleanup;
/// quantities that fail to parse stay missing rather than zero.
pub fn build_top_products(table: &Table) -> Vec<ProductRow> {
    if table.is_empty() {
        return Vec::new();
    }
    let mapping = map_headers(table.columns(), PRODUCT_HEADER_RULES);
    let find = |canonical: &str| {
        table
            .columns()
            .iter()
            .find(|c| mapping.get(*c).map(String::as_str) == Some(canonical))
            .cloned()
    };

    let col_no = find("No");
    let col_product = find("Product");
    let col_qty = find("Current_Qty");
    let col_sale = find("Sale_Total");
    let col_insight = find("Insight");
    let col_focus = find("Strategy_Focus");
    let col_q1 = find("Q1_Forecast");
    let col_q2 = find("Q2_Forecast");
    let col_q3 = find("Q3_Forecast");
    let col_q4 = find("Q4_Forecast");
    let col_image = find("Image_URL");

    let text = |row: &Row, col: &Option<String>| -> String {
        col.as_ref().map(|c| row.text(c)).unwrap_or_default()
    };
    let number = |row: &Row, col: &Option<String>| -> Option<f64> {
        col.as_ref().and_then(|c| numberish(&row.text(c)))
    };

    table
        .rows()
        .iter()
        .map(|row| {
            let product = text(row, &col_product);
            ProductRow {
                no: text(row, &col_no),
                product_key: normalize_product_key(&product),
                product,
                current_qty: number(row, &col_qty),
                sale_total: number(row, &col_sale),
                insight: text(row, &col_insight),
                strategy_focus: text(row, &col_focus),
                q1_forecast: number(row, &col_q1),
                q2_forecast: number(row, &col_q2),
                q3_forecast: number(row, &col_q3),
                q4_forecast: number(row, &col_q4),
                image_url: text(row, &col_image),
            }
        })
        .collect()
}

/// Per-product offers from the three-offer sheet, keyed by normalized
/// product name and capped at three to match the card layout.
pub fn build_offers(table: &Table) -> HashMap<String, Vec<Offer>> {
    let mut offers: HashMap<String, Vec<Offer>> = HashMap::new();

    for row in table.rows() {
        let product = row.trimmed("Product");
        if product.is_empty() {
            continue;
        }
        let offer_text = row.trimmed("Offer");
        let offer_label = row.trimmed("Offer_Product");
        let photo_url = row.trimmed("Photo_URL");

        offers
            .entry(normalize_product_key(&product))
            .or_default()
            .push(Offer {
                title: if offer_text.is_empty() {
                    "Offer details coming soon".to_string()
                } else {
                    offer_text
                },
                img: photo_url,
                label: if offer_label.is_empty() {
                    "Offer".to_string()
                } else {
                    offer_label
                },
            });
    }

    for list in offers.values_mut() {
        list.truncate(3);
    }
    offers
}
