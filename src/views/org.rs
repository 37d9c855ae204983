use serde::Serialize;
use std::collections::HashMap;

use crate::table::{Row, Table};

#[derive(Clone, Debug, Serialize)]
pub struct OrgNode {
    pub name: String,
    pub original_name: String,
    pub level: String,
    pub department: String,
    pub role: String,
    pub status: String,
    pub photo_url: String,
    pub reports_to: String,
    pub children: Vec<OrgNode>,
}

/// Department card colors, keyed by the department labels in the sheet.
pub const DEPT_COLORS: &[(&str, &str)] = &[
    ("CEO", "#003366"),
    ("KHIT ZAY", "#007BFF"),
    ("LAST-MILE OPERATION TEAM", "#17a2b8"),
    ("BOB & CUSTOMER CARE TEAM", "#ffc107"),
    ("BUSINESS INTELLIGENCE TEAM", "#dc3545"),
    ("UI/UX TEAM", "#6f42c1"),
    ("DATA-BASED MARKETING TEAM", "#28a745"),
];

/// Role accent colors for the card's left border.
pub const ROLE_COLORS: &[(&str, &str)] = &[
    ("CEO", "#003366"),
    ("Dep. Head of Ecommerce", "#007BFF"),
    ("ASST MANAGER", "#17a2b8"),
    ("Executive", "#6f42c1"),
    ("JUNIOR", "#28a745"),
    ("DEVELOPER", "#6f42c1"),
    ("SNR DESIGNER", "#ffc107"),
    ("STAFF", "#dc3545"),
    ("BOB SALE DRIVE SUPERVISOR", "#ff9800"),
    ("BOB", "#ff9800"),
    ("CC Agent-VIP & Loyalty", "#ff9800"),
    ("CC Agent-Complaint", "#dc3545"),
    ("Vacant", "#b0b8c1"),
    ("EXECUTIVE (Shopper Marketing)", "#6f42c1"),
    ("EXECUTIVE (Buyer Marketing)", "#6f42c1"),
    ("STAFF (Data Analyst) + Virtual Fast Cash", "#28a745"),
];

struct FlatNode {
    name: String,
    original_name: String,
    level: String,
    department: String,
    role: String,
    status: String,
    photo_url: String,
    reports_to_raw: String,
    reports_to: String,
}

/// Build the org tree from the flat reports-to table.
///
/// Blank or "(Vacant)" names get a synthesized `Vacant_{n}` identity,
/// numbered in encounter order. A `Reports_To` that is blank, "0",
/// self-referential, or pointing at nobody makes the row a root. A vacant
/// reference resolves through the vacancy table to the most recently
/// synthesized identity for that spelling.
pub fn build_org_chart(table: &Table) -> Vec<OrgNode> {
    let mut order: Vec<String> = Vec::new();
    let mut nodes: HashMap<String, FlatNode> = HashMap::new();
    let mut vacant_map: HashMap<String, String> = HashMap::new();

    for row in table.rows() {
        let original_name = row.trimmed("Name");
        let name = if original_name.is_empty() || original_name.to_lowercase() == "(vacant)" {
            let generated = format!("Vacant_{}", vacant_map.len() + 1);
            vacant_map.insert(original_name.clone(), generated.clone());
            generated
        } else {
            original_name.clone()
        };

        if !nodes.contains_key(&name) {
            order.push(name.clone());
        }
        nodes.insert(
            name.clone(),
            FlatNode {
                name,
                original_name,
                level: row.trimmed("Level"),
                department: row.text("Department"),
                role: row.text("Role"),
                status: row.text("Status"),
                photo_url: row.text("Photo_URL"),
                reports_to_raw: row.trimmed("Reports_To"),
                reports_to: String::new(),
            },
        );
    }

    // Resolve every Reports_To against the synthesized identities
    let resolved: HashMap<String, String> = order
        .iter()
        .map(|name| {
            let raw = &nodes[name].reports_to_raw;
            let parent = if raw.is_empty() || raw == "0" {
                String::new()
            } else if let Some(mapped) = vacant_map.get(raw) {
                mapped.clone()
            } else if nodes.contains_key(raw) {
                raw.clone()
            } else {
                String::new()
            };
            (name.clone(), parent)
        })
        .collect();
    for (name, parent) in &resolved {
        if let Some(node) = nodes.get_mut(name) {
            node.reports_to = parent.clone();
        }
    }

    let mut roots: Vec<String> = Vec::new();
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for name in &order {
        let parent = &resolved[name];
        if parent.is_empty() || parent == name || !nodes.contains_key(parent) {
            roots.push(name.clone());
        } else {
            children.entry(parent.clone()).or_default().push(name.clone());
        }
    }

    fn assemble(
        name: &str,
        nodes: &HashMap<String, FlatNode>,
        children: &HashMap<String, Vec<String>>,
    ) -> OrgNode {
        let flat = &nodes[name];
        OrgNode {
            name: flat.name.clone(),
            original_name: flat.original_name.clone(),
            level: flat.level.clone(),
            department: flat.department.clone(),
            role: flat.role.clone(),
            status: flat.status.clone(),
            photo_url: flat.photo_url.clone(),
            reports_to: flat.reports_to.clone(),
            children: children
                .get(name)
                .map(|kids| {
                    kids.iter()
                        .map(|kid| assemble(kid, nodes, children))
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    roots
        .iter()
        .map(|root| assemble(root, &nodes, &children))
        .collect()
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ExecutiveSummary {
    pub brand_promise: String,
    pub mission_statement: String,
    pub dashboard_subtitle: String,
    pub strategic_insight: String,
    pub summary: String,
    pub points: Vec<Row>,
}

/// Brand-content keys are matched by substring; a row categorized "summary"
/// in the executive sheet carries the narrative, every other row is a KPI
/// point. A Summary content key overrides the sheet narrative.
pub fn build_executive_summary(exe: &Table, brand: &Table) -> ExecutiveSummary {
    let mut view = ExecutiveSummary::default();
    let mut summary_override: Option<String> = None;

    for row in brand.rows() {
        let key = row.text("Content_Key");
        let value = row.text("Content_Value");
        if key.contains("Brand_Promise") {
            view.brand_promise = value;
        } else if key.contains("Mission_Statement") {
            view.mission_statement = value;
        } else if key.contains("Dashboard_Subtitle") {
            view.dashboard_subtitle = value;
        } else if key.contains("Strategic Insight") {
            view.strategic_insight = value;
        } else if key.contains("Summary") {
            summary_override = Some(value);
        }
    }

    let mut summary_text: Option<String> = None;
    for row in exe.rows() {
        if row.trimmed("Category").to_lowercase() == "summary" {
            summary_text = Some(row.text("Key_Insight"));
        } else {
            view.points.push(row.clone());
        }
    }

    view.summary = summary_override.or(summary_text).unwrap_or_default();
    view
}

#[derive(Clone, Debug, Serialize)]
pub struct StageGroup {
    pub name: String,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusCount {
    pub name: String,
    pub count: usize,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct OperationHealth {
    pub insights: Vec<Row>,
    pub stages: Vec<StageGroup>,
    pub status_counts: Vec<StatusCount>,
}

/// Funnel rows grouped by stage in first-seen order; rows staged "Insight"
/// are split out, and non-empty statuses are tallied.
pub fn build_operation_health(table: &Table) -> OperationHealth {
    let mut view = OperationHealth::default();
    for row in table.rows() {
        let stage = row.trimmed("Funnel Stage");
        let status = row.trimmed("Status");
        if stage.to_lowercase() == "insight" {
            view.insights.push(row.clone());
            continue;
        }
        let stage = if stage.is_empty() { "Unassigned".to_string() } else { stage };
        match view.stages.iter_mut().find(|g| g.name == stage) {
            Some(group) => group.rows.push(row.clone()),
            None => view.stages.push(StageGroup {
                name: stage,
                rows: vec![row.clone()],
            }),
        }
        if !status.is_empty() {
            match view.status_counts.iter_mut().find(|c| c.name == status) {
                Some(counter) => counter.count += 1,
                None => view.status_counts.push(StatusCount {
                    name: status,
                    count: 1,
                }),
            }
        }
    }
    view
}

/// Straight passthrough for the simple record pages (segments, retail
/// swift): every cell already normalized to text-or-number with empty-string
/// fill.
pub fn build_records(table: &Table) -> Vec<Row> {
    table.rows().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CellValue;

    fn org_table(rows: &[&[&str]]) -> Table {
        Table::from_cells(
            vec![
                "Name".into(),
                "Level".into(),
                "Department".into(),
                "Role".into(),
                "Status".into(),
                "Photo_URL".into(),
                "Reports_To".into(),
            ],
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::text(*v)).collect())
                .collect(),
        )
    }

    #[test]
    fn vacancies_are_numbered_in_encounter_order() {
        let t = org_table(&[
            &["Boss", "1", "CEO", "CEO", "", "", ""],
            &["(Vacant)", "2", "", "STAFF", "", "", "Boss"],
            &["", "2", "", "STAFF", "", "", "Boss"],
            &["(vacant)", "3", "", "STAFF", "", "", "Boss"],
        ]);
        let roots = build_org_chart(&t);
        assert_eq!(roots.len(), 1);
        let names: Vec<&str> = roots[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Vacant_1", "Vacant_2", "Vacant_3"]);
        assert_eq!(roots[0].children[0].original_name, "(Vacant)");
    }

    #[test]
    fn self_reference_becomes_root() {
        let t = org_table(&[
            &["Solo", "1", "", "", "", "", "Solo"],
            &["Child", "2", "", "", "", "", "Solo"],
        ]);
        let roots = build_org_chart(&t);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "Solo");
        assert_eq!(roots[0].children[0].name, "Child");
    }

    #[test]
    fn unresolvable_and_zero_parents_become_roots() {
        let t = org_table(&[
            &["A", "1", "", "", "", "", "0"],
            &["B", "1", "", "", "", "", "Nobody Known"],
        ]);
        let roots = build_org_chart(&t);
        assert_eq!(roots.len(), 2);
    }

    #[test]
    fn vacant_reference_resolves_to_latest_synthesized_identity() {
        let t = org_table(&[
            &["Boss", "1", "", "", "", "", ""],
            &["(Vacant)", "2", "", "", "", "", "Boss"],
            &["(Vacant)", "2", "", "", "", "", "Boss"],
            &["Worker", "3", "", "", "", "", "(Vacant)"],
        ]);
        let roots = build_org_chart(&t);
        let vacant_2 = &roots[0].children[1];
        assert_eq!(vacant_2.name, "Vacant_2");
        assert_eq!(vacant_2.children.len(), 1);
        assert_eq!(vacant_2.children[0].name, "Worker");
    }

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_cells(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| CellValue::text(*v)).collect())
                .collect(),
        )
    }

    #[test]
    fn executive_summary_brand_keys_and_override() {
        let brand = table(
            &["Content_Key", "Content_Value"],
            &[
                &["Brand_Promise_2026", "always on time"],
                &["Mission_Statement", "deliver joy"],
                &["Summary_Override", "the short version"],
            ],
        );
        let exe = table(
            &["Category", "Key_Insight", "Value"],
            &[
                &["summary", "a longer narrative", ""],
                &["KPI", "orders up", "12%"],
            ],
        );
        let view = build_executive_summary(&exe, &brand);
        assert_eq!(view.brand_promise, "always on time");
        assert_eq!(view.mission_statement, "deliver joy");
        assert_eq!(view.summary, "the short version");
        assert_eq!(view.points.len(), 1);
    }

    #[test]
    fn executive_summary_falls_back_to_sheet_narrative() {
        let exe = table(
            &["Category", "Key_Insight"],
            &[&["Summary", "from the sheet"]],
        );
        let view = build_executive_summary(&exe, &Table::empty());
        assert_eq!(view.summary, "from the sheet");
    }

    #[test]
    fn operation_health_splits_insights_and_counts_statuses() {
        let t = table(
            &["Funnel Stage", "Status", "Metric"],
            &[
                &["Acquisition", "On Track", "m1"],
                &["Insight", "", "watch retention"],
                &["Acquisition", "At Risk", "m2"],
                &["", "On Track", "m3"],
            ],
        );
        let view = build_operation_health(&t);
        assert_eq!(view.insights.len(), 1);
        assert_eq!(view.stages.len(), 2);
        assert_eq!(view.stages[0].name, "Acquisition");
        assert_eq!(view.stages[1].name, "Unassigned");
        assert_eq!(
            view.status_counts,
            vec![
                StatusCount { name: "On Track".into(), count: 2 },
                StatusCount { name: "At Risk".into(), count: 1 },
            ]
        );
    }
}
