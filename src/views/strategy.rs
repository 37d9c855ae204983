use serde::Serialize;

use crate::clean::{self, clean_latex};
use crate::table::{Row, Table};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StrategyEntry {
    pub goal: String,
    pub phase: String,
    pub quarter: String,
    pub action: String,
    pub photos: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Pillar {
    pub name: String,
    pub entries: Vec<StrategyEntry>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct StrategyPlan {
    pub goal_text: String,
    pub pillars: Vec<Pillar>,
}

/// The strategy plan sheet lists one goal cell followed by blank goal cells
/// for its pillar rows; the current goal carries forward until replaced.
pub fn build_strategy_plan(table: &Table) -> StrategyPlan {
    let mut current_goal = String::new();
    let mut pillars: Vec<Pillar> = Vec::new();

    for row in table.rows() {
        let goal_raw = row.trimmed("Goal");
        if !goal_raw.is_empty() {
            current_goal = goal_raw;
        }
        let pillar = {
            let p = row.trimmed("Strategy Pillar");
            if p.is_empty() { "General".to_string() } else { p }
        };
        let photos = ["Photo_URL 1", "Photo_URL 2", "Photo_URL 3"]
            .iter()
            .map(|c| row.trimmed(c))
            .filter(|url| !url.is_empty())
            .collect();
        let entry = StrategyEntry {
            goal: current_goal.clone(),
            phase: row.text("Phase"),
            quarter: row.text("Quarter"),
            action: row.text("Action"),
            photos,
        };
        match pillars.iter_mut().find(|p| p.name == pillar) {
            Some(existing) => existing.entries.push(entry),
            None => pillars.push(Pillar {
                name: pillar,
                entries: vec![entry],
            }),
        }
    }

    let goal_text = if current_goal.is_empty() {
        "2026 Strategy Plan".to_string()
    } else {
        current_goal
    };
    StrategyPlan { goal_text, pillars }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwotItem {
    pub id: String,
    pub title: String,
    pub details_2025: String,
    pub details_2026: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct SwotSection {
    pub category: String,
    pub items: Vec<SwotItem>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyInsight {
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Swot {
    pub sections: Vec<SwotSection>,
    pub key_insights: Vec<KeyInsight>,
}

fn first_non_empty(row: &Row, candidates: &[&str]) -> String {
    for c in candidates {
        let v = row.text(c);
        if !v.is_empty() {
            return v;
        }
    }
    String::new()
}

/// SWOT rows grouped by Category in first-seen order; rows categorized
/// "Key Insight" are pulled out into their own card list.
pub fn build_swot(table: &Table) -> Swot {
    let mut swot = Swot::default();

    for row in table.rows() {
        let category = row.trimmed("Category");
        if category.is_empty() {
            continue;
        }
        let point_id = row.text("Point_ID");
        let key_item = first_non_empty(row, &["Key_Item", "Key Item"]);
        let insight_2025 = first_non_empty(row, &["2025", "2025 Insight"]);
        let strategy_2026 = first_non_empty(row, &["2026", "2026 Strategy"]);

        if category.to_lowercase() == "key insight" {
            let content = [&insight_2025, &strategy_2026, &point_id]
                .into_iter()
                .find(|v| !v.is_empty())
                .cloned()
                .unwrap_or_default();
            swot.key_insights.push(KeyInsight {
                title: key_item,
                content,
            });
            continue;
        }

        let item = SwotItem {
            id: point_id,
            title: key_item,
            details_2025: insight_2025,
            details_2026: strategy_2026,
        };
        match swot.sections.iter_mut().find(|s| s.category == category) {
            Some(section) => section.items.push(item),
            None => swot.sections.push(SwotSection {
                category,
                items: vec![item],
            }),
        }
    }

    swot
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DnaItem {
    pub point_id: String,
    pub key_item: String,
    pub dna: String,
    pub details: String,
    pub area: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct DnaSection {
    pub title: String,
    pub items: Vec<DnaItem>,
}

const DNA_SECTIONS: &[(&str, &str)] = &[
    ("core values", "I. Core Values"),
    ("hygiene factors", "II. Hygiene Factors"),
    ("motivation factors", "III. Motivation Factors"),
    ("strategic insight", "Strategic Insight"),
];

fn dna_sort_key(point_id: &str) -> (u8, i64, String) {
    let group = match point_id.chars().next() {
        Some('V') => 0,
        Some('H') => 1,
        Some('M') => 2,
        _ => return (3, 0, point_id.to_string()),
    };
    (group, point_id[1..].parse::<i64>().unwrap_or(0), String::new())
}

/// Organizational DNA rows bucketed into the fixed section order, LaTeX
/// scrubbed, and sorted inside each section by the V/H/M point id scheme.
pub fn build_dna(table: &Table) -> Vec<DnaSection> {
    let mut sections: Vec<DnaSection> = DNA_SECTIONS
        .iter()
        .map(|(_, title)| DnaSection {
            title: (*title).to_string(),
            items: Vec::new(),
        })
        .collect();

    for row in table.rows() {
        let content_area = row.trimmed("Content_Area");
        let Some(index) = DNA_SECTIONS
            .iter()
            .position(|(key, _)| *key == content_area.to_lowercase())
        else {
            continue;
        };
        sections[index].items.push(DnaItem {
            point_id: row.text("Point_ID"),
            key_item: row.text("Key_Item"),
            dna: clean_latex(&row.text("DNA")),
            details: clean_latex(&row.text("Details/Data_Alignment")),
            area: content_area,
        });
    }

    for section in &mut sections {
        section.items.sort_by_key(|item| dna_sort_key(&item.point_id));
    }
    sections
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct Trajectories {
    pub trajectories: Vec<Row>,
    pub summary: Vec<Row>,
}

/// Section_IDs T1..Tn are trajectories, S1..Sn are the summary block.
pub fn build_trajectories(table: &Table) -> Trajectories {
    let mut view = Trajectories::default();
    for row in table.rows() {
        let section_id = row.trimmed("Section_ID");
        if section_id.is_empty() {
            continue;
        }
        let numbered = |prefix: char| {
            section_id.starts_with(prefix)
                && section_id.len() > 1
                && section_id[1..].chars().all(|c| c.is_ascii_digit())
        };
        if numbered('T') {
            view.trajectories.push(row.clone());
        } else if numbered('S') {
            view.summary.push(row.clone());
        }
    }
    view
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValueMapItem {
    pub key_identifier: String,
    pub headline: String,
    pub rationale: String,
    pub category: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct ValueMap {
    pub pains: Vec<ValueMapItem>,
    pub relievers: Vec<ValueMapItem>,
    pub gains: Vec<ValueMapItem>,
    pub creators: Vec<ValueMapItem>,
    pub activities: Vec<ValueMapItem>,
    pub products: Vec<ValueMapItem>,
    pub services: Vec<ValueMapItem>,
    pub demo: Vec<ValueMapItem>,
    pub justtobedone: Vec<ValueMapItem>,
}

/// Category labels that differ between the full-price and promo variants of
/// the value map. These read as inconsistencies in the source data but are
/// kept as separate literal lists.
pub struct ValueMapVariant {
    pub products_label: &'static str,
    pub services: &'static [&'static str],
    pub demo: &'static [&'static str],
}

pub const FULL_PRICE_VARIANT: ValueMapVariant = ValueMapVariant {
    products_label: "top-performing full-price brands",
    services: &[
        "delivery",
        "return",
        "customer service",
        "delivery tracking",
        "service",
    ],
    demo: &[
        "core customer demo",
        "core customer geo",
        "core customer demo + geo",
    ],
};

pub const PROMO_VARIANT: ValueMapVariant = ValueMapVariant {
    products_label: "top promo brands (actual performance):",
    services: &[
        "cod",
        "return",
        "customer service",
        "delivery tracking",
        "service",
    ],
    demo: &[
        "new customer demo",
        "new customer geo",
        "new customer demo + geo",
    ],
};

/// Value-proposition canvas buckets. Spaces in header names count as
/// underscores ("Key Insight" and "Key_Insight" are the same column), and
/// the rationale falls back from Highlight to Current_Status when the
/// former is blank.
pub fn build_value_map(table: &Table, variant: &ValueMapVariant) -> ValueMap {
    let column = |wanted: &str| -> Option<String> {
        table
            .columns()
            .iter()
            .find(|c| c.replace(' ', "_") == wanted)
            .cloned()
    };
    let col_category = column("Category");
    let col_point = column("Point");
    let col_insight = column("Key_Insight");
    let col_highlight = column("Highlight");
    let col_status = column("Current_Status");
    let read = |row: &Row, col: &Option<String>| -> String {
        col.as_ref().map(|c| row.text(c)).unwrap_or_default()
    };

    let mut view = ValueMap::default();

    for row in table.rows() {
        let raw_category = read(row, &col_category).trim().to_string();
        let category = raw_category.to_lowercase();
        let rationale = {
            let highlight = read(row, &col_highlight);
            if highlight.trim().is_empty() {
                read(row, &col_status)
            } else {
                highlight
            }
        };
        let item = ValueMapItem {
            key_identifier: read(row, &col_point),
            headline: read(row, &col_insight),
            rationale,
            category: raw_category,
        };

        if category == "pain" {
            view.pains.push(item);
        } else if category == "pain reliever" {
            view.relievers.push(item);
        } else if category == "gain" {
            view.gains.push(item);
        } else if category == "gain creator" {
            view.creators.push(item);
        } else if category == "activity" {
            view.activities.push(item);
        } else if category == variant.products_label {
            view.products.push(item);
        } else if variant.services.contains(&category.as_str()) {
            view.services.push(item);
        } else if variant.demo.contains(&category.as_str()) {
            view.demo.push(item);
        } else if clean::is_jtbd_category(&category) {
            view.justtobedone.push(item);
        }
    }

    view
}

#[derive(Clone, Debug, Serialize)]
pub struct ObjectiveGroup {
    pub objective: String,
    pub items_2025: Vec<Row>,
    pub items_2026: Vec<Row>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TeamComparison {
    pub team: String,
    pub objectives: Vec<ObjectiveGroup>,
    pub avg_2025: Option<f64>,
    pub avg_2026: Option<f64>,
}

fn compute_avg(rows: &[Row]) -> Option<f64> {
    let mut values = Vec::new();
    for row in rows {
        let raw = row.text("Average");
        if raw.is_empty() {
            continue;
        }
        let s = raw.replace('%', "");
        if let Ok(v) = s.trim().parse::<f64>() {
            // sheet stores fractions, 0.7 means 70%
            values.push(v * 100.0);
        }
    }
    if values.is_empty() {
        return None;
    }
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    Some((avg * 10.0).round() / 10.0)
}

/// 2025-vs-2026 OKR comparison: rows split by the Years column, grouped by
/// functional team and then by objective, with one item list per year and a
/// per-team average score for each year.
pub fn build_okr_comparison(table: &Table) -> Vec<TeamComparison> {
    let mut okr_2025: Vec<Row> = Vec::new();
    let mut okr_2026: Vec<Row> = Vec::new();
    for row in table.rows() {
        let year = row.trimmed("Years");
        if year.contains("2025") {
            okr_2025.push(row.clone());
        } else if year.contains("2026") {
            okr_2026.push(row.clone());
        }
    }

    let team_of = |row: &Row| -> String {
        let team = row.text("Functional POVs");
        let trimmed = team.trim();
        if trimmed.is_empty() {
            "Other".to_string()
        } else {
            trimmed.to_string()
        }
    };

    let mut teams: Vec<String> = Vec::new();
    for row in okr_2025.iter().chain(okr_2026.iter()) {
        let team = team_of(row);
        if !teams.contains(&team) {
            teams.push(team);
        }
    }
    teams.sort();

    let objective_of = |row: &Row| -> String {
        let o = row.text("Objective");
        if o.is_empty() { "No Objective".to_string() } else { o }
    };

    let mut comparison = Vec::new();
    for team in teams {
        let items_2025: Vec<Row> = okr_2025
            .iter()
            .filter(|r| team_of(r) == team)
            .cloned()
            .collect();
        let items_2026: Vec<Row> = okr_2026
            .iter()
            .filter(|r| team_of(r) == team)
            .cloned()
            .collect();

        let mut objectives: Vec<ObjectiveGroup> = Vec::new();
        for row in &items_2025 {
            let objective = objective_of(row);
            match objectives.iter_mut().find(|g| g.objective == objective) {
                Some(group) => group.items_2025.push(row.clone()),
                None => objectives.push(ObjectiveGroup {
                    objective,
                    items_2025: vec![row.clone()],
                    items_2026: Vec::new(),
                }),
            }
        }
        for row in &items_2026 {
            let objective = objective_of(row);
            match objectives.iter_mut().find(|g| g.objective == objective) {
                Some(group) => group.items_2026.push(row.clone()),
                None => objectives.push(ObjectiveGroup {
                    objective,
                    items_2025: Vec::new(),
                    items_2026: vec![row.clone()],
                }),
            }
        }

        comparison.push(TeamComparison {
            team,
            avg_2025: compute_avg(&items_2025),
            avg_2026: compute_avg(&items_2026),
            objectives,
        });
    }

    comparison
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RoadmapItem {
    pub activity_id: String,
    pub topic: String,
    pub owner: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct QuarterGroup {
    pub name: String,
    pub items: Vec<RoadmapItem>,
}

/// Roadmap activities grouped by Quarter (sorted), with tolerant
/// case-insensitive column lookup for the id/topic/owner fields.
pub fn build_roadmap(table: &Table) -> Vec<QuarterGroup> {
    let mut quarters: Vec<QuarterGroup> = Vec::new();
    for row in table.rows() {
        let quarter = {
            let q = row.text_any(&["Quarter"]).trim().to_string();
            if q.is_empty() { "Unassigned".to_string() } else { q }
        };
        let item = RoadmapItem {
            activity_id: row.text_any(&["Activity_ID", "Activity ID"]),
            topic: row.text_any(&["Key Topic", "Key_Topic", "Key Activity"]),
            owner: row.text_any(&["Owner"]),
        };
        match quarters.iter_mut().find(|g| g.name == quarter) {
            Some(group) => group.items.push(item),
            None => quarters.push(QuarterGroup {
                name: quarter,
                items: vec![item],
            }),
        }
    }
    quarters.sort_by(|a, b| a.name.cmp(&b.name));
    quarters
}
