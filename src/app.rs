use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use log::info;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::cache::SheetCache;
use crate::clean::{format_money, parse_number};
use crate::config::Config;
use crate::source::{ExcelWorkbook, WorkbookSource};
use crate::views::{finance, org, products, strategy};

pub struct AppState {
    cache: SheetCache<WorkbookSource>,
    templates: Handlebars<'static>,
}

/// `{{money value}}`: format a cell like 1,234,567.00, passing the raw text
/// through when it does not parse.
fn money_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let raw = match h.param(0).map(|p| p.value()) {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    match parse_number(&raw) {
        Some(n) => out.write(&format_money(Some(n)))?,
        None => out.write(&raw)?,
    }
    Ok(())
}

/// `{{{json value}}}`: embed a value as JSON, for client-side chart data.
fn json_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .map(|p| p.value().clone())
        .unwrap_or(serde_json::Value::Null);
    out.write(&value.to_string())?;
    Ok(())
}

fn build_templates() -> Result<Handlebars<'static>, Box<dyn std::error::Error>> {
    let mut handlebars = Handlebars::new();
    handlebars.register_templates_directory(".hbs", "templates")?;
    handlebars.register_helper("money", Box::new(money_helper));
    handlebars.register_helper("json", Box::new(json_helper));
    Ok(handlebars)
}

#[cfg(feature = "remote")]
async fn build_source(config: &Config) -> Result<WorkbookSource, Box<dyn std::error::Error>> {
    use crate::source::RemoteWorkbook;

    if let Some(id) = &config.spreadsheet_id {
        let remote = RemoteWorkbook::connect(id.clone(), &config.service_account_file).await?;
        return Ok(WorkbookSource::Remote(remote));
    }
    Ok(WorkbookSource::Excel(ExcelWorkbook::new(
        &config.workbook_path,
    )))
}

#[cfg(not(feature = "remote"))]
async fn build_source(config: &Config) -> Result<WorkbookSource, Box<dyn std::error::Error>> {
    Ok(WorkbookSource::Excel(ExcelWorkbook::new(
        &config.workbook_path,
    )))
}

pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let source = build_source(&config).await?;
    let app_state = Arc::new(AppState {
        cache: SheetCache::new(source, config.cache_ttl_seconds),
        templates: build_templates()?,
    });

    let app = router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::temporary("/home") }))
        .route("/home", get(home))
        .route("/executive_summary", get(executive_summary))
        .route("/profit_n_loss", get(profit_n_loss))
        .route("/financial_review", get(financial_review))
        .route("/ecom", get(ecom_target))
        .route("/ecom_comp", get(ecom_comparison))
        .route("/strategy_plan", get(strategy_plan))
        .route("/org_structure", get(org_structure))
        .route("/top_product", get(top_product))
        .route("/top_product_promo", get(top_product_promo))
        .route("/value_map", get(value_map))
        .route("/value_map_promo", get(value_map_promo))
        .route("/trajectories", get(trajectories))
        .route("/retail_swift_online", get(retail_swift_online))
        .route("/segments", get(segments))
        .route("/profit_x", get(profit_per_x))
        .route("/profit_per_x", get(profit_per_x))
        .route("/dna", get(dna))
        .route("/roadmap", get(roadmap))
        .route("/swot", get(swot))
        .route("/cost_per_x", get(cost_per_x))
        .route("/okr", get(okr))
        .route("/fna_performance", get(fna_performance))
        .route("/operation_health", get(operation_health))
        .route("/bob", get(bob))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}

fn render<T: Serialize>(state: &AppState, template: &str, context: &T) -> Response {
    match state.templates.render(template, context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::error!("template '{template}' failed to render: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "render error").into_response()
        }
    }
}

async fn home(State(state): State<Arc<AppState>>) -> Response {
    render(&state, "home", &json!({ "title": "Strategic Insight" }))
}

async fn executive_summary(State(state): State<Arc<AppState>>) -> Response {
    let exe = state.cache.get_table("exe_summary").await;
    let brand = state.cache.get_table("brand_promise").await;
    let view = org::build_executive_summary(&exe, &brand);
    render(
        &state,
        "executive_summary",
        &json!({ "title": "Executive Summary", "view": view }),
    )
}

async fn profit_n_loss(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("P&L").await;
    let rows = finance::build_profit_n_loss(&table);
    render(
        &state,
        "profit_n_loss",
        &json!({ "title": "Profit & Loss", "rows": rows }),
    )
}

async fn financial_review(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("Financial Review 25").await;
    let sections = finance::build_financial_review(&table);
    render(
        &state,
        "financial_review",
        &json!({ "title": "Financial Review", "sections": sections }),
    )
}

async fn ecom_target(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("2026 Ecom Target").await;
    let view = finance::build_ecom_target(&table);
    render(
        &state,
        "ecom",
        &json!({
            "title": "E-commerce Performance",
            "active_tab": "target",
            "target": view,
            "comparison": finance::EcomComparison::default(),
        }),
    )
}

async fn ecom_comparison(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("ecom 2024 vs 2025").await;
    let view = finance::build_ecom_comparison(&table);
    render(
        &state,
        "ecom",
        &json!({
            "title": "E-commerce Performance",
            "active_tab": "comparison",
            "target": finance::EcomTarget::default(),
            "comparison": view,
        }),
    )
}

async fn strategy_plan(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("2026 Strategy plan").await;
    let view = strategy::build_strategy_plan(&table);
    render(
        &state,
        "strategy_plan",
        &json!({ "title": "2026 Strategy Plan", "view": view }),
    )
}

async fn org_structure(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("org_chart").await;
    let roots = org::build_org_chart(&table);
    let dept_colors: serde_json::Map<String, serde_json::Value> = org::DEPT_COLORS
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    let role_colors: serde_json::Map<String, serde_json::Value> = org::ROLE_COLORS
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    render(
        &state,
        "org_structure",
        &json!({
            "title": "Organizational Structure",
            "root_nodes": roots,
            "dept_colors": dept_colors,
            "role_colors": role_colors,
        }),
    )
}

async fn top_product(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("top_product_full_price").await;
    let rows = products::build_top_products(&table);
    let offer_table = state.cache.get_table("three_offer").await;
    let offers = products::build_offers(&offer_table);
    render(
        &state,
        "top_product",
        &json!({
            "title": "Top 10 Product Forecast",
            "rows": rows,
            "offers_by_product": offers,
        }),
    )
}

async fn top_product_promo(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("top_product_promo").await;
    let rows = products::build_top_products(&table);
    render(
        &state,
        "top_product_promo",
        &json!({ "title": "Top 10 Product Promo Forecast", "rows": rows }),
    )
}

async fn value_map(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("Full price value_map").await;
    let view = strategy::build_value_map(&table, &strategy::FULL_PRICE_VARIANT);
    render(
        &state,
        "value_map",
        &json!({ "title": "Value Proposition (Full Price)", "view": view }),
    )
}

async fn value_map_promo(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("promo price value_map").await;
    let view = strategy::build_value_map(&table, &strategy::PROMO_VARIANT);
    render(
        &state,
        "value_map_promo",
        &json!({ "title": "Value Proposition (Promo Price)", "view": view }),
    )
}

async fn trajectories(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("trajectories").await;
    let view = strategy::build_trajectories(&table);
    render(
        &state,
        "trajectories",
        &json!({ "title": "Trajectories & Strategic Insights", "view": view }),
    )
}

async fn retail_swift_online(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("Retail_Swift_Online").await;
    render(
        &state,
        "retail_swift",
        &json!({ "title": "Retail Swift Online", "data": org::build_records(&table) }),
    )
}

async fn segments(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("Core -New segments").await;
    render(
        &state,
        "segments",
        &json!({ "title": "Customer Segments", "data": org::build_records(&table) }),
    )
}

async fn profit_per_x(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("Profit per X").await;
    let sections = finance::build_profit_per_x(&table);
    render(
        &state,
        "profit_per_x",
        &json!({ "title": "Profit per X", "sections": sections }),
    )
}

async fn dna(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("dna").await;
    let sections = strategy::build_dna(&table);
    render(
        &state,
        "dna",
        &json!({
            "title": "Organizational DNA",
            "description": "The foundational values, hygiene factors, and motivation drivers that shape our culture and performance.",
            "sections": sections,
        }),
    )
}

async fn roadmap(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("roadmap").await;
    let quarters = strategy::build_roadmap(&table);
    render(
        &state,
        "roadmap",
        &json!({ "title": "Roadmap", "quarters": quarters }),
    )
}

async fn swot(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("swot").await;
    let view = strategy::build_swot(&table);
    render(&state, "swot", &json!({ "title": "SWOT", "view": view }))
}

async fn cost_per_x(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("Cost per X").await;
    let rows = finance::build_cost_per_x(&table);
    render(
        &state,
        "cost_per_x",
        &json!({ "title": "Cost per X", "rows": rows }),
    )
}

async fn okr(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("okr").await;
    let comparison = strategy::build_okr_comparison(&table);
    render(
        &state,
        "okr",
        &json!({ "title": "OKR Dashboard: 2025 vs 2026", "comparison": comparison }),
    )
}

async fn fna_performance(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("fna_performance").await;
    let view = finance::build_fna_performance(&table);
    render(
        &state,
        "fna_performance",
        &json!({ "title": "FNA Performance", "view": view }),
    )
}

async fn operation_health(State(state): State<Arc<AppState>>) -> Response {
    let table = state.cache.get_table("operation_health").await;
    let view = org::build_operation_health(&table);
    render(
        &state,
        "operation_health",
        &json!({ "title": "Operations Health", "view": view }),
    )
}

async fn bob(State(state): State<Arc<AppState>>) -> Response {
    let orders = state.cache.get_table("BOB").await;
    let review = state.cache.get_table("BOB_review").await;
    let view = finance::build_bob(&orders, &review);
    render(
        &state,
        "bob",
        &json!({
            "title": "BOB Performance",
            "description": "Monthly BOB volume split with qualitative learnings",
            "view": view,
        }),
    )
}
