#![cfg(feature = "web")]

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cards::{self, CardView, LOAD_BATCH, RoleFilter, SortKey};
use crate::config::Config;
use crate::error::StoreError;
use crate::form::{FormErrors, NewUserForm};
use crate::query::{self, PaginationMode, QueryResult, Sort, SortOrder, user_schema};
use crate::saving::{FileStore, JsonRepository, Repository};
use crate::store::UserStore;
use crate::table::TABLE_PAGE_SIZE;
use crate::user::User;

pub type DynRepository = Box<dyn Repository + Send>;

pub struct AppState {
    store: Mutex<UserStore<DynRepository>>,
}

impl AppState {
    pub fn new(store: UserStore<DynRepository>) -> Self {
        AppState {
            store: Mutex::new(store),
        }
    }

    fn store(&self) -> MutexGuard<'_, UserStore<DynRepository>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

impl StatusResponse {
    fn error(message: impl Into<String>) -> Self {
        StatusResponse {
            status: "error".to_string(),
            message: Some(message.into()),
        }
    }
}

#[derive(Serialize)]
struct ValidationResponse {
    status: String,
    errors: FormErrors,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PageResponse<'a> {
    #[serde(flatten)]
    result: QueryResult<'a, User>,
    page: usize,
    page_label: String,
    has_more_items: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    columns: Option<usize>,
}

/// Load the persisted users and serve the API until the process stops.
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let repo: DynRepository = Box::new(JsonRepository::new(FileStore::open(&config.data_dir)?));
    let store = UserStore::load(repo, config.seed_count, &mut rand::thread_rng())?;
    info!(
        "{} users loaded from {}",
        store.len(),
        config.data_dir.display()
    );

    let app = router(Arc::new(AppState::new(store)));

    let listener = TcpListener::bind(&config.addr).await?;
    info!("Listening on http://{}", config.addr);
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/cards", get(list_cards))
        .route("/api/users/roles", get(list_roles))
        .route("/api/users/groups/:field", get(list_group_values))
        .route("/api/users/:id", get(get_user))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn param<'p>(params: &'p [(String, String)], key: &str) -> Option<&'p str> {
    params
        .iter()
        .rev()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn number_param(params: &[(String, String)], key: &str) -> Option<usize> {
    param(params, key).and_then(|v| v.trim().parse().ok())
}

/// Table projection.
///
/// Query parameters: `search`, `sort`, `order`, `page`, `mode`, `visible`,
/// and any number of `group=<field>:<value>` selections.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<serde_json::Value> {
    let schema = user_schema();
    let mut table = query::Query::new(TABLE_PAGE_SIZE);

    if let Some(search) = param(&params, "search") {
        table.search = search.to_string();
    }
    if let Some(key) = param(&params, "sort") {
        let order = param(&params, "order").map_or(SortOrder::Asc, SortOrder::parse);
        table.sort = Some(Sort::new(key, order));
    }
    for (_, selection) in params.iter().filter(|(k, _)| k == "group") {
        if let Some((field, value)) = selection.split_once(':') {
            table
                .group_filters
                .entry(field.to_string())
                .or_default()
                .insert(value.to_string());
        }
    }
    table.mode = param(&params, "mode").map_or(PaginationMode::Paginated, PaginationMode::parse);
    table.page = number_param(&params, "page").unwrap_or(1).max(1);
    table.visible_count = number_param(&params, "visible").unwrap_or(TABLE_PAGE_SIZE);

    let store = state.store();
    let result = query::run(store.users(), &schema, &table);
    debug!(
        "table query {:?}: {} of {} rows",
        table.search,
        result.items.len(),
        result.total_count
    );

    let has_more_items =
        table.mode == PaginationMode::All && table.visible_count < result.total_count;
    Json(page_json(result, table.page, has_more_items, None))
}

/// Card projection.
///
/// Query parameters: `search`, `role`, `sort`, `order`, `page`, `mode`,
/// `visible` (window length in infinite mode) and `width` (grid width in
/// pixels, answered with a `columns` count).
async fn list_cards(
    State(state): State<Arc<AppState>>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<serde_json::Value> {
    let mut view = CardView::new(user_schema());
    if let Some(search) = param(&params, "search") {
        view.set_search(search);
    }
    if let Some(role) = param(&params, "role") {
        view.set_role_filter(RoleFilter::parse(role));
    }
    if let Some(key) = param(&params, "sort") {
        view.set_sort_key(SortKey::parse(key));
    }
    if let Some(order) = param(&params, "order") {
        view.set_sort_order(SortOrder::parse(order));
    }
    if let Some(mode) = param(&params, "mode") {
        view.set_pagination_mode(PaginationMode::parse(mode));
    }

    let mut grid = view.query();
    grid.page = number_param(&params, "page").unwrap_or(1).max(1);
    grid.visible_count = number_param(&params, "visible").unwrap_or(LOAD_BATCH);
    let columns = param(&params, "width")
        .and_then(|w| w.trim().parse::<f64>().ok())
        .map(cards::grid_columns);

    let store = state.store();
    let result = query::run(store.users(), &user_schema(), &grid);
    let has_more_items = view.mode() == PaginationMode::All && grid.visible_count < result.total_count;
    Json(page_json(result, grid.page, has_more_items, columns))
}

fn page_json(
    result: QueryResult<'_, User>,
    page: usize,
    has_more_items: bool,
    columns: Option<usize>,
) -> serde_json::Value {
    let page_label = query::page_label(page, result.total_pages);
    let response = PageResponse {
        result,
        page,
        page_label,
        has_more_items,
        columns,
    };
    serde_json::to_value(&response).unwrap_or_else(|e| {
        warn!("failed to serialize page: {e}");
        serde_json::Value::Null
    })
}

async fn list_roles(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store = state.store();
    Json(cards::role_options(store.users()))
}

async fn list_group_values(
    Path(field): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let schema = user_schema();
    let Some(column) = schema.column(&field).filter(|c| c.groupable) else {
        return (
            StatusCode::NOT_FOUND,
            Json(StatusResponse::error(format!("no group filter on {field}"))),
        )
            .into_response();
    };

    let store = state.store();
    Json(query::distinct_values(store.users(), column)).into_response()
}

async fn get_user(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let store = state.store();
    match store.lookup(&id) {
        Ok(user) => Json(user).into_response(),
        Err(e) => (StatusCode::NOT_FOUND, Json(StatusResponse::error(e.to_string()))).into_response(),
    }
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    Json(form): Json<NewUserForm>,
) -> Response {
    let user = match form.submit(&mut rand::thread_rng(), Utc::now()) {
        Ok(user) => user,
        Err(errors) => {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationResponse {
                    status: "error".to_string(),
                    errors,
                }),
            )
                .into_response();
        }
    };

    let mut store = state.store();
    match store.add(user.clone()) {
        Ok(()) => {
            info!("added user {}", user.id);
            (StatusCode::CREATED, Json(user)).into_response()
        }
        Err(e @ StoreError::InvalidCoordinates { .. }) => {
            (StatusCode::BAD_REQUEST, Json(StatusResponse::error(e.to_string()))).into_response()
        }
        Err(e) => {
            warn!("failed to add user: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(StatusResponse::error(e.to_string())),
            )
                .into_response()
        }
    }
}
