use std::collections::BTreeSet;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::query::{self, PaginationMode, Query, QueryResult, Schema, Sort, SortOrder};
use crate::user::User;

/// Cards per page in paginated mode.
pub const CARD_PAGE_SIZE: usize = 12;

/// Cards added per "load more" in infinite mode; also the initial window.
pub const LOAD_BATCH: usize = 10;

/// Distance from the bottom of the list that triggers loading more.
pub const SCROLL_THRESHOLD: f64 = 200.0;

/// Minimum time between two scroll-triggered loads.
pub const SCROLL_DEBOUNCE: Duration = Duration::from_millis(100);

/// Minimum card width in the responsive grid.
pub const MIN_CARD_WIDTH: f64 = 320.0;

/// Gap between grid columns.
pub const GRID_GAP: f64 = 24.0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoleFilter {
    #[default]
    All,
    Only(String),
}

impl RoleFilter {
    /// "all" (or empty) selects everything; anything else is an exact role.
    pub fn parse(s: &str) -> Self {
        if s.is_empty() || s == "all" {
            RoleFilter::All
        } else {
            RoleFilter::Only(s.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Name,
    CreatedAt,
}

impl SortKey {
    /// Unknown keys sort by name.
    pub fn parse(s: &str) -> Self {
        match s {
            "createdAt" => SortKey::CreatedAt,
            _ => SortKey::Name,
        }
    }

    pub fn field(self) -> &'static str {
        match self {
            SortKey::Name => "name",
            SortKey::CreatedAt => "createdAt",
        }
    }
}

/// Entry of the role select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleOption {
    pub value: String,
    pub label: String,
}

/// Scroll position of the card list container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub client_height: f64,
    pub scroll_height: f64,
}

impl ScrollMetrics {
    pub fn near_bottom(&self) -> bool {
        self.scroll_top + self.client_height >= self.scroll_height - SCROLL_THRESHOLD
    }
}

/// Lets one event through per interval and drops the rest.
#[derive(Debug, Clone)]
pub struct ScrollDebouncer {
    interval: Duration,
    last: Option<Instant>,
}

impl ScrollDebouncer {
    pub fn new(interval: Duration) -> Self {
        ScrollDebouncer { interval, last: None }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Interaction state of the card grid view.
#[derive(Debug, Clone)]
pub struct CardView {
    schema: Schema<User>,
    search: String,
    role: RoleFilter,
    sort_key: SortKey,
    sort_order: SortOrder,
    mode: PaginationMode,
    page: usize,
    visible: usize,
    debouncer: ScrollDebouncer,
}

impl CardView {
    pub fn new(schema: Schema<User>) -> Self {
        CardView {
            schema,
            search: String::new(),
            role: RoleFilter::All,
            sort_key: SortKey::Name,
            sort_order: SortOrder::Asc,
            mode: PaginationMode::Paginated,
            page: 1,
            visible: LOAD_BATCH,
            debouncer: ScrollDebouncer::new(SCROLL_DEBOUNCE),
        }
    }

    pub fn with_debounce(mut self, interval: Duration) -> Self {
        self.debouncer = ScrollDebouncer::new(interval);
        self
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn role(&self) -> &RoleFilter {
        &self.role
    }

    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort_order
    }

    pub fn mode(&self) -> PaginationMode {
        self.mode
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn visible_count(&self) -> usize {
        self.visible
    }

    // Any change to what is being browsed starts again from the top.
    fn restart(&mut self) {
        self.page = 1;
        self.visible = LOAD_BATCH;
        self.debouncer.reset();
    }

    pub fn set_search(&mut self, term: &str) {
        if self.search != term {
            self.search = term.to_string();
            self.restart();
        }
    }

    pub fn set_role_filter(&mut self, role: RoleFilter) {
        if self.role != role {
            self.role = role;
            self.restart();
        }
    }

    pub fn set_sort_key(&mut self, key: SortKey) {
        if self.sort_key != key {
            self.sort_key = key;
            self.restart();
        }
    }

    pub fn set_sort_order(&mut self, order: SortOrder) {
        if self.sort_order != order {
            self.sort_order = order;
            self.restart();
        }
    }

    /// Switch between paginated and infinite browsing.
    pub fn set_pagination_mode(&mut self, mode: PaginationMode) {
        if self.mode == mode {
            return;
        }
        self.mode = mode;
        match mode {
            PaginationMode::All => {
                self.visible = LOAD_BATCH;
                self.debouncer.reset();
            }
            PaginationMode::Paginated => self.page = 1,
        }
    }

    /// Jump to `page`, clamped to `1..=total_pages` (or 1 with no pages).
    pub fn set_page(&mut self, page: usize, total_pages: usize) {
        self.page = page.clamp(1, total_pages.max(1));
    }

    pub fn query(&self) -> Query {
        let mut query = Query::new(CARD_PAGE_SIZE);
        query.search = self.search.clone();
        if let RoleFilter::Only(role) = &self.role {
            query
                .group_filters
                .insert("role".to_string(), BTreeSet::from([role.clone()]));
        }
        query.sort = Some(Sort::new(self.sort_key.field(), self.sort_order));
        query.mode = self.mode;
        query.page = self.page;
        query.visible_count = self.visible;
        query
    }

    pub fn project<'a>(&self, users: &'a [User]) -> QueryResult<'a, User> {
        query::run(users, &self.schema, &self.query())
    }

    /// Grow the infinite window by one batch, capped at `total_count`.
    pub fn load_more_items(&mut self, total_count: usize) {
        if self.has_more_items(total_count) {
            self.visible = (self.visible + LOAD_BATCH).min(total_count);
        }
    }

    pub fn has_more_items(&self, total_count: usize) -> bool {
        self.mode == PaginationMode::All && self.visible < total_count
    }

    /// Scroll listener. Returns true when it loaded another batch.
    pub fn on_scroll(&mut self, metrics: ScrollMetrics, total_count: usize, now: Instant) -> bool {
        if !metrics.near_bottom() || !self.has_more_items(total_count) {
            return false;
        }
        if !self.debouncer.ready(now) {
            return false;
        }
        self.load_more_items(total_count);
        true
    }
}

/// "all" followed by each distinct role, labels capitalized.
pub fn role_options(users: &[User]) -> Vec<RoleOption> {
    let mut seen = BTreeSet::new();
    let mut options = vec![RoleOption {
        value: "all".to_string(),
        label: "All".to_string(),
    }];

    for user in users {
        if seen.insert(user.role.as_str()) {
            options.push(RoleOption {
                value: user.role.clone(),
                label: capitalize(&user.role),
            });
        }
    }
    options
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Columns that fit in `width` for cards at least `MIN_CARD_WIDTH` wide.
pub fn grid_columns(width: f64) -> usize {
    if !width.is_finite() || width < MIN_CARD_WIDTH {
        return 1;
    }
    (((width + GRID_GAP) / (MIN_CARD_WIDTH + GRID_GAP)).floor() as usize).max(1)
}
