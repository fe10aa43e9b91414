//! Query engine: group filter, search, sort and pagination over a row slice.
//!
//! Every stage is a pure function of `(rows, schema, query)`, so projecting
//! the same inputs twice yields the same page.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::user::User;

/// A typed cell value extracted from a row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    fn rank(&self) -> u8 {
        match self {
            FieldValue::Null => 0,
            FieldValue::Bool(_) => 1,
            FieldValue::Number(_) => 2,
            FieldValue::Timestamp(_) => 3,
            FieldValue::Text(_) => 4,
        }
    }

    /// Ascending order between two values; values of different kinds order by kind.
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Bool(a), FieldValue::Bool(b)) => a.cmp(b),
            (FieldValue::Number(a), FieldValue::Number(b)) => a.total_cmp(b),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => locale_cmp(a, b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{b}"),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Timestamp(ts) => f.write_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
        }
    }
}

/// Case-insensitive collation; on a case-only difference lowercase sorts first.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = a
        .chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase));
    folded.then_with(|| b.cmp(a))
}

/// Declarative column description bound to a row type.
pub struct Column<T> {
    pub field: &'static str,
    pub header: &'static str,
    pub sortable: bool,
    pub groupable: bool,
    pub searchable: bool,
    pub value: fn(&T) -> FieldValue,
    pub format: Option<fn(&T) -> String>,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("field", &self.field)
            .field("sortable", &self.sortable)
            .field("groupable", &self.groupable)
            .field("searchable", &self.searchable)
            .finish()
    }
}

impl<T> Column<T> {
    /// A sortable column with no filters and no custom formatting.
    pub fn new(field: &'static str, header: &'static str, value: fn(&T) -> FieldValue) -> Self {
        Column {
            field,
            header,
            sortable: true,
            groupable: false,
            searchable: false,
            value,
            format: None,
        }
    }

    pub fn groupable(mut self) -> Self {
        self.groupable = true;
        self
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn unsortable(mut self) -> Self {
        self.sortable = false;
        self
    }

    pub fn format(mut self, format: fn(&T) -> String) -> Self {
        self.format = Some(format);
        self
    }

    pub fn value_of(&self, row: &T) -> FieldValue {
        (self.value)(row)
    }

    /// The text shown in a cell.
    pub fn display(&self, row: &T) -> String {
        match self.format {
            Some(format) => format(row),
            None => self.value_of(row).to_string(),
        }
    }
}

/// Ordered column list plus the column used when a sort key is not recognized.
#[derive(Debug, Clone)]
pub struct Schema<T> {
    pub columns: Vec<Column<T>>,
    pub default_sort: &'static str,
}

impl<T> Schema<T> {
    pub fn new(columns: Vec<Column<T>>, default_sort: &'static str) -> Self {
        Schema {
            columns,
            default_sort,
        }
    }

    pub fn column(&self, field: &str) -> Option<&Column<T>> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// Resolve a sort key, falling back to `default_sort` for unknown or unsortable keys.
    pub fn sort_column(&self, key: &str) -> Option<&Column<T>> {
        self.column(key)
            .filter(|c| c.sortable)
            .or_else(|| self.column(self.default_sort).filter(|c| c.sortable))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }

    /// "desc" (any case) is descending, anything else ascending.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub key: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(key: impl Into<String>, order: SortOrder) -> Self {
        Sort {
            key: key.into(),
            order,
        }
    }
}

/// Fixed-size pages, or a growing window from the top ("infinite" mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationMode {
    #[default]
    Paginated,
    All,
}

impl PaginationMode {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") {
            PaginationMode::All
        } else {
            PaginationMode::Paginated
        }
    }
}

/// Selected values per field. An empty set leaves that field unfiltered.
pub type GroupFilters = BTreeMap<String, BTreeSet<String>>;

/// Full query state driving one projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub search: String,
    pub group_filters: GroupFilters,
    pub sort: Option<Sort>,
    pub mode: PaginationMode,
    /// 1-based; 0 is treated as 1.
    pub page: usize,
    pub page_size: usize,
    /// Window length in `PaginationMode::All`.
    pub visible_count: usize,
}

impl Query {
    pub fn new(page_size: usize) -> Self {
        Query {
            search: String::new(),
            group_filters: GroupFilters::new(),
            sort: None,
            mode: PaginationMode::Paginated,
            page: 1,
            page_size,
            visible_count: page_size,
        }
    }
}

/// One page of results plus the totals over the whole filtered set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<'a, T> {
    pub items: Vec<&'a T>,
    pub total_count: usize,
    pub total_pages: usize,
}

pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if total_count == 0 || page_size == 0 {
        0
    } else {
        total_count.div_ceil(page_size)
    }
}

/// Pagination caption, "0 / 0" when there is nothing to page through.
pub fn page_label(page: usize, total_pages: usize) -> String {
    if total_pages == 0 {
        "0 / 0".to_string()
    } else {
        format!("{} / {}", page.max(1), total_pages)
    }
}

/// Project `rows` through the filter, search, sort and pagination stages.
pub fn run<'a, T>(rows: &'a [T], schema: &Schema<T>, query: &Query) -> QueryResult<'a, T> {
    let mut matched = filter(rows, schema, query);
    if let Some(sort) = &query.sort {
        if let Some(column) = schema.sort_column(&sort.key) {
            sort_rows(&mut matched, column, sort.order);
        }
    }

    let total_count = matched.len();
    let total_pages = total_pages(total_count, query.page_size);

    let items = match query.mode {
        PaginationMode::Paginated => {
            let start = (query.page.max(1) - 1).saturating_mul(query.page_size);
            matched.into_iter().skip(start).take(query.page_size).collect()
        }
        PaginationMode::All => {
            matched.truncate(query.visible_count);
            matched
        }
    };

    QueryResult {
        items,
        total_count,
        total_pages,
    }
}

/// Group filter then search, keeping input order.
pub fn filter<'a, T>(rows: &'a [T], schema: &Schema<T>, query: &Query) -> Vec<&'a T> {
    let active: Vec<(Option<&Column<T>>, &BTreeSet<String>)> = query
        .group_filters
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(field, values)| (schema.column(field), values))
        .collect();

    let needle = query.search.trim().to_lowercase();
    let searchable: Vec<&Column<T>> = schema.columns.iter().filter(|c| c.searchable).collect();

    rows.iter()
        .filter(|row| {
            active.iter().all(|(column, values)| match column {
                Some(column) => values.contains(&column.value_of(row).to_string()),
                None => false,
            })
        })
        .filter(|row| {
            needle.is_empty()
                || searchable
                    .iter()
                    .any(|c| c.value_of(row).to_string().to_lowercase().contains(&needle))
        })
        .collect()
}

/// Stable sort; nulls go last in either direction.
pub fn sort_rows<T>(rows: &mut Vec<&T>, column: &Column<T>, order: SortOrder) {
    let mut keyed: Vec<(FieldValue, &T)> = rows.drain(..).map(|r| (column.value_of(r), r)).collect();

    keyed.sort_by(|(a, _), (b, _)| match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match order {
            SortOrder::Asc => a.compare(b),
            SortOrder::Desc => a.compare(b).reverse(),
        },
    });

    rows.extend(keyed.into_iter().map(|(_, r)| r));
}

/// Every distinct display value of `column` across `rows`, in first-seen order.
pub fn distinct_values<T>(rows: &[T], column: &Column<T>) -> Vec<String> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| column.value_of(row).to_string())
        .filter(|value| seen.insert(value.clone()))
        .collect()
}

/// Columns of the user list: name, email, role, creation date and the detail link.
pub fn user_schema() -> Schema<User> {
    Schema::new(
        vec![
            Column::new("name", "Name", |u: &User| FieldValue::Text(u.name.clone())).searchable(),
            Column::new("email", "Email", |u: &User| FieldValue::Text(u.email.clone())).searchable(),
            Column::new("role", "Role", |u: &User| FieldValue::Text(u.role.clone()))
                .searchable()
                .groupable(),
            Column::new("createdAt", "Created", |u: &User| FieldValue::Timestamp(u.created_at))
                .format(|u: &User| u.created_at.format("%Y-%m-%d").to_string()),
            Column::new("actions", "Actions", |_: &User| FieldValue::Null)
                .unsortable()
                .format(User::detail_path),
        ],
        "name",
    )
}
