use std::collections::BTreeSet;

use crate::query::{self, Query, QueryResult, Schema, Sort, SortOrder};

/// Rows per page in the table view.
pub const TABLE_PAGE_SIZE: usize = 10;

/// One checkbox in a group filter popup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOption {
    pub value: String,
    pub checked: bool,
}

/// Interaction state of the dense table view over rows of type `T`.
#[derive(Debug, Clone)]
pub struct TableView<T> {
    schema: Schema<T>,
    query: Query,
    open_popup: Option<&'static str>,
}

impl<T> TableView<T> {
    pub fn new(schema: Schema<T>) -> Self {
        TableView {
            schema,
            query: Query::new(TABLE_PAGE_SIZE),
            open_popup: None,
        }
    }

    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn page(&self) -> usize {
        self.query.page
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.query.sort.as_ref()
    }

    pub fn open_popup(&self) -> Option<&'static str> {
        self.open_popup
    }

    /// Header click: toggle the order on the active column, otherwise sort
    /// ascending by the clicked one. Unsortable and unknown columns are ignored.
    pub fn click_header(&mut self, field: &str) {
        let Some(column) = self.schema.column(field).filter(|c| c.sortable) else {
            return;
        };

        self.query.sort = match self.query.sort.take() {
            Some(sort) if sort.key == column.field => Some(Sort::new(sort.key, sort.order.toggle())),
            _ => Some(Sort::new(column.field, SortOrder::Asc)),
        };
        self.query.page = 1;
    }

    pub fn set_search(&mut self, term: &str) {
        if self.query.search != term {
            self.query.search = term.to_string();
            self.query.page = 1;
        }
    }

    /// Filter icon click. Opens the popup for a groupable column, closing any
    /// other; clicking the open one again closes it.
    pub fn toggle_group_popup(&mut self, field: &str) {
        let Some(column) = self.schema.column(field).filter(|c| c.groupable) else {
            return;
        };

        self.open_popup = match self.open_popup {
            Some(open) if open == column.field => None,
            _ => Some(column.field),
        };
    }

    /// Click outside the open popup.
    pub fn dismiss_popup(&mut self) {
        self.open_popup = None;
    }

    /// Popup contents: every distinct value of `field` across all of `rows`,
    /// regardless of the current filters.
    pub fn group_values(&self, rows: &[T], field: &str) -> Vec<GroupOption> {
        let Some(column) = self.schema.column(field) else {
            return Vec::new();
        };
        let selected = self.query.group_filters.get(field);

        query::distinct_values(rows, column)
            .into_iter()
            .map(|value| GroupOption {
                checked: selected.is_some_and(|set| set.contains(&value)),
                value,
            })
            .collect()
    }

    /// Check or uncheck `value` in the popup of `field`.
    pub fn toggle_group_value(&mut self, field: &str, value: &str) {
        let set = self.query.group_filters.entry(field.to_string()).or_default();
        if !set.remove(value) {
            set.insert(value.to_string());
        }
        self.query.page = 1;
    }

    /// "Clear" in the popup of `field`; other fields keep their selection.
    pub fn clear_group(&mut self, field: &str) {
        if let Some(set) = self.query.group_filters.get_mut(field) {
            set.clear();
        }
        self.query.page = 1;
    }

    pub fn selected_groups(&self, field: &str) -> BTreeSet<String> {
        self.query.group_filters.get(field).cloned().unwrap_or_default()
    }

    pub fn project<'a>(&self, rows: &'a [T]) -> QueryResult<'a, T> {
        query::run(rows, &self.schema, &self.query)
    }

    /// Previous page, stopping at the first.
    pub fn prev_page(&mut self) {
        self.query.page = self.query.page.saturating_sub(1).max(1);
    }

    /// Next page, stopping at `total_pages`.
    pub fn next_page(&mut self, total_pages: usize) {
        if self.query.page < total_pages {
            self.query.page += 1;
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.schema.columns.iter().map(|c| c.header).collect()
    }

    /// Cell texts for one row, in column order.
    pub fn render_row(&self, row: &T) -> Vec<String> {
        self.schema.columns.iter().map(|c| c.display(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::user_schema;
    use crate::user::User;
    use chrono::{TimeZone, Utc};

    fn user(id: &str, name: &str, role: &str, day: u32) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            role: role.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 9, 0, 0).unwrap(),
            password: "secret1".to_string(),
            active: true,
            latitude: 0.0,
            longitude: 0.0,
        }
    }

    fn users() -> Vec<User> {
        vec![
            user("1", "Carol", "Editor", 3),
            user("2", "alice", "Admin", 1),
            user("3", "Bob", "Viewer", 2),
            user("4", "Dave", "Editor", 4),
        ]
    }

    fn names<'a>(result: &QueryResult<'a, User>) -> Vec<&'a str> {
        result.items.iter().map(|u| u.name.as_str()).collect()
    }

    #[test]
    fn header_clicks_toggle_sort() {
        let users = users();
        let mut table = TableView::new(user_schema());

        table.click_header("name");
        assert_eq!(names(&table.project(&users)), vec!["alice", "Bob", "Carol", "Dave"]);

        table.click_header("name");
        assert_eq!(table.sort().unwrap().order, SortOrder::Desc);
        assert_eq!(names(&table.project(&users)), vec!["Dave", "Carol", "Bob", "alice"]);

        table.click_header("createdAt");
        assert_eq!(table.sort(), Some(&Sort::new("createdAt", SortOrder::Asc)));
        assert_eq!(names(&table.project(&users)), vec!["alice", "Bob", "Carol", "Dave"]);
    }

    #[test]
    fn unsortable_header_is_ignored() {
        let mut table = TableView::new(user_schema());
        table.click_header("actions");
        table.click_header("bogus");
        assert!(table.sort().is_none());
    }

    #[test]
    fn only_one_popup_open_at_a_time() {
        let mut table = TableView::new(user_schema());
        table.toggle_group_popup("name");
        assert_eq!(table.open_popup(), None);

        table.toggle_group_popup("role");
        assert_eq!(table.open_popup(), Some("role"));
        table.toggle_group_popup("role");
        assert_eq!(table.open_popup(), None);

        table.toggle_group_popup("role");
        table.dismiss_popup();
        assert_eq!(table.open_popup(), None);
    }

    #[test]
    fn group_values_come_from_unfiltered_rows() {
        let users = users();
        let mut table = TableView::new(user_schema());
        table.toggle_group_value("role", "Admin");
        table.set_search("alice");

        let options = table.group_values(&users, "role");
        let values: Vec<_> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["Editor", "Admin", "Viewer"]);
        assert!(options.iter().find(|o| o.value == "Admin").unwrap().checked);
        assert!(!options.iter().find(|o| o.value == "Editor").unwrap().checked);
    }

    #[test]
    fn toggling_and_clearing_group_values() {
        let users = users();
        let mut table = TableView::new(user_schema());

        table.toggle_group_value("role", "Editor");
        assert_eq!(names(&table.project(&users)), vec!["Carol", "Dave"]);

        table.toggle_group_value("role", "Viewer");
        assert_eq!(table.project(&users).total_count, 3);

        table.toggle_group_value("role", "Editor");
        assert_eq!(names(&table.project(&users)), vec!["Bob"]);

        table.clear_group("role");
        assert!(table.selected_groups("role").is_empty());
        assert_eq!(table.project(&users).total_count, 4);
    }

    #[test]
    fn filter_changes_return_to_first_page() {
        let users: Vec<User> = (1..=25)
            .map(|i| user(&i.to_string(), &format!("User {i:02}"), "User", 1))
            .collect();
        let mut table = TableView::new(user_schema());

        let total = table.project(&users).total_pages;
        assert_eq!(total, 3);
        table.next_page(total);
        table.next_page(total);
        table.next_page(total);
        assert_eq!(table.page(), 3);
        assert_eq!(table.project(&users).items.len(), 5);

        table.set_search("user 1");
        assert_eq!(table.page(), 1);

        table.next_page(3);
        table.click_header("name");
        assert_eq!(table.page(), 1);

        table.prev_page();
        assert_eq!(table.page(), 1);
    }

    #[test]
    fn rows_render_through_formatters() {
        let table = TableView::new(user_schema());
        let users = users();
        assert_eq!(table.headers(), vec!["Name", "Email", "Role", "Created", "Actions"]);
        assert_eq!(
            table.render_row(&users[0]),
            vec!["Carol", "carol@example.com", "Editor", "2024-01-03", "/users/1"]
        );
    }
}
