#![cfg(not(tarpaulin_include))]

use chrono::Utc;
use std::env;
use std::io::{self, BufRead, Write};
use std::time::Instant;
use usergrid::{
    CardView, Config, FileStore, JsonRepository, NewUserForm, PaginationMode, QueryResult,
    RoleFilter, ScrollMetrics, SortKey, SortOrder, TableView, User, UserStore, page_label,
    role_options, user_schema,
};

#[derive(Clone, Copy)]
enum View {
    Table,
    Cards,
}

fn print_table(table: &TableView<User>, result: &QueryResult<'_, User>) {
    println!("{}", table.headers().join(" | "));
    for user in &result.items {
        println!("{}", table.render_row(user).join(" | "));
    }
    println!(
        "Page {}  ({} users)",
        page_label(table.page(), result.total_pages),
        result.total_count
    );
}

fn print_cards(cards: &CardView, result: &QueryResult<'_, User>) {
    for user in &result.items {
        println!(
            "[{}] {} <{}> {} {}",
            user.role,
            user.name,
            user.email,
            user.created_at.format("%Y-%m-%d"),
            if user.active { "active" } else { "inactive" }
        );
    }
    match cards.mode() {
        PaginationMode::Paginated => println!(
            "Page {}  ({} users)",
            page_label(cards.page(), result.total_pages),
            result.total_count
        ),
        PaginationMode::All => println!(
            "Showing {} of {}{}",
            result.items.len(),
            result.total_count,
            if cards.has_more_items(result.total_count) { " (more below)" } else { "" }
        ),
    }
}

fn print_detail(user: &User) {
    println!("{} ({})", user.name, user.id);
    println!("  email:    {}", user.email);
    println!("  role:     {}", user.role);
    println!("  active:   {}", user.active);
    println!("  created:  {}", user.created_at.to_rfc3339());
    println!("  location: {:.4}, {:.4}", user.latitude, user.longitude);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let s = Instant::now();
    let args: Vec<String> = env::args().skip(1).collect();
    let mut config = Config::from_env();
    if let Some(dir) = args.first() {
        config.data_dir = dir.into();
    }

    let repo = JsonRepository::new(FileStore::open(&config.data_dir)?);
    let mut store = UserStore::load(repo, config.seed_count, &mut rand::thread_rng())?;
    println!("Loaded {} users in {:.1} ms", store.len(), s.elapsed().as_secs_f64() * 1000.0);

    let mut table = TableView::new(user_schema());
    let mut cards = CardView::new(user_schema());
    let mut view = View::Table;
    let mut status = String::from("ok");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        let total = match view {
            View::Table => {
                let result = table.project(store.users());
                print_table(&table, &result);
                if let Some(field) = table.open_popup() {
                    for option in table.group_values(store.users(), field) {
                        println!("  [{}] {}", if option.checked { 'x' } else { ' ' }, option.value);
                    }
                }
                result.total_pages
            }
            View::Cards => {
                let result = cards.project(store.users());
                print_cards(&cards, &result);
                match cards.mode() {
                    PaginationMode::Paginated => result.total_pages,
                    PaginationMode::All => result.total_count,
                }
            }
        };

        print!("[{}] > ", status);
        io::stdout().flush()?;

        let Some(line) = lines.next() else { break };
        let line = line?;
        let (command, rest) = match line.trim().split_once(' ') {
            Some((command, rest)) => (command.to_string(), rest.trim().to_string()),
            None => (line.trim().to_string(), String::new()),
        };
        status = String::from("ok");

        match (command.as_str(), view) {
            ("q", _) => break,
            ("table", _) => view = View::Table,
            ("cards", _) => view = View::Cards,
            ("search", View::Table) => table.set_search(&rest),
            ("search", View::Cards) => cards.set_search(&rest),
            ("sort", View::Table) => table.click_header(&rest),
            ("sort", View::Cards) => cards.set_sort_key(SortKey::parse(&rest)),
            ("order", View::Cards) => cards.set_sort_order(SortOrder::parse(&rest)),
            ("role", View::Cards) => cards.set_role_filter(RoleFilter::parse(&rest)),
            ("roles", _) => {
                for option in role_options(store.users()) {
                    println!("  {} ({})", option.label, option.value);
                }
            }
            ("group", View::Table) => table.toggle_group_popup(&rest),
            ("check", View::Table) => match table.open_popup() {
                Some(field) => table.toggle_group_value(field, &rest),
                None => status = String::from("no open filter"),
            },
            ("clear", View::Table) => match table.open_popup() {
                Some(field) => table.clear_group(field),
                None => status = String::from("no open filter"),
            },
            ("close", View::Table) => table.dismiss_popup(),
            ("n", View::Table) => table.next_page(total),
            ("p", View::Table) => table.prev_page(),
            ("n", View::Cards) => cards.set_page(cards.page() + 1, total),
            ("p", View::Cards) => cards.set_page(cards.page().saturating_sub(1), total),
            ("mode", View::Cards) => cards.set_pagination_mode(PaginationMode::parse(&rest)),
            ("more", View::Cards) => {
                let bottom = ScrollMetrics {
                    scroll_top: 1.0,
                    client_height: 1.0,
                    scroll_height: 2.0,
                };
                if !cards.on_scroll(bottom, total, Instant::now()) {
                    status = String::from("nothing to load");
                }
            }
            ("show", _) => match store.lookup(&rest) {
                Ok(user) => print_detail(user),
                Err(e) => status = e.to_string(),
            },
            ("add", _) => {
                // add <name>|<email>|<password>|<role>
                let parts: Vec<&str> = rest.split('|').map(str::trim).collect();
                let form = NewUserForm {
                    name: parts.first().unwrap_or(&"").to_string(),
                    email: parts.get(1).unwrap_or(&"").to_string(),
                    password: parts.get(2).unwrap_or(&"").to_string(),
                    role: parts.get(3).unwrap_or(&"User").to_string(),
                    active: true,
                };
                match form.submit(&mut rand::thread_rng(), Utc::now()) {
                    Ok(user) => {
                        let id = user.id.clone();
                        match store.add(user) {
                            Ok(()) => status = format!("added {id}"),
                            Err(e) => status = e.to_string(),
                        }
                    }
                    Err(errors) => status = errors.to_string(),
                }
            }
            _ => status = String::from("invalid command"),
        }
    }

    let e = s.elapsed().as_secs_f64();
    println!("Total elapsed time: {:.1} seconds", e);

    Ok(())
}
