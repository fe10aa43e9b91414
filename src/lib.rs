/*!
# User Directory

A user directory with a data-grid front end: list, search, filter, sort,
paginate and inspect user records that persist to a key-value store.

## Overview

The application keeps every user in memory and mirrors each change to a single
JSON blob. All browsing happens through a pure query pipeline over that
in-memory sequence, presented either as a dense table or as a card grid with an
infinite-scroll mode.

## Architecture

### Record Store
- **Technologies**: serde_json, chrono
- **Key Components**:
  - `UserStore` - Owns the user sequence, seeds it on first run, prepends new users
  - `Repository` - Persistence seam (`load`/`save`) over a `KeyValueStore`
  - `MemoryStore` / `FileStore` - Key-value backends (tests / disk)

### Query Engine
- Group filter → text search → stable sort → page or window
- Strongly typed `Column<T>` descriptors instead of untyped row access
- `total_pages` is 0 for an empty result, shown as "0 / 0"

### View Adapters
- `TableView` - Header sorting, exclusive group-filter popups, 10 rows per page
- `CardView` - Role select, sort key/order, 12 cards per page or an
  infinite window grown 10 at a time from a debounced scroll listener

### Web Layer (feature `web`)
- **Technologies**: axum, tokio, tower-http
- JSON endpoints for the table, the cards, the detail view and user creation

## Modules

- **user**: User record and timestamp serialization
- **form**: New-user form validation
- **generator**: Synthetic seed users
- **saving**: Key-value stores and the JSON repository
- **store**: The record store
- **query**: Query engine and column schema
- **table**: Table view state
- **cards**: Card view state and infinite scrolling
- **config**: Runtime configuration
- **app**: Routing (feature `web`)

## REST API Endpoints

- `GET /api/users` - Table page (`search`, `sort`, `order`, `page`, `mode`, `visible`, `group=field:value`)
- `GET /api/users/cards` - Card page (`search`, `role`, `sort`, `order`, `page`, `mode`, `visible`, `width`)
- `GET /api/users/roles` - Role select options
- `GET /api/users/groups/{field}` - Distinct values for a group filter popup
- `GET /api/users/{id}` - User detail
- `POST /api/users` - Create a user from form values
*/

#[cfg(feature = "web")]
pub mod app;
pub mod cards;
pub mod config;
pub mod error;
pub mod form;
pub mod generator;
pub mod query;
pub mod saving;
pub mod store;
pub mod table;
pub mod user;

/// Re-export the everyday types so callers can `use usergrid::*`
pub use cards::*;
pub use config::Config;
pub use error::{Result, StoreError};
pub use form::*;
pub use generator::*;
pub use query::*;
pub use saving::*;
pub use store::*;
pub use table::*;
pub use user::*;
