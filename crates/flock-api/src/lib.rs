pub mod auth;
pub mod error;
pub mod extract;
pub mod feed;
pub mod follows;
pub mod groups;
pub mod likes;
pub mod media;
pub mod posts;
pub mod routes;
pub mod state;
pub mod users;

pub use routes::router;
pub use state::{AppState, AppStateInner};
