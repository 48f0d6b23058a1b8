pub mod auth;
pub mod contacts;
pub mod error;
pub mod extract;
pub mod messages;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod session;
pub mod state;
pub mod tokens;
pub mod users;

pub use error::{ApiError, ApiResult};
pub use routes::router;
pub use state::{AppState, AppStateInner};
pub use tokens::{TokenError, TokenService};
