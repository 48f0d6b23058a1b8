pub mod api;
pub mod models;

pub use models::{Contact, MessageLog, Role, User};
