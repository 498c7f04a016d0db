//! SQLite persistence module
//!
//! Repository pattern cho bảng `card`.

pub mod repos;
pub mod schema;

pub use repos::{connect, create_schema, CardRepo};
pub use schema::CardRow;
