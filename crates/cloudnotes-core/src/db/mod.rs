//! Local note storage for Cloud Notes

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{LocalStore, SqliteNoteStore};
