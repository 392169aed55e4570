//! cloudnotes-core - Core library for Cloud Notes
//!
//! This crate contains the note models, the local and remote store adapters
//! and the reconciliation engine that keeps a local note store and a cloud
//! file store in sync.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, ErrorKind, Result};
pub use models::{NoteId, NoteRecord, RemoteObject, SyncReport};
