//! Data models for Cloud Notes

mod note;
mod remote;
mod report;

pub use note::{NewNote, NoteId, NoteRecord};
pub use remote::RemoteObject;
pub use report::{ItemFailure, SyncPhase, SyncReport};
