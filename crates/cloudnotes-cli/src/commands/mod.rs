pub mod add;
pub mod common;
pub mod config;
pub mod edit;
pub mod list;
pub mod remote;
pub mod sync;
