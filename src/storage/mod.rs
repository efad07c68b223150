pub mod db;
mod entries;
pub mod models;
mod sessions;
mod tables;

pub use db::{Database, DatabaseError};
pub use entries::EntryPage;
pub use tables::*;
