pub mod client;
mod comments;
mod record;

pub use client::{DbClient, DbError, Result};
