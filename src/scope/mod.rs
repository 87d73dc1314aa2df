//! Scope resolution: turning an audit identifier into the course
//! catalogue every stage prompt consumes.
//!
//! This is the only part of the pipeline allowed to reach outside the
//! process for data. Resolution order is fixed: a caller-supplied
//! dataset bypasses everything, then the system of record is queried,
//! then a generative fallback estimates a plausible catalogue.

pub mod lookup;
pub mod prompt;
pub mod resolver;
pub mod types;

pub use lookup::{InMemoryScopeLookup, ScopeLookup, SqliteScopeLookup};
pub use resolver::ScopeResolver;
pub use types::{ScopeDataset, ScopeItem, ScopeRequest};

use thiserror::Error;

/// Failure of scope resolution.
#[derive(Error, Debug)]
pub enum ScopeError {
    /// Every permitted resolution path came up empty. The flag records
    /// whether the generative fallback was among them.
    #[error("no catalogue scope resolved for {identifier}{}", fallback_note(.fallback_attempted))]
    NotFound {
        identifier: String,
        fallback_attempted: bool,
    },
    /// The scope store itself failed; distinct from a store that merely
    /// has no matching rows.
    #[error("scope store failure: {0}")]
    Store(String),
}

impl From<rusqlite::Error> for ScopeError {
    fn from(error: rusqlite::Error) -> Self {
        ScopeError::Store(error.to_string())
    }
}

fn fallback_note(attempted: &bool) -> &'static str {
    if *attempted {
        " after generative fallback"
    } else {
        " (generative fallback disabled)"
    }
}
