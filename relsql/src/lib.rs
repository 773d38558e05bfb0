//! Lazily evaluated relations over SQL tables.
//!
//! ```text
//!  TableSource ──project/rename──▶ TableSource      (SELECT [DISTINCT] cols FROM table)
//!       │
//!       └──restrict/union/diff/join/group_by/map──▶ algebra node (evaluated in memory)
//! ```
//!
//! A [`TableSource`](source::TableSource) binds a heading and a set of candidate
//! keys to a physical table. Projection and renaming are folded into the SQL
//! it issues; every other operator is evaluated by [`algebra`] over the tuples
//! streamed out of the database.
//!
//! Errors never cross the streaming boundary. They are latched on the relation
//! that produced them and read back with [`Relation::err`].

extern crate self as relsql;

use std::sync::Arc;

pub use relsql_macros::*;

pub mod algebra;
pub mod builder;
pub mod config;
pub mod database;
pub mod heading;
pub mod key;
pub mod prelude;
pub mod record;
pub mod relation;
pub mod source;
pub mod tuple;
pub mod value;

pub use heading::{Attribute, Heading};
pub use key::CandKeys;
pub use record::{Domain, Record, Table};
pub use relation::{Relation, RelationExt, RelationRef};
pub use tuple::Tuple;
pub use value::{Value, ValueType};

#[derive(thiserror::Error, Debug, Clone)]
pub enum RelError {
    #[error("schema mismatch: expected ({expected}), found ({found})")]
    SchemaMismatch { expected: String, found: String },

    #[error("unknown attribute {0}")]
    UnknownAttribute(String),

    #[error("duplicate attribute {0}")]
    DuplicateAttribute(String),

    #[error("degree mismatch: expected {expected}, found {found}")]
    DegreeMismatch { expected: usize, found: usize },

    #[error("query construction failed: {0}")]
    Query(String),

    #[error("database error: {0}")]
    Database(#[source] Arc<sqlx::Error>),

    #[error("cannot decode {found} into attribute {attribute} of type {expected}")]
    Decode {
        attribute: String,
        expected: ValueType,
        found: String,
    },

    #[error("configuration error: {0}")]
    Config(#[source] Arc<::config::ConfigError>),
}

impl From<sqlx::Error> for RelError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(Arc::new(err))
    }
}

impl From<::config::ConfigError> for RelError {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(Arc::new(err))
    }
}

pub type RelResult<T> = Result<T, RelError>;
