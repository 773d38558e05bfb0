//! SQL text generation.
//!
//! Column and table names are written verbatim. They must come from a
//! trusted heading or table descriptor, never from user input.

use std::fmt::Write;

use crate::{RelError, RelResult};

#[derive(Default)]
pub struct QueryBuilder {
    buf: String,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    pub fn build(self) -> String {
        self.buf
    }

    pub fn buf_mut(&mut self) -> &mut String {
        &mut self.buf
    }

    pub fn push(&mut self, str: &str) {
        self.buf.push_str(str);
    }
}

/// `SELECT [DISTINCT] <columns> FROM <table>`
///
/// With no columns the statement selects a single constant row, present
/// only if the table has any rows at all.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectStatement {
    /// The rows of the table are already known to be distinct under the
    /// selected columns, so no `DISTINCT` is needed.
    pub source_distinct: bool,
    /// Comma separated column list
    pub columns: String,
    pub table: String,
}

impl SelectStatement {
    pub fn new<C: AsRef<str>>(source_distinct: bool, columns: &[C], table: &str) -> Self {
        Self {
            source_distinct,
            columns: columns
                .iter()
                .map(AsRef::as_ref)
                .collect::<Vec<_>>()
                .join(", "),
            table: table.to_owned(),
        }
    }

    pub fn query_string(&self) -> RelResult<String> {
        let mut builder = QueryBuilder::new();
        if self.columns.is_empty() {
            write!(builder.buf_mut(), "SELECT 1 FROM {} LIMIT 1", self.table)
                .map_err(|err| RelError::Query(err.to_string()))?;
            return Ok(builder.build());
        }

        builder.push("SELECT ");
        if !self.source_distinct {
            builder.push("DISTINCT ");
        }
        write!(builder.buf_mut(), "{} FROM {}", self.columns, self.table)
            .map_err(|err| RelError::Query(err.to_string()))?;
        Ok(builder.build())
    }
}
