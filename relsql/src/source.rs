//! Relations backed by a table in a SQL database.
//!
//! A [`TableSource`] reads its table with a single `SELECT` per scan.
//! Projection and renaming are folded into that statement (or into the
//! heading it is decoded against); all other operators wrap the source in an
//! [`algebra`](crate::algebra) node.

use std::fmt;
use std::sync::Arc;

use futures_util::stream::{Stream, TryStreamExt};
use sqlx::any::AnyRow;
use sqlx::AnyPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::algebra::{self, Fold, Mapper, Predicate};
use crate::builder::SelectStatement;
use crate::database::decode_row;
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::record::{Record, Table};
use crate::relation::{fmt_relation, Delivery, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::RelError;

pub struct TableSource {
    pool: AnyPool,

    /// Name of the table in the database
    table: String,

    /// Physical column names, positionally aligned with `heading`.
    /// Renaming changes the heading but never these.
    columns: Vec<String>,

    heading: Heading,

    keys: CandKeys,

    /// The table has no duplicate rows under `columns`, so the SELECT
    /// needs no DISTINCT.
    source_distinct: bool,

    errors: ErrorSlot,
}

impl TableSource {
    /// A relation over `table`, whose columns are named by `heading`.
    ///
    /// With no `keys`, the whole heading is the only candidate key and the
    /// table is read with `SELECT DISTINCT`. Declared keys are checked
    /// against the heading; a bad key latches an error on the relation.
    pub fn new(pool: AnyPool, table: impl Into<String>, heading: Heading, keys: CandKeys) -> Self {
        let errors = ErrorSlot::default();
        if let Err(err) = heading.check_unique() {
            errors.latch(err);
        }

        let (keys, source_distinct) = if keys.is_empty() {
            (CandKeys::default_keys(&heading), false)
        } else {
            if let Err(err) = keys.validate(&heading) {
                errors.latch(err);
            }
            (keys, true)
        };

        Self {
            pool,
            table: table.into(),
            columns: heading.names().map(str::to_owned).collect(),
            heading,
            keys,
            source_distinct,
            errors,
        }
    }

    /// A relation over `table` whose tuples are `T` records.
    pub fn from_record<T: Record>(pool: AnyPool, table: impl Into<String>, keys: CandKeys) -> Self {
        Self::new(pool, table, T::heading(), keys)
    }

    /// A relation over the table `T` declares.
    pub fn open<T: Record + Table>(pool: AnyPool) -> Self {
        Self::new(pool, T::name(), T::heading(), CandKeys::from_names(T::keys()))
    }

    pub fn into_ref(self) -> RelationRef {
        Arc::new(self)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn source_distinct(&self) -> bool {
        self.source_distinct
    }

    pub fn select_statement(&self) -> SelectStatement {
        SelectStatement::new(self.source_distinct, &self.columns, &self.table)
    }

    fn derive(
        &self,
        heading: Heading,
        columns: Vec<String>,
        keys: CandKeys,
        source_distinct: bool,
    ) -> Self {
        Self {
            pool: self.pool.clone(),
            table: self.table.clone(),
            columns,
            heading,
            keys,
            source_distinct,
            errors: ErrorSlot::inherit(self.errors.get()),
        }
    }

    /// The source restricted to the attributes of `heading`, in its order.
    pub fn projected(&self, heading: Heading) -> Self {
        let positions = self.heading.field_map(&heading);
        let columns = match &positions {
            Ok(positions) => positions.iter().map(|&i| self.columns[i].clone()).collect(),
            Err(_) => Vec::new(),
        };

        // every relation except dee and dum has at least one candidate key
        let keys = self.keys.subset(&heading);
        let (keys, source_distinct) = if keys.is_empty() {
            (CandKeys::default_keys(&heading), false)
        } else {
            (keys, self.source_distinct)
        };

        let projected = self.derive(heading, columns, keys, source_distinct);
        if let Err(err) = positions {
            projected.errors.latch(err);
        }
        projected
    }

    /// The source with its attributes positionally renamed to those of
    /// `heading`. Queries keep using the physical column names.
    pub fn renamed(&self, heading: Heading) -> Self {
        match self.heading.rename_map(&heading) {
            Ok(names) => {
                let keys = self.keys.renamed(&names);
                self.derive(heading, self.columns.clone(), keys, self.source_distinct)
            }
            Err(err) => {
                let renamed = self.derive(
                    heading,
                    self.columns.clone(),
                    self.keys.clone(),
                    self.source_distinct,
                );
                renamed.errors.latch(err);
                renamed
            }
        }
    }
}

impl Relation for TableSource {
    fn heading(&self) -> &Heading {
        &self.heading
    }

    fn cand_keys(&self) -> &CandKeys {
        &self.keys
    }

    fn err(&self) -> Option<RelError> {
        self.errors.get()
    }

    fn tuple_chan(&self, sink: Box<dyn TupleSink>) -> CancellationToken {
        let cancel = CancellationToken::new();

        if let Err(err) = self.heading.ensure_same(&sink.heading()) {
            warn!(table = %self.table, error = %err, "scan target does not match the relation");
            self.errors.latch(err);
            return cancel;
        }

        if self.errors.get().is_some() {
            // dropping the sink closes the channel
            return cancel;
        }

        let scan = Scan {
            pool: self.pool.clone(),
            table: self.table.clone(),
            statement: self.select_statement(),
            heading: self.heading.clone(),
            errors: self.errors.clone(),
        };
        tokio::spawn(scan.run(sink, cancel.clone()));

        cancel
    }

    fn project(self: Arc<Self>, heading: Heading) -> RelationRef {
        if self.heading == heading {
            // nothing to do
            return self;
        }
        Arc::new(self.projected(heading))
    }

    fn rename(self: Arc<Self>, heading: Heading) -> RelationRef {
        Arc::new(self.renamed(heading))
    }

    // TODO: push restrictions into a WHERE clause once predicates can be
    // lowered to SQL expressions.
    fn restrict(self: Arc<Self>, predicate: Predicate) -> RelationRef {
        algebra::restrict(self, predicate)
    }

    fn union(self: Arc<Self>, other: RelationRef) -> RelationRef {
        algebra::union(self, other)
    }

    fn diff(self: Arc<Self>, other: RelationRef) -> RelationRef {
        algebra::diff(self, other)
    }

    fn join(self: Arc<Self>, other: RelationRef, heading: Heading) -> RelationRef {
        algebra::join(self, other, heading)
    }

    fn group_by(self: Arc<Self>, heading: Heading, fold: Fold) -> RelationRef {
        algebra::group_by(self, heading, fold)
    }

    fn map(self: Arc<Self>, mapper: Mapper, keys: CandKeys) -> RelationRef {
        algebra::map(self, mapper, keys)
    }
}

impl fmt::Display for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(&self.heading, f)
    }
}

impl fmt::Debug for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSource")
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("heading", &self.heading)
            .field("keys", &self.keys)
            .field("source_distinct", &self.source_distinct)
            .field("err", &self.errors.get())
            .finish()
    }
}

/// Everything one scan needs, detached from the source.
struct Scan {
    pool: AnyPool,
    table: String,
    statement: SelectStatement,
    heading: Heading,
    errors: ErrorSlot,
}

enum ScanEnd {
    Exhausted(usize),
    Cancelled(usize),
}

impl Scan {
    async fn run(self, mut sink: Box<dyn TupleSink>, cancel: CancellationToken) {
        match self.execute(sink.as_mut(), &cancel).await {
            Ok(ScanEnd::Exhausted(rows)) => {
                debug!(table = %self.table, rows, "table scan finished");
            }
            Ok(ScanEnd::Cancelled(rows)) => {
                debug!(table = %self.table, rows, "table scan cancelled");
            }
            Err(err) => {
                warn!(table = %self.table, error = %err, "table scan failed");
                self.errors.latch(err);
            }
        }

        // The error is latched before the channel closes, so a receiver
        // that sees the end of the channel also sees the error.
        drop(sink);
    }

    async fn execute(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> Result<ScanEnd, RelError> {
        let sql = self.statement.query_string()?;
        debug!(table = %self.table, %sql, "starting table scan");

        // waiting for a pooled connection must not outlive the scan
        let mut tx = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ScanEnd::Cancelled(0)),
            tx = self.pool.begin() => tx?,
        };

        let outcome = {
            let mut rows = sqlx::query(&sql).fetch(&mut *tx);
            pump(&mut rows, &self.heading, sink, cancel).await
        };

        // The scan only reads; committing just hands back the connection.
        let committed = tx.commit().await;
        let end = outcome?;
        committed?;

        Ok(end)
    }
}

/// Move rows from the cursor into the sink until the cursor is exhausted,
/// the scan is cancelled or the receiver goes away.
async fn pump<S>(
    rows: &mut S,
    heading: &Heading,
    sink: &mut dyn TupleSink,
    cancel: &CancellationToken,
) -> Result<ScanEnd, RelError>
where
    S: Stream<Item = Result<AnyRow, sqlx::Error>> + Unpin,
{
    let mut sent = 0;

    loop {
        let row = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ScanEnd::Cancelled(sent)),
            row = rows.try_next() => row?,
        };

        let row = match row {
            Some(row) => row,
            None => return Ok(ScanEnd::Exhausted(sent)),
        };

        let tuple = decode_row(&row, heading)?;

        let delivery = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(ScanEnd::Cancelled(sent)),
            delivery = sink.send(tuple) => delivery?,
        };

        match delivery {
            Delivery::Sent => sent += 1,
            Delivery::Closed => return Ok(ScanEnd::Cancelled(sent)),
        }
    }
}
