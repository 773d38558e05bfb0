//! In-memory relational algebra.
//!
//! Every operator is a relation node evaluated over the tuples streamed out
//! of its operands. Nothing here is translated to SQL; a table source that
//! is restricted, joined and so on is simply a leaf of the node tree.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::warn;

use crate::heading::Heading;
use crate::key::CandKeys;
use crate::record::Record;
use crate::relation::{tuple_channel, Delivery, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::tuple::Tuple;
use crate::RelResult;

mod group;
mod join;
mod map;
mod project;
mod restrict;
mod set;

pub use group::GroupBy;
pub use join::Join;
pub use map::Map;
pub use project::{Project, Rename};
pub use restrict::Restrict;
pub use set::{Diff, Union};

/// Keep the tuples for which the predicate holds.
pub fn restrict(source: RelationRef, predicate: Predicate) -> RelationRef {
    Arc::new(Restrict::new(source, predicate))
}

pub fn project(source: RelationRef, heading: Heading) -> RelationRef {
    if source.heading() == &heading {
        return source;
    }
    Arc::new(Project::new(source, heading))
}

pub fn rename(source: RelationRef, heading: Heading) -> RelationRef {
    Arc::new(Rename::new(source, heading))
}

pub fn union(left: RelationRef, right: RelationRef) -> RelationRef {
    Arc::new(Union::new(left, right))
}

pub fn diff(left: RelationRef, right: RelationRef) -> RelationRef {
    Arc::new(Diff::new(left, right))
}

pub fn join(left: RelationRef, right: RelationRef, heading: Heading) -> RelationRef {
    Arc::new(Join::new(left, right, heading))
}

pub fn group_by(source: RelationRef, heading: Heading, fold: Fold) -> RelationRef {
    Arc::new(GroupBy::new(source, heading, fold))
}

pub fn map(source: RelationRef, mapper: Mapper, keys: CandKeys) -> RelationRef {
    Arc::new(Map::new(source, mapper, keys))
}

///
/// A restriction predicate.
///
/// A predicate reads either whole tuples or, when built from a record type,
/// just the attributes of that record, which must be a subdomain of the
/// restricted relation.
///
#[derive(Clone)]
pub struct Predicate {
    heading: Option<Heading>,
    test: Arc<dyn Fn(Tuple) -> RelResult<bool> + Send + Sync>,
}

impl Predicate {
    /// A predicate over whole tuples of the restricted relation.
    pub fn tuple<F>(test: F) -> Self
    where
        F: Fn(&Tuple) -> bool + Send + Sync + 'static,
    {
        Self {
            heading: None,
            test: Arc::new(move |tuple| Ok(test(&tuple))),
        }
    }

    /// A predicate over `T` records projected out of each tuple.
    pub fn record<T, F>(test: F) -> Self
    where
        T: Record,
        F: Fn(T) -> bool + Send + Sync + 'static,
    {
        Self {
            heading: Some(T::heading()),
            test: Arc::new(move |tuple| Ok(test(T::from_tuple(tuple)?))),
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.heading {
            Some(heading) => write!(f, "Predicate({})", heading),
            None => write!(f, "Predicate(*)"),
        }
    }
}

///
/// Aggregation for [`Relation::group_by`].
///
/// For every group the fold receives the `input` attributes of each tuple in
/// the group and returns one tuple of `output` attributes.
///
#[derive(Clone)]
pub struct Fold {
    input: Heading,
    output: Heading,
    fold: Arc<dyn Fn(Vec<Tuple>) -> RelResult<Tuple> + Send + Sync>,
}

impl Fold {
    pub fn new<F>(input: Heading, output: Heading, fold: F) -> Self
    where
        F: Fn(Vec<Tuple>) -> RelResult<Tuple> + Send + Sync + 'static,
    {
        Self {
            input,
            output,
            fold: Arc::new(fold),
        }
    }

    pub fn record<V, W, F>(fold: F) -> Self
    where
        V: Record,
        W: Record,
        F: Fn(Vec<V>) -> W + Send + Sync + 'static,
    {
        Self::new(V::heading(), W::heading(), move |tuples| {
            let records = tuples
                .into_iter()
                .map(V::from_tuple)
                .collect::<RelResult<Vec<_>>>()?;
            Ok(fold(records).into_tuple())
        })
    }
}

impl fmt::Debug for Fold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fold({} -> {})", self.input, self.output)
    }
}

///
/// Tuple transformation for [`Relation::map`].
///
#[derive(Clone)]
pub struct Mapper {
    input: Heading,
    output: Heading,
    map: Arc<dyn Fn(Tuple) -> RelResult<Tuple> + Send + Sync>,
}

impl Mapper {
    pub fn new<F>(input: Heading, output: Heading, map: F) -> Self
    where
        F: Fn(Tuple) -> RelResult<Tuple> + Send + Sync + 'static,
    {
        Self {
            input,
            output,
            map: Arc::new(map),
        }
    }

    pub fn record<A, B, F>(map: F) -> Self
    where
        A: Record,
        B: Record,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Self::new(A::heading(), B::heading(), move |tuple| {
            Ok(map(A::from_tuple(tuple)?).into_tuple())
        })
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapper({} -> {})", self.input, self.output)
    }
}

/// A node that knows how to evaluate itself into a sink.
#[async_trait]
pub(crate) trait Evaluate: Relation + Clone {
    fn errors(&self) -> &ErrorSlot;

    async fn evaluate(&self, sink: &mut dyn TupleSink, cancel: &CancellationToken)
        -> RelResult<()>;
}

/// Shared `tuple_chan` of every algebra node.
pub(crate) fn start<N: Evaluate>(node: &N, sink: Box<dyn TupleSink>) -> CancellationToken {
    let cancel = CancellationToken::new();

    if let Err(err) = node.heading().ensure_same(&sink.heading()) {
        warn!(relation = %node, error = %err, "scan target does not match the relation");
        node.errors().latch(err);
        return cancel;
    }

    if node.err().is_some() {
        return cancel;
    }

    let node = node.clone();
    let token = cancel.clone();
    tokio::spawn(async move {
        let mut sink = sink;
        if let Err(err) = node.evaluate(sink.as_mut(), &token).await {
            warn!(relation = %node, error = %err, "relation evaluation failed");
            node.errors().latch(err);
        }
        drop(sink);
    });

    cancel
}

/// A running scan of an operand.
///
/// Dropping the input cancels the scan.
pub(crate) struct Input {
    relation: RelationRef,
    rx: mpsc::Receiver<Tuple>,
    _scan: DropGuard,
}

impl Input {
    pub fn open(relation: &RelationRef) -> Self {
        let (tx, rx) = tuple_channel(relation.heading().clone());
        let scan = relation.tuple_chan(Box::new(tx)).drop_guard();
        Self {
            relation: relation.clone(),
            rx,
            _scan: scan,
        }
    }

    /// The next tuple, or `None` once the operand is exhausted or `cancel`
    /// fires. An operand that failed yields its error instead of `None`.
    pub async fn next(&mut self, cancel: &CancellationToken) -> RelResult<Option<Tuple>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            tuple = self.rx.recv() => match tuple {
                Some(tuple) => Ok(Some(tuple)),
                None => match self.relation.err() {
                    Some(err) => Err(err),
                    None => Ok(None),
                },
            },
        }
    }

    /// Every remaining tuple (only some of them if `cancel` fires).
    pub async fn drain(mut self, cancel: &CancellationToken) -> RelResult<Vec<Tuple>> {
        let mut tuples = Vec::new();
        while let Some(tuple) = self.next(cancel).await? {
            tuples.push(tuple);
        }
        Ok(tuples)
    }
}

/// Send one tuple, returning false when evaluation should stop.
pub(crate) async fn emit(
    sink: &mut dyn TupleSink,
    tuple: Tuple,
    cancel: &CancellationToken,
) -> RelResult<bool> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Ok(false),
        delivery = sink.send(tuple) => Ok(matches!(delivery?, Delivery::Sent)),
    }
}

/// The parts of [`Relation`] every algebra node implements the same way.
macro_rules! node_relation {
    () => {
        fn tuple_chan(
            &self,
            sink: Box<dyn $crate::relation::TupleSink>,
        ) -> ::tokio_util::sync::CancellationToken {
            $crate::algebra::start(self, sink)
        }

        fn project(
            self: ::std::sync::Arc<Self>,
            heading: $crate::heading::Heading,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::project(self, heading)
        }

        fn rename(
            self: ::std::sync::Arc<Self>,
            heading: $crate::heading::Heading,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::rename(self, heading)
        }

        fn restrict(
            self: ::std::sync::Arc<Self>,
            predicate: $crate::algebra::Predicate,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::restrict(self, predicate)
        }

        fn union(
            self: ::std::sync::Arc<Self>,
            other: $crate::relation::RelationRef,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::union(self, other)
        }

        fn diff(
            self: ::std::sync::Arc<Self>,
            other: $crate::relation::RelationRef,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::diff(self, other)
        }

        fn join(
            self: ::std::sync::Arc<Self>,
            other: $crate::relation::RelationRef,
            heading: $crate::heading::Heading,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::join(self, other, heading)
        }

        fn group_by(
            self: ::std::sync::Arc<Self>,
            heading: $crate::heading::Heading,
            fold: $crate::algebra::Fold,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::group_by(self, heading, fold)
        }

        fn map(
            self: ::std::sync::Arc<Self>,
            mapper: $crate::algebra::Mapper,
            keys: $crate::key::CandKeys,
        ) -> $crate::relation::RelationRef {
            $crate::algebra::map(self, mapper, keys)
        }
    };
}

pub(crate) use node_relation;
