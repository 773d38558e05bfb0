//! The relation abstraction shared by table sources and algebra nodes.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::algebra::{Fold, Mapper, Predicate};
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::record::Record;
use crate::tuple::Tuple;
use crate::{RelError, RelResult};

pub type RelationRef = Arc<dyn Relation>;

///
/// A lazily evaluated relation.
///
/// Nothing is computed until [`Relation::tuple_chan`] is called, and every
/// call evaluates the relation afresh. Operators return new relations and
/// never modify their operands.
///
/// A relation that failed keeps its first error. Every relation derived from
/// it reports that error too, and none of them evaluates anything.
///
pub trait Relation: fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// The shape of every tuple of the relation (its zero value).
    fn heading(&self) -> &Heading;

    fn cand_keys(&self) -> &CandKeys;

    /// The error latched on this relation, or on any relation it reads from.
    fn err(&self) -> Option<RelError>;

    /// Start sending the tuples of the relation into `sink`.
    ///
    /// The sink is dropped, closing the channel behind it, once the relation
    /// is exhausted, has failed or has been cancelled. Errors are latched and
    /// must be read with [`Relation::err`] after the channel is drained.
    ///
    /// Must be called from within a tokio runtime.
    fn tuple_chan(&self, sink: Box<dyn TupleSink>) -> CancellationToken;

    /// Keep the attributes of `heading`, in that order.
    fn project(self: Arc<Self>, heading: Heading) -> RelationRef;

    /// Rename the attributes positionally to those of `heading`.
    fn rename(self: Arc<Self>, heading: Heading) -> RelationRef;

    fn restrict(self: Arc<Self>, predicate: Predicate) -> RelationRef;

    fn union(self: Arc<Self>, other: RelationRef) -> RelationRef;

    fn diff(self: Arc<Self>, other: RelationRef) -> RelationRef;

    /// Natural join, producing tuples of `heading`.
    fn join(self: Arc<Self>, other: RelationRef, heading: Heading) -> RelationRef;

    fn group_by(self: Arc<Self>, heading: Heading, fold: Fold) -> RelationRef;

    fn map(self: Arc<Self>, mapper: Mapper, keys: CandKeys) -> RelationRef;
}

/// Set-once error slot. The first latched error wins.
#[derive(Clone, Debug, Default)]
pub struct ErrorSlot(Arc<Mutex<Option<RelError>>>);

impl ErrorSlot {
    /// A fresh slot, holding `err` if there is one.
    pub fn inherit(err: Option<RelError>) -> Self {
        Self(Arc::new(Mutex::new(err)))
    }

    pub fn get(&self) -> Option<RelError> {
        self.0.lock().clone()
    }

    /// Returns false if an error was already latched.
    pub fn latch(&self, err: RelError) -> bool {
        let mut slot = self.0.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(err);
        true
    }
}

pub enum Delivery {
    Sent,
    /// The receiving side has gone away.
    Closed,
}

/// The receiving end of a scan, erased over the record type.
#[async_trait]
pub trait TupleSink: Send + 'static {
    /// The shape the sink accepts.
    fn heading(&self) -> Heading;

    async fn send(&mut self, tuple: Tuple) -> RelResult<Delivery>;
}

#[async_trait]
impl<T: Record> TupleSink for mpsc::Sender<T> {
    fn heading(&self) -> Heading {
        T::heading()
    }

    async fn send(&mut self, tuple: Tuple) -> RelResult<Delivery> {
        let record = T::from_tuple(tuple)?;
        Ok(match mpsc::Sender::send(self, record).await {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Closed,
        })
    }
}

/// Sink for untyped tuples of a given heading.
pub struct TupleSender {
    heading: Heading,
    tx: mpsc::Sender<Tuple>,
}

/// A single-slot channel of tuples of `heading`.
pub fn tuple_channel(heading: Heading) -> (TupleSender, mpsc::Receiver<Tuple>) {
    let (tx, rx) = mpsc::channel(1);
    (TupleSender { heading, tx }, rx)
}

#[async_trait]
impl TupleSink for TupleSender {
    fn heading(&self) -> Heading {
        self.heading.clone()
    }

    async fn send(&mut self, tuple: Tuple) -> RelResult<Delivery> {
        Ok(match self.tx.send(tuple).await {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Closed,
        })
    }
}

pub(crate) fn fmt_relation(heading: &Heading, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Relation({})", heading)
}

/// Typed conveniences over [`Relation`].
#[async_trait]
pub trait RelationExt {
    fn degree(&self) -> usize;

    fn project_to<T: Record>(&self) -> RelationRef;

    fn rename_to<T: Record>(&self) -> RelationRef;

    /// Scan into a channel of records. The channel's record type must have
    /// exactly the heading of the relation.
    fn tuple_chan_of<T: Record>(&self, target: mpsc::Sender<T>) -> CancellationToken;

    /// Drain the relation into records, then report any latched error.
    async fn collect<T: Record>(&self) -> RelResult<Vec<T>>;

    async fn tuples(&self) -> RelResult<Vec<Tuple>>;

    async fn cardinality(&self) -> RelResult<usize>;
}

#[async_trait]
impl RelationExt for RelationRef {
    fn degree(&self) -> usize {
        self.heading().degree()
    }

    fn project_to<T: Record>(&self) -> RelationRef {
        self.clone().project(T::heading())
    }

    fn rename_to<T: Record>(&self) -> RelationRef {
        self.clone().rename(T::heading())
    }

    fn tuple_chan_of<T: Record>(&self, target: mpsc::Sender<T>) -> CancellationToken {
        self.tuple_chan(Box::new(target))
    }

    async fn collect<T: Record>(&self) -> RelResult<Vec<T>> {
        let (tx, mut rx) = mpsc::channel(1);
        let _cancel = self.tuple_chan_of::<T>(tx);

        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }

        match self.err() {
            Some(err) => Err(err),
            None => Ok(records),
        }
    }

    async fn tuples(&self) -> RelResult<Vec<Tuple>> {
        let (tx, mut rx) = tuple_channel(self.heading().clone());
        let _cancel = self.tuple_chan(Box::new(tx));

        let mut tuples = Vec::new();
        while let Some(tuple) = rx.recv().await {
            tuples.push(tuple);
        }

        match self.err() {
            Some(err) => Err(err),
            None => Ok(tuples),
        }
    }

    async fn cardinality(&self) -> RelResult<usize> {
        Ok(self.tuples().await?.len())
    }
}
