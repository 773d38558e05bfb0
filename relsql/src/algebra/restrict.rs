use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{emit, node_relation, Evaluate, Input, Predicate};
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::relation::{fmt_relation, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::{RelError, RelResult};

/// The tuples of a relation for which a predicate holds.
#[derive(Clone, Debug)]
pub struct Restrict {
    source: RelationRef,
    predicate: Predicate,
    /// Where the predicate's record fields sit in the source tuples.
    positions: Option<Vec<usize>>,
    errors: ErrorSlot,
}

impl Restrict {
    pub fn new(source: RelationRef, predicate: Predicate) -> Self {
        let errors = ErrorSlot::default();
        let positions = match &predicate.heading {
            Some(heading) => match source.heading().field_map(heading) {
                Ok(positions) => Some(positions),
                Err(err) => {
                    errors.latch(err);
                    None
                }
            },
            None => None,
        };

        Self {
            source,
            predicate,
            positions,
            errors,
        }
    }
}

impl Relation for Restrict {
    fn heading(&self) -> &Heading {
        self.source.heading()
    }

    fn cand_keys(&self) -> &CandKeys {
        self.source.cand_keys()
    }

    fn err(&self) -> Option<RelError> {
        self.errors.get().or_else(|| self.source.err())
    }

    node_relation!();
}

#[async_trait]
impl Evaluate for Restrict {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let mut input = Input::open(&self.source);

        while let Some(tuple) = input.next(cancel).await? {
            let argument = match &self.positions {
                Some(positions) => tuple.project(positions),
                None => tuple.clone(),
            };

            if (self.predicate.test)(argument)? && !emit(sink, tuple, cancel).await? {
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Restrict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(self.heading(), f)
    }
}
