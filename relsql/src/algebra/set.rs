use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{emit, node_relation, Evaluate, Input};
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::relation::{fmt_relation, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::{RelError, RelResult};

fn operand_errors(left: &RelationRef, right: &RelationRef) -> ErrorSlot {
    let errors = ErrorSlot::default();
    if let Err(err) = left.heading().ensure_same(right.heading()) {
        errors.latch(err);
    }
    errors
}

/// Every tuple found in either operand.
#[derive(Clone, Debug)]
pub struct Union {
    left: RelationRef,
    right: RelationRef,
    keys: CandKeys,
    errors: ErrorSlot,
}

impl Union {
    pub fn new(left: RelationRef, right: RelationRef) -> Self {
        let errors = operand_errors(&left, &right);
        // a key of either operand need not be a key of the union
        let keys = CandKeys::default_keys(left.heading());

        Self {
            left,
            right,
            keys,
            errors,
        }
    }
}

impl Relation for Union {
    fn heading(&self) -> &Heading {
        self.left.heading()
    }

    fn cand_keys(&self) -> &CandKeys {
        &self.keys
    }

    fn err(&self) -> Option<RelError> {
        self.errors
            .get()
            .or_else(|| self.left.err())
            .or_else(|| self.right.err())
    }

    node_relation!();
}

#[async_trait]
impl Evaluate for Union {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let mut seen = HashSet::new();

        for operand in [&self.left, &self.right] {
            let mut input = Input::open(operand);
            while let Some(tuple) = input.next(cancel).await? {
                if !seen.insert(tuple.clone()) {
                    continue;
                }
                if !emit(sink, tuple, cancel).await? {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}

impl fmt::Display for Union {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(self.heading(), f)
    }
}

/// The tuples of the left operand not found in the right one.
#[derive(Clone, Debug)]
pub struct Diff {
    left: RelationRef,
    right: RelationRef,
    errors: ErrorSlot,
}

impl Diff {
    pub fn new(left: RelationRef, right: RelationRef) -> Self {
        let errors = operand_errors(&left, &right);
        Self {
            left,
            right,
            errors,
        }
    }
}

impl Relation for Diff {
    fn heading(&self) -> &Heading {
        self.left.heading()
    }

    fn cand_keys(&self) -> &CandKeys {
        self.left.cand_keys()
    }

    fn err(&self) -> Option<RelError> {
        self.errors
            .get()
            .or_else(|| self.left.err())
            .or_else(|| self.right.err())
    }

    node_relation!();
}

#[async_trait]
impl Evaluate for Diff {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let excluded: HashSet<_> = Input::open(&self.right)
            .drain(cancel)
            .await?
            .into_iter()
            .collect();

        let mut input = Input::open(&self.left);
        while let Some(tuple) = input.next(cancel).await? {
            if excluded.contains(&tuple) {
                continue;
            }
            if !emit(sink, tuple, cancel).await? {
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(self.heading(), f)
    }
}
