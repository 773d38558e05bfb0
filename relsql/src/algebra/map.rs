use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{emit, node_relation, Evaluate, Input, Mapper};
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::relation::{fmt_relation, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::{RelError, RelResult};

/// Every tuple of a relation passed through a function.
#[derive(Clone, Debug)]
pub struct Map {
    source: RelationRef,
    mapper: Mapper,
    keys: CandKeys,
    positions: Vec<usize>,
    /// The mapping may collapse tuples unless a key is declared.
    dedup: bool,
    errors: ErrorSlot,
}

impl Map {
    pub fn new(source: RelationRef, mapper: Mapper, keys: CandKeys) -> Self {
        let errors = ErrorSlot::default();
        let positions = source
            .heading()
            .field_map(&mapper.input)
            .unwrap_or_else(|err| {
                errors.latch(err);
                Vec::new()
            });

        let (keys, dedup) = if keys.is_empty() {
            (CandKeys::default_keys(&mapper.output), true)
        } else {
            if let Err(err) = keys.validate(&mapper.output) {
                errors.latch(err);
            }
            (keys, false)
        };

        Self {
            source,
            mapper,
            keys,
            positions,
            dedup,
            errors,
        }
    }
}

impl Relation for Map {
    fn heading(&self) -> &Heading {
        &self.mapper.output
    }

    fn cand_keys(&self) -> &CandKeys {
        &self.keys
    }

    fn err(&self) -> Option<RelError> {
        self.errors.get().or_else(|| self.source.err())
    }

    node_relation!();
}

#[async_trait]
impl Evaluate for Map {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let degree = self.mapper.output.degree();
        let mut input = Input::open(&self.source);
        let mut seen = HashSet::new();

        while let Some(tuple) = input.next(cancel).await? {
            let mapped = (self.mapper.map)(tuple.project(&self.positions))?;
            if mapped.degree() != degree {
                return Err(RelError::DegreeMismatch {
                    expected: degree,
                    found: mapped.degree(),
                });
            }

            if self.dedup && !seen.insert(mapped.clone()) {
                continue;
            }
            if !emit(sink, mapped, cancel).await? {
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(self.heading(), f)
    }
}
