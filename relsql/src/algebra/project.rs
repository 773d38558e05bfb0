use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{emit, node_relation, Evaluate, Input};
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::relation::{fmt_relation, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::{RelError, RelResult};

/// A relation restricted to some of its attributes.
#[derive(Clone, Debug)]
pub struct Project {
    source: RelationRef,
    heading: Heading,
    keys: CandKeys,
    positions: Vec<usize>,
    /// No source key survived, so duplicates have to be removed here.
    dedup: bool,
    errors: ErrorSlot,
}

impl Project {
    pub fn new(source: RelationRef, heading: Heading) -> Self {
        let errors = ErrorSlot::default();
        let positions = source.heading().field_map(&heading).unwrap_or_else(|err| {
            errors.latch(err);
            Vec::new()
        });

        let keys = source.cand_keys().subset(&heading);
        let (keys, dedup) = if keys.is_empty() {
            (CandKeys::default_keys(&heading), true)
        } else {
            (keys, false)
        };

        Self {
            source,
            heading,
            keys,
            positions,
            dedup,
            errors,
        }
    }
}

impl Relation for Project {
    fn heading(&self) -> &Heading {
        &self.heading
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
impl Evaluate for Project {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let mut input = Input::open(&self.source);
        let mut seen = HashSet::new();

        while let Some(tuple) = input.next(cancel).await? {
            let tuple = tuple.project(&self.positions);
            if self.dedup && !seen.insert(tuple.clone()) {
                continue;
            }
            if !emit(sink, tuple, cancel).await? {
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(&self.heading, f)
    }
}

/// A relation with its attributes positionally renamed.
#[derive(Clone, Debug)]
pub struct Rename {
    source: RelationRef,
    heading: Heading,
    keys: CandKeys,
    errors: ErrorSlot,
}

impl Rename {
    pub fn new(source: RelationRef, heading: Heading) -> Self {
        let errors = ErrorSlot::default();
        let keys = match source.heading().rename_map(&heading) {
            Ok(names) => source.cand_keys().renamed(&names),
            Err(err) => {
                errors.latch(err);
                source.cand_keys().clone()
            }
        };

        Self {
            source,
            heading,
            keys,
            errors,
        }
    }
}

impl Relation for Rename {
    fn heading(&self) -> &Heading {
        &self.heading
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
impl Evaluate for Rename {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let mut input = Input::open(&self.source);

        // renaming is positional, the values stay where they are
        while let Some(tuple) = input.next(cancel).await? {
            if !emit(sink, tuple, cancel).await? {
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Rename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(&self.heading, f)
    }
}
