use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{emit, node_relation, Evaluate, Input};
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::relation::{fmt_relation, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::tuple::Tuple;
use crate::value::Value;
use crate::{RelError, RelResult};

///
/// Natural join.
///
/// Tuples of the two operands match when they agree on every attribute the
/// operands have in common. Each match produces one tuple of the join's
/// heading, whose attributes are taken from either operand.
///
#[derive(Clone, Debug)]
pub struct Join {
    left: RelationRef,
    right: RelationRef,
    heading: Heading,
    keys: CandKeys,
    plan: JoinPlan,
    errors: ErrorSlot,
}

#[derive(Clone, Debug, Default)]
struct JoinPlan {
    /// Positions of the common attributes in the left operand...
    left_common: Vec<usize>,
    /// ...and, in the same order, in the right operand.
    right_common: Vec<usize>,
    /// Positions of the output attributes in a left tuple followed by a
    /// right tuple.
    output: Vec<usize>,
    dedup: bool,
}

impl Join {
    pub fn new(left: RelationRef, right: RelationRef, heading: Heading) -> Self {
        let errors = ErrorSlot::default();

        let joined = left.cand_keys().join(right.cand_keys());
        let keys = joined.subset(&heading);
        let (keys, dedup) = if keys.is_empty() {
            (CandKeys::default_keys(&heading), true)
        } else {
            (keys, false)
        };

        let plan = match plan(left.heading(), right.heading(), &heading) {
            Ok(plan) => JoinPlan { dedup, ..plan },
            Err(err) => {
                errors.latch(err);
                JoinPlan::default()
            }
        };

        Self {
            left,
            right,
            heading,
            keys,
            plan,
            errors,
        }
    }
}

fn plan(left: &Heading, right: &Heading, heading: &Heading) -> RelResult<JoinPlan> {
    let mut left_common = Vec::new();
    let mut right_common = Vec::new();

    for (i, attribute) in left.attributes().iter().enumerate() {
        if let Some(j) = right.position(attribute.name()) {
            let other = &right.attributes()[j];
            if !attribute.same_domain(other) {
                return Err(RelError::SchemaMismatch {
                    expected: attribute.to_string(),
                    found: other.to_string(),
                });
            }
            left_common.push(i);
            right_common.push(j);
        }
    }

    // common attributes resolve to the left operand
    let both = Heading::new(
        left.attributes()
            .iter()
            .chain(right.attributes())
            .cloned()
            .collect(),
    );
    let output = both.field_map(heading)?;

    Ok(JoinPlan {
        left_common,
        right_common,
        output,
        dedup: false,
    })
}

fn common_values(tuple: &Tuple, positions: &[usize]) -> Vec<Value> {
    positions.iter().map(|&i| tuple.values()[i].clone()).collect()
}

impl Relation for Join {
    fn heading(&self) -> &Heading {
        &self.heading
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
impl Evaluate for Join {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let plan = &self.plan;

        let mut index: HashMap<Vec<Value>, Vec<Tuple>> = HashMap::new();
        for tuple in Input::open(&self.right).drain(cancel).await? {
            index
                .entry(common_values(&tuple, &plan.right_common))
                .or_default()
                .push(tuple);
        }

        let mut seen = HashSet::new();
        let mut input = Input::open(&self.left);
        while let Some(left) = input.next(cancel).await? {
            let matches = match index.get(&common_values(&left, &plan.left_common)) {
                Some(matches) => matches,
                None => continue,
            };

            for right in matches {
                let both = Tuple::new(
                    left.values()
                        .iter()
                        .chain(right.values())
                        .cloned()
                        .collect(),
                );
                let tuple = both.project(&plan.output);
                if plan.dedup && !seen.insert(tuple.clone()) {
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

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(&self.heading, f)
    }
}
