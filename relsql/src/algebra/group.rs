use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{emit, node_relation, Evaluate, Fold, Input};
use crate::heading::Heading;
use crate::key::CandKeys;
use crate::relation::{fmt_relation, ErrorSlot, Relation, RelationRef, TupleSink};
use crate::tuple::Tuple;
use crate::{RelError, RelResult};

///
/// Grouping with aggregation.
///
/// The attributes of the heading that the fold does not produce are the
/// grouping attributes. The source is partitioned on them, and each group is
/// folded into one tuple.
///
#[derive(Clone, Debug)]
pub struct GroupBy {
    source: RelationRef,
    heading: Heading,
    fold: Fold,
    keys: CandKeys,
    plan: GroupPlan,
    errors: ErrorSlot,
}

#[derive(Clone, Debug, Default)]
struct GroupPlan {
    /// Positions of the grouping attributes in a source tuple.
    group: Vec<usize>,
    /// Positions of the fold's input attributes in a source tuple.
    input: Vec<usize>,
    /// Positions of the output attributes in a group tuple followed by a
    /// folded tuple.
    output: Vec<usize>,
}

impl GroupBy {
    pub fn new(source: RelationRef, heading: Heading, fold: Fold) -> Self {
        let errors = ErrorSlot::default();

        let group = Heading::new(
            heading
                .attributes()
                .iter()
                .filter(|attribute| !fold.output.contains(attribute.name()))
                .cloned()
                .collect(),
        );

        let keys = if group.degree() > 0 {
            CandKeys::from_vecs(vec![group.names().map(str::to_owned).collect()])
        } else {
            CandKeys::default_keys(&heading)
        };

        let plan = plan(source.heading(), &heading, &group, &fold).unwrap_or_else(|err| {
            errors.latch(err);
            GroupPlan::default()
        });

        Self {
            source,
            heading,
            fold,
            keys,
            plan,
            errors,
        }
    }
}

fn plan(
    source: &Heading,
    heading: &Heading,
    group: &Heading,
    fold: &Fold,
) -> RelResult<GroupPlan> {
    if let Some(missing) = fold.output.names().find(|name| !heading.contains(name)) {
        return Err(RelError::UnknownAttribute(missing.to_owned()));
    }

    let both = Heading::new(
        group
            .attributes()
            .iter()
            .chain(fold.output.attributes())
            .cloned()
            .collect(),
    );

    Ok(GroupPlan {
        group: source.field_map(group)?,
        input: source.field_map(&fold.input)?,
        output: both.field_map(heading)?,
    })
}

impl Relation for GroupBy {
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
impl Evaluate for GroupBy {
    fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    async fn evaluate(
        &self,
        sink: &mut dyn TupleSink,
        cancel: &CancellationToken,
    ) -> RelResult<()> {
        let plan = &self.plan;

        // groups in order of first appearance
        let mut groups: Vec<(Tuple, Vec<Tuple>)> = Vec::new();
        let mut index: HashMap<Tuple, usize> = HashMap::new();

        let mut input = Input::open(&self.source);
        while let Some(tuple) = input.next(cancel).await? {
            let group = tuple.project(&plan.group);
            let i = *index.entry(group.clone()).or_insert_with(|| {
                groups.push((group, Vec::new()));
                groups.len() - 1
            });
            groups[i].1.push(tuple.project(&plan.input));
        }

        if cancel.is_cancelled() {
            return Ok(());
        }

        for (group, members) in groups {
            let folded = (self.fold.fold)(members)?.expect_degree(self.fold.output.degree())?;
            let both = Tuple::new(group.into_values().into_iter().chain(folded).collect());
            if !emit(sink, both.project(&plan.output), cancel).await? {
                break;
            }
        }

        Ok(())
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_relation(&self.heading, f)
    }
}
