use std::fmt;

use crate::heading::Heading;
use crate::value::Value;
use crate::{RelError, RelResult};

/// A tuple of values, positionally aligned with some heading.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Tuple(Vec<Value>);

impl Tuple {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }

    pub fn degree(&self) -> usize {
        self.0.len()
    }

    /// The values, provided there are exactly `degree` of them.
    pub fn expect_degree(self, degree: usize) -> RelResult<Vec<Value>> {
        if self.0.len() == degree {
            Ok(self.0)
        } else {
            Err(RelError::DegreeMismatch {
                expected: degree,
                found: self.0.len(),
            })
        }
    }

    /// The value of the attribute called `name` in `heading`.
    pub fn get(&self, heading: &Heading, name: &str) -> Option<&Value> {
        heading.position(name).and_then(|i| self.0.get(i))
    }

    /// A new tuple made of the values at `positions`, in that order.
    ///
    /// The positions come from [`Heading::field_map`] and are always in range.
    pub fn project(&self, positions: &[usize]) -> Tuple {
        Tuple(positions.iter().map(|&i| self.0[i].clone()).collect())
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "}}")
    }
}
