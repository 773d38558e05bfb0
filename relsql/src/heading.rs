//! Headings: the ordered, named and typed attributes of a relation.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::record::Domain;
use crate::value::ValueType;
use crate::{RelError, RelResult};

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct Attribute {
    name: String,
    ty: ValueType,
    nullable: bool,
}

impl Attribute {
    pub fn new(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: false,
        }
    }

    pub fn nullable(name: impl Into<String>, ty: ValueType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
        }
    }

    /// The attribute a record field of type `D` maps to.
    pub fn of<D: Domain>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: D::TYPE,
            nullable: D::NULLABLE,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ValueType {
        self.ty
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Same domain, ignoring the name.
    pub fn same_domain(&self, other: &Attribute) -> bool {
        self.ty == other.ty && self.nullable == other.nullable
    }

    fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_owned(),
            ..self.clone()
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.ty)?;
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

/// The heading of a relation.
///
/// Order is significant: it is the order of the values in every tuple
/// produced by the relation, and the order of the fields of its record type.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Heading(Vec<Attribute>);

impl Heading {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self(attributes)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.0
    }

    pub fn degree(&self) -> usize {
        self.0.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.iter().map(Attribute::name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|attribute| attribute.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|attribute| attribute.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Rejects headings naming the same attribute twice.
    pub fn check_unique(&self) -> RelResult<()> {
        let mut seen = HashSet::new();
        for name in self.names() {
            if !seen.insert(name) {
                return Err(RelError::DuplicateAttribute(name.to_owned()));
            }
        }
        Ok(())
    }

    /// Checks that tuples of `other` can be exchanged with tuples of `self`:
    /// same degree, and the same names and domains in the same order.
    pub fn ensure_same(&self, other: &Heading) -> RelResult<()> {
        if self == other {
            Ok(())
        } else {
            Err(RelError::SchemaMismatch {
                expected: self.to_typed_string(),
                found: other.to_typed_string(),
            })
        }
    }

    /// For every attribute of `target`, its position in `self`.
    ///
    /// Fails if `target` is not a subdomain of `self`, i.e. if it names an
    /// attribute `self` does not have, or gives one a different domain.
    pub fn field_map(&self, target: &Heading) -> RelResult<Vec<usize>> {
        target.check_unique()?;
        target
            .0
            .iter()
            .map(|attribute| {
                let position = self
                    .position(&attribute.name)
                    .ok_or_else(|| RelError::UnknownAttribute(attribute.name.clone()))?;
                let own = &self.0[position];
                if own.same_domain(attribute) {
                    Ok(position)
                } else {
                    Err(RelError::SchemaMismatch {
                        expected: own.to_string(),
                        found: attribute.to_string(),
                    })
                }
            })
            .collect()
    }

    pub fn is_subdomain(&self, target: &Heading) -> bool {
        self.field_map(target).is_ok()
    }

    /// Positional old name -> new name map for renaming `self` into `target`.
    pub fn rename_map(&self, target: &Heading) -> RelResult<HashMap<String, String>> {
        if self.degree() != target.degree() {
            return Err(RelError::DegreeMismatch {
                expected: self.degree(),
                found: target.degree(),
            });
        }
        target.check_unique()?;

        self.0
            .iter()
            .zip(target.0.iter())
            .map(|(old, new)| {
                if old.same_domain(new) {
                    Ok((old.name.clone(), new.name.clone()))
                } else {
                    Err(RelError::SchemaMismatch {
                        expected: old.to_string(),
                        found: new.to_string(),
                    })
                }
            })
            .collect()
    }

    /// Applies a rename map, keeping attributes without an entry unchanged.
    pub fn renamed(&self, names: &HashMap<String, String>) -> Heading {
        Heading(
            self.0
                .iter()
                .map(|attribute| match names.get(&attribute.name) {
                    Some(name) => attribute.renamed(name),
                    None => attribute.clone(),
                })
                .collect(),
        )
    }

    fn to_typed_string(&self) -> String {
        self.0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The heading string, e.g. `SNO, SName`.
impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", name)?;
        }
        Ok(())
    }
}
