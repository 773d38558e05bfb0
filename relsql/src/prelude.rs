pub use crate::algebra::{Fold, Mapper, Predicate};
pub use crate::config::DatabaseConfig;
pub use crate::heading::{Attribute, Heading};
pub use crate::key::CandKeys;
pub use crate::record::{Domain, Record, Table};
pub use crate::relation::{tuple_channel, Relation, RelationExt, RelationRef};
pub use crate::source::TableSource;
pub use crate::tuple::Tuple;
pub use crate::value::{Value, ValueType};
pub use crate::{RelError, RelResult};
