//! The tuple data model.
//!
//! - [`Type`] / [`Field`] - fixed-width typed values
//! - [`TupleDesc`] - schemas, mergeable for wider composite rows
//! - [`Tuple`] - one record plus its optional on-disk location
//! - [`RecordId`] - `(page, slot)` location of a stored tuple

mod field;
mod record_id;
#[allow(clippy::module_inception)]
mod tuple;
mod tuple_desc;

pub use field::{Field, Type};
pub use record_id::RecordId;
pub use tuple::Tuple;
pub use tuple_desc::{TdItem, TupleDesc};
