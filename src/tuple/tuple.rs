//! Tuples: typed records conforming to a [`TupleDesc`].

use std::fmt;
use std::sync::Arc;

use crate::common::{Error, Result};

use super::field::Field;
use super::record_id::RecordId;
use super::tuple_desc::TupleDesc;

/// One record.
///
/// A tuple carries its schema, its field values, and (once stored) the
/// [`RecordId`] of the slot that holds it. A `None` record id means the tuple
/// has not been placed in a heap file yet.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use heapstore::tuple::{Field, Tuple, TupleDesc, Type};
///
/// let desc = Arc::new(TupleDesc::new(vec![Type::Int, Type::Str]));
/// let tuple = Tuple::new(desc, vec![Field::Int(1), Field::from("ada")]).unwrap();
/// assert_eq!(tuple.to_string(), "1\tada");
/// assert!(tuple.record_id().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    desc: Arc<TupleDesc>,
    fields: Vec<Field>,
    record_id: Option<RecordId>,
}

impl Tuple {
    /// Build a tuple, checking that `fields` conform to `desc`.
    ///
    /// # Errors
    /// `Error::SchemaMismatch` if the arity or any field type differs.
    pub fn new(desc: Arc<TupleDesc>, fields: Vec<Field>) -> Result<Self> {
        let conforms = fields.len() == desc.num_fields()
            && fields
                .iter()
                .enumerate()
                .all(|(i, f)| desc.field_type(i) == Some(f.field_type()));
        if !conforms {
            return Err(Error::SchemaMismatch);
        }
        Ok(Self {
            desc,
            fields,
            record_id: None,
        })
    }

    /// Concatenate two tuples into one over the merged schema.
    pub fn merge(a: &Tuple, b: &Tuple) -> Tuple {
        let mut fields = Vec::with_capacity(a.fields.len() + b.fields.len());
        fields.extend(a.fields.iter().cloned());
        fields.extend(b.fields.iter().cloned());
        Tuple {
            desc: Arc::new(TupleDesc::merge(&a.desc, &b.desc)),
            fields,
            record_id: None,
        }
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    /// Replace the schema, keeping the field values.
    ///
    /// Used by operators that rename columns; the new schema must have the
    /// same types.
    pub fn reset_tuple_desc(&mut self, desc: Arc<TupleDesc>) -> Result<()> {
        if *desc != *self.desc {
            return Err(Error::SchemaMismatch);
        }
        self.desc = desc;
        Ok(())
    }

    pub fn field(&self, i: usize) -> Option<&Field> {
        self.fields.get(i)
    }

    /// Overwrite field `i`.
    ///
    /// # Errors
    /// `Error::SchemaMismatch` if `i` is out of range or the type differs.
    pub fn set_field(&mut self, i: usize, value: Field) -> Result<()> {
        if self.desc.field_type(i) != Some(value.field_type()) {
            return Err(Error::SchemaMismatch);
        }
        self.fields[i] = value;
        Ok(())
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn record_id(&self) -> Option<RecordId> {
        self.record_id
    }

    pub fn set_record_id(&mut self, record_id: Option<RecordId>) {
        self.record_id = record_id;
    }

    /// Write the fixed-width image of this tuple into `out`.
    ///
    /// `out` must be at least `tuple_desc().size()` bytes.
    pub fn serialize_into(&self, out: &mut [u8]) {
        let mut offset = 0;
        for field in &self.fields {
            let len = field.field_type().byte_len();
            field.serialize_into(&mut out[offset..offset + len]);
            offset += len;
        }
    }

    /// Decode a tuple image produced by [`Tuple::serialize_into`].
    pub fn deserialize(desc: Arc<TupleDesc>, bytes: &[u8]) -> Tuple {
        let mut fields = Vec::with_capacity(desc.num_fields());
        let mut offset = 0;
        for item in desc.items() {
            let len = item.field_type.byte_len();
            fields.push(item.field_type.parse(&bytes[offset..offset + len]));
            offset += len;
        }
        Tuple {
            desc,
            fields,
            record_id: None,
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, "\t")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}
