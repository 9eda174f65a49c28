//! Tuple schemas.

use std::fmt;

use super::field::Type;

/// One column of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TdItem {
    pub field_type: Type,
    pub name: Option<String>,
}

/// Ordered list of `(type, name)` pairs describing a tuple.
///
/// Two descriptors are equal when their types match position by position;
/// names do not participate in equality.
///
/// # Example
/// ```
/// use heapstore::tuple::{TupleDesc, Type};
///
/// let left = TupleDesc::with_names(vec![(Type::Int, "id")]);
/// let right = TupleDesc::with_names(vec![(Type::Str, "name")]);
/// let joined = TupleDesc::merge(&left, &right);
///
/// assert_eq!(joined.num_fields(), 2);
/// assert_eq!(joined.index_of("name"), Some(1));
/// ```
#[derive(Debug, Clone, Eq)]
pub struct TupleDesc {
    items: Vec<TdItem>,
}

impl TupleDesc {
    /// Build an anonymous schema from field types.
    pub fn new(types: Vec<Type>) -> Self {
        Self {
            items: types
                .into_iter()
                .map(|field_type| TdItem {
                    field_type,
                    name: None,
                })
                .collect(),
        }
    }

    /// Build a schema with named fields.
    pub fn with_names<S: Into<String>>(fields: Vec<(Type, S)>) -> Self {
        Self {
            items: fields
                .into_iter()
                .map(|(field_type, name)| TdItem {
                    field_type,
                    name: Some(name.into()),
                })
                .collect(),
        }
    }

    /// Concatenate two schemas: all fields of `a`, then all fields of `b`.
    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut items = Vec::with_capacity(a.items.len() + b.items.len());
        items.extend(a.items.iter().cloned());
        items.extend(b.items.iter().cloned());
        TupleDesc { items }
    }

    pub fn num_fields(&self) -> usize {
        self.items.len()
    }

    pub fn field_type(&self, i: usize) -> Option<Type> {
        self.items.get(i).map(|item| item.field_type)
    }

    pub fn field_name(&self, i: usize) -> Option<&str> {
        self.items.get(i).and_then(|item| item.name.as_deref())
    }

    /// Index of the first field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.name.as_deref() == Some(name))
    }

    /// Serialized width of a tuple with this schema, in bytes.
    pub fn size(&self) -> usize {
        self.items.iter().map(|item| item.field_type.byte_len()).sum()
    }

    pub fn items(&self) -> impl Iterator<Item = &TdItem> {
        self.items.iter()
    }
}

impl PartialEq for TupleDesc {
    fn eq(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| a.field_type == b.field_type)
    }
}

impl fmt::Display for TupleDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match &item.name {
                Some(name) => write!(f, "{}({})", item.field_type, name)?,
                None => write!(f, "{}(null)", item.field_type)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        let td = TupleDesc::new(vec![Type::Int, Type::Int, Type::Str]);
        assert_eq!(td.size(), 4 + 4 + 132);
    }

    #[test]
    fn test_merge_keeps_order_and_names() {
        let a = TupleDesc::with_names(vec![(Type::Int, "a0"), (Type::Str, "a1")]);
        let b = TupleDesc::with_names(vec![(Type::Int, "b0")]);
        let merged = TupleDesc::merge(&a, &b);

        assert_eq!(merged.num_fields(), 3);
        assert_eq!(merged.field_type(1), Some(Type::Str));
        assert_eq!(merged.field_name(2), Some("b0"));
        assert_eq!(merged.size(), a.size() + b.size());
    }

    #[test]
    fn test_equality_ignores_names() {
        let a = TupleDesc::with_names(vec![(Type::Int, "x")]);
        let b = TupleDesc::new(vec![Type::Int]);
        let c = TupleDesc::new(vec![Type::Str]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_index_of_missing_and_anonymous() {
        let td = TupleDesc::new(vec![Type::Int]);
        assert_eq!(td.index_of("anything"), None);
        assert_eq!(td.field_name(0), None);
        assert_eq!(td.field_type(5), None);
    }

    #[test]
    fn test_display() {
        let td = TupleDesc::with_names(vec![(Type::Int, "id"), (Type::Str, "name")]);
        assert_eq!(td.to_string(), "INT(id), STRING(name)");
    }
}
