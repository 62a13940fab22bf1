//! # Data Types and Schemas
//!
//! Every relation in a plan produces a flat list of typed, named columns. The
//! translator needs those types to build Substrait function signatures
//! (`gt:i32_i32`) and base schemas, and the consumer rebuilds them from the
//! Substrait `NamedStruct` so column references can be rendered by name.

use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scalar column types understood by the plan model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of an untyped NULL literal.
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Fixed-point decimal with `precision` total digits and `scale` fractional digits.
    Decimal { precision: u8, scale: u8 },
    Varchar,
    /// Days since the Unix epoch.
    Date,
}

impl DataType {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::Float32
                | DataType::Float64
                | DataType::Decimal { .. }
        )
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    /// Result type of an arithmetic operation over `self` and `other`.
    ///
    /// Floats win over decimals, decimals over integers, and integers widen to
    /// the larger width. NULL adopts the other side's type.
    pub fn arithmetic_result(self, other: DataType) -> Result<DataType, PlanError> {
        use DataType::*;
        match (self, other) {
            (Null, t) | (t, Null) => Ok(t),
            (Float64, r) | (r, Float64) if r.is_numeric() => Ok(Float64),
            (Float32, r) | (r, Float32) if r.is_numeric() => Ok(Float32),
            (
                Decimal {
                    precision: p1,
                    scale: s1,
                },
                Decimal {
                    precision: p2,
                    scale: s2,
                },
            ) => Ok(Decimal {
                precision: p1.max(p2),
                scale: s1.max(s2),
            }),
            (d @ Decimal { .. }, i) | (i, d @ Decimal { .. }) if i.is_integer() => Ok(d),
            (l, r) if l.is_integer() && r.is_integer() => Ok(l.wider_integer(r)),
            (l, r) => Err(PlanError::TypeMismatch(format!(
                "cannot apply arithmetic to {} and {}",
                l, r
            ))),
        }
    }

    fn wider_integer(self, other: DataType) -> DataType {
        fn rank(t: DataType) -> u8 {
            match t {
                DataType::Int8 => 1,
                DataType::Int16 => 2,
                DataType::Int32 => 3,
                _ => 4,
            }
        }
        if rank(other) > rank(self) {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Null => write!(f, "NULL"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Int8 => write!(f, "TINYINT"),
            DataType::Int16 => write!(f, "SMALLINT"),
            DataType::Int32 => write!(f, "INTEGER"),
            DataType::Int64 => write!(f, "BIGINT"),
            DataType::Float32 => write!(f, "FLOAT"),
            DataType::Float64 => write!(f, "DOUBLE"),
            DataType::Decimal { precision, scale } => write!(f, "DECIMAL({},{})", precision, scale),
            DataType::Varchar => write!(f, "VARCHAR"),
            DataType::Date => write!(f, "DATE"),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Ordered list of output columns of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by ordinal position.
    pub fn field(&self, index: usize) -> Result<&Field, PlanError> {
        self.fields
            .get(index)
            .ok_or(PlanError::ColumnIndexOutOfRange {
                index,
                width: self.fields.len(),
            })
    }

    /// Position of the first field with the given name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    /// Concatenate two schemas (join output).
    pub fn join(&self, other: &Schema) -> Schema {
        let mut fields = self.fields.clone();
        fields.extend(other.fields.iter().cloned());
        Schema { fields }
    }

    /// Keep only the given positions, in the given order.
    pub fn project(&self, indices: &[usize]) -> Result<Schema, PlanError> {
        let fields = indices
            .iter()
            .map(|&i| self.field(i).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Schema { fields })
    }

    /// Copy of this schema with every field marked nullable (outer join sides).
    pub fn to_nullable(&self) -> Schema {
        Schema {
            fields: self
                .fields
                .iter()
                .map(|f| Field {
                    nullable: true,
                    ..f.clone()
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic_widening() {
        assert_eq!(
            DataType::Int32.arithmetic_result(DataType::Int64).unwrap(),
            DataType::Int64
        );
        assert_eq!(
            DataType::Int16.arithmetic_result(DataType::Float64).unwrap(),
            DataType::Float64
        );
        let dec = DataType::Decimal {
            precision: 10,
            scale: 2,
        };
        assert_eq!(DataType::Int32.arithmetic_result(dec).unwrap(), dec);
        assert!(DataType::Varchar.arithmetic_result(DataType::Int32).is_err());
    }

    #[test]
    fn test_schema_projection_and_bounds() {
        let schema = Schema::new(vec![
            Field::new("a", DataType::Int32, false),
            Field::new("b", DataType::Varchar, true),
        ]);
        let projected = schema.project(&[1]).unwrap();
        assert_eq!(projected.names(), vec!["b".to_string()]);
        assert!(matches!(
            schema.field(5),
            Err(PlanError::ColumnIndexOutOfRange { index: 5, width: 2 })
        ));
    }
}
