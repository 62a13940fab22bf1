//! Conversion between `DataType` and Substrait `Type`, plus the short type
//! names used in compound function signatures (`add:i32_i32`).

use planx_core::types::{DataType, Field, Schema};
use substrait::proto;
use substrait::proto::r#type::{self as ptype, Kind, Nullability};

fn nullability(nullable: bool) -> i32 {
    if nullable {
        Nullability::Nullable as i32
    } else {
        Nullability::Required as i32
    }
}

/// Substrait type for a column type. `None` for `DataType::Null`, which has no
/// concrete Substrait counterpart.
pub fn to_substrait_type(data_type: DataType, nullable: bool) -> Option<proto::Type> {
    let n = nullability(nullable);
    let kind = match data_type {
        DataType::Null => return None,
        DataType::Boolean => Kind::Bool(ptype::Boolean {
            nullability: n,
            ..Default::default()
        }),
        DataType::Int8 => Kind::I8(ptype::I8 {
            nullability: n,
            ..Default::default()
        }),
        DataType::Int16 => Kind::I16(ptype::I16 {
            nullability: n,
            ..Default::default()
        }),
        DataType::Int32 => Kind::I32(ptype::I32 {
            nullability: n,
            ..Default::default()
        }),
        DataType::Int64 => Kind::I64(ptype::I64 {
            nullability: n,
            ..Default::default()
        }),
        DataType::Float32 => Kind::Fp32(ptype::Fp32 {
            nullability: n,
            ..Default::default()
        }),
        DataType::Float64 => Kind::Fp64(ptype::Fp64 {
            nullability: n,
            ..Default::default()
        }),
        DataType::Decimal { precision, scale } => Kind::Decimal(ptype::Decimal {
            precision: i32::from(precision),
            scale: i32::from(scale),
            nullability: n,
            ..Default::default()
        }),
        DataType::Varchar => Kind::String(ptype::String {
            nullability: n,
            ..Default::default()
        }),
        DataType::Date => Kind::Date(ptype::Date {
            nullability: n,
            ..Default::default()
        }),
    };
    Some(proto::Type { kind: Some(kind) })
}

/// Column type and nullability of a Substrait type. `Err` carries a short
/// description of the unsupported kind.
pub fn from_substrait_type(ty: &proto::Type) -> Result<(DataType, bool), String> {
    let kind = ty.kind.as_ref().ok_or_else(|| "type without kind".to_string())?;
    let (data_type, n) = match kind {
        Kind::Bool(t) => (DataType::Boolean, t.nullability),
        Kind::I8(t) => (DataType::Int8, t.nullability),
        Kind::I16(t) => (DataType::Int16, t.nullability),
        Kind::I32(t) => (DataType::Int32, t.nullability),
        Kind::I64(t) => (DataType::Int64, t.nullability),
        Kind::Fp32(t) => (DataType::Float32, t.nullability),
        Kind::Fp64(t) => (DataType::Float64, t.nullability),
        Kind::String(t) => (DataType::Varchar, t.nullability),
        Kind::Varchar(t) => (DataType::Varchar, t.nullability),
        Kind::FixedChar(t) => (DataType::Varchar, t.nullability),
        Kind::Date(t) => (DataType::Date, t.nullability),
        Kind::Decimal(t) => {
            let precision = u8::try_from(t.precision)
                .ok()
                .filter(|p| (1..=38).contains(p))
                .ok_or_else(|| format!("decimal precision {}", t.precision))?;
            let scale = u8::try_from(t.scale)
                .ok()
                .filter(|s| *s <= precision)
                .ok_or_else(|| format!("decimal scale {}", t.scale))?;
            (DataType::Decimal { precision, scale }, t.nullability)
        }
        other => return Err(variant_name(other)),
    };
    Ok((data_type, n != Nullability::Required as i32))
}

/// Substrait `NamedStruct` describing a schema.
pub fn to_named_struct(schema: &Schema) -> Option<proto::NamedStruct> {
    let types = schema
        .fields
        .iter()
        .map(|f| to_substrait_type(f.data_type, f.nullable))
        .collect::<Option<Vec<_>>>()?;
    Some(proto::NamedStruct {
        names: schema.names(),
        r#struct: Some(ptype::Struct {
            types,
            nullability: Nullability::Required as i32,
            ..Default::default()
        }),
    })
}

/// Schema of a Substrait `NamedStruct`. Only flat structs are supported, so
/// names and types must line up one to one.
pub fn from_named_struct(ns: &proto::NamedStruct) -> Result<Schema, String> {
    let types = ns
        .r#struct
        .as_ref()
        .map(|s| s.types.as_slice())
        .unwrap_or_default();
    if types.len() != ns.names.len() {
        return Err(format!(
            "named struct with {} names and {} types",
            ns.names.len(),
            types.len()
        ));
    }
    let fields = ns
        .names
        .iter()
        .zip(types)
        .map(|(name, ty)| {
            let (data_type, nullable) = from_substrait_type(ty)?;
            Ok(Field::new(name.clone(), data_type, nullable))
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(Schema::new(fields))
}

/// Short type name used in compound function names.
pub fn signature_name(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Null => "any",
        DataType::Boolean => "bool",
        DataType::Int8 => "i8",
        DataType::Int16 => "i16",
        DataType::Int32 => "i32",
        DataType::Int64 => "i64",
        DataType::Float32 => "fp32",
        DataType::Float64 => "fp64",
        DataType::Decimal { .. } => "dec",
        DataType::Varchar => "str",
        DataType::Date => "date",
    }
}

/// Name of an enum variant from its `Debug` output (`Foo(..)` -> `Foo`).
pub(crate) fn variant_name<T: std::fmt::Debug>(value: &T) -> String {
    let debug = format!("{:?}", value);
    debug
        .split(|c: char| c == '(' || c == ' ' || c == '{')
        .next()
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_roundtrip() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new(
                "price",
                DataType::Decimal {
                    precision: 12,
                    scale: 2,
                },
                true,
            ),
            Field::new("name", DataType::Varchar, true),
        ]);
        let ns = to_named_struct(&schema).unwrap();
        assert_eq!(from_named_struct(&ns).unwrap(), schema);
    }

    #[test]
    fn test_unsupported_kind_named() {
        let ty = proto::Type {
            kind: Some(Kind::Uuid(ptype::Uuid::default())),
        };
        assert_eq!(from_substrait_type(&ty).unwrap_err(), "Uuid");
        assert!(to_substrait_type(DataType::Null, true).is_none());
    }
}
