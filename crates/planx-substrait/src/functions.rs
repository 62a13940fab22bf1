//! # Function Extensions
//!
//! Substrait plans reference functions by anchor. Each anchor is declared once
//! in the plan's `extensions` list together with the extension URI that
//! defines the function and its compound name (`name:arg1_arg2`).
//!
//! Internally functions use the host engine's names (`substr`, `~~`, `mod`,
//! ...). [`substrait_name`] and [`internal_name`] translate between the two
//! vocabularies; names without an entry are the same on both sides.
//!
//! - [`ExtensionSet`] collects declarations while producing a plan, assigning
//!   URI and function anchors in first-use order so output is deterministic.
//! - [`FunctionMap`] resolves anchors while consuming a plan.

use crate::types::signature_name;
use planx_core::types::DataType;
use std::collections::HashMap;
use substrait::proto;
use substrait::proto::extensions::simple_extension_declaration::{ExtensionFunction, MappingType};
use substrait::proto::extensions::{SimpleExtensionDeclaration, SimpleExtensionUri};
use tracing::trace;

const EXTENSION_ROOT: &str = "https://github.com/substrait-io/substrait/blob/main/extensions";

pub const COMPARISON: &str = "functions_comparison.yaml";
pub const BOOLEAN: &str = "functions_boolean.yaml";
pub const ARITHMETIC: &str = "functions_arithmetic.yaml";
pub const ARITHMETIC_DECIMAL: &str = "functions_arithmetic_decimal.yaml";
pub const ROUNDING: &str = "functions_rounding.yaml";
pub const LOGARITHMIC: &str = "functions_logarithmic.yaml";
pub const STRING: &str = "functions_string.yaml";
pub const AGGREGATE_GENERIC: &str = "functions_aggregate_generic.yaml";

/// A scalar function the translator knows how to declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSpec {
    /// Name used inside `Expr::Function`.
    pub name: &'static str,
    /// Name in the Substrait extension file.
    pub substrait: &'static str,
    pub file: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions.
    pub max_args: Option<usize>,
}

const fn spec(
    name: &'static str,
    substrait: &'static str,
    file: &'static str,
    min_args: usize,
    max_args: Option<usize>,
) -> FunctionSpec {
    FunctionSpec {
        name,
        substrait,
        file,
        min_args,
        max_args,
    }
}

/// Scalar functions callable through `Expr::Function`.
pub const SCALAR_FUNCTIONS: &[FunctionSpec] = &[
    spec("abs", "abs", ARITHMETIC, 1, Some(1)),
    spec("sqrt", "sqrt", ARITHMETIC, 1, Some(1)),
    spec("exp", "exp", ARITHMETIC, 1, Some(1)),
    spec("power", "power", ARITHMETIC, 2, Some(2)),
    spec("sign", "sign", ARITHMETIC, 1, Some(1)),
    spec("mod", "modulus", ARITHMETIC, 2, Some(2)),
    spec("&", "bitwise_and", ARITHMETIC, 2, Some(2)),
    spec("|", "bitwise_or", ARITHMETIC, 2, Some(2)),
    spec("xor", "bitwise_xor", ARITHMETIC, 2, Some(2)),
    spec("ln", "ln", LOGARITHMIC, 1, Some(1)),
    spec("round", "round", ROUNDING, 1, Some(2)),
    spec("floor", "floor", ROUNDING, 1, Some(1)),
    spec("ceil", "ceil", ROUNDING, 1, Some(1)),
    spec("isnan", "is_nan", COMPARISON, 1, Some(1)),
    spec("coalesce", "coalesce", COMPARISON, 1, None),
    spec("upper", "upper", STRING, 1, Some(1)),
    spec("lower", "lower", STRING, 1, Some(1)),
    spec("substr", "substring", STRING, 2, Some(3)),
    spec("length", "char_length", STRING, 1, Some(1)),
    spec("prefix", "starts_with", STRING, 2, Some(2)),
    spec("suffix", "ends_with", STRING, 2, Some(2)),
    spec("contains", "contains", STRING, 2, Some(2)),
    spec("concat", "concat", STRING, 1, None),
    spec("~~", "like", STRING, 2, Some(2)),
    spec("trim", "trim", STRING, 1, Some(2)),
    spec("ltrim", "ltrim", STRING, 1, Some(2)),
    spec("rtrim", "rtrim", STRING, 1, Some(2)),
    spec("replace", "replace", STRING, 3, Some(3)),
];

/// Look up a scalar function by its internal name.
pub fn lookup_scalar(name: &str) -> Option<&'static FunctionSpec> {
    SCALAR_FUNCTIONS.iter().find(|f| f.name == name)
}

/// Internal name for a Substrait function name.
pub fn internal_name(substrait: &str) -> &str {
    match substrait {
        "modulus" => "mod",
        "std_dev" => "stddev",
        "starts_with" => "prefix",
        "ends_with" => "suffix",
        "substring" => "substr",
        "char_length" => "length",
        "is_nan" => "isnan",
        "like" => "~~",
        "bitwise_and" => "&",
        "bitwise_or" => "|",
        "bitwise_xor" => "xor",
        other => other,
    }
}

/// Substrait name for an internal function name.
pub fn substrait_name(internal: &str) -> &str {
    match lookup_scalar(internal) {
        Some(spec) => spec.substrait,
        None => internal,
    }
}

/// Compound function name: `name:t1_t2`, or just `name` without arguments.
pub fn compound_name(name: &str, arg_types: &[DataType]) -> String {
    if arg_types.is_empty() {
        return name.to_string();
    }
    let sig: Vec<&str> = arg_types.iter().copied().map(signature_name).collect();
    format!("{}:{}", name, sig.join("_"))
}

/// Function name with the signature suffix removed.
pub fn strip_signature(compound: &str) -> &str {
    compound.split(':').next().unwrap_or(compound)
}

/// Extension declarations collected while producing a plan.
#[derive(Debug, Default)]
pub struct ExtensionSet {
    uris: Vec<String>,
    functions: Vec<(u32, u32, String)>,
    anchors: HashMap<(String, String), u32>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor for `compound` declared in extension `file`, registering both on first use.
    pub fn register(&mut self, file: &str, compound: String) -> u32 {
        let key = (file.to_string(), compound);
        if let Some(anchor) = self.anchors.get(&key) {
            return *anchor;
        }
        let uri = format!("{}/{}", EXTENSION_ROOT, file);
        let uri_anchor = match self.uris.iter().position(|u| *u == uri) {
            Some(pos) => pos as u32 + 1,
            None => {
                self.uris.push(uri);
                self.uris.len() as u32
            }
        };
        let anchor = self.functions.len() as u32 + 1;
        trace!("Registered function {} as anchor {}", key.1, anchor);
        self.functions.push((anchor, uri_anchor, key.1.clone()));
        self.anchors.insert(key, anchor);
        anchor
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// `extension_uris` entries of the plan.
    pub fn uris(&self) -> Vec<SimpleExtensionUri> {
        self.uris
            .iter()
            .enumerate()
            .map(|(i, uri)| SimpleExtensionUri {
                extension_uri_anchor: i as u32 + 1,
                uri: uri.clone(),
            })
            .collect()
    }

    /// `extensions` entries of the plan.
    pub fn declarations(&self) -> Vec<SimpleExtensionDeclaration> {
        self.functions
            .iter()
            .map(|(anchor, uri_anchor, name)| SimpleExtensionDeclaration {
                mapping_type: Some(MappingType::ExtensionFunction(ExtensionFunction {
                    extension_uri_reference: *uri_anchor,
                    function_anchor: *anchor,
                    name: name.clone(),
                    ..Default::default()
                })),
            })
            .collect()
    }
}

/// Function anchors declared by a plan, resolved to names without signatures.
#[derive(Debug, Default)]
pub struct FunctionMap {
    names: HashMap<u32, String>,
}

impl FunctionMap {
    pub fn from_plan(plan: &proto::Plan) -> Self {
        let names = plan
            .extensions
            .iter()
            .filter_map(|decl| match &decl.mapping_type {
                Some(MappingType::ExtensionFunction(f)) => Some((
                    f.function_anchor,
                    strip_signature(&f.name).to_string(),
                )),
                _ => None,
            })
            .collect();
        Self { names }
    }

    pub fn get(&self, anchor: u32) -> Option<&str> {
        self.names.get(&anchor).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors_in_first_use_order() {
        let mut set = ExtensionSet::new();
        let gt = set.register(COMPARISON, compound_name("gt", &[DataType::Int32, DataType::Int32]));
        let add = set.register(ARITHMETIC, compound_name("add", &[DataType::Int64, DataType::Int64]));
        let gt_again =
            set.register(COMPARISON, compound_name("gt", &[DataType::Int32, DataType::Int32]));
        assert_eq!((gt, add, gt_again), (1, 2, 1));

        let uris = set.uris();
        assert_eq!(uris.len(), 2);
        assert!(uris[0].uri.ends_with(COMPARISON));

        let plan = proto::Plan {
            extension_uris: uris,
            extensions: set.declarations(),
            ..Default::default()
        };
        let map = FunctionMap::from_plan(&plan);
        assert_eq!(map.get(1), Some("gt"));
        assert_eq!(map.get(2), Some("add"));
        assert_eq!(map.get(3), None);
    }

    #[test]
    fn test_name_mapping() {
        assert_eq!(substrait_name("substr"), "substring");
        assert_eq!(internal_name("substring"), "substr");
        assert_eq!(internal_name("like"), "~~");
        assert_eq!(internal_name("std_dev"), "stddev");
        assert_eq!(substrait_name("upper"), "upper");
        assert_eq!(compound_name("count", &[]), "count");
        assert_eq!(strip_signature("equal:any_any"), "equal");
    }
}
