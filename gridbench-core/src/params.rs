//! Parameter Matrix Expansion
//!
//! A definition declares named parameters, each with an ordered list of literal
//! values. Expansion enumerates their Cartesian product with the last-declared
//! parameter varying fastest, so `N ∈ {10, 100}, M ∈ {1, 2}` yields
//! `(10,1) (10,2) (100,1) (100,2)`.

use crate::error::DefinitionError;
use fxhash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A literal parameter value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean literal
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal
    Str(String),
}

impl ParamValue {
    /// Integer value, if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Non-negative integer value as `usize`
    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    /// Numeric value as `f64` (integers are widened)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(v) => Some(*v),
            ParamValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Boolean value, if this is a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// String value, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(v) => write!(f, "{v}"),
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::Float(v) => write!(f, "{v}"),
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

macro_rules! int_param_value {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ParamValue {
            fn from(v: $ty) -> Self {
                ParamValue::Int(i64::from(v))
            }
        })*
    };
}

int_param_value!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        ParamValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<u64> for ParamValue {
    fn from(v: u64) -> Self {
        ParamValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// A declared parameter: a name and its ordered values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    /// Parameter name
    pub name: String,
    /// Values in declaration order
    pub values: Vec<ParamValue>,
}

impl ParameterDeclaration {
    /// Declare a parameter from any iterable of convertible values
    pub fn new<V>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self
    where
        V: Into<ParamValue>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

/// A single name/value assignment inside a combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterBinding {
    /// Parameter name
    pub name: String,
    /// Bound value
    pub value: ParamValue,
}

/// One concrete value for every declared parameter, in declaration order
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterCombination {
    bindings: Vec<ParameterBinding>,
}

impl ParameterCombination {
    /// Build a combination from ordered `(name, value)` pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ParamValue>,
    {
        Self {
            bindings: pairs
                .into_iter()
                .map(|(name, value)| ParameterBinding {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    /// Value bound to `name`
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.bindings
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.value)
    }

    /// Integer bound to `name`
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ParamValue::as_i64)
    }

    /// Non-negative integer bound to `name`
    pub fn get_usize(&self, name: &str) -> Option<usize> {
        self.get(name).and_then(ParamValue::as_usize)
    }

    /// Number bound to `name`
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    /// Boolean bound to `name`
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(ParamValue::as_bool)
    }

    /// String bound to `name`
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_str)
    }

    /// Non-negative integer bound to `name`, or an error naming the parameter.
    ///
    /// Meant for setup callables: `state.n = params.require_usize("N")?;`
    pub fn require_usize(&self, name: &str) -> anyhow::Result<usize> {
        self.get_usize(name).ok_or_else(|| {
            anyhow::anyhow!("parameter `{name}` is missing or not a non-negative integer")
        })
    }

    /// Bindings in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &ParameterBinding> {
        self.bindings.iter()
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Display for ParameterCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, binding) in self.bindings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", binding.name, binding.value)?;
        }
        Ok(())
    }
}

/// Check declarations for empty value lists and repeated names.
pub fn validate_parameters(declarations: &[ParameterDeclaration]) -> Result<(), DefinitionError> {
    let mut seen = FxHashSet::default();
    for decl in declarations {
        if !seen.insert(decl.name.as_str()) {
            return Err(DefinitionError::DuplicateParameter {
                parameter: decl.name.clone(),
            });
        }
        if decl.values.is_empty() {
            return Err(DefinitionError::EmptyParameter {
                parameter: decl.name.clone(),
            });
        }
    }
    Ok(())
}

/// Expand declarations into their ordered Cartesian product.
///
/// Zero declarations yield exactly one empty combination. No combination is
/// skipped or deduplicated, so the result length is always the product of the
/// value-list sizes.
pub fn expand_parameters(
    declarations: &[ParameterDeclaration],
) -> Result<Vec<ParameterCombination>, DefinitionError> {
    validate_parameters(declarations)?;

    let total = declarations
        .iter()
        .try_fold(1usize, |acc, d| acc.checked_mul(d.values.len()))
        .ok_or(DefinitionError::TooManyCombinations)?;
    let mut combinations = Vec::with_capacity(total);

    // Odometer over value indices; the last position turns fastest.
    let mut cursor = vec![0usize; declarations.len()];
    for _ in 0..total {
        combinations.push(ParameterCombination {
            bindings: declarations
                .iter()
                .zip(&cursor)
                .map(|(decl, &idx)| ParameterBinding {
                    name: decl.name.clone(),
                    value: decl.values[idx].clone(),
                })
                .collect(),
        });

        for pos in (0..cursor.len()).rev() {
            cursor[pos] += 1;
            if cursor[pos] < declarations[pos].values.len() {
                break;
            }
            cursor[pos] = 0;
        }
    }

    Ok(combinations)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(combos: &[ParameterCombination]) -> Vec<String> {
        combos.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn last_parameter_varies_fastest() {
        let decls = [
            ParameterDeclaration::new("N", [10, 100]),
            ParameterDeclaration::new("M", [1, 2, 3]),
        ];
        let combos = expand_parameters(&decls).unwrap();

        assert_eq!(
            rendered(&combos),
            [
                "N=10, M=1",
                "N=10, M=2",
                "N=10, M=3",
                "N=100, M=1",
                "N=100, M=2",
                "N=100, M=3"
            ]
        );
    }

    #[test]
    fn count_is_product_of_sizes() {
        let decls = [
            ParameterDeclaration::new("a", [1, 2]),
            ParameterDeclaration::new("b", ["x", "y", "z"]),
            ParameterDeclaration::new("c", [true, false]),
            ParameterDeclaration::new("d", [0.5]),
        ];
        assert_eq!(expand_parameters(&decls).unwrap().len(), 2 * 3 * 2);
    }

    #[test]
    fn no_parameters_yield_one_empty_combination() {
        let combos = expand_parameters(&[]).unwrap();
        assert_eq!(combos.len(), 1);
        assert!(combos[0].is_empty());
    }

    #[test]
    fn repeated_values_are_not_deduplicated() {
        let combos = expand_parameters(&[ParameterDeclaration::new("N", [5, 5])]).unwrap();
        assert_eq!(combos.len(), 2);
    }

    #[test]
    fn empty_value_list_is_rejected() {
        let decls = [
            ParameterDeclaration::new("N", [1]),
            ParameterDeclaration::new("M", Vec::<i64>::new()),
        ];
        assert_eq!(
            expand_parameters(&decls),
            Err(DefinitionError::EmptyParameter {
                parameter: "M".to_string()
            })
        );
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let decls = [
            ParameterDeclaration::new("N", [1]),
            ParameterDeclaration::new("N", [2]),
        ];
        assert!(matches!(
            expand_parameters(&decls),
            Err(DefinitionError::DuplicateParameter { .. })
        ));
    }

    #[test]
    fn overflowing_grid_is_rejected() {
        let decls: Vec<_> = (0..5)
            .map(|i| ParameterDeclaration::new(format!("P{i}"), 0..65_536i64))
            .collect();
        assert_eq!(
            expand_parameters(&decls),
            Err(DefinitionError::TooManyCombinations)
        );
    }

    #[test]
    fn typed_accessors() {
        let combo = ParameterCombination::from_pairs([
            ("N", ParamValue::from(1_000)),
            ("ratio", ParamValue::from(0.25)),
            ("pattern", ParamValue::from("a+b")),
            ("cold", ParamValue::from(true)),
        ]);

        assert_eq!(combo.get_usize("N"), Some(1_000));
        assert_eq!(combo.get_f64("N"), Some(1_000.0));
        assert_eq!(combo.get_f64("ratio"), Some(0.25));
        assert_eq!(combo.get_str("pattern"), Some("a+b"));
        assert_eq!(combo.get_bool("cold"), Some(true));
        assert_eq!(combo.get_usize("missing"), None);
        assert!(combo.require_usize("pattern").is_err());
    }

    #[test]
    fn serializes_as_ordered_bindings() {
        let combo = ParameterCombination::from_pairs([("N", 10), ("M", 2)]);
        let json = serde_json::to_string(&combo).unwrap();
        assert_eq!(
            json,
            r#"[{"name":"N","value":10},{"name":"M","value":2}]"#
        );
    }
}
