//! Declarative parameter schemas (the type oracle).
//!
//! A schema maps each parameter an estimator understands to its expected
//! [`ParamKind`] and default value. Coercion turns raw values (usually text)
//! into the schema's kind. Schemas are authored per algorithm in
//! [`super::algorithms`]; [`ParamSchema::from_signature`] builds one from a
//! dumped constructor signature instead.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{Diagnostics, ParamError, ParamWarning, Result};
use super::value::{ParamMap, ParamValue};

// Floats whose truncation lies in [I64_MIN_F, I64_MAX_F) fit an i64 exactly
const I64_MIN_F: f64 = -9_223_372_036_854_775_808.0;
const I64_MAX_F: f64 = 9_223_372_036_854_775_808.0;

/// Expected type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    Str,
    /// No coercion (the estimator's default is `None`, or the parameter
    /// accepts several shapes).
    Any,
}

impl ParamKind {
    /// Kind implied by a default value.
    pub fn of(default: &ParamValue) -> Self {
        match default {
            ParamValue::Bool(_) => ParamKind::Bool,
            ParamValue::Int(_) => ParamKind::Int,
            ParamValue::Float(_) => ParamKind::Float,
            ParamValue::Str(_) => ParamKind::Str,
            ParamValue::Null | ParamValue::List(_) | ParamValue::Map(_) => ParamKind::Any,
        }
    }

    /// Coerce `value` to this kind.
    ///
    /// Booleans never fail: anything whose text is not `true`/`false`
    /// (case-insensitive) becomes `false` and a warning is recorded. Other
    /// kinds fail with [`ParamError::UncoercibleValue`].
    pub fn coerce(
        self,
        key: &str,
        value: ParamValue,
        diagnostics: &mut Diagnostics,
    ) -> Result<ParamValue> {
        let uncoercible = |value: &ParamValue| ParamError::UncoercibleValue {
            key: key.to_string(),
            value: value.to_text(),
            kind: self,
        };

        match self {
            ParamKind::Any => Ok(value),
            ParamKind::Bool => {
                let text = value.to_text();
                let tag = text.trim().to_lowercase();
                if tag != "true" && tag != "false" {
                    // TODO: make this an error once callers stop relying on typos defaulting to false
                    diagnostics.warn(ParamWarning::BooleanCoercion {
                        key: key.to_string(),
                        value: text,
                    });
                }
                Ok(ParamValue::Bool(tag == "true"))
            }
            ParamKind::Int => match value {
                ParamValue::Int(_) => Ok(value),
                ParamValue::Bool(b) => Ok(ParamValue::Int(b as i64)),
                ParamValue::Float(x) if (I64_MIN_F..I64_MAX_F).contains(&x.trunc()) => {
                    Ok(ParamValue::Int(x.trunc() as i64))
                }
                ParamValue::Str(ref s) => s
                    .trim()
                    .parse::<i64>()
                    .map(ParamValue::Int)
                    .map_err(|_| uncoercible(&value)),
                _ => Err(uncoercible(&value)),
            },
            ParamKind::Float => match value {
                ParamValue::Float(_) => Ok(value),
                ParamValue::Int(i) => Ok(ParamValue::Float(i as f64)),
                ParamValue::Bool(b) => Ok(ParamValue::Float(if b { 1.0 } else { 0.0 })),
                ParamValue::Str(ref s) => s
                    .trim()
                    .parse::<f64>()
                    .map(ParamValue::Float)
                    .map_err(|_| uncoercible(&value)),
                _ => Err(uncoercible(&value)),
            },
            // Scalars render the way the estimators' own str() would
            ParamKind::Str => match value {
                ParamValue::Str(_) => Ok(value),
                ParamValue::Null => Ok(ParamValue::Str("None".to_string())),
                ParamValue::Bool(true) => Ok(ParamValue::Str("True".to_string())),
                ParamValue::Bool(false) => Ok(ParamValue::Str("False".to_string())),
                other => Ok(ParamValue::Str(other.to_text())),
            },
        }
    }
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Bool => write!(f, "bool"),
            ParamKind::Int => write!(f, "int"),
            ParamKind::Float => write!(f, "float"),
            ParamKind::Str => write!(f, "str"),
            ParamKind::Any => write!(f, "any"),
        }
    }
}

/// One schema entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub kind: ParamKind,
    pub default: ParamValue,
}

impl ParamSpec {
    /// Spec whose kind follows the default value.
    pub fn from_default(default: ParamValue) -> Self {
        Self {
            kind: ParamKind::of(&default),
            default,
        }
    }
}

/// Constructor parameter names that never carry a default.
const IMPLICIT_SLOTS: &[&str] = &["self", "kwargs"];

/// A constructor signature dump: parameter names and the trailing defaults.
#[derive(Debug, Deserialize)]
struct Signature {
    params: Vec<String>,
    defaults: Vec<serde_json::Value>,
}

/// Ordered parameter schema for one estimator.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamSchema {
    specs: ParamMap<ParamSpec>,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, name: &str, kind: ParamKind, default: ParamValue) -> Self {
        self.specs.insert(name, ParamSpec { kind, default });
        self
    }

    pub fn boolean(self, name: &str, default: bool) -> Self {
        self.with(name, ParamKind::Bool, ParamValue::Bool(default))
    }

    pub fn int(self, name: &str, default: i64) -> Self {
        self.with(name, ParamKind::Int, ParamValue::Int(default))
    }

    pub fn float(self, name: &str, default: f64) -> Self {
        self.with(name, ParamKind::Float, ParamValue::Float(default))
    }

    pub fn string(self, name: &str, default: &str) -> Self {
        self.with(name, ParamKind::Str, ParamValue::from(default))
    }

    /// Parameter with no default (`None`); values pass through untouched.
    pub fn any(self, name: &str) -> Self {
        self.with(name, ParamKind::Any, ParamValue::Null)
    }

    /// Force a default, replacing the existing entry's kind with the one the
    /// new default implies. Adds the parameter if it is not declared yet.
    pub fn with_default(mut self, name: &str, default: impl Into<ParamValue>) -> Self {
        self.specs.insert(name, ParamSpec::from_default(default.into()));
        self
    }

    /// Build a schema from constructor parameter names and their defaults,
    /// paired position by position after dropping `self`/`kwargs`.
    ///
    /// Every remaining name must have a default; a count mismatch means the
    /// signature is not one we can pair up and is rejected.
    pub fn from_signature(names: &[String], defaults: Vec<ParamValue>) -> Result<Self> {
        let names: Vec<&String> = names
            .iter()
            .filter(|name| !IMPLICIT_SLOTS.contains(&name.as_str()))
            .collect();
        if names.len() != defaults.len() {
            return Err(ParamError::SignatureMismatch {
                names: names.len(),
                defaults: defaults.len(),
            });
        }

        let specs = names
            .into_iter()
            .zip(defaults)
            .map(|(name, default)| (name.clone(), ParamSpec::from_default(default)))
            .collect();
        Ok(Self { specs })
    }

    /// Load a signature dump of the form
    /// `{"params": ["self", "C", ...], "defaults": [1.0, ...]}`.
    pub fn from_signature_file(path: &Path) -> Result<Self> {
        let fail = |reason: String| ParamError::ParamFile {
            path: path.to_path_buf(),
            reason,
        };
        let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
        let signature: Signature =
            serde_json::from_str(&content).map_err(|e| fail(e.to_string()))?;

        let defaults = signature
            .defaults
            .into_iter()
            .map(ParamValue::from)
            .collect();
        Self::from_signature(&signature.params, defaults)
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn coerce(kind: ParamKind, value: impl Into<ParamValue>) -> (Result<ParamValue>, usize) {
        let mut diagnostics = Diagnostics::default();
        let result = kind.coerce("p", value.into(), &mut diagnostics);
        (result, diagnostics.warnings().len())
    }

    #[test]
    fn test_bool_coercion() {
        for text in ["True", "true", "TRUE "] {
            let (value, warnings) = coerce(ParamKind::Bool, text);
            assert_eq!(value.unwrap(), ParamValue::Bool(true), "input {:?}", text);
            assert_eq!(warnings, 0);
        }
        let (value, warnings) = coerce(ParamKind::Bool, "False");
        assert_eq!(value.unwrap(), ParamValue::Bool(false));
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_bool_fallback_is_false_with_warning() {
        for text in ["maybe", "flase", "1", ""] {
            let (value, warnings) = coerce(ParamKind::Bool, text);
            assert_eq!(value.unwrap(), ParamValue::Bool(false), "input {:?}", text);
            assert_eq!(warnings, 1);
        }
        // Already-typed booleans round-trip through their text form
        let (value, warnings) = coerce(ParamKind::Bool, true);
        assert_eq!(value.unwrap(), ParamValue::Bool(true));
        assert_eq!(warnings, 0);
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(coerce(ParamKind::Float, "3").0.unwrap(), ParamValue::Float(3.0));
        assert_eq!(coerce(ParamKind::Float, 2i64).0.unwrap(), ParamValue::Float(2.0));
        assert_eq!(coerce(ParamKind::Float, "1e-4").0.unwrap(), ParamValue::Float(1e-4));
        assert!(matches!(
            coerce(ParamKind::Float, "fast").0,
            Err(ParamError::UncoercibleValue { kind: ParamKind::Float, .. })
        ));
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(coerce(ParamKind::Int, " 31 ").0.unwrap(), ParamValue::Int(31));
        assert_eq!(coerce(ParamKind::Int, -1i64).0.unwrap(), ParamValue::Int(-1));
        // Floats truncate toward zero
        assert_eq!(coerce(ParamKind::Int, 2.9).0.unwrap(), ParamValue::Int(2));
        assert!(coerce(ParamKind::Int, "3.5").0.is_err());
        assert!(coerce(ParamKind::Int, ParamValue::Null).0.is_err());
    }

    #[test]
    fn test_int_coercion_rejects_out_of_range_floats() {
        for x in [1e30, -1e30, 9.3e18, f64::INFINITY, f64::NAN] {
            assert!(
                matches!(
                    coerce(ParamKind::Int, x).0,
                    Err(ParamError::UncoercibleValue { kind: ParamKind::Int, .. })
                ),
                "input {:?}",
                x
            );
        }
        assert_eq!(
            coerce(ParamKind::Int, -9.2e18).0.unwrap(),
            ParamValue::Int(-9_200_000_000_000_000_000)
        );
    }

    #[test]
    fn test_str_and_any() {
        assert_eq!(coerce(ParamKind::Str, "gbdt").0.unwrap(), ParamValue::from("gbdt"));
        assert_eq!(coerce(ParamKind::Str, 5i64).0.unwrap(), ParamValue::from("5"));
        assert_eq!(coerce(ParamKind::Any, "5").0.unwrap(), ParamValue::from("5"));
        assert_eq!(coerce(ParamKind::Str, ParamValue::Null).0.unwrap(), ParamValue::from("None"));
        assert_eq!(coerce(ParamKind::Str, true).0.unwrap(), ParamValue::from("True"));
        assert_eq!(coerce(ParamKind::Str, false).0.unwrap(), ParamValue::from("False"));
        assert_eq!(coerce(ParamKind::Str, 0.5).0.unwrap(), ParamValue::from("0.5"));
    }

    #[test]
    fn test_with_default_changes_kind() {
        let schema = ParamSchema::new()
            .any("objective")
            .with_default("objective", "binary:logistic")
            .with_default("use_label_encoder", true);

        assert_eq!(schema.get("objective").unwrap().kind, ParamKind::Str);
        assert_eq!(schema.get("use_label_encoder").unwrap().kind, ParamKind::Bool);
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_from_signature() {
        let names: Vec<String> = ["self", "C", "kernel", "probability", "kwargs"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let defaults = vec![
            ParamValue::Float(1.0),
            ParamValue::from("rbf"),
            ParamValue::Bool(false),
        ];
        let schema = ParamSchema::from_signature(&names, defaults).unwrap();

        assert_eq!(schema.get("C").unwrap().kind, ParamKind::Float);
        assert_eq!(schema.get("kernel").unwrap().kind, ParamKind::Str);
        assert_eq!(schema.get("probability").unwrap().kind, ParamKind::Bool);
    }

    #[test]
    fn test_from_signature_count_mismatch() {
        let names = vec!["self".to_string(), "a".to_string(), "b".to_string()];
        let err = ParamSchema::from_signature(&names, vec![ParamValue::Int(1)]).unwrap_err();
        assert!(matches!(
            err,
            ParamError::SignatureMismatch {
                names: 2,
                defaults: 1
            }
        ));
    }

    #[test]
    fn test_from_signature_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"params": ["self", "n_estimators", "max_features"], "defaults": [100, null]}}"#
        )
        .unwrap();

        let schema = ParamSchema::from_signature_file(file.path()).unwrap();
        assert_eq!(schema.get("n_estimators").unwrap().kind, ParamKind::Int);
        assert_eq!(schema.get("max_features").unwrap().kind, ParamKind::Any);
    }
}
