//! Registry of supported algorithms and their parameter schemas.
//!
//! Each algorithm is a pure builder producing an [`AlgorithmSpec`]: the
//! schema used as type oracle, per-key custom parsers, the policy for keys
//! the schema does not know, and overrides the training glue always passes.
//!
//! | Name          | Estimator            | Notes                                        |
//! |---------------|----------------------|----------------------------------------------|
//! | `lightgbm`    | LGBMClassifier       | constructor defaults                         |
//! | `xgboost`     | XGBClassifier        | probes the base booster, forces objective    |
//! | `lr`          | LogisticRegression   | keyword-only defaults, forces `penalty=l2`   |
//! | `svm`         | SVC                  | keyword-only defaults                        |
//! | `flaml`       | flaml.AutoML         | no schema, values parsed as literals         |
//! | `autosklearn` | AutoSklearnClassifier| no schema, values parsed as literals         |

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use super::error::{Diagnostics, ParamError, Result};
use super::literal::parse_literal;
use super::schema::ParamSchema;
use super::value::{ParamMap, ParamValue};

/// Custom parser for a single parameter. Its output is used verbatim.
pub type ParseFn = fn(ParamValue) -> Result<ParamValue>;

/// What happens to keys that have neither a custom parser nor a schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    /// Keep the raw value.
    #[default]
    PassThrough,
    /// Parse textual values as literals, keeping the text when that fails.
    Literal,
}

#[derive(Debug, Clone)]
pub struct AlgorithmSpec {
    pub name: String,
    /// Estimator the parameters are handed to.
    pub estimator: String,
    pub schema: ParamSchema,
    pub parsers: HashMap<String, ParseFn>,
    pub fallback: Fallback,
    /// Keyword overrides the training glue always supplies.
    pub overrides: ParamMap,
}

impl AlgorithmSpec {
    pub fn new(name: &str, estimator: &str) -> Self {
        Self {
            name: name.to_string(),
            estimator: estimator.to_string(),
            schema: ParamSchema::new(),
            parsers: HashMap::new(),
            fallback: Fallback::default(),
            overrides: ParamMap::new(),
        }
    }

    pub fn with_schema(mut self, schema: ParamSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_parser(mut self, key: &str, parser: ParseFn) -> Self {
        self.parsers.insert(key.to_string(), parser);
        self
    }

    /// Register [`parse_literal_or_text`] for each key.
    pub fn with_literal_params(mut self, keys: &[&str]) -> Self {
        for key in keys {
            self.parsers.insert(key.to_string(), parse_literal_or_text);
        }
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_override(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.overrides.insert(key, value.into());
        self
    }

    /// Whether a custom parser or a schema entry covers `key`.
    pub fn knows(&self, key: &str) -> bool {
        self.parsers.contains_key(key) || self.schema.contains(key)
    }

    /// Coerce one value: custom parser first, then the schema kind.
    /// Keys known to neither come back unchanged.
    pub fn coerce(
        &self,
        key: &str,
        value: ParamValue,
        diagnostics: &mut Diagnostics,
    ) -> Result<ParamValue> {
        if let Some(parser) = self.parsers.get(key) {
            return parser(value);
        }
        match self.schema.get(key) {
            Some(spec) => spec.kind.coerce(key, value, diagnostics),
            None => Ok(value),
        }
    }

    /// Apply the fallback policy to a key the spec does not know.
    pub fn fallback(&self, value: ParamValue) -> ParamValue {
        match (self.fallback, value) {
            (Fallback::Literal, ParamValue::Str(text)) => match parse_literal(&text) {
                Ok(parsed) => parsed,
                Err(_) => ParamValue::Str(text),
            },
            (_, value) => value,
        }
    }
}

/// Parse text as a literal (`{0: 1, 1: 5}`, `0.1`, `None`), keeping the
/// text when it is not one (`balanced`, `scale`). Typed values pass through.
pub fn parse_literal_or_text(value: ParamValue) -> Result<ParamValue> {
    match value {
        ParamValue::Str(text) => Ok(match parse_literal(&text) {
            Ok(parsed) => parsed,
            Err(_) => ParamValue::Str(text),
        }),
        other => Ok(other),
    }
}

// ============================================================================
// Schema builders
// ============================================================================

fn lightgbm() -> AlgorithmSpec {
    let schema = ParamSchema::new()
        .string("boosting_type", "gbdt")
        .int("num_leaves", 31)
        .int("max_depth", -1)
        .float("learning_rate", 0.1)
        .int("n_estimators", 100)
        .int("subsample_for_bin", 200_000)
        .any("objective")
        .any("class_weight")
        .float("min_split_gain", 0.0)
        .float("min_child_weight", 1e-3)
        .int("min_child_samples", 20)
        .float("subsample", 1.0)
        .int("subsample_freq", 0)
        .float("colsample_bytree", 1.0)
        .float("reg_alpha", 0.0)
        .float("reg_lambda", 0.0)
        .any("random_state")
        .int("n_jobs", -1)
        .string("importance_type", "split");

    AlgorithmSpec::new("lightgbm", "LGBMClassifier")
        .with_schema(schema)
        .with_literal_params(&["class_weight", "random_state"])
}

/// Defaults of the base booster. The classifier's own constructor only
/// forwards `**kwargs`, so its signature carries nothing useful.
fn xgb_model_schema() -> ParamSchema {
    ParamSchema::new()
        .int("max_depth", 6)
        .int("max_leaves", 0)
        .int("max_bin", 256)
        .string("grow_policy", "depthwise")
        .float("learning_rate", 0.3)
        .int("n_estimators", 100)
        .int("verbosity", 1)
        .any("objective")
        .string("booster", "gbtree")
        .string("tree_method", "auto")
        .any("n_jobs")
        .float("gamma", 0.0)
        .float("min_child_weight", 1.0)
        .float("max_delta_step", 0.0)
        .float("subsample", 1.0)
        .string("sampling_method", "uniform")
        .float("colsample_bytree", 1.0)
        .float("colsample_bylevel", 1.0)
        .float("colsample_bynode", 1.0)
        .float("reg_alpha", 0.0)
        .float("reg_lambda", 1.0)
        .float("scale_pos_weight", 1.0)
        .float("base_score", 0.5)
        .int("random_state", 0)
        .float("missing", f64::NAN)
        .int("num_parallel_tree", 1)
        .any("monotone_constraints")
        .any("interaction_constraints")
        .any("importance_type")
        .any("gpu_id")
        .any("validate_parameters")
        .any("predictor")
        .boolean("enable_categorical", false)
        .any("eval_metric")
        .any("early_stopping_rounds")
}

fn xgboost() -> AlgorithmSpec {
    let schema = xgb_model_schema()
        .with_default("objective", "binary:logistic")
        .with_default("use_label_encoder", true);

    AlgorithmSpec::new("xgboost", "XGBClassifier")
        .with_schema(schema)
        .with_literal_params(&[
            "class_weight",
            "n_jobs",
            "eval_metric",
            "early_stopping_rounds",
        ])
        .with_override("use_label_encoder", true)
}

fn logistic_regression_kwonly() -> ParamSchema {
    ParamSchema::new()
        .any("penalty")
        .boolean("dual", false)
        .float("tol", 1e-4)
        .float("C", 1.0)
        .boolean("fit_intercept", true)
        .int("intercept_scaling", 1)
        .any("class_weight")
        .any("random_state")
        .string("solver", "lbfgs")
        .int("max_iter", 100)
        .string("multi_class", "auto")
        .int("verbose", 0)
        .boolean("warm_start", false)
        .any("n_jobs")
        .any("l1_ratio")
}

fn lr() -> AlgorithmSpec {
    let schema = logistic_regression_kwonly().with_default("penalty", "l2");

    AlgorithmSpec::new("lr", "LogisticRegression")
        .with_schema(schema)
        .with_literal_params(&["class_weight", "random_state", "n_jobs", "l1_ratio"])
}

fn svm() -> AlgorithmSpec {
    let schema = ParamSchema::new()
        .float("C", 1.0)
        .string("kernel", "rbf")
        .int("degree", 3)
        .any("gamma")
        .float("coef0", 0.0)
        .boolean("shrinking", true)
        .boolean("probability", false)
        .float("tol", 1e-3)
        .float("cache_size", 200.0)
        .any("class_weight")
        .boolean("verbose", false)
        .int("max_iter", -1)
        .string("decision_function_shape", "ovr")
        .boolean("break_ties", false)
        .any("random_state");

    // gamma is "scale", "auto" or a float
    AlgorithmSpec::new("svm", "SVC")
        .with_schema(schema)
        .with_literal_params(&["gamma", "class_weight", "random_state"])
}

fn flaml() -> AlgorithmSpec {
    AlgorithmSpec::new("flaml", "flaml.AutoML").with_fallback(Fallback::Literal)
}

fn autosklearn() -> AlgorithmSpec {
    AlgorithmSpec::new("autosklearn", "AutoSklearnClassifier").with_fallback(Fallback::Literal)
}

// ============================================================================
// Registry
// ============================================================================

static REGISTRY: Lazy<Vec<AlgorithmSpec>> =
    Lazy::new(|| vec![lightgbm(), xgboost(), lr(), svm(), flaml(), autosklearn()]);

const ALIASES: &[(&str, &str)] = &[
    ("lgbm", "lightgbm"),
    ("xgb", "xgboost"),
    ("logistic_regression", "lr"),
    ("svc", "svm"),
    ("auto-sklearn", "autosklearn"),
];

/// All registered algorithms, in registration order.
pub fn algorithms() -> &'static [AlgorithmSpec] {
    &REGISTRY
}

/// Look up an algorithm by name or alias (case-insensitive).
pub fn algorithm(name: &str) -> Result<AlgorithmSpec> {
    let lowered = name.trim().to_lowercase();
    let canonical = ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(lowered.as_str());

    REGISTRY
        .iter()
        .find(|spec| spec.name == canonical)
        .cloned()
        .ok_or_else(|| ParamError::UnknownAlgorithm {
            name: name.to_string(),
            known: REGISTRY
                .iter()
                .map(|spec| spec.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::schema::ParamKind;

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(algorithm("LightGBM").unwrap().name, "lightgbm");
        assert_eq!(algorithm("xgb").unwrap().name, "xgboost");
        assert_eq!(algorithm(" SVC ").unwrap().name, "svm");
    }

    #[test]
    fn test_unknown_algorithm() {
        let err = algorithm("catboost").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("catboost"));
        assert!(message.contains("lightgbm"));
    }

    #[test]
    fn test_xgboost_forces_objective_and_label_encoder() {
        let spec = algorithm("xgboost").unwrap();
        let objective = spec.schema.get("objective").unwrap();
        assert_eq!(objective.kind, ParamKind::Str);
        assert_eq!(objective.default, ParamValue::from("binary:logistic"));
        assert_eq!(spec.schema.get("use_label_encoder").unwrap().kind, ParamKind::Bool);
        assert_eq!(
            spec.overrides.get("use_label_encoder"),
            Some(&ParamValue::Bool(true))
        );
    }

    #[test]
    fn test_lr_forces_penalty() {
        let spec = algorithm("lr").unwrap();
        assert_eq!(
            spec.schema.get("penalty").unwrap().default,
            ParamValue::from("l2")
        );
    }

    #[test]
    fn test_class_weight_parser() {
        let spec = algorithm("lr").unwrap();
        let mut diagnostics = Diagnostics::default();

        let weights = spec
            .coerce("class_weight", "{0: 1, 1: 5}".into(), &mut diagnostics)
            .unwrap();
        assert_eq!(
            weights,
            ParamValue::Map(vec![
                (ParamValue::Int(0), ParamValue::Int(1)),
                (ParamValue::Int(1), ParamValue::Int(5)),
            ])
        );

        let balanced = spec
            .coerce("class_weight", "balanced".into(), &mut diagnostics)
            .unwrap();
        assert_eq!(balanced, ParamValue::from("balanced"));
    }

    #[test]
    fn test_svm_gamma_accepts_keyword_or_number() {
        let spec = algorithm("svm").unwrap();
        let mut diagnostics = Diagnostics::default();
        assert_eq!(
            spec.coerce("gamma", "0.1".into(), &mut diagnostics).unwrap(),
            ParamValue::Float(0.1)
        );
        assert_eq!(
            spec.coerce("gamma", "scale".into(), &mut diagnostics).unwrap(),
            ParamValue::from("scale")
        );
    }

    #[test]
    fn test_automl_literal_fallback() {
        let spec = algorithm("flaml").unwrap();
        assert!(!spec.knows("time_budget"));
        assert_eq!(spec.fallback("60".into()), ParamValue::Int(60));
        assert_eq!(spec.fallback("'f1'".into()), ParamValue::from("f1"));
        assert_eq!(spec.fallback("f1".into()), ParamValue::from("f1"));

        let classical = algorithm("lightgbm").unwrap();
        assert_eq!(classical.fallback("60".into()), ParamValue::from("60"));
    }
}
