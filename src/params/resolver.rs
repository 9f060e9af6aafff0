//! Parameter resolution: merge sources, coerce to the schema, build the
//! search space.
//!
//! ## Precedence
//!
//! ```text
//! param file  →  param string  →  glue overrides  →  caller overrides
//!   (lowest)                                            (highest)
//! ```
//!
//! Each later source overwrites earlier entries with the same key. The
//! merged map is then coerced key by key: custom parser, else schema kind,
//! else the algorithm's fallback policy.
//!
//! The search string shares the `key=value;...` grammar. Each value must be
//! a list literal; every candidate is coerced exactly like a scalar value
//! for the same key.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::algorithms::AlgorithmSpec;
use super::error::{Diagnostics, ParamError, ParamWarning, Result};
use super::literal::parse_literal;
use super::source::{parse_file, parse_param_str};
use super::value::{ParamMap, ParamValue};

/// Constructor-ready parameters plus an optional grid search space.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedParameters {
    pub input_params: ParamMap,
    pub search_params: ParamMap<Vec<ParamValue>>,
    /// Problems recovered from while resolving.
    #[serde(skip)]
    pub warnings: Vec<ParamWarning>,
}

impl ResolvedParameters {
    /// Whether a grid search was requested.
    pub fn has_search(&self) -> bool {
        !self.search_params.is_empty()
    }
}

impl fmt::Display for ResolvedParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input_params: {}\nsearch_params: {}",
            self.input_params, self.search_params
        )
    }
}

/// Builder collecting the raw sources for one resolution.
#[derive(Debug, Clone)]
pub struct ParameterResolver<'a> {
    spec: &'a AlgorithmSpec,
    param_file: Option<PathBuf>,
    params: Option<String>,
    search_params: Option<String>,
    overrides: ParamMap,
}

impl<'a> ParameterResolver<'a> {
    pub fn new(spec: &'a AlgorithmSpec) -> Self {
        Self {
            spec,
            param_file: None,
            params: None,
            search_params: None,
            overrides: ParamMap::new(),
        }
    }

    /// JSON object file with parameters.
    pub fn param_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.param_file = Some(path.into());
        self
    }

    /// `key=value;key=value` parameter string.
    pub fn params(mut self, params: impl Into<String>) -> Self {
        self.params = Some(params.into());
        self
    }

    /// `key=[v1, v2];key=[...]` search string.
    pub fn search_params(mut self, search_params: impl Into<String>) -> Self {
        self.search_params = Some(search_params.into());
        self
    }

    /// Native-typed overrides, applied last.
    pub fn overrides(mut self, overrides: ParamMap) -> Self {
        self.overrides.merge(overrides);
        self
    }

    pub fn set(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.overrides.insert(key, value.into());
        self
    }

    pub fn resolve(&self) -> Result<ResolvedParameters> {
        let mut diagnostics = Diagnostics::default();

        let mut merged = parse_file(self.param_file.as_deref())?;
        merged.merge(parse_param_str(self.params.as_deref(), &mut diagnostics));
        merged.merge(self.spec.overrides.clone());
        merged.merge(self.overrides.clone());

        let input_params = self.check_input_params(merged, &mut diagnostics)?;
        let search_params = self.check_search_params(&mut diagnostics)?;

        let resolved = ResolvedParameters {
            input_params,
            search_params,
            warnings: diagnostics.into_warnings(),
        };
        tracing::debug!(algorithm = %self.spec.name, "params: {}", resolved);
        Ok(resolved)
    }

    fn check_input_params(
        &self,
        merged: ParamMap,
        diagnostics: &mut Diagnostics,
    ) -> Result<ParamMap> {
        merged
            .into_iter()
            .map(|(key, value)| {
                let value = if self.spec.knows(&key) {
                    self.spec.coerce(&key, value, diagnostics)?
                } else {
                    self.spec.fallback(value)
                };
                Ok::<_, ParamError>((key, value))
            })
            .collect()
    }

    fn check_search_params(
        &self,
        diagnostics: &mut Diagnostics,
    ) -> Result<ParamMap<Vec<ParamValue>>> {
        let raw = parse_param_str(self.search_params.as_deref(), diagnostics);
        let mut search = ParamMap::new();

        for (key, value) in raw {
            let text = value.to_text();
            let candidates = match parse_literal(&text) {
                Ok(ParamValue::List(items)) => items,
                Ok(other) => {
                    diagnostics.warn(ParamWarning::SearchLiteral {
                        key,
                        value: text,
                        reason: format!("found {}", other.kind_name()),
                    });
                    continue;
                }
                Err(e) => {
                    diagnostics.warn(ParamWarning::SearchLiteral {
                        key,
                        value: text,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let coerced = candidates
                .into_iter()
                .map(|candidate| self.spec.coerce(&key, candidate, diagnostics))
                .collect::<Result<Vec<_>>>()?;
            search.insert(key, coerced);
        }

        Ok(search)
    }
}

/// Resolve parameters for `spec` from the three raw sources.
pub fn resolve(
    spec: &AlgorithmSpec,
    param_file: Option<&Path>,
    params: Option<&str>,
    search_params: Option<&str>,
    overrides: ParamMap,
) -> Result<ResolvedParameters> {
    let mut resolver = ParameterResolver::new(spec).overrides(overrides);
    if let Some(path) = param_file {
        resolver = resolver.param_file(path);
    }
    if let Some(params) = params {
        resolver = resolver.params(params);
    }
    if let Some(search_params) = search_params {
        resolver = resolver.search_params(search_params);
    }
    resolver.resolve()
}
