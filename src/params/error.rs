//! Failures and recoverable warnings raised while resolving parameters.
//!
//! Errors abort resolution. Warnings are logged and collected on the
//! result; the offending entry is dropped or defaulted and resolution
//! carries on.

use std::path::PathBuf;

use thiserror::Error;

use super::schema::ParamKind;

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("failed to load parameter file {}: {reason}", .path.display())]
    ParamFile { path: PathBuf, reason: String },

    #[error("constructor signature has {names} named parameters but {defaults} default values")]
    SignatureMismatch { names: usize, defaults: usize },

    #[error("unknown algorithm '{name}', expected one of: {known}")]
    UnknownAlgorithm { name: String, known: String },

    #[error("cannot coerce {key}={value} to {kind}")]
    UncoercibleValue {
        key: String,
        value: String,
        kind: ParamKind,
    },

    #[error("search space for '{key}' has no candidates")]
    EmptySearchList { key: String },
}

pub type Result<T> = std::result::Result<T, ParamError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamWarning {
    #[error("'{entry}' is not a key=value pair, ignored")]
    MalformedEntry { entry: String },

    #[error("search values for '{key}' must be a list literal, got '{value}' ({reason}), dropped")]
    SearchLiteral {
        key: String,
        value: String,
        reason: String,
    },

    #[error("'{value}' for boolean parameter '{key}' is neither true nor false, set to false")]
    BooleanCoercion { key: String, value: String },
}

/// Warning sink for a single resolution.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<ParamWarning>,
}

impl Diagnostics {
    pub fn warn(&mut self, warning: ParamWarning) {
        tracing::warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ParamWarning] {
        &self.warnings
    }

    pub fn into_warnings(self) -> Vec<ParamWarning> {
        self.warnings
    }
}
