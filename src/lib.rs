//! tunekit - hyperparameter resolution for ML training backends
//!
//! Turns loosely-typed configuration text into constructor-ready
//! parameters and search grids, plus the glue a training run needs
//! around them.
//!
//! # Architecture
//!
//! ```text
//! param file ─┐
//! "k=v;k=v"  ─┼→ Resolver → input_params  ─┬→ Trainer (fit) → Metrics → Registry
//! overrides  ─┘     ↑       search_params ─┘      ↑
//!               schema registry             k-fold grid search
//! ```
//!
//! # Modules
//!
//! - [`params`]: merge, coerce and validate hyperparameters
//! - [`training`]: grid expansion, cross-validated search, metrics
//! - [`data`]: csv loading and seeded train/test split
//! - [`registry`]: versioned models with production promotion
//! - [`config`]: `tunekit.toml` / `[tool.tunekit]` defaults

pub mod config;
pub mod data;
pub mod params;
pub mod registry;
pub mod training;

// Re-export core types
pub use params::{
    AlgorithmSpec, ParamError, ParamMap, ParamValue, ParamWarning, ParameterResolver,
    ResolvedParameters, algorithm, resolve,
};

pub use config::Config;
pub use data::{DataSplit, Dataset, load_data};
pub use registry::{ModelRegistry, RunRecord, Stage, create_model_version};
pub use training::{ClassificationMetrics, ParameterGrid, Trainer, train_model};
