//! Training glue around external estimators.
//!
//! Fitting is delegated through the [`Trainer`] seam. This module owns
//! everything around it:
//! 1. Expanding a resolved search space into candidates
//! 2. K-fold cross-validation and best-candidate refit
//! 3. Classification metrics for the fitted model
//!
//! ## Usage
//!
//! ```bash
//! # Resolve parameters and inspect the grid before training
//! tunekit grid --algorithm lightgbm --params "learning_rate=0.05" \
//!     --search-params "num_leaves=[15, 31, 63];max_depth=[4, 8]"
//!
//! # Score predictions written by a backend
//! tunekit metrics --predictions preds.csv --pred-column prediction
//! ```

pub mod gridsearch;
pub mod metrics;

pub use gridsearch::{
    CandidateScore, DEFAULT_FOLDS, ParameterGrid, TrainOutcome, Trainer, kfold_splits,
    train_model,
};
pub use metrics::{
    ClassReport, ClassificationMetrics, classification_report, eval_classification_metrics,
};
