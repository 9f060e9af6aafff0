//! Exhaustive grid search over a resolved search space.
//!
//! ## Grid Layout
//!
//! A search space `{a: [1, 2], b: [x, y, z]}` has 2 × 3 = 6 points. Points
//! are numbered in mixed radix with the first key varying slowest:
//!
//! ```text
//! 0: a=1 b=x   1: a=1 b=y   2: a=1 b=z
//! 3: a=2 b=x   4: a=2 b=y   5: a=2 b=z
//! ```
//!
//! Each point is overlaid on the resolved `input_params` to form a
//! candidate. Fitting is delegated to a [`Trainer`]; candidates are scored
//! by k-fold cross-validation and the best mean score is refit on the full
//! training set.

use anyhow::{Result, bail};
use serde::Serialize;

use crate::data::Dataset;
use crate::params::{ParamError, ParamMap, ParamValue, ResolvedParameters};

/// Default number of cross-validation folds.
pub const DEFAULT_FOLDS: usize = 5;

/// Cartesian product of per-parameter candidate lists.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    dims: Vec<(String, Vec<ParamValue>)>,
}

impl ParameterGrid {
    /// Build a grid. Every parameter needs at least one candidate.
    pub fn new(search: &ParamMap<Vec<ParamValue>>) -> Result<Self, ParamError> {
        let mut dims = Vec::with_capacity(search.len());
        for (key, values) in search.iter() {
            if values.is_empty() {
                return Err(ParamError::EmptySearchList {
                    key: key.to_string(),
                });
            }
            dims.push((key.to_string(), values.clone()));
        }
        Ok(Self { dims })
    }

    /// Number of points (1 for an empty search space).
    pub fn len(&self) -> usize {
        self.dims.iter().map(|(_, values)| values.len()).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parameter names, in grid order.
    pub fn param_names(&self) -> Vec<&str> {
        self.dims.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Decode a linear index into one point of the grid.
    pub fn point(&self, index: usize) -> Option<ParamMap> {
        if index >= self.len() {
            return None;
        }

        let mut remaining = index;
        let mut picks = Vec::with_capacity(self.dims.len());
        for (name, values) in self.dims.iter().rev() {
            let dim_idx = remaining % values.len();
            remaining /= values.len();
            picks.push((name.clone(), values[dim_idx].clone()));
        }
        picks.reverse();
        Some(picks.into_iter().collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = ParamMap> + '_ {
        (0..self.len()).filter_map(|index| self.point(index))
    }

    /// Every point overlaid on `base`.
    pub fn candidates(&self, base: &ParamMap) -> Vec<ParamMap> {
        self.iter()
            .map(|point| {
                let mut candidate = base.clone();
                candidate.merge(point);
                candidate
            })
            .collect()
    }
}

/// Seam to an external training backend.
pub trait Trainer {
    type Model;

    /// Construct an estimator with `params` and fit it.
    fn fit(&self, params: &ParamMap, train: &Dataset) -> Result<Self::Model>;

    /// Score a fitted model; higher is better.
    fn score(&self, model: &Self::Model, valid: &Dataset) -> Result<f64>;
}

/// Cross-validation result for one candidate.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateScore {
    pub params: ParamMap,
    pub mean_score: f64,
    pub fold_scores: Vec<f64>,
}

#[derive(Debug)]
pub struct TrainOutcome<M> {
    pub model: M,
    pub best_params: ParamMap,
    /// Empty when no search was requested.
    pub cv_results: Vec<CandidateScore>,
}

/// Contiguous k-fold splits as `(train, valid)` index lists. The first
/// `n % k` folds take one extra sample.
pub fn kfold_splits(n_samples: usize, folds: usize) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if folds < 2 {
        bail!("cross-validation needs at least 2 folds, got {}", folds);
    }
    if n_samples < folds {
        bail!("cannot split {} samples into {} folds", n_samples, folds);
    }

    let base = n_samples / folds;
    let extra = n_samples % folds;
    let mut splits = Vec::with_capacity(folds);
    let mut start = 0;
    for fold in 0..folds {
        let size = base + usize::from(fold < extra);
        let end = start + size;
        let valid: Vec<usize> = (start..end).collect();
        let train: Vec<usize> = (0..start).chain(end..n_samples).collect();
        splits.push((train, valid));
        start = end;
    }
    Ok(splits)
}

/// Train directly, or grid-search the resolved space and refit the winner.
pub fn train_model<T: Trainer>(
    trainer: &T,
    params: &ResolvedParameters,
    train: &Dataset,
    folds: usize,
) -> Result<TrainOutcome<T::Model>> {
    if !params.has_search() {
        let model = trainer.fit(&params.input_params, train)?;
        return Ok(TrainOutcome {
            model,
            best_params: params.input_params.clone(),
            cv_results: Vec::new(),
        });
    }

    let grid = ParameterGrid::new(&params.search_params)?;
    let splits = kfold_splits(train.len(), folds)?;
    tracing::info!(
        "grid search: {} candidates x {} folds",
        grid.len(),
        splits.len()
    );

    let mut cv_results = Vec::with_capacity(grid.len());
    for candidate in grid.candidates(&params.input_params) {
        let mut fold_scores = Vec::with_capacity(splits.len());
        for (train_idx, valid_idx) in &splits {
            let model = trainer.fit(&candidate, &train.subset(train_idx))?;
            fold_scores.push(trainer.score(&model, &train.subset(valid_idx))?);
        }
        let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
        tracing::info!("{} {:.6}", candidate, mean_score);
        cv_results.push(CandidateScore {
            params: candidate,
            mean_score,
            fold_scores,
        });
    }

    // First candidate wins ties
    let mut best = 0;
    for (i, result) in cv_results.iter().enumerate() {
        if result.mean_score > cv_results[best].mean_score {
            best = i;
        }
    }
    let best_params = cv_results[best].params.clone();
    let model = trainer.fit(&best_params, train)?;

    Ok(TrainOutcome {
        model,
        best_params,
        cv_results,
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::params::{ParameterResolver, algorithm};

    fn search(entries: &[(&str, Vec<ParamValue>)]) -> ParamMap<Vec<ParamValue>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn ints(values: &[i64]) -> Vec<ParamValue> {
        values.iter().copied().map(ParamValue::Int).collect()
    }

    #[test]
    fn test_grid_len_is_product() {
        let grid = ParameterGrid::new(&search(&[
            ("a", ints(&[1, 2])),
            ("b", ints(&[10, 20, 30])),
        ]))
        .unwrap();
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.param_names(), vec!["a", "b"]);
    }

    #[test]
    fn test_grid_order_first_key_slowest() {
        let grid = ParameterGrid::new(&search(&[
            ("a", ints(&[1, 2])),
            ("b", ints(&[10, 20, 30])),
        ]))
        .unwrap();
        let points: Vec<_> = grid.iter().collect();

        assert_eq!(points[0].get("a"), Some(&ParamValue::Int(1)));
        assert_eq!(points[0].get("b"), Some(&ParamValue::Int(10)));
        assert_eq!(points[2].get("b"), Some(&ParamValue::Int(30)));
        assert_eq!(points[3].get("a"), Some(&ParamValue::Int(2)));
        assert_eq!(points[3].get("b"), Some(&ParamValue::Int(10)));
        assert!(grid.point(6).is_none());
    }

    #[test]
    fn test_empty_search_space_has_one_point() {
        let grid = ParameterGrid::new(&ParamMap::new()).unwrap();
        assert_eq!(grid.len(), 1);
        let mut base = ParamMap::new();
        base.insert("a", ParamValue::Int(1));
        assert_eq!(grid.candidates(&base), vec![base]);
    }

    #[test]
    fn test_empty_candidate_list_rejected() {
        let err = ParameterGrid::new(&search(&[("a", Vec::new())])).unwrap_err();
        assert!(matches!(err, ParamError::EmptySearchList { .. }));
    }

    #[test]
    fn test_candidates_overlay_base() {
        let grid = ParameterGrid::new(&search(&[("depth", ints(&[3, 5]))])).unwrap();
        let mut base = ParamMap::new();
        base.insert("depth", ParamValue::Int(1));
        base.insert("rate", ParamValue::Float(0.1));

        let candidates = grid.candidates(&base);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].get("depth"), Some(&ParamValue::Int(5)));
        assert_eq!(candidates[1].get("rate"), Some(&ParamValue::Float(0.1)));
    }

    #[test]
    fn test_kfold_splits_cover_all_samples() {
        let splits = kfold_splits(7, 3).unwrap();
        let sizes: Vec<_> = splits.iter().map(|(_, valid)| valid.len()).collect();
        assert_eq!(sizes, vec![3, 2, 2]);
        for (train, valid) in &splits {
            assert_eq!(train.len() + valid.len(), 7);
            assert!(valid.iter().all(|i| !train.contains(i)));
        }
        assert!(kfold_splits(2, 3).is_err());
        assert!(kfold_splits(10, 1).is_err());
    }

    /// Predicts one fixed label; scores closer to `target` depth better.
    struct DepthTrainer {
        target: i64,
        fits: Cell<usize>,
    }

    impl Trainer for DepthTrainer {
        type Model = i64;

        fn fit(&self, params: &ParamMap, _train: &Dataset) -> Result<i64> {
            self.fits.set(self.fits.get() + 1);
            match params.get("max_depth") {
                Some(ParamValue::Int(depth)) => Ok(*depth),
                other => bail!("max_depth missing or untyped: {:?}", other),
            }
        }

        fn score(&self, model: &i64, _valid: &Dataset) -> Result<f64> {
            Ok(-((model - self.target).abs() as f64))
        }
    }

    fn dataset(n: usize) -> Dataset {
        Dataset {
            feature_names: vec!["x".to_string()],
            rows: (0..n).map(|i| vec![i.to_string()]).collect(),
            labels: (0..n).map(|i| (i % 2).to_string()).collect(),
        }
    }

    #[test]
    fn test_train_model_picks_best_candidate() {
        let spec = algorithm("lightgbm").unwrap();
        let resolved = ParameterResolver::new(&spec)
            .params("max_depth=3")
            .search_params("max_depth=[2, 4, 6]")
            .resolve()
            .unwrap();
        let trainer = DepthTrainer {
            target: 5,
            fits: Cell::new(0),
        };

        let outcome = train_model(&trainer, &resolved, &dataset(10), 5).unwrap();
        // 4 and 6 tie; the first one wins
        assert_eq!(outcome.model, 4);
        assert_eq!(outcome.best_params.get("max_depth"), Some(&ParamValue::Int(4)));
        assert_eq!(outcome.cv_results.len(), 3);
        // 3 candidates x 5 folds + refit
        assert_eq!(trainer.fits.get(), 16);
    }

    #[test]
    fn test_train_model_without_search_fits_once() {
        let spec = algorithm("lightgbm").unwrap();
        let resolved = ParameterResolver::new(&spec)
            .params("max_depth=7")
            .resolve()
            .unwrap();
        let trainer = DepthTrainer {
            target: 0,
            fits: Cell::new(0),
        };

        let outcome = train_model(&trainer, &resolved, &dataset(3), DEFAULT_FOLDS).unwrap();
        assert_eq!(outcome.model, 7);
        assert!(outcome.cv_results.is_empty());
        assert_eq!(trainer.fits.get(), 1);
    }
}
