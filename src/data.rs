//! Tabular data loading.
//!
//! Two layouts are accepted:
//! - a directory holding `train.csv` and `test.csv`
//! - a single `.csv` file, shuffled with a seeded RNG and split in two
//!
//! Values are kept as text; backends decide how to read features.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail, ensure};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

pub const PATH_ERROR_MESSAGE: &str =
    "data path must be a csv file or a directory containing train.csv and test.csv";

pub const DEFAULT_TEST_SIZE: f64 = 0.25;

/// Feature rows plus their labels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Rows at `indices`, in that order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
        }
    }

    /// `(label, count)` pairs sorted by label.
    pub fn label_counts(&self) -> Vec<(String, usize)> {
        let mut counts = std::collections::BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.as_str()).or_insert(0usize) += 1;
        }
        counts
            .into_iter()
            .map(|(label, n)| (label.to_string(), n))
            .collect()
    }
}

/// Train and test partitions.
#[derive(Debug, Clone)]
pub struct DataSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Load a csv file, separating `label_column` from the features.
pub fn load_csv_data(path: &Path, label_column: &str) -> Result<Dataset> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let Some(label_idx) = headers.iter().position(|h| h.trim() == label_column) else {
        bail!(
            "label column '{}' not found in {} (columns: {})",
            label_column,
            path.display(),
            headers.iter().collect::<Vec<_>>().join(", ")
        );
    };

    let feature_names = headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != label_idx)
        .map(|(_, h)| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("Failed to parse record {} of {}", line + 1, path.display()))?;
        let mut row = Vec::with_capacity(record.len().saturating_sub(1));
        for (i, field) in record.iter().enumerate() {
            if i == label_idx {
                labels.push(field.to_string());
            } else {
                row.push(field.to_string());
            }
        }
        rows.push(row);
    }

    tracing::debug!("loaded {} rows from {}", labels.len(), path.display());
    Ok(Dataset {
        feature_names,
        rows,
        labels,
    })
}

/// Seeded shuffle-and-split. The test partition takes
/// `ceil(test_size * n)` rows.
pub fn train_test_split(data: &Dataset, test_size: f64, random_state: u64) -> Result<DataSplit> {
    ensure!(
        test_size > 0.0 && test_size < 1.0,
        "test_size must be in (0, 1), got {}",
        test_size
    );

    let n = data.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    ensure!(
        n_test > 0 && n_test < n,
        "cannot split {} rows with test_size {}",
        n,
        test_size
    );

    let mut permutation: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(random_state);
    permutation.shuffle(&mut rng);

    let (test_idx, train_idx) = permutation.split_at(n_test);
    Ok(DataSplit {
        train: data.subset(train_idx),
        test: data.subset(test_idx),
    })
}

pub fn load_split_csv_data(
    path: &Path,
    label_column: &str,
    test_size: f64,
    random_state: u64,
) -> Result<DataSplit> {
    let data = load_csv_data(path, label_column)?;
    train_test_split(&data, test_size, random_state)
}

/// Load train/test data from a directory or a single csv file.
pub fn load_data(
    path: &Path,
    label_column: &str,
    test_size: f64,
    random_state: u64,
) -> Result<DataSplit> {
    if path.is_dir() {
        let train_path = path.join("train.csv");
        let test_path = path.join("test.csv");
        ensure!(train_path.exists() && test_path.exists(), PATH_ERROR_MESSAGE);

        tracing::info!("load train data from {}", train_path.display());
        tracing::info!("load test data from {}", test_path.display());
        let train = load_csv_data(&train_path, label_column)?;
        let test = load_csv_data(&test_path, label_column)?;
        ensure!(
            train.feature_names == test.feature_names,
            "train.csv and test.csv have different columns"
        );
        return Ok(DataSplit { train, test });
    }

    if path.extension().is_some_and(|ext| ext == "csv") {
        tracing::info!("load data from {}", path.display());
        tracing::info!("split data to train set and test set");
        return load_split_csv_data(path, label_column, test_size, random_state);
    }

    bail!(PATH_ERROR_MESSAGE)
}

/// Read named columns from a csv file, e.g. true and predicted labels.
pub fn load_columns(path: &Path, columns: &[&str]) -> Result<Vec<Vec<String>>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let headers = reader.headers()?.clone();

    let mut indices = Vec::with_capacity(columns.len());
    for column in columns {
        let Some(idx) = headers.iter().position(|h| h.trim() == *column) else {
            bail!("column '{}' not found in {}", column, path.display());
        };
        indices.push(idx);
    }

    let mut out = vec![Vec::new(); columns.len()];
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to parse {}", path.display()))?;
        for (col, &idx) in indices.iter().enumerate() {
            out[col].push(record.get(idx).unwrap_or_default().to_string());
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const CSV: &str = "a,label,b\n1,x,2\n3,y,4\n5,x,6\n7,y,8\n9,x,10\n";

    fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_csv_separates_label() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "data.csv", CSV);

        let data = load_csv_data(&path, "label").unwrap();
        assert_eq!(data.feature_names, vec!["a", "b"]);
        assert_eq!(data.rows[1], vec!["3", "4"]);
        assert_eq!(data.labels, vec!["x", "y", "x", "y", "x"]);
        assert_eq!(data.label_counts(), vec![("x".to_string(), 3), ("y".to_string(), 2)]);
    }

    #[test]
    fn test_missing_label_column_errors() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "data.csv", CSV);
        let err = load_csv_data(&path, "target").unwrap_err();
        assert!(err.to_string().contains("target"));
    }

    #[test]
    fn test_split_is_seeded_and_disjoint() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "data.csv", CSV);

        let first = load_data(&path, "label", 0.25, 7).unwrap();
        let second = load_data(&path, "label", 0.25, 7).unwrap();
        // ceil(0.25 * 5) = 2
        assert_eq!(first.test.len(), 2);
        assert_eq!(first.train.len(), 3);
        assert_eq!(first.test, second.test);

        let mut all: Vec<_> = first
            .train
            .rows
            .iter()
            .chain(first.test.rows.iter())
            .map(|row| row[0].clone())
            .collect();
        all.sort();
        assert_eq!(all, vec!["1", "3", "5", "7", "9"]);
    }

    #[test]
    fn test_directory_layout() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "train.csv", CSV);
        write(dir.path(), "test.csv", "a,label,b\n0,y,0\n");

        let split = load_data(dir.path(), "label", DEFAULT_TEST_SIZE, 1).unwrap();
        assert_eq!(split.train.len(), 5);
        assert_eq!(split.test.labels, vec!["y"]);
    }

    #[test]
    fn test_directory_without_test_csv_errors() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "train.csv", CSV);
        let err = load_data(dir.path(), "label", DEFAULT_TEST_SIZE, 1).unwrap_err();
        assert_eq!(err.to_string(), PATH_ERROR_MESSAGE);
    }

    #[test]
    fn test_other_paths_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "data.json", "{}");
        assert!(load_data(&path, "label", DEFAULT_TEST_SIZE, 1).is_err());
    }

    #[test]
    fn test_bad_test_size_rejected() {
        let data = Dataset {
            feature_names: vec![],
            rows: vec![vec![]; 4],
            labels: vec!["a".to_string(); 4],
        };
        assert!(train_test_split(&data, 0.0, 1).is_err());
        assert!(train_test_split(&data, 1.0, 1).is_err());
    }

    #[test]
    fn test_load_columns() {
        let dir = TempDir::new().unwrap();
        let path = write(dir.path(), "pred.csv", "label,pred\nx,x\ny,x\n");
        let cols = load_columns(&path, &["label", "pred"]).unwrap();
        assert_eq!(cols[0], vec!["x", "y"]);
        assert_eq!(cols[1], vec!["x", "x"]);
        assert!(load_columns(&path, &["missing"]).is_err());
    }
}
