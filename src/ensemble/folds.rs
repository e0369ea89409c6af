use std::ops::Range;

use serde::Serialize;

use crate::error::{ForecastError, Result};

/// One contiguous hold-out block; every other row trains.
///
/// Folds are sequential blocks but any fold may be held out, so later rows
/// routinely train a model that is scored on earlier rows. This is plain
/// K-fold, not a forward-chaining split, and carries look-ahead leakage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fold {
    pub index: usize,
    pub validation: Range<usize>,
    pub total: usize,
}

impl Fold {
    pub fn validation_indices(&self) -> Vec<usize> {
        self.validation.clone().collect()
    }

    pub fn train_indices(&self) -> Vec<usize> {
        (0..self.validation.start)
            .chain(self.validation.end..self.total)
            .collect()
    }

    pub fn validation_rows(&self) -> usize {
        self.validation.len()
    }

    pub fn train_rows(&self) -> usize {
        self.total - self.validation.len()
    }
}

/// `k` non-shuffled folds of `n / k` rows; the last fold absorbs the remainder.
pub fn contiguous_folds(n: usize, k: usize) -> Result<Vec<Fold>> {
    if k == 0 || n / k == 0 {
        return Err(ForecastError::DegenerateFold {
            fold: 0,
            train_rows: n,
            validation_rows: 0,
        });
    }
    let size = n / k;
    let folds: Vec<Fold> = (0..k)
        .map(|index| {
            let start = index * size;
            let end = if index + 1 == k { n } else { start + size };
            Fold {
                index,
                validation: start..end,
                total: n,
            }
        })
        .collect();
    for fold in &folds {
        if fold.train_rows() == 0 || fold.validation_rows() == 0 {
            return Err(ForecastError::DegenerateFold {
                fold: fold.index,
                train_rows: fold.train_rows(),
                validation_rows: fold.validation_rows(),
            });
        }
    }
    Ok(folds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_indices_exclude_validation_block() {
        let folds = contiguous_folds(10, 3).unwrap();
        assert_eq!(folds[1].validation, 3..6);
        assert_eq!(folds[1].train_indices(), vec![0, 1, 2, 6, 7, 8, 9]);
        assert_eq!(folds[2].validation, 6..10);
    }

    #[test]
    fn single_fold_has_no_training_rows() {
        let err = contiguous_folds(10, 1).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::DegenerateFold {
                train_rows: 0,
                ..
            }
        ));
    }
}
