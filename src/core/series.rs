//! Evenly spaced univariate series and its training/validation partition.

use crate::error::{ForecastError, Result};

/// An ordered, finite, evenly spaced sequence of observations.
///
/// A `Series` is immutable once constructed; every transform in this crate
/// returns a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    values: Vec<f64>,
}

impl Series {
    /// Create a series, rejecting empty input and non-finite values.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        if values.is_empty() {
            return Err(ForecastError::EmptyData);
        }
        if let Some(index) = values.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::NonFiniteValue { index });
        }
        Ok(Self { values })
    }

    /// Create a series from a slice.
    pub fn from_slice(values: &[f64]) -> Result<Self> {
        Self::new(values.to_vec())
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; a series holds at least one value.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observations in time order.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Last observation.
    pub fn last(&self) -> f64 {
        self.values[self.values.len() - 1]
    }

    /// Smallest observation.
    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Contiguous sub-series `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<Series> {
        if start >= end || end > self.values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "slice [{start}, {end}) is out of range for series of length {}",
                self.values.len()
            )));
        }
        Ok(Series {
            values: self.values[start..end].to_vec(),
        })
    }

    /// Map every value through `f`, failing if the result is not finite.
    pub fn map<F>(&self, f: F) -> Result<Series>
    where
        F: Fn(f64) -> f64,
    {
        Series::new(self.values.iter().map(|&x| f(x)).collect())
    }

    /// Check that every observation is strictly positive.
    pub fn ensure_positive(&self) -> Result<()> {
        match self.values.iter().position(|&x| x <= 0.0) {
            Some(i) => Err(ForecastError::Domain(format!(
                "value {} at index {i} is not strictly positive",
                self.values[i]
            ))),
            None => Ok(()),
        }
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }
}

impl AsRef<[f64]> for Series {
    fn as_ref(&self) -> &[f64] {
        &self.values
    }
}

/// Training, validation and combined slices of one parent series.
///
/// `training` ends strictly before `validation` begins; `combined` is their
/// concatenation. A prefix of the parent may be discarded.
#[derive(Debug, Clone)]
pub struct Partition {
    training: Series,
    validation: Option<Series>,
    combined: Series,
    discarded: usize,
}

impl Partition {
    /// Split `parent` after dropping `discard` leading observations.
    ///
    /// `validation_len` may be zero, in which case `combined` equals `training`.
    pub fn new(
        parent: &Series,
        discard: usize,
        training_len: usize,
        validation_len: usize,
    ) -> Result<Self> {
        if training_len == 0 {
            return Err(ForecastError::InvalidParameter(
                "training slice must not be empty".to_string(),
            ));
        }
        let needed = discard + training_len + validation_len;
        if parent.len() < needed {
            return Err(ForecastError::InsufficientData {
                needed,
                got: parent.len(),
            });
        }

        let train_end = discard + training_len;
        let training = parent.slice(discard, train_end)?;
        let validation = if validation_len > 0 {
            Some(parent.slice(train_end, train_end + validation_len)?)
        } else {
            None
        };
        let combined = parent.slice(discard, train_end + validation_len)?;

        Ok(Self {
            training,
            validation,
            combined,
            discarded: discard,
        })
    }

    /// Use the whole series for training, with no validation slice.
    pub fn training_only(series: Series) -> Self {
        Self {
            combined: series.clone(),
            training: series,
            validation: None,
            discarded: 0,
        }
    }

    pub fn training(&self) -> &Series {
        &self.training
    }

    pub fn validation(&self) -> Option<&Series> {
        self.validation.as_ref()
    }

    pub fn combined(&self) -> &Series {
        &self.combined
    }

    /// Number of leading parent observations that were dropped.
    pub fn discarded(&self) -> usize {
        self.discarded
    }
}
