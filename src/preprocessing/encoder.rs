//! Categorical label encoding
//!
//! Codes are positions in the sorted set of distinct values, so the same
//! input set always yields the same assignment regardless of row order.

use crate::error::{Result, RetentionError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Sorted label encoder
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelEncoder {
    /// Distinct values in code order
    classes: Vec<String>,
    mapping: HashMap<String, usize>,
    is_fitted: bool,
}

impl LabelEncoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the encoder to the observed values
    pub fn fit<'a, I>(&mut self, values: I) -> &mut Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        self.classes = distinct.into_iter().map(str::to_string).collect();
        self.mapping = self
            .classes
            .iter()
            .enumerate()
            .map(|(code, class)| (class.clone(), code))
            .collect();
        self.is_fitted = true;
        self
    }

    /// Code for one value
    pub fn transform(&self, value: &str) -> Result<usize> {
        if !self.is_fitted {
            return Err(RetentionError::ModelNotFitted);
        }
        self.mapping
            .get(value)
            .copied()
            .ok_or_else(|| RetentionError::UnknownCategory(value.to_string()))
    }

    /// Value for one code
    pub fn inverse_transform(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, values: &[&str]) -> Result<Vec<usize>> {
        self.fit(values.iter().copied());
        values.iter().map(|v| self.transform(v)).collect()
    }

    /// Distinct values in code order
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }
}
