//! Half-year tenure buckets and attrition rate per bucket
//!
//! Buckets are left-closed `[lo, hi)` except the last, which also includes
//! its upper edge. A bucket's label is its lower edge in years, so binning
//! a bucket's lower edge lands back in the same bucket.

use serde::{Deserialize, Serialize};

use super::builder::FeatureTable;
use crate::config::TENURE_EDGES_DAYS;
use crate::error::{Result, RetentionError};

const DAYS_PER_YEAR: f64 = 365.0;

/// One tenure bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TenureBucket {
    pub index: usize,
    /// Lower edge in years
    pub label: f64,
    pub lower_days: f64,
    pub upper_days: f64,
}

/// Mean attrition within one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRate {
    pub bucket: TenureBucket,
    pub count: usize,
    pub quit_rate: f64,
}

/// Attrition by tenure bucket, ordered by bucket; empty buckets are omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BucketReport {
    pub rates: Vec<BucketRate>,
    /// Records whose tenure fell outside every bucket
    pub n_unbinned: usize,
}

/// Maps tenure in days to a bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenureBinner {
    edges: Vec<f64>,
}

impl Default for TenureBinner {
    fn default() -> Self {
        Self {
            edges: TENURE_EDGES_DAYS.to_vec(),
        }
    }
}

impl TenureBinner {
    /// Edges in days, strictly increasing, at least two
    pub fn new(edges: Vec<f64>) -> Result<Self> {
        if edges.len() < 2 || edges.windows(2).any(|w| !(w[0] < w[1])) {
            return Err(RetentionError::ConfigError(format!(
                "tenure edges must be at least two strictly increasing values, got {:?}",
                edges
            )));
        }
        Ok(Self { edges })
    }

    pub fn n_buckets(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Bucket index for a tenure, `None` outside `[first edge, last edge]`
    pub fn bucket_index(&self, days: f64) -> Option<usize> {
        let first = self.edges[0];
        let last = self.edges[self.edges.len() - 1];
        if !(first..=last).contains(&days) {
            return None;
        }
        if days == last {
            return Some(self.n_buckets() - 1);
        }
        Some(self.edges.partition_point(|&edge| edge <= days) - 1)
    }

    pub fn bucket(&self, index: usize) -> Option<TenureBucket> {
        (index < self.n_buckets()).then(|| TenureBucket {
            index,
            label: self.edges[index] / DAYS_PER_YEAR,
            lower_days: self.edges[index],
            upper_days: self.edges[index + 1],
        })
    }

    /// Bucket for a tenure
    pub fn bin(&self, days: f64) -> Option<TenureBucket> {
        self.bucket_index(days).and_then(|i| self.bucket(i))
    }

    /// Bucket labels for all buckets, in order
    pub fn labels(&self) -> Vec<f64> {
        (0..self.n_buckets())
            .filter_map(|i| self.bucket(i).map(|b| b.label))
            .collect()
    }

    /// Mean quit flag per non-empty bucket
    pub fn attrition_by_bucket(&self, table: &FeatureTable) -> BucketReport {
        let mut counts = vec![0usize; self.n_buckets()];
        let mut quits = vec![0usize; self.n_buckets()];
        let mut n_unbinned = 0;

        for record in &table.records {
            match self.bucket_index(record.tenure_days as f64) {
                Some(i) => {
                    counts[i] += 1;
                    quits[i] += record.quit as usize;
                }
                None => n_unbinned += 1,
            }
        }

        let rates = counts
            .iter()
            .zip(&quits)
            .enumerate()
            .filter(|(_, (&count, _))| count > 0)
            .filter_map(|(i, (&count, &quit))| {
                self.bucket(i).map(|bucket| BucketRate {
                    bucket,
                    count,
                    quit_rate: quit as f64 / count as f64,
                })
            })
            .collect();

        BucketReport { rates, n_unbinned }
    }
}
