use std::f64::consts::PI;
use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// Largest supported angle bin count. Edges are built up front, so the count bounds memory.
pub const MAX_BINS: u32 = 1024;

/// Edges for the extension flags: `0.0` lands in bucket 0, `1.0` in bucket 1.
pub const FLAG_EDGES: [f64; 3] = [0.0, 0.5, 1.0];

/// How the trailing finger-flag positions are bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlagSchedule {
    /// Fixed two-bucket schedule, independent of the angle bin count.
    #[default]
    Binary,
    /// Reuse the angle edges over `[0, π]`.
    AngleRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuantizedVector(Vec<u32>);

impl QuantizedVector {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u32>> for QuantizedVector {
    fn from(buckets: Vec<u32>) -> Self {
        Self(buckets)
    }
}

impl FromIterator<u32> for QuantizedVector {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone)]
pub struct Quantizer {
    angle_edges: Vec<f64>,
    flag_schedule: FlagSchedule,
}

impl Quantizer {
    pub fn new(num_bins: NonZeroU32, flag_schedule: FlagSchedule) -> Self {
        Self {
            angle_edges: angle_edges(num_bins),
            flag_schedule,
        }
    }

    pub fn num_bins(&self) -> usize {
        self.angle_edges.len() - 1
    }

    pub fn angle_edges(&self) -> &[f64] {
        &self.angle_edges
    }

    pub fn flag_edges(&self) -> &[f64] {
        match self.flag_schedule {
            FlagSchedule::Binary => &FLAG_EDGES,
            FlagSchedule::AngleRange => &self.angle_edges,
        }
    }

    pub fn quantize(&self, features: &FeatureVector) -> QuantizedVector {
        let angle_count = features.table().angle_count();
        features
            .values()
            .iter()
            .enumerate()
            .map(|(i, &value)| {
                let edges = if i < angle_count {
                    self.angle_edges()
                } else {
                    self.flag_edges()
                };
                bucket(value, edges)
            })
            .collect()
    }
}

/// `num_bins + 1` evenly spaced edges over `[0, π]`.
pub fn angle_edges(num_bins: NonZeroU32) -> Vec<f64> {
    let n = num_bins.get();
    let mut edges: Vec<f64> = (0..=n).map(|i| PI * f64::from(i) / f64::from(n)).collect();
    // pin the last edge so π itself is never past the range through rounding
    edges[n as usize] = PI;
    edges
}

/// Bucket index of `value`: the position of the first edge strictly greater than it,
/// minus one, clamped into `[0, edges.len() - 2]`.
///
/// A value sitting exactly on an edge belongs to the bucket that edge opens; values
/// at or beyond the last edge fall into the last bucket, values below the first edge
/// into bucket 0.
pub fn bucket(value: f64, edges: &[f64]) -> u32 {
    let last = edges.len().saturating_sub(2);
    let above = edges.iter().position(|&edge| edge > value).unwrap_or(edges.len());
    above.saturating_sub(1).min(last) as u32
}
