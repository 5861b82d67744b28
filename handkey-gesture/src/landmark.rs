use anyhow::{bail, Result};
use ndarray::{arr1, Array1};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Landmarks reported per detected hand.
pub const LANDMARK_COUNT: usize = 21;

pub const WRIST: usize = 0;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_PIP: usize = 6;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_TIP: usize = 12;
pub const RING_PIP: usize = 14;
pub const RING_TIP: usize = 16;
pub const PINKY_PIP: usize = 18;
pub const PINKY_TIP: usize = 20;

/// One tracked hand point. x and y are normalized to the frame, z is relative depth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Landmark {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn vector(&self) -> Array1<f64> {
        arr1(&[self.x, self.y, self.z])
    }

    pub fn distance(&self, other: &Landmark) -> f64 {
        let d = &self.vector() - &other.vector();
        d.dot(&d).sqrt()
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A complete hand: exactly [`LANDMARK_COUNT`] points in detector order, index 0 is the wrist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Landmark>", into = "Vec<Landmark>")]
pub struct LandmarkSet {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkSet {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Result<Self> {
        if let Some(idx) = points.iter().position(|p| !p.is_finite()) {
            bail!("landmark {idx} has non-finite coordinates");
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    pub fn wrist(&self) -> Landmark {
        self.points[WRIST]
    }

    /// Re-express every point relative to the wrist, scaled so the farthest point is at distance 1.
    pub fn normalized(&self) -> Self {
        let wrist = self.wrist();
        let spread = self
            .points
            .iter()
            .map(|p| p.distance(&wrist))
            .fold(0.0_f64, f64::max);
        let scale = if spread == 0.0 { 1.0 } else { spread };

        Self {
            points: self.points.map(|p| {
                Landmark::new(
                    (p.x - wrist.x) / scale,
                    (p.y - wrist.y) / scale,
                    (p.z - wrist.z) / scale,
                )
            }),
        }
    }

    /// Flip horizontally, turning a camera view into the mirrored view (and back).
    pub fn mirrored(&self) -> Self {
        Self {
            points: self.points.map(|p| Landmark::new(1.0 - p.x, p.y, p.z)),
        }
    }
}

impl Index<usize> for LandmarkSet {
    type Output = Landmark;

    fn index(&self, idx: usize) -> &Landmark {
        &self.points[idx]
    }
}

impl TryFrom<Vec<Landmark>> for LandmarkSet {
    type Error = anyhow::Error;

    fn try_from(points: Vec<Landmark>) -> Result<Self> {
        let len = points.len();
        match <[Landmark; LANDMARK_COUNT]>::try_from(points) {
            Ok(points) => Self::new(points),
            Err(_) => bail!("expected {LANDMARK_COUNT} landmarks, got {len}"),
        }
    }
}

impl TryFrom<&[Landmark]> for LandmarkSet {
    type Error = anyhow::Error;

    fn try_from(points: &[Landmark]) -> Result<Self> {
        Self::try_from(points.to_vec())
    }
}

impl From<LandmarkSet> for Vec<Landmark> {
    fn from(set: LandmarkSet) -> Self {
        set.points.to_vec()
    }
}
