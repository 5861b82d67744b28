//! Landmark → feature vector extraction.
//!
//! A feature vector is a fixed, ordered list of joint angles (radians, in `[0, π]`)
//! followed by one extension flag per finger (`0.0` or `1.0`). Angles between joint
//! segments do not change when the hand moves or changes size in frame, so no
//! explicit normalization pass is needed before extraction.
//!
//! The table and its ordering are part of every stored credential: changing either
//! invalidates all enrolled gestures.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::landmark::{self, Landmark, LandmarkSet, LANDMARK_COUNT};

/// Extension flags appended after the angle terms, thumb first.
pub const FINGER_COUNT: usize = 5;

/// `(base, mid, tip)` landmark indices; the angle is measured at `mid`.
pub type JointTriple = (usize, usize, usize);

const FULL_TRIPLES: [JointTriple; 8] = [
    (1, 2, 4),
    (5, 6, 8),
    (9, 10, 12),
    (13, 14, 16),
    (17, 18, 20),
    // palm width: wrist, index knuckle, pinky knuckle
    (0, 5, 17),
    (5, 9, 13),
    (9, 13, 17),
];

const FINGER_TRIPLES: [JointTriple; 5] = [
    (1, 2, 3),
    (5, 6, 7),
    (9, 10, 11),
    (13, 14, 15),
    (17, 18, 19),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JointTable {
    /// Finger spans plus palm shape: 8 angles, 13 features.
    #[default]
    Full,
    /// One angle per finger: 5 angles, 10 features.
    Fingers,
}

impl JointTable {
    pub fn triples(self) -> &'static [JointTriple] {
        match self {
            JointTable::Full => &FULL_TRIPLES,
            JointTable::Fingers => &FINGER_TRIPLES,
        }
    }

    pub fn angle_count(self) -> usize {
        self.triples().len()
    }

    pub fn feature_len(self) -> usize {
        self.angle_count() + FINGER_COUNT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFeatureVector")]
pub struct FeatureVector {
    table: JointTable,
    values: Vec<f64>,
}

#[derive(Deserialize)]
struct RawFeatureVector {
    table: JointTable,
    values: Vec<f64>,
}

impl TryFrom<RawFeatureVector> for FeatureVector {
    type Error = String;

    fn try_from(raw: RawFeatureVector) -> Result<Self, Self::Error> {
        let (table, len) = (raw.table, raw.values.len());
        Self::from_values(table, raw.values).ok_or_else(|| {
            format!(
                "{:?} table expects {} features, got {}",
                table,
                table.feature_len(),
                len
            )
        })
    }
}

impl FeatureVector {
    /// Wrap precomputed values; `None` if the length does not fit the table.
    pub fn from_values(table: JointTable, values: Vec<f64>) -> Option<Self> {
        (values.len() == table.feature_len()).then_some(Self { table, values })
    }

    pub fn table(&self) -> JointTable {
        self.table
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn angles(&self) -> &[f64] {
        &self.values[..self.table.angle_count()]
    }

    pub fn flags(&self) -> &[f64] {
        &self.values[self.table.angle_count()..]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Angle at `mid` between the segments `base → mid` and `mid → tip`.
///
/// A zero-length segment yields 0 instead of NaN.
pub fn joint_angle(base: &Landmark, mid: &Landmark, tip: &Landmark) -> f64 {
    let v1 = &mid.vector() - &base.vector();
    let v2 = &tip.vector() - &mid.vector();

    let n1 = v1.dot(&v1).sqrt();
    let n2 = v2.dot(&v2).sqrt();
    if n1 == 0.0 || n2 == 0.0 {
        return 0.0;
    }

    let u1 = v1 / n1;
    let u2 = v2 / n2;
    u1.dot(&u2).clamp(-1.0, 1.0).acos()
}

/// Extract features from the landmark set.
pub fn extract(table: JointTable, hand: &LandmarkSet) -> FeatureVector {
    let points = hand.points();
    let mut values = Vec::with_capacity(table.feature_len());

    for &(base, mid, tip) in table.triples() {
        values.push(joint_angle(&points[base], &points[mid], &points[tip]));
    }
    values.extend(
        FingerState::from_landmarks(hand)
            .as_array()
            .map(|extended| if extended { 1.0 } else { 0.0 }),
    );

    debug!("extracted {} features ({:?} table)", values.len(), table);
    FeatureVector { table, values }
}

/// Extract from a raw detector slice; `None` unless it holds exactly one full hand.
pub fn extract_points(table: JointTable, points: &[Landmark]) -> Option<FeatureVector> {
    if points.len() != LANDMARK_COUNT {
        debug!("expected {} landmarks, got {}", LANDMARK_COUNT, points.len());
        return None;
    }
    let hand = LandmarkSet::try_from(points).ok()?;
    Some(extract(table, &hand))
}

/// Which fingers are judged extended.
///
/// The thumb is compared on x (tip left of the IP joint in the mirrored view);
/// the other fingers are extended when the tip sits above the PIP joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    pub fn from_landmarks(hand: &LandmarkSet) -> Self {
        let above = |tip: usize, pip: usize| hand[tip].y < hand[pip].y;
        Self {
            thumb: hand[landmark::THUMB_TIP].x < hand[landmark::THUMB_IP].x,
            index: above(landmark::INDEX_TIP, landmark::INDEX_PIP),
            middle: above(landmark::MIDDLE_TIP, landmark::MIDDLE_PIP),
            ring: above(landmark::RING_TIP, landmark::RING_PIP),
            pinky: above(landmark::PINKY_TIP, landmark::PINKY_PIP),
        }
    }

    pub fn as_array(&self) -> [bool; FINGER_COUNT] {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
    }

    pub fn extended_count(&self) -> usize {
        self.as_array().iter().filter(|&&e| e).count()
    }
}

/// Coarse name for a hand pose. Informational only, never hashed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gesture {
    Fist,
    OpenHand,
    Pointing,
    PeaceSign,
    ThreeFingers,
    FourFingers,
    Custom,
}

impl Gesture {
    pub fn classify(fingers: FingerState) -> Self {
        match fingers.extended_count() {
            0 => Gesture::Fist,
            5 => Gesture::OpenHand,
            1 if fingers.index => Gesture::Pointing,
            2 if fingers.index && fingers.middle => Gesture::PeaceSign,
            3 => Gesture::ThreeFingers,
            4 => Gesture::FourFingers,
            _ => Gesture::Custom,
        }
    }

    pub fn of(hand: &LandmarkSet) -> Self {
        Self::classify(FingerState::from_landmarks(hand))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Fist => "fist",
            Gesture::OpenHand => "open hand",
            Gesture::Pointing => "pointing",
            Gesture::PeaceSign => "peace sign",
            Gesture::ThreeFingers => "three fingers",
            Gesture::FourFingers => "four fingers",
            Gesture::Custom => "custom gesture",
        }
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
