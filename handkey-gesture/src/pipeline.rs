use std::fmt;
use std::num::NonZeroU32;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::features::{self, FeatureVector, JointTable};
use crate::hash::HashProfile;
use crate::landmark::{Landmark, LandmarkSet};
use crate::quantize::{FlagSchedule, QuantizedVector, Quantizer, MAX_BINS};

/// Everything that decides how a credential is derived. Stored next to each
/// digest so a credential is always re-derived the way it was enrolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineParams {
    pub joint_table: JointTable,
    pub num_bins: NonZeroU32,
    pub flag_schedule: FlagSchedule,
    pub profile: HashProfile,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            joint_table: JointTable::Full,
            num_bins: NonZeroU32::MIN,
            flag_schedule: FlagSchedule::Binary,
            profile: HashProfile::Rolling,
        }
    }
}

impl PipelineParams {
    /// Whether a pipeline can be built from these params without an unbounded allocation.
    pub fn is_supported(&self) -> bool {
        self.num_bins.get() <= MAX_BINS
    }
}

impl fmt::Display for PipelineParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{} bins/{:?} flags/{:?}",
            self.joint_table, self.num_bins, self.flag_schedule, self.profile
        )
    }
}

/// A derived gesture credential: the hex digest tagged with the params that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    pub params: PipelineParams,
    pub digest: String,
}

impl Credential {
    /// Credentials only compare meaningfully when derived the same way.
    pub fn is_comparable(&self, other: &Credential) -> bool {
        self.params == other.params
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digest)
    }
}

/// Every intermediate product of one derivation.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub features: FeatureVector,
    pub quantized: QuantizedVector,
    pub credential: Credential,
}

/// Full pipeline: extract features → quantize → hash
#[derive(Debug, Clone)]
pub struct Pipeline {
    params: PipelineParams,
    quantizer: Quantizer,
}

impl Pipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self {
            params,
            quantizer: Quantizer::new(params.num_bins, params.flag_schedule),
        }
    }

    pub fn params(&self) -> PipelineParams {
        self.params
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    pub fn extract(&self, hand: &LandmarkSet) -> FeatureVector {
        features::extract(self.params.joint_table, hand)
    }

    pub fn quantize(&self, features: &FeatureVector) -> QuantizedVector {
        self.quantizer.quantize(features)
    }

    pub fn hash(&self, quantized: &QuantizedVector, salt: Option<&str>) -> Credential {
        Credential {
            params: self.params,
            digest: self.params.profile.digest(quantized, salt),
        }
    }

    /// Run one hand through every stage.
    pub fn derive(&self, hand: &LandmarkSet, salt: Option<&str>) -> Derivation {
        let features = self.extract(hand);
        let quantized = self.quantize(&features);
        let credential = self.hash(&quantized, salt);
        debug!(
            "derived credential {} from buckets {:?} ({})",
            credential,
            quantized.as_slice(),
            self.params
        );
        Derivation {
            features,
            quantized,
            credential,
        }
    }

    /// Like [`Pipeline::derive`] for a raw detector slice; `None` when it is not one full hand.
    pub fn derive_points(&self, points: &[Landmark], salt: Option<&str>) -> Option<Derivation> {
        let hand = LandmarkSet::try_from(points).ok()?;
        Some(self.derive(&hand, salt))
    }

    /// Convenience: credential only.
    pub fn credential(&self, hand: &LandmarkSet, salt: Option<&str>) -> Credential {
        self.derive(hand, salt).credential
    }
}
