use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::landmark::{Landmark, LandmarkSet};

/// Anything that turns a frame into at most one hand.
pub trait LandmarkSource {
    type Frame: ?Sized;

    /// `Ok(None)` means the frame was read but no usable hand was found.
    fn detect(&mut self, frame: &Self::Frame) -> Result<Option<LandmarkSet>>;
}

/// Detector output for one frame, as written by the external hand-landmark detector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Capture {
    #[serde(default)]
    pub hands: Vec<Vec<Landmark>>,
}

impl Capture {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parsing capture")
    }

    /// The first reported hand, if it is complete.
    pub fn first_hand(&self) -> Option<LandmarkSet> {
        let hand = self.hands.first()?;
        if self.hands.len() > 1 {
            log::debug!("capture holds {} hands, using the first", self.hands.len());
        }
        match LandmarkSet::try_from(hand.as_slice()) {
            Ok(set) => Some(set),
            Err(e) => {
                log::warn!("discarding hand: {}", e);
                None
            }
        }
    }
}

/// Reads capture JSON files from disk.
#[derive(Debug, Clone, Default)]
pub struct CaptureFileSource {
    mirror: bool,
}

impl CaptureFileSource {
    pub fn new(mirror: bool) -> Self {
        Self { mirror }
    }
}

impl LandmarkSource for CaptureFileSource {
    type Frame = Path;

    fn detect(&mut self, frame: &Path) -> Result<Option<LandmarkSet>> {
        let raw = std::fs::read_to_string(frame)
            .with_context(|| format!("reading capture {}", frame.display()))?;
        let capture =
            Capture::from_json(&raw).with_context(|| format!("in {}", frame.display()))?;
        log::debug!(
            "capture {}: {} hand(s)",
            frame.display(),
            capture.hands.len()
        );

        let hand = capture.first_hand();
        Ok(if self.mirror {
            hand.map(|h| h.mirrored())
        } else {
            hand
        })
    }
}
