//! Synthetic hand captures for protocol tests.
#![allow(dead_code)]

use handkey::landmark::Landmark;
use handkey::LandmarkSet;

pub const FIST: [bool; 5] = [false; 5];
pub const OPEN: [bool; 5] = [true; 5];
pub const PEACE: [bool; 5] = [false, true, true, false, false];

/// Hand with the given fingers (thumb first) extended.
pub fn hand(extended: [bool; 5]) -> LandmarkSet {
    let lm = |x: f64, y: f64| Landmark::new(x, y, 0.0);
    let thumb_tip = if extended[0] {
        lm(0.26, 0.62)
    } else {
        lm(0.36, 0.66)
    };
    let mut points = vec![
        lm(0.5, 0.9),
        lm(0.42, 0.82),
        lm(0.36, 0.74),
        lm(0.31, 0.68),
        thumb_tip,
    ];
    for (finger, x) in [0.42, 0.5, 0.58, 0.66].into_iter().enumerate() {
        let (dip, tip) = if extended[finger + 1] {
            (0.42, 0.35)
        } else {
            (0.56, 0.62)
        };
        points.extend([lm(x, 0.6), lm(x, 0.5), lm(x, dip), lm(x, tip)]);
    }
    LandmarkSet::try_from(points).expect("synthetic hand is complete")
}

/// The same pose captured again with slight sensor noise.
pub fn recaptured(hand: &LandmarkSet) -> LandmarkSet {
    let moved: Vec<Landmark> = hand
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let phase = i as f64 * 1.7;
            Landmark::new(p.x + 1e-3 * phase.sin(), p.y + 1e-3 * phase.cos(), p.z)
        })
        .collect();
    LandmarkSet::try_from(moved).expect("noise keeps the hand complete")
}

/// Write `hand` as a detector capture file.
pub fn write_capture(path: &std::path::Path, hand: Option<&LandmarkSet>) -> anyhow::Result<()> {
    let hands: Vec<Vec<Landmark>> = hand.map(|h| h.points().to_vec()).into_iter().collect();
    std::fs::write(path, serde_json::json!({ "hands": hands }).to_string())?;
    Ok(())
}
