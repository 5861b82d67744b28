//! Synthetic hands laid out like detector output in the mirrored view.
#![allow(dead_code)]

use handkey_gesture::{Landmark, LandmarkSet};

pub const FIST: [bool; 5] = [false; 5];
pub const OPEN: [bool; 5] = [true; 5];
pub const PEACE: [bool; 5] = [false, true, true, false, false];
pub const POINT: [bool; 5] = [false, true, false, false, false];

const FINGER_X: [f64; 4] = [0.42, 0.5, 0.58, 0.66];

/// Build a hand with the given fingers (thumb first) extended.
pub fn hand(extended: [bool; 5]) -> LandmarkSet {
    LandmarkSet::try_from(points(extended)).expect("synthetic hand is complete")
}

pub fn points(extended: [bool; 5]) -> Vec<Landmark> {
    let lm = |x: f64, y: f64| Landmark::new(x, y, 0.0);
    let mut points = vec![
        lm(0.5, 0.9),
        lm(0.42, 0.82),
        lm(0.36, 0.74),
        lm(0.31, 0.68),
        if extended[0] {
            lm(0.26, 0.62)
        } else {
            lm(0.36, 0.66)
        },
    ];

    for (finger, &x) in FINGER_X.iter().enumerate() {
        points.push(lm(x, 0.6));
        points.push(lm(x, 0.5));
        if extended[finger + 1] {
            points.push(lm(x, 0.42));
            points.push(lm(x, 0.35));
        } else {
            points.push(lm(x, 0.56));
            points.push(lm(x, 0.62));
        }
    }
    points
}

/// Deterministic small displacement of every point, at most `amount` per axis.
pub fn jittered(hand: &LandmarkSet, amount: f64) -> LandmarkSet {
    let moved: Vec<Landmark> = hand
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let phase = i as f64 * 1.7;
            Landmark::new(
                p.x + amount * phase.sin(),
                p.y + amount * phase.cos(),
                p.z + amount * (phase * 0.5).sin(),
            )
        })
        .collect();
    LandmarkSet::try_from(moved).expect("jitter keeps the hand complete")
}

/// Move and resize the whole hand in frame.
pub fn shifted(hand: &LandmarkSet, dx: f64, dy: f64, scale: f64) -> LandmarkSet {
    let wrist = hand.wrist();
    let moved: Vec<Landmark> = hand
        .points()
        .iter()
        .map(|p| {
            Landmark::new(
                wrist.x + (p.x - wrist.x) * scale + dx,
                wrist.y + (p.y - wrist.y) * scale + dy,
                p.z * scale,
            )
        })
        .collect();
    LandmarkSet::try_from(moved).expect("shift keeps the hand complete")
}
