//! Band classification of a scalar risk signal

use crate::config::BandAnchors;
use crate::types::Severity;

/// Band whose anchor is nearest to `signal`.
///
/// Equidistant anchors resolve to the higher band. Signals below the low
/// anchor are low and above the critical anchor critical.
pub fn classify(signal: f64, anchors: &BandAnchors) -> Severity {
    let mut best = Severity::Low;
    let mut best_distance = f64::INFINITY;
    for severity in Severity::ALL {
        let distance = (signal - anchors.anchor(severity)).abs();
        // `<=` lets a later (higher) band win an exact tie
        if distance <= best_distance {
            best = severity;
            best_distance = distance;
        }
    }
    best
}

/// Piecewise-linear position of `signal` on the anchor scale, in [0, 1].
///
/// Each band segment covers one third of the range.
pub fn normalized_score(signal: f64, anchors: &BandAnchors) -> f64 {
    let points = [anchors.low, anchors.medium, anchors.high, anchors.critical];
    if signal <= points[0] {
        return 0.0;
    }
    if signal >= points[3] {
        return 1.0;
    }
    let segments = (points.len() - 1) as f64;
    for (i, pair) in points.windows(2).enumerate() {
        let (lo, hi) = (pair[0], pair[1]);
        if signal <= hi {
            let frac = (signal - lo) / (hi - lo);
            return (i as f64 + frac) / segments;
        }
    }
    1.0
}
