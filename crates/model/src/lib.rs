use serde::{Deserialize, Serialize};

/// Canonical resolution of a generated track polyline.
pub const TARGET_LENGTH: usize = 2000;

/// Upper bound on raw samples kept for a single lap attempt.
pub const MAX_RAW_POINTS: usize = 100_000;

/// Segment marker stamped on every point. Only single-segment tracks exist today.
pub const SEGMENT_MARKER: u8 = 1;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
    pub lap_pct: f64,
    pub segment: u8,
}

/// A dead-reckoned sample before resampling. Same layout as a published point.
pub type RawPoint = TrackPoint;

impl TrackPoint {
    pub fn new(x: f64, y: f64, lap_pct: f64) -> Self {
        Self { x, y, lap_pct, segment: SEGMENT_MARKER }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TrackArtifact {
    /// Raw sample count of the lap that produced `points`; 0 when no track exists.
    pub length: usize,
    pub updatable: bool,
    #[serde(default)]
    pub points: Vec<TrackPoint>,
}

impl Default for TrackArtifact {
    fn default() -> Self {
        Self { length: 0, updatable: true, points: Vec::new() }
    }
}

impl TrackArtifact {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_artifact_is_empty_and_updatable() {
        let t = TrackArtifact::default();
        assert_eq!(t.length, 0);
        assert!(t.updatable);
        assert!(t.is_empty());
    }

    #[test]
    fn artifact_json_keeps_shape() {
        let t = TrackArtifact {
            length: 3,
            updatable: false,
            points: vec![
                TrackPoint::new(0.0, 0.0, 0.0),
                TrackPoint::new(1.5, -2.25, 0.5),
                TrackPoint::new(1.5, -2.25, 0.5),
            ],
        };
        let s = serde_json::to_string(&t).unwrap();
        let back: TrackArtifact = serde_json::from_str(&s).unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn missing_points_deserialize_as_empty() {
        let t: TrackArtifact = serde_json::from_str(r#"{"length":0,"updatable":true}"#).unwrap();
        assert!(t.points.is_empty());
    }
}
