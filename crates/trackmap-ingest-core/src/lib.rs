//! Telemetry model and source traits shared by every trackmap connector

use serde::{Deserialize, Serialize};

/// Session phase as reported by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum SessionState {
    #[default]
    Invalid,
    /// Driver is not racing yet. Laps driven in this state never count.
    GetInCar,
    Warmup,
    ParadeLaps,
    Racing,
    Checkered,
    CoolDown,
    Other(i32),
}

impl From<i32> for SessionState {
    fn from(v: i32) -> Self {
        match v {
            0 => Self::Invalid,
            1 => Self::GetInCar,
            2 => Self::Warmup,
            3 => Self::ParadeLaps,
            4 => Self::Racing,
            5 => Self::Checkered,
            6 => Self::CoolDown,
            other => Self::Other(other),
        }
    }
}

impl From<SessionState> for i32 {
    fn from(s: SessionState) -> Self {
        match s {
            SessionState::Invalid => 0,
            SessionState::GetInCar => 1,
            SessionState::Warmup => 2,
            SessionState::ParadeLaps => 3,
            SessionState::Racing => 4,
            SessionState::Checkered => 5,
            SessionState::CoolDown => 6,
            SessionState::Other(v) => v,
        }
    }
}

/// Where the player's car currently sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum TrackSurface {
    #[default]
    NotInWorld,
    OffTrack,
    InPitStall,
    ApproachingPits,
    OnTrack,
    Other(i32),
}

impl From<i32> for TrackSurface {
    fn from(v: i32) -> Self {
        match v {
            -1 => Self::NotInWorld,
            0 => Self::OffTrack,
            1 => Self::InPitStall,
            2 => Self::ApproachingPits,
            3 => Self::OnTrack,
            other => Self::Other(other),
        }
    }
}

impl From<TrackSurface> for i32 {
    fn from(s: TrackSurface) -> Self {
        match s {
            TrackSurface::NotInWorld => -1,
            TrackSurface::OffTrack => 0,
            TrackSurface::InPitStall => 1,
            TrackSurface::ApproachingPits => 2,
            TrackSurface::OnTrack => 3,
            TrackSurface::Other(v) => v,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    // lap progress
    pub lap_dist_pct: f64, // 0..1
    pub current_lap: i32,
    pub player_lap: i32,

    // session / validity
    pub session_state: SessionState,
    pub track_surface: TrackSurface,
    pub incident_count: i32,
    pub is_on_track: bool,

    // motion (car-local velocity, m/s; yaw in radians, already frame-adjusted)
    pub yaw: f64,
    pub vel_x: f64,
    pub vel_y: f64,

    pub session_time: f64, // seconds
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Connected { track_name: String },
    Sample(TelemetrySample),
    Disconnected,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{0}")]
    Msg(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type TelemetryTx = crossbeam_channel::Sender<SourceEvent>;
pub type TelemetryRx = crossbeam_channel::Receiver<SourceEvent>;

/// Trait for any telemetry connector, live or recorded
#[async_trait::async_trait]
pub trait TelemetrySource: Send + Sync {
    async fn run(&self, tx: TelemetryTx) -> Result<(), IngestError>;
}

pub fn channel() -> (TelemetryTx, TelemetryRx) {
    crossbeam_channel::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_keep_unknown_raw_values() {
        assert_eq!(SessionState::from(42), SessionState::Other(42));
        assert_eq!(i32::from(SessionState::Other(42)), 42);
        assert_eq!(TrackSurface::from(7), TrackSurface::Other(7));
        assert_eq!(i32::from(TrackSurface::OnTrack), 3);
        assert_eq!(SessionState::from(1), SessionState::GetInCar);
    }

    #[test]
    fn sample_serializes_enums_as_raw_ints() {
        let s = TelemetrySample {
            session_state: SessionState::Racing,
            track_surface: TrackSurface::OnTrack,
            ..Default::default()
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["session_state"], 4);
        assert_eq!(v["track_surface"], 3);

        let back: TelemetrySample = serde_json::from_value(v).unwrap();
        assert_eq!(back, s);
    }
}
