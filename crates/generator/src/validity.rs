use std::fmt;

use trackmap_ingest_core::{SessionState, TelemetrySample, TrackSurface};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    NotRacing,
    OffSurface(TrackSurface),
    Incident { was: i32, now: i32 },
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NotRacing => write!(f, "session not racing"),
            InvalidReason::OffSurface(s) => write!(f, "track surface {:?}", s),
            InvalidReason::Incident { was, now } => write!(f, "incidents {} -> {}", was, now),
        }
    }
}

/// Sticky disqualification flag for the lap attempt in progress.
#[derive(Debug, Clone)]
pub struct ValidityMonitor {
    prev_incident_count: i32,
    is_invalid_lap: bool,
}

impl Default for ValidityMonitor {
    // the partial lap seen right after connecting never counts
    fn default() -> Self {
        Self { prev_incident_count: 0, is_invalid_lap: true }
    }
}

impl ValidityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the reason when this tick disqualifies a so-far valid attempt.
    pub fn check(&mut self, s: &TelemetrySample) -> Option<InvalidReason> {
        if self.is_invalid_lap {
            return None;
        }
        let reason = if s.session_state == SessionState::GetInCar {
            InvalidReason::NotRacing
        } else if s.track_surface != TrackSurface::OnTrack {
            InvalidReason::OffSurface(s.track_surface)
        } else if s.incident_count > self.prev_incident_count {
            InvalidReason::Incident { was: self.prev_incident_count, now: s.incident_count }
        } else {
            return None;
        };
        self.is_invalid_lap = true;
        Some(reason)
    }

    pub fn start_attempt(&mut self, s: &TelemetrySample) {
        self.prev_incident_count = s.incident_count;
        self.is_invalid_lap = false;
    }

    pub fn invalidate(&mut self) {
        self.is_invalid_lap = true;
    }

    pub fn is_invalid(&self) -> bool {
        self.is_invalid_lap
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
