//! Incremental track map generation from live telemetry.
//!
//! [`TrackReconstructor`] is fed one [`TelemetrySample`] per tick. It splits
//! the stream into lap attempts, rejects attempts that went off track, picked
//! up incidents or ran outside a live session, dead-reckons each attempt into
//! a raw trace and, when a clean attempt beats the stored one, publishes the
//! resampled trace as the new [`TrackArtifact`].

mod integrator;
mod resample;
mod segmenter;
mod validity;

pub use integrator::PathIntegrator;
pub use resample::{fraction_grid, resample};
pub use segmenter::LapSegmenter;
pub use validity::{InvalidReason, ValidityMonitor};

use log::{debug, info};
use model::TrackArtifact;
use trackmap_ingest_core::TelemetrySample;

pub type TrackTx = crossbeam_channel::Sender<TrackArtifact>;
pub type TrackRx = crossbeam_channel::Receiver<TrackArtifact>;

pub fn track_channel() -> (TrackTx, TrackRx) {
    crossbeam_channel::unbounded()
}

/// Owns all generator state for one connected session. Published artifacts
/// are sent as owned copies, so readers never see one half-built.
pub struct TrackReconstructor {
    track: TrackArtifact,
    segmenter: LapSegmenter,
    validity: ValidityMonitor,
    integrator: PathIntegrator,
    tx: TrackTx,
}

impl TrackReconstructor {
    pub fn new(tx: TrackTx) -> Self {
        Self::with_track(tx, TrackArtifact::default())
    }

    pub fn with_track(tx: TrackTx, track: TrackArtifact) -> Self {
        Self {
            track,
            segmenter: LapSegmenter::new(),
            validity: ValidityMonitor::new(),
            integrator: PathIntegrator::new(),
            tx,
        }
    }

    /// Advances the generator by one tick. A missing sample leaves every bit
    /// of state untouched. Returns true when a new track was published.
    pub fn process(&mut self, sample: Option<&TelemetrySample>) -> bool {
        let Some(s) = sample else {
            return false;
        };

        if self.segmenter.check_release(s) {
            debug!("lap changed: {}", s.current_lap);
        }
        if let Some(reason) = self.validity.check(s) {
            info!("invalid lap {}: {}", s.current_lap, reason);
        }

        let mut published = false;
        if self.segmenter.is_boundary(s) {
            published = self.close_attempt();
            self.integrator.clear();
            self.validity.start_attempt(s);
            self.segmenter.start_attempt();
            debug!("start generating: lap {}", s.current_lap);
        }

        let dt = self.integrator.advance_clock(s);
        self.segmenter.end_tick(s);

        if s.is_on_track && self.track.updatable {
            self.integrator.integrate(s, dt);
        }
        published
    }

    fn close_attempt(&mut self) -> bool {
        let raw = self.integrator.len();
        if self.validity.is_invalid() {
            debug!("attempt discarded: invalid ({} raw points)", raw);
            return false;
        }
        if !self.track.updatable {
            debug!("attempt discarded: track locked");
            return false;
        }
        // heuristic: fewer samples over a full lap counts as the tighter trace
        if self.track.length != 0 && raw >= self.track.length {
            debug!("attempt discarded: {} raw points, stored {}", raw, self.track.length);
            return false;
        }

        self.track.length = raw;
        self.track.points = resample(self.integrator.points());
        info!("track updated: {} raw points, {} resampled", raw, self.track.points.len());
        self.emit();
        true
    }

    fn emit(&self) {
        if self.tx.send(self.track.clone()).is_err() {
            debug!("track listener gone, update dropped");
        }
    }

    pub fn track(&self) -> &TrackArtifact {
        &self.track
    }

    pub fn is_updatable(&self) -> bool {
        self.track.updatable
    }

    /// Number of raw points gathered for the attempt in progress.
    pub fn raw_len(&self) -> usize {
        self.integrator.len()
    }

    /// Locks or unlocks the stored track. The attempt in progress is
    /// disqualified because its trace has a gap while locked.
    pub fn set_updatable(&mut self, updatable: bool) {
        self.track.updatable = updatable;
        self.validity.invalidate();
        info!("track updatable: {}", updatable);
    }

    /// Replaces the stored track without publishing, e.g. with one loaded from disk.
    pub fn load_track(&mut self, track: TrackArtifact) {
        self.track = track;
    }

    /// Drops all progress and the stored track, then publishes the empty track.
    pub fn reset(&mut self) {
        self.segmenter.reset();
        self.validity.reset();
        self.integrator.reset();
        self.track = TrackArtifact::default();
        info!("track generator reset");
        self.emit();
    }
}
