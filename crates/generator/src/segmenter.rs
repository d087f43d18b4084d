use trackmap_ingest_core::TelemetrySample;

/// One-shot edge detector around the start/finish line.
///
/// A lap attempt starts once the lap fraction climbs past the midpoint. The
/// detector then stays armed-off until the lap counter advances (or resets to
/// 0) while the fraction is back in the first half, so jitter around 0/1
/// never produces a second boundary.
#[derive(Debug, Clone)]
pub struct LapSegmenter {
    prev_lap: i32,
    is_lap_changed: bool,
}

impl Default for LapSegmenter {
    fn default() -> Self {
        Self { prev_lap: 0, is_lap_changed: true }
    }
}

impl LapSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the guard flag once the car has left the start/finish area.
    /// Returns true when the flag was released this tick.
    pub fn check_release(&mut self, s: &TelemetrySample) -> bool {
        let lap_advanced = s.current_lap > self.prev_lap || s.current_lap == 0;
        if lap_advanced && s.lap_dist_pct <= 0.5 && self.is_lap_changed {
            self.is_lap_changed = false;
            return true;
        }
        false
    }

    pub fn is_boundary(&self, s: &TelemetrySample) -> bool {
        s.lap_dist_pct > 0.5 && !self.is_lap_changed
    }

    pub fn start_attempt(&mut self) {
        self.is_lap_changed = true;
    }

    pub fn end_tick(&mut self, s: &TelemetrySample) {
        self.prev_lap = s.current_lap;
    }

    pub fn is_lap_changed(&self) -> bool {
        self.is_lap_changed
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
