use model::{RawPoint, MAX_RAW_POINTS};
use trackmap_ingest_core::TelemetrySample;

/// Dead-reckons car-local velocity into a world-frame trace for one lap attempt.
#[derive(Debug, Clone, Default)]
pub struct PathIntegrator {
    points: Vec<RawPoint>,
    prev_session_time: f64,
}

impl PathIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous tick; also records this tick's time.
    pub fn advance_clock(&mut self, s: &TelemetrySample) -> f64 {
        let dt = s.session_time - self.prev_session_time;
        self.prev_session_time = s.session_time;
        dt
    }

    /// Appends one point unless the store is full. The first point of an
    /// attempt sits at the origin.
    pub fn integrate(&mut self, s: &TelemetrySample, dt: f64) -> bool {
        if self.points.len() >= MAX_RAW_POINTS {
            return false;
        }
        let (sin, cos) = s.yaw.sin_cos();
        let wvx = s.vel_x * cos - s.vel_y * sin;
        let wvy = s.vel_x * sin + s.vel_y * cos;

        // y grows downward on the map
        let (x, y) = match self.points.last() {
            Some(last) => (last.x + wvx * dt, last.y - wvy * dt),
            None => (0.0, 0.0),
        };
        self.points.push(RawPoint::new(x, y, s.lap_dist_pct));
        true
    }

    pub fn points(&self) -> &[RawPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn reset(&mut self) {
        self.points.clear();
        self.prev_session_time = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn moving(t: f64, yaw: f64, vx: f64, vy: f64) -> TelemetrySample {
        TelemetrySample {
            session_time: t,
            yaw,
            vel_x: vx,
            vel_y: vy,
            lap_dist_pct: t / 100.0,
            ..Default::default()
        }
    }

    fn step(p: &mut PathIntegrator, s: &TelemetrySample) {
        let dt = p.advance_clock(s);
        p.integrate(s, dt);
    }

    #[test]
    fn first_point_is_origin() {
        let mut p = PathIntegrator::new();
        step(&mut p, &moving(12.0, 1.0, 50.0, 3.0));
        assert_eq!(p.points()[0], RawPoint::new(0.0, 0.0, 0.12));
    }

    #[test]
    fn heading_east_moves_x() {
        let mut p = PathIntegrator::new();
        step(&mut p, &moving(1.0, 0.0, 10.0, 0.0));
        step(&mut p, &moving(1.5, 0.0, 10.0, 0.0));
        let last = p.points()[1];
        assert!((last.x - 5.0).abs() < 1e-9);
        assert!(last.y.abs() < 1e-9);
    }

    #[test]
    fn heading_north_moves_y_inverted() {
        let mut p = PathIntegrator::new();
        step(&mut p, &moving(1.0, FRAC_PI_2, 10.0, 0.0));
        step(&mut p, &moving(1.5, FRAC_PI_2, 10.0, 0.0));
        let last = p.points()[1];
        assert!(last.x.abs() < 1e-9);
        assert!((last.y + 5.0).abs() < 1e-9);
    }

    #[test]
    fn lateral_velocity_rotates() {
        let mut p = PathIntegrator::new();
        step(&mut p, &moving(0.0, 0.0, 0.0, 4.0));
        step(&mut p, &moving(2.0, 0.0, 0.0, 4.0));
        let last = p.points()[1];
        assert!(last.x.abs() < 1e-9);
        assert!((last.y + 8.0).abs() < 1e-9);
    }

    #[test]
    fn zero_dt_repeats_position() {
        let mut p = PathIntegrator::new();
        step(&mut p, &moving(3.0, 0.3, 10.0, 1.0));
        step(&mut p, &moving(4.0, 0.3, 10.0, 1.0));
        step(&mut p, &moving(4.0, 0.3, 10.0, 1.0));
        let pts = p.points();
        assert_eq!((pts[1].x, pts[1].y), (pts[2].x, pts[2].y));
    }

    #[test]
    fn store_is_capped() {
        let mut p = PathIntegrator::new();
        let s = moving(0.0, 0.0, 1.0, 0.0);
        for _ in 0..MAX_RAW_POINTS {
            assert!(p.integrate(&s, 0.016));
        }
        assert!(!p.integrate(&s, 0.016));
        assert_eq!(p.len(), MAX_RAW_POINTS);
    }
}
