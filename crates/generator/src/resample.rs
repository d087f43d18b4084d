use model::{TrackPoint, TARGET_LENGTH};

/// `n` evenly spaced values over [0, 1]; first is exactly 0.0, last exactly 1.0.
pub fn fraction_grid(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => {
            let step = 1.0 / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { 1.0 } else { i as f64 * step })
                .collect()
        }
    }
}

/// Nearest-sample resample of a raw trace onto the canonical fraction grid.
///
/// Each grid fraction takes `x`, `y` and `segment` from the raw point whose
/// `lap_pct` is closest to it. On equal distance the earlier point in
/// fraction order wins, and among points sharing a fraction the one recorded
/// first wins. The output is closed by repeating its last entry.
pub fn resample(raw: &[TrackPoint]) -> Vec<TrackPoint> {
    if raw.is_empty() {
        return Vec::new();
    }

    let mut sorted = raw.to_vec();
    // stable: insertion order survives among equal fractions
    sorted.sort_by(|a, b| a.lap_pct.total_cmp(&b.lap_pct));

    let grid = fraction_grid(TARGET_LENGTH);
    let mut out: Vec<TrackPoint> = Vec::with_capacity(grid.len() + 1);
    for &target in &grid {
        let src = &sorted[nearest_index(&sorted, target)];
        out.push(TrackPoint { x: src.x, y: src.y, lap_pct: target, segment: src.segment });
    }

    out.dedup_by(|b, a| a.lap_pct == b.lap_pct);

    if let Some(last) = out.last().copied() {
        out.push(last);
    }
    out
}

fn nearest_index(sorted: &[TrackPoint], target: f64) -> usize {
    let right = sorted.partition_point(|p| p.lap_pct < target);
    if right == 0 {
        return 0;
    }
    // first occurrence of the fraction just below the target
    let below = sorted[right - 1].lap_pct;
    let left = sorted.partition_point(|p| p.lap_pct < below);
    if right == sorted.len() {
        return left;
    }

    let dl = (target - sorted[left].lap_pct).abs();
    let dr = (sorted[right].lap_pct - target).abs();
    if dl <= dr { left } else { right }
}
