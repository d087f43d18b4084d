use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use model::*;
use trackmap_ingest_core::TelemetrySample;

/// Generated tracks on disk, one JSON file per track name.
#[derive(Clone, Debug)]
pub struct TrackStore {
    dir: PathBuf,
}

impl TrackStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, track_name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", track_name.replace(' ', "_")))
    }

    /// `Ok(None)` when nothing was saved for this track yet.
    pub fn load(&self, track_name: &str) -> Result<Option<TrackArtifact>> {
        let path = self.path_for(track_name);
        if !path.exists() {
            return Ok(None);
        }
        let s = fs::read_to_string(&path)
            .with_context(|| format!("read {}", path.display()))?;
        let track: TrackArtifact = serde_json::from_str(&s)
            .with_context(|| format!("parse {}", path.display()))?;
        info!("loaded track {:?}: {} points", track_name, track.points.len());
        Ok(Some(track))
    }

    /// Writes the track unless it has no points. Returns whether a file was written.
    pub fn save(&self, track_name: &str, track: &TrackArtifact) -> Result<bool> {
        if track.is_empty() {
            return Ok(false);
        }
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {}", self.dir.display()))?;
        let path = self.path_for(track_name);
        let f = File::create(&path).with_context(|| format!("create {}", path.display()))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer(&mut w, track)?;
        w.flush()?;
        info!("saved track {:?} to {}", track_name, path.display());
        Ok(true)
    }

    pub fn delete(&self, track_name: &str) -> Result<()> {
        let path = self.path_for(track_name);
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("deleted {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("delete {}", path.display())),
        }
    }
}

pub fn export_points_csv(track: &TrackArtifact, path: &Path) -> Result<()> {
    let mut w = csv::Writer::from_path(path)?;
    for p in &track.points {
        w.serialize(CsvPoint { x: p.x, y: p.y, lap_pct: p.lap_pct, segment: p.segment })?;
    }
    w.flush()?;
    Ok(())
}

pub fn import_points_csv(path: &Path) -> Result<Vec<TrackPoint>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut points = Vec::new();
    for rec in rdr.deserialize() {
        let r: CsvPoint = rec?;
        points.push(TrackPoint { x: r.x, y: r.y, lap_pct: r.lap_pct, segment: r.segment });
    }
    Ok(points)
}

/// Reads a telemetry recording, one sample per line. Unparseable lines are skipped.
pub fn import_recording_ndjson(path: &Path) -> Result<Vec<TelemetrySample>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = BufReader::new(f);
    let mut samples = vec![];
    for (i, line) in rdr.lines().enumerate() {
        let s = line?;
        if s.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TelemetrySample>(&s) {
            Ok(sample) => samples.push(sample),
            Err(e) => warn!("{}:{}: skipping sample: {}", path.display(), i + 1, e),
        }
    }
    Ok(samples)
}

pub fn export_recording_ndjson(samples: &[TelemetrySample], path: &Path) -> Result<()> {
    let f = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut w = BufWriter::new(f);
    for sample in samples {
        let s = serde_json::to_string(sample)?;
        writeln!(w, "{}", s)?;
    }
    w.flush()?;
    Ok(())
}

#[derive(Serialize, Deserialize)]
struct CsvPoint {
    x: f64,
    y: f64,
    lap_pct: f64,
    segment: u8,
}
