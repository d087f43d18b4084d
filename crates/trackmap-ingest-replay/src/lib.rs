use std::path::PathBuf;

use log::info;
use tokio::time::{self, Duration};
use trackmap_ingest_core::*;

#[derive(Clone, Debug)]
pub struct ReplayConfig {
    /// NDJSON recording, one `TelemetrySample` per line
    pub path: PathBuf,
    /// Track name announced on connect; keys the saved track file
    pub track_name: String,
    /// Delay between samples. Zero replays as fast as the consumer drains.
    pub tick: Duration,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("recording.ndjson"),
            track_name: "replay".into(),
            tick: Duration::from_millis(16),
        }
    }
}

pub struct ReplaySource { cfg: ReplayConfig }
impl ReplaySource { pub fn new(cfg: ReplayConfig) -> Self { Self { cfg } } }

#[async_trait::async_trait]
impl TelemetrySource for ReplaySource {
    async fn run(&self, tx: TelemetryTx) -> Result<(), IngestError> {
        let samples = iox::import_recording_ndjson(&self.cfg.path)?;
        info!("replaying {} samples from {}", samples.len(), self.cfg.path.display());

        if tx.send(SourceEvent::Connected { track_name: self.cfg.track_name.clone() }).is_err() {
            return Ok(());
        }

        let mut interval = (!self.cfg.tick.is_zero()).then(|| {
            let mut iv = time::interval(self.cfg.tick);
            iv.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            iv
        });
        for sample in samples {
            if let Some(iv) = interval.as_mut() {
                iv.tick().await;
            }
            if tx.send(SourceEvent::Sample(sample)).is_err() {
                // consumer went away
                return Ok(());
            }
        }

        let _ = tx.send(SourceEvent::Disconnected);
        info!("replay finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(n: usize) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("trackmap-replay-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rec.ndjson");
        let samples: Vec<_> = (0..n)
            .map(|i| TelemetrySample { session_time: i as f64, ..Default::default() })
            .collect();
        iox::export_recording_ndjson(&samples, &path).unwrap();
        path
    }

    #[tokio::test]
    async fn replays_connect_samples_disconnect() {
        let path = recording(3);
        let src = ReplaySource::new(ReplayConfig {
            path: path.clone(),
            track_name: "Summit Point".into(),
            tick: Duration::ZERO,
        });
        let (tx, rx) = channel();
        src.run(tx).await.unwrap();

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 5);
        assert_eq!(events[0], SourceEvent::Connected { track_name: "Summit Point".into() });
        assert!(matches!(&events[2], SourceEvent::Sample(s) if s.session_time == 1.0));
        assert_eq!(events[4], SourceEvent::Disconnected);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn paced_replay_still_delivers_everything() {
        let path = recording(4);
        let src = ReplaySource::new(ReplayConfig {
            path: path.clone(),
            tick: Duration::from_millis(1),
            ..Default::default()
        });
        let (tx, rx) = channel();
        src.run(tx).await.unwrap();
        assert_eq!(rx.try_iter().filter(|e| matches!(e, SourceEvent::Sample(_))).count(), 4);
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn missing_recording_is_an_error() {
        let src = ReplaySource::new(ReplayConfig {
            path: PathBuf::from("/nonexistent/trackmap/rec.ndjson"),
            ..Default::default()
        });
        let (tx, _rx) = channel();
        assert!(src.run(tx).await.is_err());
    }
}
