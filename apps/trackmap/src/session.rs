use std::{sync::Arc, thread};
use log::{error, info, warn};
use parking_lot::{Mutex, RwLock};

use iox::TrackStore;
use model::TrackArtifact;
use track_generator::{TrackReconstructor, TrackRx, TrackTx};
use trackmap_ingest_core::{channel, SourceEvent, TelemetryRx, TelemetrySource};

pub struct AppSession {
    pub inner: Mutex<Inner>,
    // last published track, replaced wholesale on every update
    snapshot: RwLock<TrackArtifact>,
}

pub struct Inner {
    pub store: TrackStore,
    pub track_name: Option<String>,
    // present only while a source is connected
    pub generator: Option<TrackReconstructor>,
    track_tx: TrackTx,
}

impl AppSession {
    pub fn new(store: TrackStore, track_tx: TrackTx) -> Self {
        Self {
            inner: Mutex::new(Inner { store, track_name: None, generator: None, track_tx }),
            snapshot: RwLock::new(TrackArtifact::default()),
        }
    }

    pub fn snapshot(&self) -> TrackArtifact {
        self.snapshot.read().clone()
    }

    pub fn publish(&self, track: TrackArtifact) {
        *self.snapshot.write() = track;
    }
}

impl Inner {
    pub fn handle_event(&mut self, ev: SourceEvent) {
        match ev {
            SourceEvent::Connected { track_name } => self.connect(track_name),
            SourceEvent::Sample(s) => {
                if let Some(g) = &mut self.generator {
                    g.process(Some(&s));
                }
            }
            SourceEvent::Disconnected => self.disconnect(),
        }
    }

    fn connect(&mut self, track_name: String) {
        if self.generator.is_some() {
            self.disconnect();
        }
        let track = match self.store.load(&track_name) {
            Ok(Some(t)) => t,
            Ok(None) => TrackArtifact::default(),
            Err(e) => {
                warn!("could not load saved track for {:?}: {:#}", track_name, e);
                TrackArtifact::default()
            }
        };
        info!("connected: {} (saved track: {} points)", track_name, track.points.len());
        self.generator = Some(TrackReconstructor::with_track(self.track_tx.clone(), track.clone()));
        self.track_name = Some(track_name);
        let _ = self.track_tx.send(track);
    }

    fn disconnect(&mut self) {
        self.save();
        if let Some(mut g) = self.generator.take() {
            g.reset();
        }
        info!("disconnected: {}", self.track_name.take().unwrap_or_default());
    }

    /// Persists the current track, if any. Errors are logged, not raised.
    pub fn save(&self) {
        let (Some(name), Some(g)) = (&self.track_name, &self.generator) else {
            return;
        };
        if let Err(e) = self.store.save(name, g.track()) {
            error!("saving track {:?} failed: {:#}", name, e);
        }
    }
}

/// Copies every published track into the session snapshot.
pub fn spawn_publisher(sess: Arc<AppSession>, rx: TrackRx) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for track in rx.iter() {
            info!("track map: {} points (locked: {})", track.points.len(), !track.updatable);
            sess.publish(track);
        }
    })
}

/// Spawns the source on the runtime and pumps its events into the session.
/// The returned thread ends when the source stops.
pub fn run_source<S: TelemetrySource + 'static>(src: S, sess: Arc<AppSession>) -> thread::JoinHandle<()> {
    let (tx, rx): (_, TelemetryRx) = channel();
    tokio::spawn(async move {
        if let Err(e) = src.run(tx).await {
            error!("telemetry source stopped: {}", e);
        }
    });
    thread::spawn(move || {
        for ev in rx.iter() {
            sess.inner.lock().handle_event(ev);
        }
    })
}
