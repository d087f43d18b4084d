mod commands;
mod config;
mod session;

use std::{io::BufRead, path::PathBuf, sync::Arc, thread};

use anyhow::Result;
use log::{info, warn};

use config::{Config, SourceKind};
use iox::TrackStore;
use session::{run_source, spawn_publisher, AppSession};
use track_generator::track_channel;
use trackmap_ingest_replay::ReplaySource;
use trackmap_ingest_udp::UdpSource;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Config::load(std::env::args().nth(1).map(PathBuf::from))?;
    let tracks_dir = cfg.tracks_dir();
    info!("tracks stored in {}", tracks_dir.display());

    let (track_tx, track_rx) = track_channel();
    let sess = Arc::new(AppSession::new(TrackStore::new(tracks_dir), track_tx));
    spawn_publisher(sess.clone(), track_rx);

    let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(2);

    let pump = match cfg.source {
        SourceKind::Udp => run_source(UdpSource::new(cfg.udp_config()), sess.clone()),
        SourceKind::Replay => run_source(ReplaySource::new(cfg.replay_config()?), sess.clone()),
    };
    let pump_done = done_tx.clone();
    thread::spawn(move || {
        let _ = pump.join();
        let _ = pump_done.send(());
    });

    let stdin_sess = sess.clone();
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match commands::parse(&line) {
                Ok(commands::Command::Quit) => {
                    let _ = done_tx.send(());
                    return;
                }
                Ok(cmd) => match commands::execute(&stdin_sess, &cmd) {
                    Ok(msg) => println!("{}", msg),
                    Err(msg) => warn!("{}", msg),
                },
                Err(msg) => warn!("{}", msg),
            }
        }
        // stdin closed: keep running until the source stops
    });

    tokio::task::spawn_blocking(move || done_rx.recv()).await?.ok();

    sess.inner.lock().save();
    info!("bye");
    Ok(())
}
