// apps/trackmap/src/commands.rs
use std::path::PathBuf;

use crate::session::AppSession;

#[derive(Debug, PartialEq)]
pub enum Command {
    Status,
    Lock,
    Unlock,
    Delete,
    Export(PathBuf),
    Quit,
}

pub fn parse(line: &str) -> Result<Command, String> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or_default();
    let arg = parts.next();
    match (cmd, arg) {
        ("status", None) => Ok(Command::Status),
        ("lock", None) => Ok(Command::Lock),
        ("unlock", None) => Ok(Command::Unlock),
        ("delete", None) => Ok(Command::Delete),
        ("export", Some(p)) => Ok(Command::Export(PathBuf::from(p))),
        ("export", None) => Err("usage: export <path.csv>".into()),
        ("quit" | "exit", None) => Ok(Command::Quit),
        ("", _) => Err("empty command".into()),
        (other, _) => Err(format!("unknown command {:?} (status, lock, unlock, delete, export, quit)", other)),
    }
}

/// Runs one admin command. `Quit` is left to the caller.
pub fn execute(sess: &AppSession, cmd: &Command) -> Result<String, String> {
    match cmd {
        Command::Status => {
            let snap = sess.snapshot();
            let inner = sess.inner.lock();
            let Some(g) = &inner.generator else {
                return Ok("not connected".into());
            };
            Ok(format!(
                "{}: {} points from a {}-sample lap, updatable={}, current attempt {} samples",
                inner.track_name.as_deref().unwrap_or("?"),
                snap.points.len(),
                g.track().length,
                g.is_updatable(),
                g.raw_len(),
            ))
        }
        Command::Lock | Command::Unlock => {
            let mut inner = sess.inner.lock();
            let g = inner.generator.as_mut().ok_or("not connected")?;
            g.set_updatable(*cmd == Command::Unlock);
            Ok(format!("updatable={}", g.is_updatable()))
        }
        Command::Delete => {
            let mut inner = sess.inner.lock();
            let name = inner.track_name.clone().ok_or("not connected")?;
            inner.store.delete(&name).map_err(|e| format!("{:#}", e))?;
            if let Some(g) = inner.generator.as_mut() {
                g.reset();
            }
            Ok(format!("deleted track {}", name))
        }
        Command::Export(path) => {
            let snap = sess.snapshot();
            if snap.is_empty() {
                return Err("no track to export".into());
            }
            iox::export_points_csv(&snap, path).map_err(|e| format!("{:#}", e))?;
            Ok(format!("exported {} points to {}", snap.points.len(), path.display()))
        }
        Command::Quit => Ok("bye".into()),
    }
}
