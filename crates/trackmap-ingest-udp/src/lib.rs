use anyhow::Context;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::{info, warn};
use std::f64::consts::FRAC_PI_2;
use std::io::{Cursor, Read};
use tokio::{net::UdpSocket, time::{self, Duration}};
use trackmap_ingest_core::*;

const MAGIC: &[u8; 4] = b"TMAP";
const KIND_SESSION: u8 = 0;
const KIND_SAMPLE: u8 = 1;
const KIND_DISCONNECT: u8 = 2;

#[derive(Clone, Debug)]
pub struct UdpConfig {
    /// Local bind address the simulator relay sends to
    pub bind_addr: String,
    /// Silence after which a connected relay is considered gone
    pub idle_timeout: Duration,
}

impl Default for UdpConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:9870".into(), idle_timeout: Duration::from_millis(2000) }
    }
}

pub struct UdpSource { cfg: UdpConfig }

impl UdpSource {
    pub fn new(cfg: UdpConfig) -> Self { Self { cfg } }

    /// Runs the receive loop on an already bound socket.
    pub async fn serve(&self, socket: UdpSocket, tx: TelemetryTx) -> Result<(), IngestError> {
        let mut buf = vec![0u8; 2048];
        let mut track: Option<String> = None;
        loop {
            let len = match time::timeout(self.cfg.idle_timeout, socket.recv_from(&mut buf)).await {
                Err(_) => {
                    if track.take().is_some() {
                        info!("relay silent for {:?}, disconnected", self.cfg.idle_timeout);
                        if tx.send(SourceEvent::Disconnected).is_err() { return Ok(()); }
                    }
                    continue;
                }
                Ok(res) => res.context("recv")?.0,
            };

            let events = match parse_datagram(&buf[..len]) {
                Some(Datagram::Session { track_name }) => {
                    if track.as_deref() == Some(track_name.as_str()) {
                        continue;
                    }
                    let mut ev = Vec::with_capacity(2);
                    if track.is_some() {
                        ev.push(SourceEvent::Disconnected);
                    }
                    info!("relay connected: {}", track_name);
                    track = Some(track_name.clone());
                    ev.push(SourceEvent::Connected { track_name });
                    ev
                }
                Some(Datagram::Sample(s)) if track.is_some() => vec![SourceEvent::Sample(s)],
                // no session yet
                Some(Datagram::Sample(_)) => continue,
                Some(Datagram::Disconnect) => {
                    if track.take().is_none() {
                        continue;
                    }
                    info!("relay disconnected");
                    vec![SourceEvent::Disconnected]
                }
                None => {
                    warn!("dropping malformed datagram ({} bytes)", len);
                    continue;
                }
            };
            for ev in events {
                if tx.send(ev).is_err() {
                    return Ok(());
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl TelemetrySource for UdpSource {
    async fn run(&self, tx: TelemetryTx) -> Result<(), IngestError> {
        let socket = UdpSocket::bind(&self.cfg.bind_addr).await
            .with_context(|| format!("bind {}", self.cfg.bind_addr))?;
        info!("listening for relay on {}", self.cfg.bind_addr);
        self.serve(socket, tx).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Datagram {
    Session { track_name: String },
    Sample(TelemetrySample),
    Disconnect,
}

pub fn parse_datagram(pkt: &[u8]) -> Option<Datagram> {
    if pkt.len() < 5 || &pkt[..4] != MAGIC {
        return None;
    }
    let mut c = Cursor::new(&pkt[5..]);
    match pkt[4] {
        KIND_SESSION => {
            let n = c.read_u16::<LittleEndian>().ok()? as usize;
            let mut name = vec![0u8; n];
            c.read_exact(&mut name).ok()?;
            Some(Datagram::Session { track_name: String::from_utf8(name).ok()? })
        }
        KIND_SAMPLE => read_sample(&mut c).map(Datagram::Sample),
        KIND_DISCONNECT => Some(Datagram::Disconnect),
        _ => None,
    }
}

fn read_sample(c: &mut Cursor<&[u8]>) -> Option<TelemetrySample> {
    let session_time = c.read_f64::<LittleEndian>().ok()?;
    let lap_dist_pct = c.read_f32::<LittleEndian>().ok()?;
    let current_lap = c.read_i32::<LittleEndian>().ok()?;
    let player_lap = c.read_i32::<LittleEndian>().ok()?;
    let session_state = c.read_i32::<LittleEndian>().ok()?;
    let track_surface = c.read_i32::<LittleEndian>().ok()?;
    let incident_count = c.read_i32::<LittleEndian>().ok()?;
    let is_on_track = c.read_u8().ok()?;
    let yaw_north = c.read_f32::<LittleEndian>().ok()?;
    let vel_x = c.read_f32::<LittleEndian>().ok()?;
    let vel_y = c.read_f32::<LittleEndian>().ok()?;

    Some(TelemetrySample {
        lap_dist_pct: lap_dist_pct as f64,
        current_lap,
        player_lap,
        session_state: session_state.into(),
        track_surface: track_surface.into(),
        incident_count,
        is_on_track: is_on_track != 0,
        // compass heading -> map frame
        yaw: -(yaw_north as f64) + FRAC_PI_2,
        vel_x: vel_x as f64,
        vel_y: vel_y as f64,
        session_time,
    })
}

fn header(kind: u8) -> Vec<u8> {
    let mut v = Vec::with_capacity(64);
    v.extend_from_slice(MAGIC);
    v.push(kind);
    v
}

pub fn encode_session(track_name: &str) -> Vec<u8> {
    let mut v = header(KIND_SESSION);
    let name = track_name.as_bytes();
    let n = name.len().min(u16::MAX as usize);
    // writes into a Vec cannot fail
    let _ = v.write_u16::<LittleEndian>(n as u16);
    v.extend_from_slice(&name[..n]);
    v
}

/// Relay-side encoding; `yaw` is turned back into a compass heading.
pub fn encode_sample(s: &TelemetrySample) -> Vec<u8> {
    let mut v = header(KIND_SAMPLE);
    let _ = v.write_f64::<LittleEndian>(s.session_time);
    let _ = v.write_f32::<LittleEndian>(s.lap_dist_pct as f32);
    let _ = v.write_i32::<LittleEndian>(s.current_lap);
    let _ = v.write_i32::<LittleEndian>(s.player_lap);
    let _ = v.write_i32::<LittleEndian>(s.session_state.into());
    let _ = v.write_i32::<LittleEndian>(s.track_surface.into());
    let _ = v.write_i32::<LittleEndian>(s.incident_count);
    v.push(s.is_on_track as u8);
    let _ = v.write_f32::<LittleEndian>((FRAC_PI_2 - s.yaw) as f32);
    let _ = v.write_f32::<LittleEndian>(s.vel_x as f32);
    let _ = v.write_f32::<LittleEndian>(s.vel_y as f32);
    v
}

pub fn encode_disconnect() -> Vec<u8> {
    header(KIND_DISCONNECT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TelemetrySample {
        TelemetrySample {
            lap_dist_pct: 0.5,
            current_lap: 4,
            player_lap: 4,
            session_state: SessionState::Racing,
            track_surface: TrackSurface::OnTrack,
            incident_count: 2,
            is_on_track: true,
            yaw: 0.75,
            vel_x: 52.5,
            vel_y: -1.25,
            session_time: 812.125,
        }
    }

    #[test]
    fn sample_datagram_decodes() {
        let pkt = encode_sample(&sample());
        assert_eq!(pkt.len(), 50);
        let Some(Datagram::Sample(s)) = parse_datagram(&pkt) else {
            panic!("not a sample");
        };
        let want = sample();
        assert_eq!(s.current_lap, want.current_lap);
        assert_eq!(s.session_state, SessionState::Racing);
        assert_eq!(s.track_surface, TrackSurface::OnTrack);
        assert_eq!(s.session_time, want.session_time);
        assert_eq!(s.lap_dist_pct, 0.5);
        assert!((s.yaw - want.yaw).abs() < 1e-6);
        assert_eq!((s.vel_x, s.vel_y), (52.5, -1.25));
    }

    #[test]
    fn yaw_north_is_converted() {
        let mut pkt = encode_sample(&sample());
        // heading 0 (north) lands at +pi/2 in map frame
        let off = pkt.len() - 12;
        pkt[off..off + 4].copy_from_slice(&0f32.to_le_bytes());
        let Some(Datagram::Sample(s)) = parse_datagram(&pkt) else { panic!() };
        assert!((s.yaw - FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn session_and_disconnect_decode() {
        assert_eq!(
            parse_datagram(&encode_session("Brands Hatch")),
            Some(Datagram::Session { track_name: "Brands Hatch".into() })
        );
        assert_eq!(parse_datagram(&encode_disconnect()), Some(Datagram::Disconnect));
    }

    #[test]
    fn malformed_datagrams_are_rejected() {
        assert_eq!(parse_datagram(b""), None);
        assert_eq!(parse_datagram(b"XMAP\x01"), None);
        assert_eq!(parse_datagram(b"TMAP\x09"), None);
        let pkt = encode_sample(&sample());
        assert_eq!(parse_datagram(&pkt[..pkt.len() - 1]), None);
        let mut bad_name = encode_session("ab");
        bad_name.truncate(bad_name.len() - 1);
        assert_eq!(parse_datagram(&bad_name), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn relay_lifecycle_maps_to_events() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let src = UdpSource::new(UdpConfig {
            bind_addr: addr.to_string(),
            idle_timeout: Duration::from_millis(200),
        });
        let (tx, rx) = channel();
        let task = tokio::spawn(async move { src.serve(socket, tx).await });

        let relay = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        // dropped: no session yet
        relay.send_to(&encode_sample(&sample()), addr).await.unwrap();
        time::sleep(Duration::from_millis(20)).await;
        relay.send_to(&encode_session("Sebring"), addr).await.unwrap();
        time::sleep(Duration::from_millis(20)).await;
        relay.send_to(&encode_sample(&sample()), addr).await.unwrap();
        relay.send_to(b"junk", addr).await.unwrap();

        let mut events = Vec::new();
        for _ in 0..100 {
            events.extend(rx.try_iter());
            if events.len() >= 3 {
                break;
            }
            time::sleep(Duration::from_millis(20)).await;
        }
        task.abort();

        assert_eq!(events.len(), 3, "{:?}", events);
        assert_eq!(events[0], SourceEvent::Connected { track_name: "Sebring".into() });
        assert!(matches!(events[1], SourceEvent::Sample(_)));
        assert_eq!(events[2], SourceEvent::Disconnected);
    }
}
