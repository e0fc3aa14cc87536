//! Socket feed: newline delimited JSON frames over an outbound TCP connection.
//!
//! Every non-blank frame gets exactly one response frame on the same stream,
//! including frames that are not valid UTF-8 or JSON. When the stream closes
//! the feed waits `reconnect_delay` and connects again. Reads poll so that
//! setting the stop flag detaches an idle connection too.

use std::{
    io::{self, BufRead, BufReader, ErrorKind, Write},
    net::TcpStream,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use log::{info, warn};
use serde_json::Value;

use crate::{
    config::SocketConfig,
    ingest::{
        ADD_MUSIC_TRACK, ResponseFrame, error::IngestError, frame_type,
        gateway::{Gateway, IngestAck},
        submit_add_request,
    },
    notify::Origin,
};

/// How often a blocked read or a reconnect wait looks at the stop flag.
const STOP_POLL: Duration = Duration::from_millis(100);

pub struct SocketFeed {
    config: SocketConfig,
    gateway: Arc<Gateway>,
}

impl SocketFeed {
    pub fn new(config: SocketConfig, gateway: Arc<Gateway>) -> Self {
        Self { config, gateway }
    }

    /// Answers one raw frame, without its trailing newline.
    pub fn handle_frame(&self, frame: &[u8]) -> String {
        let result = match serde_json::from_slice::<Value>(frame) {
            Err(e) => self
                .gateway
                .reject(Origin::Socket, IngestError::Transport(format!("invalid frame: {e}"))),
            Ok(data) => match frame_type(&data) {
                Some(ADD_MUSIC_TRACK) => submit_add_request(&self.gateway, &data, Origin::Socket),
                other => self.gateway.reject(
                    Origin::Socket,
                    IngestError::Transport(format!(
                        "unsupported frame type {}",
                        other.unwrap_or("<none>")
                    )),
                ),
            },
        };

        ResponseFrame::new(&IngestAck::from(&result))
            .to_value()
            .to_string()
    }

    /// Connects, serves, reconnects, until `stop` is set.
    pub fn run(&self, stop: &AtomicBool) {
        let delay = self.config.reconnect_delay();

        while !stop.load(Ordering::SeqCst) {
            match TcpStream::connect(&self.config.addr) {
                Ok(stream) => {
                    info!("Socket feed connected to {}", self.config.addr);
                    match self.serve(stream, stop) {
                        Ok(()) => info!("Socket feed {} closed", self.config.addr),
                        Err(e) => warn!("Socket feed {} failed: {e}", self.config.addr),
                    }
                }
                Err(e) => warn!("Could not connect socket feed to {}: {e}", self.config.addr),
            }

            if stop.load(Ordering::SeqCst) {
                break;
            }
            info!("Reconnecting socket feed in {} ms", delay.as_millis());
            wait_unless_stopped(delay, stop);
        }
    }

    pub fn spawn(self, stop: Arc<AtomicBool>) -> JoinHandle<()> {
        thread::spawn(move || self.run(&stop))
    }

    fn serve(&self, stream: TcpStream, stop: &AtomicBool) -> io::Result<()> {
        stream.set_read_timeout(Some(STOP_POLL))?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = stream;
        // bytes read before a timeout stay here until the rest of the frame arrives
        let mut frame = Vec::new();

        while !stop.load(Ordering::SeqCst) {
            match reader.read_until(b'\n', &mut frame) {
                Ok(0) => {
                    self.answer(&frame, &mut writer)?;
                    return Ok(());
                }
                Ok(_) if frame.ends_with(b"\n") => {
                    self.answer(&frame, &mut writer)?;
                    frame.clear();
                }
                Ok(_) => {}
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
        }
        info!("Socket feed {} stopped", self.config.addr);
        Ok(())
    }

    fn answer(&self, frame: &[u8], writer: &mut TcpStream) -> io::Result<()> {
        let frame = frame.trim_ascii();
        if frame.is_empty() {
            return Ok(());
        }
        let response = self.handle_frame(frame);
        writer.write_all(response.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()
    }
}

fn wait_unless_stopped(delay: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while !stop.load(Ordering::SeqCst) {
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            break;
        }
        thread::sleep(left.min(STOP_POLL));
    }
}
