//! Controller readings — from phones over OSC, or simulated from the window.
//!
//! The public interface is [`ControlEvent`] delivered over a `mpsc` channel.
//! Consumers don't need to know whether a reading came from a phone or from
//! the mouse.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use anyhow::Context;
use rosc::{OscMessage, OscPacket, OscType};

/// OSC address the phone app sends horizontal motion on.
pub const HORIZONTAL_MOTION_ADDR: &str = "/hfosc/horizontalmotion";

const BUF_SIZE: usize = 1536;

// ════════════════════════════════════════════════════════════════════════════
// ControlEvent
// ════════════════════════════════════════════════════════════════════════════

/// What a controller source tells the app loop.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlEvent {
    /// A normalised horizontal position (nominally 0.0–1.0) for one voice.
    Reading { channel: String, position: f32 },

    /// Quit the application.
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// ControlSource trait — unified interface for OSC and simulation
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`ControlEvent`]s over a channel.
pub trait ControlSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<ControlEvent>);
}

/// Run a control source on its own thread, feeding `tx`.
pub fn spawn_control_source<C: ControlSource>(source: C, tx: Sender<ControlEvent>) -> JoinHandle<()> {
    thread::spawn(move || Box::new(source).run(tx))
}

// ════════════════════════════════════════════════════════════════════════════
// OscListener — one UDP port per voice
// ════════════════════════════════════════════════════════════════════════════

/// Listens on one UDP port and turns horizontal-motion messages into
/// readings for a single channel.
pub struct OscListener {
    channel: String,
    address: String,
    socket:  UdpSocket,
}

impl OscListener {
    /// Bind `0.0.0.0:port`.  Port 0 picks a free port (see
    /// [`OscListener::local_addr`]).
    pub fn bind(channel: &str, port: u16, address: &str) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
            .with_context(|| format!("failed to bind OSC port {} for {}", port, channel))?;
        Ok(OscListener {
            channel: channel.to_string(),
            address: address.to_string(),
            socket,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl ControlSource for OscListener {
    fn run(self: Box<Self>, tx: Sender<ControlEvent>) {
        if let Ok(addr) = self.socket.local_addr() {
            log::info!("listening for {} on {} ({})", self.channel, addr, self.address);
        }

        let mut buf = [0u8; BUF_SIZE];
        loop {
            let size = match self.socket.recv(&mut buf) {
                Ok(size) => size,
                Err(e) => match e.kind() {
                    io::ErrorKind::Interrupted
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset => continue,
                    _ => {
                        log::error!("{}: OSC socket failed: {}", self.channel, e);
                        return;
                    }
                },
            };

            for position in decode_readings(&buf[..size], &self.address) {
                let event = ControlEvent::Reading { channel: self.channel.clone(), position };
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
    }
}

/// Decode one datagram and pull every reading for `address` out of it.
/// Malformed packets are logged and yield nothing.
pub fn decode_readings(bytes: &[u8], address: &str) -> Vec<f32> {
    match rosc::decoder::decode_udp(bytes) {
        Ok((_, packet)) => {
            let mut out = Vec::new();
            collect_readings(&packet, address, &mut out);
            out
        }
        Err(e) => {
            log::warn!("dropping malformed OSC packet ({} bytes): {:?}", bytes.len(), e);
            Vec::new()
        }
    }
}

fn collect_readings(packet: &OscPacket, address: &str, out: &mut Vec<f32>) {
    match packet {
        OscPacket::Message(msg) => {
            if let Some(position) = reading_from_message(msg, address) {
                out.push(position);
            }
        }
        OscPacket::Bundle(bundle) => {
            for inner in &bundle.content {
                collect_readings(inner, address, out);
            }
        }
    }
}

/// The position carried by `msg`, if it is addressed to `address` and its
/// first argument is numeric.
pub fn reading_from_message(msg: &OscMessage, address: &str) -> Option<f32> {
    if msg.addr != address {
        log::debug!("ignoring OSC message on {}", msg.addr);
        return None;
    }
    match msg.args.first() {
        Some(OscType::Float(f))  => Some(*f),
        Some(OscType::Double(d)) => Some(*d as f32),
        Some(OscType::Int(i))    => Some(*i as f32),
        other => {
            log::debug!("{}: no usable position in {:?}", msg.addr, other);
            None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimControlSource — mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    /// Voice `voice` (index into the configured voices) slid to `position`.
    Slide { voice: usize, position: f32 },
    Quit,
}

/// Control source driven by [`SimInput`] events from the visualizer.
///
/// The window sends `SimInput` here; this translator turns voice indices into
/// channel ids, so the app loop handles simulated and real readings alike.
pub struct SimControlSource {
    channels: Vec<String>,
    rx:       Receiver<SimInput>,
}

impl SimControlSource {
    pub fn new(channels: Vec<String>, rx: Receiver<SimInput>) -> Self {
        SimControlSource { channels, rx }
    }
}

impl ControlSource for SimControlSource {
    fn run(self: Box<Self>, tx: Sender<ControlEvent>) {
        for input in self.rx {
            let event = match input {
                SimInput::Slide { voice, position } => match self.channels.get(voice) {
                    Some(channel) => ControlEvent::Reading { channel: channel.clone(), position },
                    None => continue,
                },
                SimInput::Quit => {
                    let _ = tx.send(ControlEvent::Quit);
                    return;
                }
            };
            if tx.send(event).is_err() {
                return;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
