//! Real-time MIDI output thread.
//!
//! Sound events from the voices are forwarded over a channel to a thread
//! that owns the MIDI connection, so a slow port never stalls the display.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use choir_voice::{Event, Pitch};

// ════════════════════════════════════════════════════════════════════════════
// SoundCommand — sent to the output thread
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SoundCommand {
    /// Select an instrument (MIDI program 0–127) on a channel.
    ProgramChange { channel: u8, program: u8 },
    NoteOn  { channel: u8, pitch: Pitch, velocity: u8 },
    NoteOff { channel: u8, pitch: Pitch },
    /// Terminate the thread.
    Quit,
}

impl SoundCommand {
    /// The command for a sound event; display events have none.
    pub fn from_event(event: &Event) -> Option<Self> {
        match *event {
            Event::ProgramChange { channel, program } =>
                Some(SoundCommand::ProgramChange { channel, program }),
            Event::NoteOn { channel, pitch, velocity } =>
                Some(SoundCommand::NoteOn { channel, pitch, velocity }),
            Event::NoteOff { channel, pitch } =>
                Some(SoundCommand::NoteOff { channel, pitch }),
            _ => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MidiOut — abstraction over midir / null (for testing)
// ════════════════════════════════════════════════════════════════════════════

pub trait MidiOut: Send {
    fn program_change(&mut self, channel: u8, program: u8);
    fn note_on(&mut self,  channel: u8, note: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, note: u8);
}

pub fn program_change_bytes(channel: u8, program: u8) -> [u8; 2] {
    [0xC0 | (channel & 0x0F), program & 0x7F]
}

pub fn note_on_bytes(channel: u8, note: u8, velocity: u8) -> [u8; 3] {
    [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
}

pub fn note_off_bytes(channel: u8, note: u8) -> [u8; 3] {
    [0x80 | (channel & 0x0F), note & 0x7F, 0]
}

// ── midir backend ─────────────────────────────────────────────────────────

struct MidirOut {
    conn: midir::MidiOutputConnection,
}

impl MidirOut {
    fn send(&mut self, bytes: &[u8]) {
        if let Err(e) = self.conn.send(bytes) {
            log::warn!("MIDI send failed: {}", e);
        }
    }
}

impl MidiOut for MidirOut {
    fn program_change(&mut self, channel: u8, program: u8) {
        self.send(&program_change_bytes(channel, program));
    }
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.send(&note_on_bytes(channel, note, velocity));
    }
    fn note_off(&mut self, channel: u8, note: u8) {
        self.send(&note_off_bytes(channel, note));
    }
}

// ── null backend (used when no MIDI port is available) ────────────────────

struct NullOut;
impl MidiOut for NullOut {
    fn program_change(&mut self, _ch: u8, _p: u8)   {}
    fn note_on(&mut self, _ch: u8, _n: u8, _v: u8)  {}
    fn note_off(&mut self, _ch: u8, _n: u8)          {}
}

// ════════════════════════════════════════════════════════════════════════════
// open_midi_output — enumerate ports and pick first available
// ════════════════════════════════════════════════════════════════════════════

/// Try to open a MIDI output port, preferring a software synthesiser.
/// Falls back to a silent output with a warning if none is found.
fn open_midi_output(client_name: &str) -> Box<dyn MidiOut> {
    let midi_out = match midir::MidiOutput::new(client_name) {
        Ok(m)  => m,
        Err(e) => {
            log::warn!("MIDI init error: {} — using null output", e);
            return Box::new(NullOut);
        }
    };

    let ports = midi_out.ports();
    if ports.is_empty() {
        log::warn!("no MIDI output ports found — using null output");
        log::warn!("start a synthesiser such as `timidity -iA` or `fluidsynth` to hear the choir");
        return Box::new(NullOut);
    }

    let port_idx = ports.iter().enumerate()
        .find(|(_, p)| {
            midi_out.port_name(p).map(|n| {
                let n = n.to_lowercase();
                n.contains("fluid") || n.contains("timidity") ||
                n.contains("microsoft") || n.contains("gm") ||
                n.contains("synth")
            }).unwrap_or(false)
        })
        .map(|(i, _)| i)
        .unwrap_or(0);

    let port = &ports[port_idx];
    let name = midi_out.port_name(port)
        .unwrap_or_else(|_| "Unknown".to_string());
    log::info!("opening MIDI port: {}", name);

    match midi_out.connect(port, "osc-choir") {
        Ok(conn) => Box::new(MidirOut { conn }),
        Err(e) => {
            log::warn!("failed to connect to {}: {} — using null output", name, e);
            Box::new(NullOut)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Player — handle to the output thread
// ════════════════════════════════════════════════════════════════════════════

pub struct Player {
    cmd_tx: Sender<SoundCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Player {
    /// Spawn the output thread on the system's MIDI output.
    pub fn spawn(client_name: &str) -> Self {
        let client_name = client_name.to_string();
        Self::spawn_with(move || open_midi_output(&client_name))
    }

    /// Spawn the output thread on a MIDI output built inside that thread.
    pub fn spawn_with<F>(open: F) -> Self
    where
        F: FnOnce() -> Box<dyn MidiOut> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel::<SoundCommand>();
        let handle = thread::spawn(move || player_thread(open(), cmd_rx));
        Player { cmd_tx, handle: Some(handle) }
    }

    /// Forward a sound event; display events are ignored.
    pub fn send_event(&self, event: &Event) {
        if let Some(cmd) = SoundCommand::from_event(event) {
            let _ = self.cmd_tx.send(cmd);
        }
    }

    /// Stop the thread after it has sent everything queued so far.
    pub fn quit(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.cmd_tx.send(SoundCommand::Quit);
            if handle.join().is_err() {
                log::error!("MIDI output thread panicked");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.quit();
    }
}

fn player_thread(mut midi: Box<dyn MidiOut>, cmd_rx: Receiver<SoundCommand>) {
    for cmd in cmd_rx {
        match cmd {
            SoundCommand::ProgramChange { channel, program } => {
                midi.program_change(channel, program);
            }
            SoundCommand::NoteOn { channel, pitch, velocity } => {
                midi.note_on(channel, pitch, velocity);
            }
            SoundCommand::NoteOff { channel, pitch } => {
                midi.note_off(channel, pitch);
            }
            SoundCommand::Quit => return,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingOut {
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl MidiOut for RecordingOut {
        fn program_change(&mut self, channel: u8, program: u8) {
            self.sent.lock().unwrap().push(program_change_bytes(channel, program).to_vec());
        }
        fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
            self.sent.lock().unwrap().push(note_on_bytes(channel, note, velocity).to_vec());
        }
        fn note_off(&mut self, channel: u8, note: u8) {
            self.sent.lock().unwrap().push(note_off_bytes(channel, note).to_vec());
        }
    }

    #[test]
    fn status_bytes_carry_channel() {
        assert_eq!(program_change_bytes(2, 52), [0xC2, 52]);
        assert_eq!(note_on_bytes(1, 60, 127), [0x91, 60, 127]);
        assert_eq!(note_off_bytes(0, 43), [0x80, 43, 0]);
    }

    #[test]
    fn display_events_are_not_sound() {
        let bg = Event::SetBackground { color: 0xFFFFFFFF };
        assert_eq!(SoundCommand::from_event(&bg), None);
        let off = Event::NoteOff { channel: 1, pitch: 57 };
        assert_eq!(
            SoundCommand::from_event(&off),
            Some(SoundCommand::NoteOff { channel: 1, pitch: 57 })
        );
    }

    #[test]
    fn player_sends_in_order_and_drains_before_quit() {
        let out = RecordingOut::default();
        let sent = Arc::clone(&out.sent);
        let mut player = Player::spawn_with(move || Box::new(out) as Box<dyn MidiOut>);

        player.send_event(&Event::ProgramChange { channel: 0, program: 52 });
        player.send_event(&Event::NoteOn { channel: 0, pitch: 43, velocity: 127 });
        player.send_event(&Event::ClearBar { voice: "BASS".to_string() });
        player.send_event(&Event::NoteOff { channel: 0, pitch: 43 });
        player.quit();

        assert_eq!(
            *sent.lock().unwrap(),
            vec![vec![0xC0, 52], vec![0x90, 43, 127], vec![0x80, 43, 0]]
        );
    }
}
