//! Top-level application state.
//!
//! `AppState` owns the `ControllerRouter`, the `DisplayState` and the
//! `PitchPanel`.  It handles `ControlEvent`s and `UiAction`s on the app loop
//! thread, so every voice mutation is serialized there.  Sound events are
//! queued for the MIDI player; display events update the display state.

use std::sync::mpsc::{self, TryRecvError};

use choir_voice::{ControllerRouter, Event, Pitch, Voice, VoiceError, BLACK, CHOIR_AAHS};

use crate::display::{DisplayState, PitchPanel, PANEL_H};
use crate::player::Player;
use crate::source::{
    spawn_control_source, ControlEvent, OscListener, SimControlSource, HORIZONTAL_MOTION_ADDR,
};
use crate::visualizer::{UiAction, Visualizer};

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

/// One voice and the UDP port its controller sends to.
#[derive(Clone, Debug)]
pub struct VoiceConfig {
    pub name:    String,
    pub pitches: Vec<Pitch>,
    /// General MIDI program.
    pub program: u8,
    pub channel: u8,
    pub color:   u32,
    pub port:    u16,
}

impl VoiceConfig {
    /// Channel id readings for this voice carry.
    pub fn channel_id(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Configuration for the full application.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub voices:        Vec<VoiceConfig>,
    pub osc_address:   String,
    pub title:         String,
    pub window_width:  usize,
    pub window_height: usize,
    pub midi_client:   String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let voice = |name: &str, pitches: [Pitch; 3], channel: u8, port: u16| VoiceConfig {
            name: name.to_string(),
            pitches: pitches.to_vec(),
            program: CHOIR_AAHS,
            channel,
            color: BLACK,
            port,
        };
        AppConfig {
            voices: vec![
                voice("BASS",  [43, 45, 47], 0, 57110), // G2  A2  B2
                voice("TENOR", [52, 57, 59], 1, 57111), // E3  A3  B3
                voice("ALTO",  [61, 62, 63], 2, 57112), // C#4 D4  D#4
            ],
            osc_address:   HORIZONTAL_MOTION_ADDR.to_string(),
            title:         "Phone Music".to_string(),
            window_width:  1200,
            window_height: 760,
            midi_client:   "osc_choir".to_string(),
        }
    }
}

impl AppConfig {
    /// Build the voices.  Fails on a channel or program MIDI cannot carry.
    pub fn router(&self) -> Result<ControllerRouter, VoiceError> {
        let voices = self
            .voices
            .iter()
            .map(|v| Voice::new(&v.name, v.pitches.clone(), v.program, v.channel, v.color))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ControllerRouter::new(voices))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    router:  ControllerRouter,
    display: DisplayState,
    panel:   PitchPanel,
    /// Sound events waiting for the MIDI player.
    outbox:  Vec<Event>,
    pub status: String,
}

impl AppState {
    pub fn new(cfg: &AppConfig) -> Result<Self, VoiceError> {
        let router = cfg.router()?;
        let mut display = DisplayState::new(cfg.window_width, cfg.window_height);
        display.background = router.background_color();
        let panel = PitchPanel::new(&router);

        let mut outbox = Vec::new();
        router.announce(&mut outbox);

        Ok(AppState {
            router,
            display,
            panel,
            outbox,
            status: "Ready — waiting for controllers".to_string(),
        })
    }

    /// Route a control event.  `Quit` is left to the run loop.
    pub fn handle_control(&mut self, event: ControlEvent) {
        let ControlEvent::Reading { channel, position } = event else { return };

        let mut events = Vec::new();
        match self.router.handle_reading(&channel, position, &mut events) {
            Ok(pitch) => {
                log::trace!("{} {:.3} → {}", channel, position, pitch);
            }
            Err(e) => {
                log::warn!("dropping reading for {}: {}", channel, e);
                self.status = e.to_string();
            }
        }
        self.dispatch(events);
    }

    /// Handle direct window input.
    pub fn handle_ui(&mut self, action: UiAction) {
        match action {
            UiAction::Click { x, y } => {
                if self.panel.open && y < PANEL_H {
                    return;
                }
                let Some(voice) = self.display.bar_at(x, y).map(str::to_string) else { return };
                let mut events = Vec::new();
                match self.router.mute(&voice, &mut events) {
                    Ok(()) => self.status = format!("{} muted", voice),
                    Err(e) => log::warn!("mute failed: {}", e),
                }
                self.dispatch(events);
            }
            UiAction::TogglePanel => self.panel.toggle(),
            UiAction::MoveCursor(delta) => self.panel.move_cursor(delta),
            UiAction::Pick(delta) => {
                let Some(choice) = self.panel.pick(delta) else { return };
                match self.router.reassign(&choice.voice, choice.slot, &choice.note) {
                    Ok(_) => {
                        let set = self.router.voice(&choice.voice).map(|v| v.pitch_set().to_string());
                        self.status = format!(
                            "{} pitches {}",
                            choice.voice,
                            set.unwrap_or_default()
                        );
                    }
                    Err(e) => {
                        log::warn!("rejected {:?}: {}", choice, e);
                        self.status = e.to_string();
                    }
                }
            }
        }
    }

    /// Silence every voice (before exit).
    pub fn shutdown(&mut self) {
        let mut events = Vec::new();
        self.router.stop_all(&mut events);
        self.dispatch(events);
    }

    fn dispatch(&mut self, events: Vec<Event>) {
        for event in events {
            if event.is_sound() {
                self.outbox.push(event);
            } else {
                self.display.apply(&event);
            }
        }
    }

    /// Drain the sound events queued since the last call.
    pub fn take_sound(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.outbox)
    }

    // ── Accessors for the render loop ─────────────────────────────────────

    pub fn router(&self)  -> &ControllerRouter { &self.router }
    pub fn display(&self) -> &DisplayState     { &self.display }
    pub fn panel(&self)   -> &PitchPanel       { &self.panel }
}

// ════════════════════════════════════════════════════════════════════════════
// run() — the main application loop
// ════════════════════════════════════════════════════════════════════════════

/// Run the full application.
///
/// Binds one OSC listener per voice, opens the window and the MIDI output,
/// and drives the event/render loop at ~60 fps until the window closes.
pub fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let mut app = AppState::new(&cfg)?;
    let (control_tx, control_rx) = mpsc::channel::<ControlEvent>();

    // ── OSC listeners, one port per voice ─────────────────────────────────
    for voice in &cfg.voices {
        let listener = OscListener::bind(&voice.channel_id(), voice.port, &cfg.osc_address)?;
        spawn_control_source(listener, control_tx.clone());
    }

    // ── Simulation source fed by the window ───────────────────────────────
    let (sim_tx, sim_rx) = mpsc::channel();
    let channels = cfg.voices.iter().map(VoiceConfig::channel_id).collect();
    spawn_control_source(SimControlSource::new(channels, sim_rx), control_tx);

    let mut vis = Visualizer::new(&cfg.title, cfg.window_width, cfg.window_height, sim_tx)?;
    let mut player = Player::spawn(&cfg.midi_client);

    // ── Main loop ─────────────────────────────────────────────────────────
    'frames: while vis.is_open() {
        for action in vis.poll_input() {
            app.handle_ui(action);
        }

        loop {
            match control_rx.try_recv() {
                Ok(ControlEvent::Quit) => break 'frames,
                Ok(event) => app.handle_control(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break 'frames,
            }
        }

        for event in app.take_sound() {
            player.send_event(&event);
        }

        vis.render(app.display(), app.panel(), &app.status);
    }

    app.shutdown();
    for event in app.take_sound() {
        player.send_event(&event);
    }
    player.quit();
    log::info!("bye");
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
