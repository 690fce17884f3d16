//! # choir_voice
//!
//! The musical core of a motion-controlled choir: each phone controller
//! reports a normalised horizontal position, which is quantized onto a small
//! per-voice pitch set and turned into note-on / note-off bookkeeping.
//!
//! * **Position** (0.0–1.0) → **bucket** in the voice's [`PitchSet`]
//! * **Bucket** → **pitch** (MIDI note number, 60 = C4)
//! * **Pitch change** → [`Event`]s for a synthesiser and a display
//!
//! Nothing in here touches a socket, a window or a MIDI port.  Side effects
//! leave through an [`EventSink`], so the same code drives the live app and
//! the tests.
//!
//! ## Quick start
//!
//! ```rust
//! use choir_voice::{ControllerRouter, Event, Voice, CHOIR_AAHS};
//!
//! let mut router = ControllerRouter::new(vec![
//!     Voice::new("BASS", [43, 45, 47], CHOIR_AAHS, 0, 0xFF000000).unwrap(),
//! ]);
//!
//! let mut events: Vec<Event> = Vec::new();
//! let pitch = router.handle_reading("bass", 0.34, &mut events).unwrap();
//! assert_eq!(pitch, 45);
//! assert!(matches!(events[0], Event::NoteOn { pitch: 45, .. }));
//! ```

use std::fmt;
use std::sync::mpsc::Sender;

/// MIDI-style note number: 60 = middle C (C4).
pub type Pitch = u8;

/// Lowest pitch the display represents (two semitones below C2).
pub const LOWEST_PITCH: Pitch = 36 - 2;
/// Highest pitch the display represents (C6).
pub const HIGHEST_PITCH: Pitch = 84;

/// Every note-on is sent at full velocity.
pub const DEFAULT_VELOCITY: u8 = 127;

/// General MIDI program 52, "Choir Aahs".
pub const CHOIR_AAHS: u8 = 52;

/// Note names within one octave, indexed by `pitch % 12`.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

// ════════════════════════════════════════════════════════════════════════════
// VoiceError
// ════════════════════════════════════════════════════════════════════════════

/// Local, synchronous failures of the core.  None of them are transient.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoiceError {
    /// A pitch set cannot serve the request (empty set, bad slot index).
    InvalidConfiguration(String),
    /// A note name such as `"H4"` or `"C"` could not be parsed.
    InvalidNoteName(String),
    /// A reading or action was tagged with a voice nobody owns.
    UnknownChannel(String),
}

impl fmt::Display for VoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceError::InvalidConfiguration(why) => write!(f, "invalid configuration: {}", why),
            VoiceError::InvalidNoteName(name)     => write!(f, "invalid note name: {:?}", name),
            VoiceError::UnknownChannel(id)        => write!(f, "unknown channel: {:?}", id),
        }
    }
}

impl std::error::Error for VoiceError {}

// ════════════════════════════════════════════════════════════════════════════
// Note names — pitch ↔ "C#4"
// ════════════════════════════════════════════════════════════════════════════

/// Index of `pitch` within its octave (0 = C … 11 = B).
pub fn note_index(pitch: Pitch) -> u8 {
    pitch % 12
}

/// Octave number of `pitch`, where 60 is in octave 4.
pub fn octave(pitch: Pitch) -> i32 {
    pitch as i32 / 12 - 1
}

/// Render a pitch as note name plus octave.
///
/// ```rust
/// assert_eq!(choir_voice::to_name(60), "C4");
/// assert_eq!(choir_voice::to_name(54), "F#3");
/// assert_eq!(choir_voice::to_name(0),  "C-1");
/// ```
pub fn to_name(pitch: Pitch) -> String {
    format!("{}{}", NOTE_NAMES[note_index(pitch) as usize], octave(pitch))
}

/// Parse a note name produced by [`to_name`] back into a pitch.
///
/// Only the exact spelling `to_name` produces is accepted: case-sensitive,
/// sharps only, no surrounding whitespace.  The octave may be `-1`
/// (`"B-1"` = 11) but never `-0` or zero-padded.
pub fn from_name(name: &str) -> Result<Pitch, VoiceError> {
    let invalid = || VoiceError::InvalidNoteName(name.to_string());

    let split = name
        .find(|c: char| c == '-' || c.is_ascii_digit())
        .ok_or_else(invalid)?;
    let (note, octave) = name.split_at(split);
    if octave != "-1" && !(octave.len() == 1 && octave.as_bytes()[0].is_ascii_digit()) {
        return Err(invalid());
    }

    let index = NOTE_NAMES
        .iter()
        .position(|n| *n == note)
        .ok_or_else(invalid)?;
    let octave: i64 = octave.parse().map_err(|_| invalid())?;

    let pitch = (octave + 1) * 12 + index as i64;
    if pitch > 127 {
        return Err(invalid());
    }
    Ok(pitch as Pitch)
}

// ════════════════════════════════════════════════════════════════════════════
// Quantization — position (0.0–1.0) → pitch
// ════════════════════════════════════════════════════════════════════════════

/// Map a normalised position onto one of the pitches in `pitch_set`.
///
/// `[0, 1]` is split into `N` equal buckets; bucket `i` selects
/// `pitch_set[i]`.  Positions outside the range are clamped (sensor noise
/// routinely overshoots), so `1.0` and above land on the last pitch.  A NaN
/// position lands on the first.
///
/// ```rust
/// use choir_voice::quantize;
///
/// let set = [43, 45, 47];
/// assert_eq!(quantize(0.0,  &set).unwrap(), 43);
/// assert_eq!(quantize(0.34, &set).unwrap(), 45);
/// assert_eq!(quantize(0.99, &set).unwrap(), 47);
/// assert_eq!(quantize(1.5,  &set).unwrap(), 47);
/// ```
pub fn quantize(position: f32, pitch_set: &[Pitch]) -> Result<Pitch, VoiceError> {
    let n = pitch_set.len();
    if n == 0 {
        return Err(VoiceError::InvalidConfiguration(
            "cannot quantize onto an empty pitch set".to_string(),
        ));
    }
    let width  = 1.0 / n as f64;
    let bucket = (position as f64 / width).floor();
    // Float → usize casts saturate: negatives and NaN become 0.
    let index  = (bucket as usize).min(n - 1);
    Ok(pitch_set[index])
}

// ════════════════════════════════════════════════════════════════════════════
// PitchSet
// ════════════════════════════════════════════════════════════════════════════

/// The ordered pitches a voice can reach.  Slot order is bucket order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PitchSet {
    pitches: Vec<Pitch>,
}

impl PitchSet {
    pub fn new(pitches: Vec<Pitch>) -> Self {
        PitchSet { pitches }
    }

    pub fn pitches(&self) -> &[Pitch] { &self.pitches }

    /// Quantize `position` onto this set.  See [`quantize`].
    pub fn quantize(&self, position: f32) -> Result<Pitch, VoiceError> {
        quantize(position, &self.pitches)
    }

    /// A copy of this set with `slot` replaced by `pitch`.
    pub fn with_slot(&self, slot: usize, pitch: Pitch) -> Result<PitchSet, VoiceError> {
        if slot >= self.pitches.len() {
            return Err(VoiceError::InvalidConfiguration(format!(
                "slot {} out of range for a set of {} pitches",
                slot,
                self.pitches.len()
            )));
        }
        let mut pitches = self.pitches.clone();
        pitches[slot] = pitch;
        Ok(PitchSet { pitches })
    }
}

impl From<Vec<Pitch>> for PitchSet {
    fn from(pitches: Vec<Pitch>) -> Self { PitchSet::new(pitches) }
}

impl<const N: usize> From<[Pitch; N]> for PitchSet {
    fn from(pitches: [Pitch; N]) -> Self { PitchSet::new(pitches.to_vec()) }
}

impl fmt::Display for PitchSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.pitches.iter().map(|&p| to_name(p)).collect();
        write!(f, "[{}]", names.join(" "))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Event / EventSink — everything the core asks the outside world to do
// ════════════════════════════════════════════════════════════════════════════

/// A side effect requested by a [`Voice`] or the [`ControllerRouter`].
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Select the instrument for a channel.
    ProgramChange { channel: u8, program: u8 },
    NoteOn  { channel: u8, pitch: Pitch, velocity: u8 },
    NoteOff { channel: u8, pitch: Pitch },
    /// Replace `voice`'s bar.  `vertical_fraction` is 0.0 at the top of the
    /// display and 1.0 at the bottom.
    DrawBar {
        voice: String,
        vertical_fraction: f32,
        label: String,
        color: u32,
    },
    /// Remove `voice`'s bar.
    ClearBar { voice: String },
    /// New display background (ARGB).
    SetBackground { color: u32 },
}

impl Event {
    /// True for events a synthesiser consumes.
    pub fn is_sound(&self) -> bool {
        matches!(
            self,
            Event::ProgramChange { .. } | Event::NoteOn { .. } | Event::NoteOff { .. }
        )
    }
}

/// Anything that accepts [`Event`]s.
pub trait EventSink {
    fn emit(&mut self, event: Event);
}

impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) {
        self.push(event);
    }
}

impl EventSink for Sender<Event> {
    fn emit(&mut self, event: Event) {
        // A closed receiver means the consumer is shutting down.
        let _ = self.send(event);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Voice
// ════════════════════════════════════════════════════════════════════════════

/// Where the bar for `pitch` sits on the display: 0.0 at the top
/// ([`HIGHEST_PITCH`]) and 1.0 at the bottom ([`LOWEST_PITCH`]).
///
/// Pitches outside the represented range give values outside `[0, 1]`;
/// the display is responsible for keeping the bar on screen.
pub fn vertical_fraction(pitch: Pitch) -> f32 {
    let numerator   = pitch as f32 - LOWEST_PITCH as f32;
    let denominator = HIGHEST_PITCH as f32 - LOWEST_PITCH as f32;
    1.0 - numerator / denominator
}

/// One independently controlled melodic line.
///
/// At most one pitch sounds at a time.  The sounding pitch only changes
/// through [`Voice::set_pitch`] and [`Voice::stop`].
#[derive(Clone, Debug)]
pub struct Voice {
    name:      String,
    channel:   u8,
    program:   u8,
    color:     u32,
    pitch_set: PitchSet,
    current:   Option<Pitch>,
}

impl Voice {
    /// `program` is a General MIDI program number (0–127), `channel` is 0–15
    /// and `color` is the ARGB color of this voice's bar.  Out-of-range
    /// channels and programs are rejected rather than wrapped.
    pub fn new(
        name: &str,
        pitch_set: impl Into<PitchSet>,
        program: u8,
        channel: u8,
        color: u32,
    ) -> Result<Self, VoiceError> {
        if channel > 15 {
            return Err(VoiceError::InvalidConfiguration(format!(
                "{}: MIDI channel {} is outside 0-15", name, channel
            )));
        }
        if program > 127 {
            return Err(VoiceError::InvalidConfiguration(format!(
                "{}: MIDI program {} is outside 0-127", name, program
            )));
        }
        Ok(Voice {
            name: name.to_string(),
            channel,
            program,
            color,
            pitch_set: pitch_set.into(),
            current: None,
        })
    }

    pub fn name(&self)      -> &str           { &self.name }
    pub fn channel(&self)   -> u8             { self.channel }
    pub fn program(&self)   -> u8             { self.program }
    pub fn color(&self)     -> u32            { self.color }
    pub fn pitch_set(&self) -> &PitchSet      { &self.pitch_set }
    pub fn current(&self)   -> Option<Pitch>  { self.current }
    pub fn is_sounding(&self) -> bool         { self.current.is_some() }

    /// Note-within-octave of the sounding pitch; a silent voice counts as C.
    pub fn current_note_index(&self) -> u8 {
        note_index(self.current.unwrap_or(0))
    }

    /// Tell the synthesiser which instrument this voice plays.
    pub fn announce(&self, sink: &mut impl EventSink) {
        sink.emit(Event::ProgramChange { channel: self.channel, program: self.program });
    }

    /// Move to `pitch`.  Repeating the sounding pitch does nothing, so a
    /// steady stream of identical readings never retriggers the note.
    pub fn set_pitch(&mut self, pitch: Pitch, sink: &mut impl EventSink) {
        if self.current == Some(pitch) {
            return;
        }
        self.stop(sink);

        sink.emit(Event::NoteOn {
            channel: self.channel,
            pitch,
            velocity: DEFAULT_VELOCITY,
        });
        self.current = Some(pitch);
        log::debug!("{}: now sounding {}", self.name, to_name(pitch));

        sink.emit(Event::DrawBar {
            voice: self.name.clone(),
            vertical_fraction: vertical_fraction(pitch),
            label: to_name(pitch),
            color: self.color,
        });
    }

    /// Quantize `position` onto this voice's pitch set and move there.
    pub fn play_position(
        &mut self,
        position: f32,
        sink: &mut impl EventSink,
    ) -> Result<Pitch, VoiceError> {
        let pitch = self.pitch_set.quantize(position)?;
        self.set_pitch(pitch, sink);
        Ok(pitch)
    }

    /// Silence the sounding note, if any.  Idempotent.
    pub fn stop(&mut self, sink: &mut impl EventSink) {
        if let Some(pitch) = self.current.take() {
            sink.emit(Event::NoteOff { channel: self.channel, pitch });
        }
    }

    /// Replace the whole pitch set.  The sounding note is left alone until
    /// the next [`Voice::set_pitch`].
    pub fn reassign_pitch_set(&mut self, pitch_set: impl Into<PitchSet>) {
        self.pitch_set = pitch_set.into();
        log::info!("{}: pitch set is now {}", self.name, self.pitch_set);
    }

    /// Replace a single slot.  On error the set is unchanged.
    pub fn reassign_slot(&mut self, slot: usize, pitch: Pitch) -> Result<(), VoiceError> {
        let updated = self.pitch_set.with_slot(slot, pitch)?;
        self.reassign_pitch_set(updated);
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Background palette & gradient
// ════════════════════════════════════════════════════════════════════════════

pub const WHITE:      u32 = 0xFFFFFFFF;
pub const RED:        u32 = 0xFFFF0000;
pub const LIGHT_GRAY: u32 = 0xFFC0C0C0;
pub const ORANGE:     u32 = 0xFFFFC800;
pub const YELLOW:     u32 = 0xFFFFFF00;
pub const GREEN:      u32 = 0xFF00FF00;
pub const DARK_GRAY:  u32 = 0xFF404040;
pub const BLUE:       u32 = 0xFF0000FF;
pub const CYAN:       u32 = 0xFF00FFFF;
pub const MAGENTA:    u32 = 0xFFFF00FF;
pub const BLACK:      u32 = 0xFF000000;
pub const PINK:       u32 = 0xFFFFAFAF;

/// One color per note within the octave (C = white … B = pink).
pub const PALETTE: [u32; 12] = [
    WHITE, RED, LIGHT_GRAY, ORANGE, YELLOW, GREEN,
    DARK_GRAY, BLUE, CYAN, MAGENTA, BLACK, PINK,
];

/// `steps` colors running from `from` toward `to`.  The first entry is
/// `from`; `to` itself is not included, so gradients can be chained.
pub fn gradient(from: u32, to: u32, steps: usize) -> Vec<u32> {
    let channel = |c: u32, shift: u32| ((c >> shift) & 0xFF) as f64;
    (0..steps)
        .map(|k| {
            let t = k as f64 / steps as f64;
            let mix = |shift: u32| {
                let a = channel(from, shift);
                let b = channel(to, shift);
                ((a + (b - a) * t) as u32).min(0xFF) << shift
            };
            0xFF000000 | mix(16) | mix(8) | mix(0)
        })
        .collect()
}

/// Background color for three note indices (0–11).
///
/// Builds `low → high` over half the represented pitch range, then
/// `high → white` over the other half, and picks entry `third`.
pub fn background_color(low: u8, high: u8, third: u8) -> u32 {
    let steps      = ((HIGHEST_PITCH - LOWEST_PITCH) / 2) as usize;
    let low_color  = PALETTE[(low % 12) as usize];
    let high_color = PALETTE[(high % 12) as usize];

    let mut cg = gradient(low_color, high_color, steps);
    cg.extend(gradient(high_color, WHITE, steps));
    cg.push(WHITE);

    cg[(third as usize).min(cg.len() - 1)]
}

// ════════════════════════════════════════════════════════════════════════════
// ControllerRouter
// ════════════════════════════════════════════════════════════════════════════

/// Owns every [`Voice`] and routes readings and configuration to them.
///
/// Channel ids match voice names case-insensitively, so a reading tagged
/// `"bass"` reaches the voice named `"BASS"`.
#[derive(Clone, Debug, Default)]
pub struct ControllerRouter {
    voices: Vec<Voice>,
}

impl ControllerRouter {
    pub fn new(voices: Vec<Voice>) -> Self {
        ControllerRouter { voices }
    }

    /// Voices in construction order.
    pub fn voices(&self) -> &[Voice] { &self.voices }

    pub fn voice(&self, id: &str) -> Option<&Voice> {
        self.index_of(id).ok().map(|i| &self.voices[i])
    }

    fn index_of(&self, id: &str) -> Result<usize, VoiceError> {
        self.voices
            .iter()
            .position(|v| v.name.eq_ignore_ascii_case(id))
            .ok_or_else(|| VoiceError::UnknownChannel(id.to_string()))
    }

    /// Program changes for every voice.
    pub fn announce(&self, sink: &mut impl EventSink) {
        for voice in &self.voices {
            voice.announce(sink);
        }
    }

    /// Route one controller reading: quantize, move the voice, then refresh
    /// the background.  Returns the quantized pitch.
    pub fn handle_reading(
        &mut self,
        id: &str,
        position: f32,
        sink: &mut impl EventSink,
    ) -> Result<Pitch, VoiceError> {
        let index = self.index_of(id)?;
        let pitch = self.voices[index].play_position(position, sink)?;
        sink.emit(Event::SetBackground { color: self.background_color() });
        Ok(pitch)
    }

    /// Point `slot` of voice `id` at the note called `note_name`.
    ///
    /// The name is parsed before anything is touched; a bad name, voice or
    /// slot leaves the existing set in place.
    pub fn reassign(
        &mut self,
        id: &str,
        slot: usize,
        note_name: &str,
    ) -> Result<Pitch, VoiceError> {
        let index = self.index_of(id)?;
        let pitch = from_name(note_name)?;
        self.voices[index].reassign_slot(slot, pitch)?;
        Ok(pitch)
    }

    /// Silence voice `id` and take its bar off the display.
    pub fn mute(&mut self, id: &str, sink: &mut impl EventSink) -> Result<(), VoiceError> {
        let index = self.index_of(id)?;
        let voice = &mut self.voices[index];
        voice.stop(sink);
        sink.emit(Event::ClearBar { voice: voice.name.clone() });
        Ok(())
    }

    /// Silence everything (shutdown).
    pub fn stop_all(&mut self, sink: &mut impl EventSink) {
        for voice in &mut self.voices {
            voice.stop(sink);
        }
    }

    /// Background derived from the first three voices' sounding notes.
    pub fn background_color(&self) -> u32 {
        let idx = |i: usize| self.voices.get(i).map_or(0, Voice::current_note_index);
        background_color(idx(0), idx(1), idx(2))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn bass() -> Voice {
        Voice::new("BASS", [43, 45, 47], CHOIR_AAHS, 0, BLACK).unwrap()
    }

    fn trio() -> ControllerRouter {
        ControllerRouter::new(vec![
            Voice::new("BASS",  [43, 45, 47], CHOIR_AAHS, 0, BLACK).unwrap(),
            Voice::new("TENOR", [52, 57, 59], CHOIR_AAHS, 1, BLACK).unwrap(),
            Voice::new("ALTO",  [61, 62, 63], CHOIR_AAHS, 2, BLACK).unwrap(),
        ])
    }

    fn note_ons(events: &[Event]) -> usize {
        events.iter().filter(|e| matches!(e, Event::NoteOn { .. })).count()
    }

    fn note_offs(events: &[Event]) -> usize {
        events.iter().filter(|e| matches!(e, Event::NoteOff { .. })).count()
    }

    // ── quantize ─────────────────────────────────────────────────────────
    #[test]
    fn quantize_examples() {
        let set = [43, 45, 47];
        assert_eq!(quantize(0.0,  &set), Ok(43));
        assert_eq!(quantize(0.34, &set), Ok(45));
        assert_eq!(quantize(0.99, &set), Ok(47));
        assert_eq!(quantize(1.0,  &set), Ok(47));
        assert_eq!(quantize(1.5,  &set), Ok(47));
    }

    #[test]
    fn quantize_clamps_below_zero_and_nan() {
        let set = [43, 45, 47];
        assert_eq!(quantize(-0.5, &set), Ok(43));
        assert_eq!(quantize(f32::NAN, &set), Ok(43));
        assert_eq!(quantize(f32::INFINITY, &set), Ok(47));
    }

    #[test]
    fn quantize_always_returns_member() {
        for n in 1..=8u8 {
            let set: Vec<Pitch> = (0..n).map(|i| 40 + i * 2).collect();
            for step in 0..=100 {
                let pos = step as f32 / 100.0;
                let p = quantize(pos, &set).unwrap();
                assert!(set.contains(&p), "n={} pos={} gave {}", n, pos, p);
            }
            assert_eq!(quantize(0.0, &set), Ok(set[0]));
            assert_eq!(quantize(1.0, &set), Ok(set[set.len() - 1]));
        }
    }

    #[test]
    fn quantize_empty_set_is_invalid() {
        assert!(matches!(quantize(0.5, &[]), Err(VoiceError::InvalidConfiguration(_))));
    }

    // ── note names ───────────────────────────────────────────────────────
    #[test]
    fn note_name_examples() {
        assert_eq!(to_name(60), "C4");
        assert_eq!(from_name("C4"), Ok(60));
        assert_eq!(from_name("F#3"), Ok(54));
        assert_eq!(to_name(43), "G2");
        assert_eq!(to_name(127), "G9");
        assert_eq!(to_name(11), "B-1");
    }

    #[test]
    fn note_name_round_trip() {
        for p in 0..=127u8 {
            assert_eq!(from_name(&to_name(p)), Ok(p), "pitch {}", p);
        }
    }

    #[test]
    fn from_name_rejects_garbage() {
        for bad in [
            "", "C", "H4", "c4", "Db4", "C#", "#4", "G#9", "C10", "C-2", "C4x", "C99999999999",
            "C-0", "C04", "C+4", " C4 ", "C4\n",
        ] {
            assert!(
                matches!(from_name(bad), Err(VoiceError::InvalidNoteName(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    // ── voice lifecycle ──────────────────────────────────────────────────
    #[test]
    fn duplicate_pitch_does_not_retrigger() {
        let mut v = bass();
        let mut ev = Vec::new();
        v.set_pitch(45, &mut ev);
        v.set_pitch(45, &mut ev);
        assert_eq!(note_ons(&ev), 1);
        assert_eq!(note_offs(&ev), 0);
    }

    #[test]
    fn pitch_change_stops_old_then_starts_new() {
        let mut v = bass();
        let mut ev = Vec::new();
        v.set_pitch(43, &mut ev);
        ev.clear();
        v.set_pitch(47, &mut ev);

        let sound: Vec<&Event> = ev.iter().filter(|e| e.is_sound()).collect();
        assert_eq!(
            sound,
            vec![
                &Event::NoteOff { channel: 0, pitch: 43 },
                &Event::NoteOn  { channel: 0, pitch: 47, velocity: 127 },
            ]
        );
        assert_eq!(v.current(), Some(47));
    }

    #[test]
    fn set_pitch_draws_bar() {
        let mut v = bass();
        let mut ev = Vec::new();
        v.set_pitch(84, &mut ev);
        assert_eq!(
            ev.last(),
            Some(&Event::DrawBar {
                voice: "BASS".to_string(),
                vertical_fraction: 0.0,
                label: "C6".to_string(),
                color: BLACK,
            })
        );
    }

    #[test]
    fn vertical_fraction_inverts_range() {
        assert_eq!(vertical_fraction(HIGHEST_PITCH), 0.0);
        assert_eq!(vertical_fraction(LOWEST_PITCH), 1.0);
        assert!((vertical_fraction(59) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut v = bass();
        let mut ev = Vec::new();
        v.stop(&mut ev);
        assert!(ev.is_empty());

        v.set_pitch(45, &mut ev);
        ev.clear();
        v.stop(&mut ev);
        assert_eq!(ev, vec![Event::NoteOff { channel: 0, pitch: 45 }]);
        assert_eq!(v.current(), None);

        ev.clear();
        v.stop(&mut ev);
        assert!(ev.is_empty());
    }

    #[test]
    fn reassign_keeps_sounding_pitch() {
        let mut v = bass();
        let mut ev = Vec::new();
        v.set_pitch(45, &mut ev);
        v.reassign_pitch_set([60, 62, 64]);
        assert_eq!(v.current(), Some(45));
        assert_eq!(v.pitch_set().pitches(), &[60, 62, 64]);

        ev.clear();
        v.play_position(0.5, &mut ev).unwrap();
        assert_eq!(v.current(), Some(62));
        assert_eq!(note_offs(&ev), 1);
    }

    #[test]
    fn reassign_slot_out_of_range_leaves_set() {
        let mut v = bass();
        assert!(v.reassign_slot(3, 60).is_err());
        assert_eq!(v.pitch_set().pitches(), &[43, 45, 47]);
        v.reassign_slot(2, 48).unwrap();
        assert_eq!(v.pitch_set().pitches(), &[43, 45, 48]);
    }

    #[test]
    fn announce_sends_program_change() {
        let mut ev = Vec::new();
        let alto = Voice::new("ALTO", [61], CHOIR_AAHS, 2, BLACK).unwrap();
        alto.announce(&mut ev);
        assert_eq!(ev, vec![Event::ProgramChange { channel: 2, program: alto.program() }]);
    }

    #[test]
    fn out_of_range_channel_or_program_is_rejected() {
        assert!(matches!(
            Voice::new("SOPRANO", [72], CHOIR_AAHS, 16, BLACK),
            Err(VoiceError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Voice::new("SOPRANO", [72], 128, 3, BLACK),
            Err(VoiceError::InvalidConfiguration(_))
        ));
        let v = Voice::new("SOPRANO", [72], 127, 15, BLACK).unwrap();
        assert_eq!((v.channel(), v.program()), (15, 127));
    }

    // ── gradient ─────────────────────────────────────────────────────────
    #[test]
    fn gradient_starts_at_from_and_excludes_to() {
        let g = gradient(RED, WHITE, 25);
        assert_eq!(g.len(), 25);
        assert_eq!(g[0], RED);
        assert_eq!(g[1], 0xFFFF0A0A);
        assert!(!g.contains(&WHITE));
    }

    #[test]
    fn background_is_deterministic() {
        assert_eq!(background_color(0, 0, 0), WHITE);
        assert_eq!(background_color(7, 0, 0), BLUE);
        assert_eq!(background_color(1, 0, 1), 0xFFFF0A0A);
        assert_eq!(background_color(3, 5, 9), background_color(3, 5, 9));
    }

    // ── router ───────────────────────────────────────────────────────────
    #[test]
    fn router_routes_by_channel() {
        let mut r = trio();
        let mut ev = Vec::new();
        assert_eq!(r.handle_reading("tenor", 0.5, &mut ev), Ok(57));
        assert_eq!(r.voice("TENOR").unwrap().current(), Some(57));
        assert_eq!(r.voice("bass").unwrap().current(), None);
        assert!(matches!(ev.last(), Some(Event::SetBackground { .. })));
    }

    #[test]
    fn router_background_follows_voices() {
        let mut r = trio();
        let mut ev = Vec::new();
        r.handle_reading("bass", 0.0, &mut ev).unwrap(); // G2 → 7 → blue
        assert_eq!(ev.last(), Some(&Event::SetBackground { color: BLUE }));
        assert_eq!(r.background_color(), BLUE);
    }

    #[test]
    fn router_unknown_channel() {
        let mut r = trio();
        let mut ev = Vec::new();
        assert_eq!(
            r.handle_reading("soprano", 0.5, &mut ev),
            Err(VoiceError::UnknownChannel("soprano".to_string()))
        );
        assert!(ev.is_empty());
    }

    #[test]
    fn router_reassign_parses_name() {
        let mut r = trio();
        assert_eq!(r.reassign("alto", 0, "C4"), Ok(60));
        assert_eq!(r.voice("alto").unwrap().pitch_set().pitches(), &[60, 62, 63]);
    }

    #[test]
    fn router_reassign_bad_name_keeps_set() {
        let mut r = trio();
        assert!(matches!(r.reassign("alto", 0, "X9"), Err(VoiceError::InvalidNoteName(_))));
        assert!(matches!(r.reassign("alto", 7, "C4"), Err(VoiceError::InvalidConfiguration(_))));
        assert!(matches!(r.reassign("nobody", 0, "C4"), Err(VoiceError::UnknownChannel(_))));
        assert_eq!(r.voice("alto").unwrap().pitch_set().pitches(), &[61, 62, 63]);
    }

    #[test]
    fn router_mute_clears_bar() {
        let mut r = trio();
        let mut ev = Vec::new();
        r.handle_reading("bass", 0.9, &mut ev).unwrap();
        ev.clear();
        r.mute("bass", &mut ev).unwrap();
        assert_eq!(
            ev,
            vec![
                Event::NoteOff { channel: 0, pitch: 47 },
                Event::ClearBar { voice: "BASS".to_string() },
            ]
        );
    }

    #[test]
    fn router_stop_all_silences_everyone() {
        let mut r = trio();
        let mut ev = Vec::new();
        r.handle_reading("bass", 0.1, &mut ev).unwrap();
        r.handle_reading("alto", 0.9, &mut ev).unwrap();
        ev.clear();
        r.stop_all(&mut ev);
        assert_eq!(note_offs(&ev), 2);
        assert!(r.voices().iter().all(|v| !v.is_sounding()));
    }

    #[test]
    fn sender_sink_forwards_events() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut sink = tx;
        bass().announce(&mut sink);
        assert_eq!(rx.try_recv(), Ok(Event::ProgramChange { channel: 0, program: 52 }));
    }
}
