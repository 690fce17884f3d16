//! Display state: the pitch bars, the background and the pitch panel.
//!
//! Nothing here draws pixels.  The visualizer reads this state each frame;
//! the app mutates it from voice events and panel input.

use choir_voice::{ControllerRouter, Event, NOTE_NAMES, WHITE};

/// Height of a pitch bar in pixels.
pub const BAR_HEIGHT: usize = 30;
/// Vertical offset of a bar's label from the bar's top edge.
pub const LABEL_OFFSET: usize = 7;
/// Strip at the top of the window where the pitch panel opens.
pub const PANEL_H: usize = 34;
/// Strip at the bottom of the window holding the status line.
pub const STATUS_H: usize = 24;

// ════════════════════════════════════════════════════════════════════════════
// Bar — one voice's current pitch on screen
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct Bar {
    pub voice: String,
    /// Pixel row of the bar's top edge.
    pub top:   usize,
    pub label: String,
    pub color: u32,
}

impl Bar {
    pub fn contains_row(&self, y: usize) -> bool {
        y >= self.top && y < self.top + BAR_HEIGHT
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DisplayState
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct DisplayState {
    pub width:      usize,
    pub height:     usize,
    pub background: u32,
    /// Draw order: later bars paint over earlier ones.
    bars:           Vec<Bar>,
}

impl DisplayState {
    pub fn new(width: usize, height: usize) -> Self {
        DisplayState {
            width,
            height,
            background: WHITE,
            bars: Vec::new(),
        }
    }

    pub fn bars(&self) -> &[Bar] { &self.bars }

    pub fn bar(&self, voice: &str) -> Option<&Bar> {
        self.bars.iter().find(|b| b.voice == voice)
    }

    /// Pixel row for a vertical fraction.  The whole bar stays between the
    /// panel strip and the status strip, so neither ever covers it.
    pub fn bar_row(&self, vertical_fraction: f32) -> usize {
        let min_row = PANEL_H as f32;
        let max_row = self.height.saturating_sub(STATUS_H + BAR_HEIGHT).max(PANEL_H) as f32;
        (vertical_fraction * self.height as f32).clamp(min_row, max_row) as usize
    }

    /// Apply a display event.  Sound events are ignored.
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::DrawBar { voice, vertical_fraction, label, color } => {
                let top = self.bar_row(*vertical_fraction);
                self.bars.retain(|b| b.voice != *voice);
                self.bars.push(Bar {
                    voice: voice.clone(),
                    top,
                    label: label.clone(),
                    color: *color,
                });
            }
            Event::ClearBar { voice } => {
                self.bars.retain(|b| b.voice != *voice);
            }
            Event::SetBackground { color } => {
                self.background = *color;
            }
            _ => {}
        }
    }

    /// The voice whose bar is drawn on top at `(x, y)`.
    pub fn bar_at(&self, x: usize, y: usize) -> Option<&str> {
        if x >= self.width || y < PANEL_H || y >= self.height.saturating_sub(STATUS_H) {
            return None;
        }
        self.bars
            .iter()
            .rev()
            .find(|b| b.contains_row(y))
            .map(|b| b.voice.as_str())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PitchPanel — per-slot note selectors
// ════════════════════════════════════════════════════════════════════════════

/// Notes offered by every selector: `C2` through `B5`.
pub fn note_choices() -> Vec<String> {
    (2..=5)
        .flat_map(|octave| NOTE_NAMES.iter().map(move |n| format!("{}{}", n, octave)))
        .collect()
}

/// A slot reassignment chosen in the panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reassignment {
    pub voice: String,
    pub slot:  usize,
    pub note:  String,
}

/// One selector per (voice, slot), navigated from the keyboard.
#[derive(Debug)]
pub struct PitchPanel {
    pub open:  bool,
    selectors: Vec<Selector>,
    choices:   Vec<String>,
    cursor:    usize,
}

#[derive(Clone, Debug)]
struct Selector {
    voice:  String,
    slot:   usize,
    choice: usize,
}

/// What the visualizer needs to draw one selector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectorView<'a> {
    pub voice:   &'a str,
    pub slot:    usize,
    pub note:    &'a str,
    pub focused: bool,
}

impl PitchPanel {
    /// Selectors start on each slot's current pitch when it is one of the
    /// offered notes, otherwise on the first note.
    pub fn new(router: &ControllerRouter) -> Self {
        let choices = note_choices();
        let mut selectors = Vec::new();
        for voice in router.voices() {
            for (slot, &pitch) in voice.pitch_set().pitches().iter().enumerate() {
                let name = choir_voice::to_name(pitch);
                let choice = choices.iter().position(|c| *c == name).unwrap_or(0);
                selectors.push(Selector { voice: voice.name().to_string(), slot, choice });
            }
        }
        PitchPanel { open: false, selectors, choices, cursor: 0 }
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Move focus by `delta` selectors, wrapping at both ends.
    pub fn move_cursor(&mut self, delta: isize) {
        if !self.open || self.selectors.is_empty() {
            return;
        }
        self.cursor = wrap(self.cursor, delta, self.selectors.len());
    }

    /// Step the focused selector by `delta` notes and report the resulting
    /// reassignment.  Nothing happens while the panel is closed.
    pub fn pick(&mut self, delta: isize) -> Option<Reassignment> {
        if !self.open || self.choices.is_empty() {
            return None;
        }
        let n = self.choices.len();
        let sel = self.selectors.get_mut(self.cursor)?;
        sel.choice = wrap(sel.choice, delta, n);
        Some(Reassignment {
            voice: sel.voice.clone(),
            slot:  sel.slot,
            note:  self.choices[sel.choice].clone(),
        })
    }

    pub fn selectors(&self) -> impl Iterator<Item = SelectorView<'_>> {
        self.selectors.iter().enumerate().map(move |(i, s)| SelectorView {
            voice:   &s.voice,
            slot:    s.slot,
            note:    &self.choices[s.choice],
            focused: i == self.cursor,
        })
    }
}

fn wrap(index: usize, delta: isize, len: usize) -> usize {
    (index as isize + delta).rem_euclid(len as isize) as usize
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use choir_voice::{from_name, vertical_fraction, Voice, BLACK, BLUE, CHOIR_AAHS, HIGHEST_PITCH};

    fn router() -> ControllerRouter {
        ControllerRouter::new(vec![
            Voice::new("BASS",  [43, 45, 47], CHOIR_AAHS, 0, BLACK).unwrap(),
            Voice::new("TENOR", [52, 57, 59], CHOIR_AAHS, 1, BLACK).unwrap(),
        ])
    }

    fn draw(voice: &str, fraction: f32) -> Event {
        Event::DrawBar {
            voice: voice.to_string(),
            vertical_fraction: fraction,
            label: "C4".to_string(),
            color: BLACK,
        }
    }

    #[test]
    fn bar_row_scales_and_clamps() {
        let d = DisplayState::new(1200, 760);
        assert_eq!(d.bar_row(0.5), 380);
        assert_eq!(d.bar_row(0.0), PANEL_H);
        assert_eq!(d.bar_row(-0.2), PANEL_H);
        assert_eq!(d.bar_row(1.0), 706);
        assert_eq!(d.bar_row(1.4), 706);
    }

    #[test]
    fn every_offered_note_keeps_its_label_clear_of_the_strips() {
        let d = DisplayState::new(1200, 760);
        let status_top = d.height - STATUS_H;

        let c2 = d.bar_row(vertical_fraction(from_name("C2").unwrap()));
        assert!(c2 + LABEL_OFFSET + 10 <= status_top, "C2 label at {}", c2 + LABEL_OFFSET);

        let mut names = note_choices();
        names.push(choir_voice::to_name(HIGHEST_PITCH));
        for name in names {
            let top = d.bar_row(vertical_fraction(from_name(&name).unwrap()));
            assert!(top >= PANEL_H, "{} bar at {}", name, top);
            assert!(top + BAR_HEIGHT <= status_top, "{} bar at {}", name, top);
        }
    }

    #[test]
    fn clicks_in_the_strips_miss() {
        let mut d = DisplayState::new(1200, 760);
        d.apply(&draw("BASS", 0.0));
        d.apply(&draw("TENOR", 1.0));
        assert_eq!(d.bar_at(10, PANEL_H - 1), None);
        assert_eq!(d.bar_at(10, PANEL_H), Some("BASS"));
        assert_eq!(d.bar_at(10, 735), Some("TENOR"));
        assert_eq!(d.bar_at(10, 736), None);
    }

    #[test]
    fn draw_bar_replaces_previous_bar() {
        let mut d = DisplayState::new(1200, 760);
        d.apply(&draw("BASS", 0.5));
        d.apply(&draw("BASS", 0.25));
        assert_eq!(d.bars().len(), 1);
        assert_eq!(d.bar("BASS").map(|b| b.top), Some(190));
    }

    #[test]
    fn clear_and_background_events() {
        let mut d = DisplayState::new(1200, 760);
        d.apply(&draw("BASS", 0.5));
        d.apply(&Event::ClearBar { voice: "BASS".to_string() });
        d.apply(&Event::SetBackground { color: BLUE });
        d.apply(&Event::NoteOff { channel: 0, pitch: 43 });
        assert!(d.bars().is_empty());
        assert_eq!(d.background, BLUE);
    }

    #[test]
    fn click_hits_topmost_bar() {
        let mut d = DisplayState::new(1200, 760);
        d.apply(&draw("BASS", 0.5));   // rows 380..410
        d.apply(&draw("TENOR", 0.51)); // rows 387..417, drawn later
        assert_eq!(d.bar_at(10, 385), Some("BASS"));
        assert_eq!(d.bar_at(10, 400), Some("TENOR"));
        assert_eq!(d.bar_at(10, 100), None);
        assert_eq!(d.bar_at(5000, 400), None);
    }

    #[test]
    fn note_choices_span_four_octaves() {
        let c = note_choices();
        assert_eq!(c.len(), 48);
        assert_eq!(c.first().map(String::as_str), Some("C2"));
        assert_eq!(c.last().map(String::as_str), Some("B5"));
    }

    #[test]
    fn panel_starts_on_current_pitches() {
        let p = PitchPanel::new(&router());
        let notes: Vec<&str> = p.selectors().map(|s| s.note).collect();
        assert_eq!(notes, vec!["G2", "A2", "B2", "E3", "A3", "B3"]);
    }

    #[test]
    fn panel_ignores_input_while_closed() {
        let mut p = PitchPanel::new(&router());
        assert_eq!(p.pick(1), None);
        p.move_cursor(1);
        assert!(p.selectors().next().map_or(false, |s| s.focused));
    }

    #[test]
    fn panel_pick_reports_reassignment() {
        let mut p = PitchPanel::new(&router());
        p.toggle();
        p.move_cursor(4); // TENOR slot 1
        assert_eq!(
            p.pick(1),
            Some(Reassignment { voice: "TENOR".to_string(), slot: 1, note: "A#3".to_string() })
        );
    }

    #[test]
    fn panel_cursor_and_choices_wrap() {
        let mut p = PitchPanel::new(&router());
        p.toggle();
        p.move_cursor(-1); // wraps to TENOR slot 2
        let focused = p.selectors().find(|s| s.focused).unwrap();
        assert_eq!((focused.voice, focused.slot), ("TENOR", 2));

        p.move_cursor(1); // back to BASS slot 0 (G2 = index 7)
        assert_eq!(p.pick(-8).map(|r| r.note), Some("B5".to_string()));
    }
}
