//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │ BASS [G2][A2][B2]  TENOR [E3][A3][B3]  ALTO [C#4][D4][D#4]      │  ← panel (P)
//! │                                                                │
//! │█████████████████████████ [ A3 ] ███████████████████████████████│  ← tenor bar
//! │                                                                │
//! │█████████████████████████ [ G2 ] ███████████████████████████████│  ← bass bar
//! │ status                                                         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The background color follows the sounding notes.

use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::anyhow;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use crate::display::{DisplayState, PitchPanel, BAR_HEIGHT, LABEL_OFFSET, PANEL_H, STATUS_H};
use crate::source::SimInput;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

const TEXT_SCALE:     usize = 2;
const GLYPH_W:        usize = 4 * TEXT_SCALE;
const SELECTOR_W:     usize = 64;
const LABEL_BG:       u32   = 0xFF000000;
const LABEL_FG:       u32   = 0xFFFFFFFF;
const PANEL_BG:       u32   = 0xFF16213E;
const SELECTOR_BG:    u32   = 0xFF0F3460;
const FOCUS_COLOR:    u32   = 0xFFFFD700;
const STATUS_BG:      u32   = 0xFF1A1A2E;

/// Keys that slide a voice while held, in voice order.
const VOICE_KEYS: [Key; 3] = [Key::Z, Key::X, Key::C];

// ════════════════════════════════════════════════════════════════════════════
// UiAction — window input the app handles directly
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub enum UiAction {
    /// Left mouse button pressed at a pixel.
    Click { x: usize, y: usize },
    TogglePanel,
    MoveCursor(isize),
    Pick(isize),
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    buf:        Vec<u32>,
    width:      usize,
    height:     usize,
    sim_tx:     Sender<SimInput>,
    mouse_was_down: bool,
}

impl Visualizer {
    pub fn new(title: &str, width: usize, height: usize, sim_tx: Sender<SimInput>) -> anyhow::Result<Self> {
        let mut window = Window::new(
            title,
            width, height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| anyhow!("failed to open window: {}", e))?;

        window.limit_update_rate(Some(Duration::from_millis(16))); // ~60fps

        Ok(Visualizer {
            window,
            buf: vec![0xFFFFFFFF; width * height],
            width,
            height,
            sim_tx,
            mouse_was_down: false,
        })
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard and mouse.  Simulated readings go straight to the
    /// simulation source; everything else is returned for the app.
    pub fn poll_input(&mut self) -> Vec<UiAction> {
        let mut actions = Vec::new();
        if !self.window.is_open() { return actions; }

        let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
        let repeat   = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

        if one_shot(Key::Q) || one_shot(Key::Escape) {
            let _ = self.sim_tx.send(SimInput::Quit);
            return actions;
        }
        if one_shot(Key::P)     { actions.push(UiAction::TogglePanel); }
        if repeat(Key::Left)    { actions.push(UiAction::MoveCursor(-1)); }
        if repeat(Key::Right)   { actions.push(UiAction::MoveCursor(1)); }
        if repeat(Key::Up)      { actions.push(UiAction::Pick(-1)); }
        if repeat(Key::Down)    { actions.push(UiAction::Pick(1)); }

        let mouse = self.window.get_mouse_pos(MouseMode::Discard);

        // Held voice key + mouse x → simulated controller reading.
        if let Some((mx, _)) = mouse {
            let position = mx / self.width.max(1) as f32;
            for (voice, key) in VOICE_KEYS.iter().enumerate() {
                if self.window.is_key_down(*key) {
                    let _ = self.sim_tx.send(SimInput::Slide { voice, position });
                }
            }
        }

        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_was_down {
            if let Some((mx, my)) = mouse {
                actions.push(UiAction::Click { x: mx as usize, y: my as usize });
            }
        }
        self.mouse_was_down = down;

        actions
    }

    /// Render one frame.
    pub fn render(&mut self, display: &DisplayState, panel: &PitchPanel, status: &str) {
        self.buf.fill(display.background);

        // ── Pitch bars ────────────────────────────────────────────────────
        for bar in display.bars() {
            self.fill_rect(0, bar.top, self.width, BAR_HEIGHT, bar.color);

            let text_w = bar.label.chars().count() * GLYPH_W;
            let lx = self.width / 2;
            let ly = bar.top + LABEL_OFFSET;
            self.fill_rect(lx.saturating_sub(4), ly.saturating_sub(3), text_w + 6, 5 * TEXT_SCALE + 6, LABEL_BG);
            self.draw_label(&bar.label, lx, ly, LABEL_FG);
        }

        // ── Pitch panel ───────────────────────────────────────────────────
        if panel.open {
            self.draw_panel(panel);
        }

        // ── Status bar ────────────────────────────────────────────────────
        let status_y = self.height.saturating_sub(STATUS_H);
        self.fill_rect(0, status_y, self.width, STATUS_H, STATUS_BG);
        self.draw_label(status, 10, status_y + 7, 0xFFEEEEEE);
        let legend = "Z/X/C+mouse=play  click bar=mute  P=pitches  Q=quit";
        let legend_x = self.width.saturating_sub(legend.len() * GLYPH_W + 10);
        self.draw_label(legend, legend_x, status_y + 7, 0xFF888888);

        if let Err(e) = self.window.update_with_buffer(&self.buf, self.width, self.height) {
            log::warn!("window update failed: {}", e);
        }
    }

    // ── Panel ─────────────────────────────────────────────────────────────

    fn draw_panel(&mut self, panel: &PitchPanel) {
        self.fill_rect(0, 0, self.width, PANEL_H, PANEL_BG);

        let mut x = 10;
        let mut last_voice = "";
        for sel in panel.selectors() {
            if sel.voice != last_voice {
                let caption = format!("{}:", sel.voice);
                self.draw_label(&caption, x, 10, LABEL_FG);
                x += caption.chars().count() * GLYPH_W + 8;
                last_voice = sel.voice;
            }
            self.fill_rect(x, 4, SELECTOR_W, PANEL_H - 8, SELECTOR_BG);
            if sel.focused {
                self.draw_border(x, 4, SELECTOR_W, PANEL_H - 8, FOCUS_COLOR);
            }
            self.draw_label(sel.note, x + 8, 10, LABEL_FG);
            x += SELECTOR_W + 6;
        }
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y + h).min(self.height) {
            for col in x..(x + w).min(self.width) {
                self.buf[row * self.width + col] = color;
            }
        }
    }

    fn draw_border(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        if w == 0 || h == 0 { return; }
        for col in x..(x + w) {
            self.set_pixel(col, y, color);
            self.set_pixel(col, y + h - 1, color);
        }
        for row in y..(y + h) {
            self.set_pixel(x, row, color);
            self.set_pixel(x + w - 1, row, color);
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < self.width && y < self.height {
            self.buf[y * self.width + x] = color;
        }
    }

    /// Minimal 3×5 bitmap font, scaled by `TEXT_SCALE`.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.fill_rect(
                            cx + col * TEXT_SCALE, y + row * TEXT_SCALE,
                            TEXT_SCALE, TEXT_SCALE, color,
                        );
                    }
                }
            }
            cx += GLYPH_W;
            if cx + GLYPH_W > self.width { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '#' => [0b101, 0b111, 0b101, 0b111, 0b101],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}
