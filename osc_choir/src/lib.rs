//! # osc_choir
//!
//! Three phone motion controllers drive a three-voice choir: each phone sends
//! its horizontal position over OSC, the position is quantized onto that
//! voice's pitch set, and the note is played over MIDI and shown as a bar.
//!
//! ## Controller → voice mapping
//!
//! | Voice | UDP port | Default pitches | MIDI channel |
//! |---|---|---|---|
//! | Bass  | 57110 | G2 A2 B2    | 0 |
//! | Tenor | 57111 | E3 A3 B3    | 1 |
//! | Alto  | 57112 | C#4 D4 D#4  | 2 |
//!
//! Every port listens for `/hfosc/horizontalmotion` with one numeric
//! argument in 0.0–1.0.
//!
//! ## Visualization
//!
//! Each sounding voice draws a full-width bar whose height on screen follows
//! its pitch, labelled with the note name.  The background blends colors
//! picked from the three sounding notes.  Clicking a bar mutes that voice.
//!
//! ### Keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `Z` / `X` / `C` + mouse | Simulate the bass / tenor / alto controller |
//! | `P` | Show or hide the pitch panel |
//! | `←` / `→` | Move between pitch selectors |
//! | `↑` / `↓` | Pick the previous / next note for the focused slot |
//! | `Q` / `Escape` | Quit |

pub mod source;
pub mod display;
pub mod player;
pub mod visualizer;
pub mod app;
