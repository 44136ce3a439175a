//! Narrative Playback — a linear story player for games.
//!
//! Reveals scripted paragraphs one tap at a time across pages, holds input
//! while voice cues play, and runs a one-shot audio-driven interlude between
//! the first and second page before resuming.

pub mod core;
pub mod schema;
