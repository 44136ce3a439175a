//! The playback state machine and the stage contracts it drives.

pub mod gate;
pub mod headless;
pub mod player;
pub mod position;
pub mod reveal;
pub mod scope;
pub mod special;
pub mod stage;
pub mod tip;
