//! Static data consumed by the player: story content and tuning.

pub mod config;
pub mod story;
