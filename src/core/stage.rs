/// Stage contracts — the host capabilities the player drives.
///
/// The player never renders, tweens or plays audio itself. It issues
/// requests through these traits and receives each completion later as a
/// [`Signal`] carrying the [`Ticket`] the request returned.

use std::fmt;
use std::time::Duration;

use crate::schema::story::{CueId, Position};

/// Handle to a node in the host's scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Handle to an asynchronous fade, cue playback, or timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// An opacity animation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub node: NodeId,
    /// Starting opacity; `None` animates from the current value.
    pub from: Option<f32>,
    pub to: f32,
    pub duration: Duration,
}

impl Fade {
    pub fn to(node: NodeId, to: f32, duration: Duration) -> Self {
        Self {
            node,
            from: None,
            to,
            duration,
        }
    }

    pub fn from_to(node: NodeId, from: f32, to: f32, duration: Duration) -> Self {
        Self {
            node,
            from: Some(from),
            to,
            duration,
        }
    }
}

/// A completion reported back by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    FadeFinished(Ticket),
    CueFinished(Ticket),
    TimerFired(Ticket),
}

impl Signal {
    pub fn ticket(&self) -> Ticket {
        match self {
            Self::FadeFinished(t) | Self::CueFinished(t) | Self::TimerFired(t) => *t,
        }
    }
}

/// Something the player needed from the host that was not there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Cue(CueId),
    VisualAsset(String),
    RenderWidth,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cue(cue) => write!(f, "audio cue '{}'", cue),
            Self::VisualAsset(name) => write!(f, "visual asset '{}'", name),
            Self::RenderWidth => f.write_str("render width"),
        }
    }
}

pub trait Renderer {
    fn root(&self) -> NodeId;
    fn create_container(&mut self, parent: NodeId) -> NodeId;
    fn add_text(
        &mut self,
        parent: NodeId,
        content: &str,
        position: Position,
        wrap_width: f32,
    ) -> NodeId;
    /// Returns `None` when `asset` is unknown to the host.
    fn add_sprite(&mut self, parent: NodeId, asset: &str, position: Position) -> Option<NodeId>;
    fn set_visible(&mut self, node: NodeId, visible: bool);
    fn set_opacity(&mut self, node: NodeId, opacity: f32);
    fn set_position(&mut self, node: NodeId, position: Position);
}

pub trait Animator {
    /// Start a fade. Completion arrives as [`Signal::FadeFinished`].
    fn fade(&mut self, fade: Fade) -> Ticket;
    fn cancel_fade(&mut self, ticket: Ticket);
}

pub trait AudioEngine {
    fn has_cue(&self, cue: &CueId) -> bool;
    /// Start a cue. Completion arrives as [`Signal::CueFinished`].
    fn play(&mut self, cue: &CueId, volume: f32) -> Ticket;
    fn is_playing(&self, cue: &CueId) -> bool;
    fn set_channel_volume(&mut self, channel: &str, volume: f32);
    fn stop(&mut self, ticket: Ticket);
}

pub trait Scheduler {
    /// Arm a one-shot timer. Completion arrives as [`Signal::TimerFired`].
    fn schedule(&mut self, delay: Duration) -> Ticket;
    fn cancel_timer(&mut self, ticket: Ticket);
}

/// Everything the player needs from its host.
pub trait Stage: Renderer + Animator + AudioEngine + Scheduler {}

impl<T: Renderer + Animator + AudioEngine + Scheduler> Stage for T {}
