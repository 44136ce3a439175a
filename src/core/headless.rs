/// Headless stage — an in-memory [`Stage`] with explicit completion control.
///
/// Keeps a scene graph, the fades, cues and timers in flight, and a history
/// of every cue started. Nothing completes on its own: the caller finishes
/// fades, cues and timers and forwards the returned signals to the player.
///
/// [`Stage`]: crate::core::stage::Stage

use rustc_hash::{FxHashMap, FxHashSet};
use std::time::Duration;

use crate::core::stage::{
    Animator, AudioEngine, Fade, NodeId, Renderer, Scheduler, Signal, Ticket,
};
use crate::schema::story::{CueId, Position};

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,
    Container,
    Text { content: String, wrap_width: f32 },
    Sprite { asset: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRecord {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub kind: NodeKind,
    pub visible: bool,
    pub opacity: f32,
    pub position: Position,
}

impl NodeRecord {
    fn new(parent: Option<NodeId>, kind: NodeKind) -> Self {
        Self {
            parent,
            children: Vec::new(),
            kind,
            visible: true,
            opacity: 1.0,
            position: Position::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingFade {
    pub ticket: Ticket,
    pub fade: Fade,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Playback {
    pub ticket: Ticket,
    pub cue: CueId,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTimer {
    pub ticket: Ticket,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct HeadlessStage {
    nodes: Vec<NodeRecord>,
    assets: FxHashSet<String>,
    cues: FxHashSet<CueId>,
    fades: Vec<PendingFade>,
    playing: Vec<Playback>,
    timers: Vec<PendingTimer>,
    channel_volumes: FxHashMap<String, f32>,
    history: Vec<Playback>,
    cancelled: Vec<Ticket>,
    next_ticket: u64,
}

impl Default for HeadlessStage {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessStage {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeRecord::new(None, NodeKind::Root)],
            assets: FxHashSet::default(),
            cues: FxHashSet::default(),
            fades: Vec::new(),
            playing: Vec::new(),
            timers: Vec::new(),
            channel_volumes: FxHashMap::default(),
            history: Vec::new(),
            cancelled: Vec::new(),
            next_ticket: 1,
        }
    }

    /// Register a sprite asset the stage can resolve.
    pub fn with_asset(mut self, name: impl Into<String>) -> Self {
        self.assets.insert(name.into());
        self
    }

    /// Register a cue the audio engine can play.
    pub fn with_cue(mut self, cue: impl Into<CueId>) -> Self {
        self.cues.insert(cue.into());
        self
    }

    pub fn with_cues<I>(mut self, cues: I) -> Self
    where
        I: IntoIterator<Item = CueId>,
    {
        self.cues.extend(cues);
        self
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |n| n.children.as_slice())
    }

    /// Text content of the direct children of `id`, in insertion order.
    pub fn texts(&self, id: NodeId) -> Vec<&str> {
        self.children(id)
            .iter()
            .filter_map(|child| match &self.node(*child)?.kind {
                NodeKind::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.visible)
    }

    pub fn opacity(&self, id: NodeId) -> Option<f32> {
        self.node(id).map(|n| n.opacity)
    }

    pub fn channel_volume(&self, channel: &str) -> Option<f32> {
        self.channel_volumes.get(channel).copied()
    }

    pub fn pending_fades(&self) -> &[PendingFade] {
        &self.fades
    }

    pub fn playing(&self) -> &[Playback] {
        &self.playing
    }

    pub fn pending_timers(&self) -> &[PendingTimer] {
        &self.timers
    }

    /// Every cue started, including finished and stopped ones.
    pub fn played(&self) -> &[Playback] {
        &self.history
    }

    /// Tickets withdrawn through `cancel_fade`, `stop` or `cancel_timer`.
    pub fn cancelled(&self) -> &[Ticket] {
        &self.cancelled
    }

    pub fn is_idle(&self) -> bool {
        self.fades.is_empty() && self.playing.is_empty() && self.timers.is_empty()
    }

    /// Complete every fade in flight, applying its target opacity.
    pub fn finish_fades(&mut self) -> Vec<Signal> {
        let fades = std::mem::take(&mut self.fades);
        fades
            .into_iter()
            .map(|pending| {
                self.set_opacity(pending.fade.node, pending.fade.to);
                Signal::FadeFinished(pending.ticket)
            })
            .collect()
    }

    /// Complete every playback of `cue`.
    pub fn finish_cue(&mut self, cue: &CueId) -> Vec<Signal> {
        let (done, still): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.playing).into_iter().partition(|p| &p.cue == cue);
        self.playing = still;
        done.into_iter().map(|p| Signal::CueFinished(p.ticket)).collect()
    }

    pub fn finish_all_cues(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.playing)
            .into_iter()
            .map(|p| Signal::CueFinished(p.ticket))
            .collect()
    }

    pub fn fire_timers(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.timers)
            .into_iter()
            .map(|t| Signal::TimerFired(t.ticket))
            .collect()
    }

    fn issue(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    fn push_node(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(NodeRecord::new(Some(parent), kind));
        if let Some(p) = self.nodes.get_mut(parent.0 as usize) {
            p.children.push(id);
        }
        id
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NodeRecord> {
        self.nodes.get_mut(id.0 as usize)
    }
}

impl Renderer for HeadlessStage {
    fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn create_container(&mut self, parent: NodeId) -> NodeId {
        self.push_node(parent, NodeKind::Container)
    }

    fn add_text(
        &mut self,
        parent: NodeId,
        content: &str,
        position: Position,
        wrap_width: f32,
    ) -> NodeId {
        let id = self.push_node(
            parent,
            NodeKind::Text {
                content: content.to_string(),
                wrap_width,
            },
        );
        self.set_position(id, position);
        id
    }

    fn add_sprite(&mut self, parent: NodeId, asset: &str, position: Position) -> Option<NodeId> {
        if !self.assets.contains(asset) {
            return None;
        }
        let id = self.push_node(
            parent,
            NodeKind::Sprite {
                asset: asset.to_string(),
            },
        );
        self.set_position(id, position);
        Some(id)
    }

    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Some(n) = self.node_mut(node) {
            n.visible = visible;
        }
    }

    fn set_opacity(&mut self, node: NodeId, opacity: f32) {
        if let Some(n) = self.node_mut(node) {
            n.opacity = opacity;
        }
    }

    fn set_position(&mut self, node: NodeId, position: Position) {
        if let Some(n) = self.node_mut(node) {
            n.position = position;
        }
    }
}

impl Animator for HeadlessStage {
    fn fade(&mut self, fade: Fade) -> Ticket {
        if let Some(from) = fade.from {
            self.set_opacity(fade.node, from);
        }
        let ticket = self.issue();
        self.fades.push(PendingFade { ticket, fade });
        ticket
    }

    fn cancel_fade(&mut self, ticket: Ticket) {
        self.fades.retain(|f| f.ticket != ticket);
        self.cancelled.push(ticket);
    }
}

impl AudioEngine for HeadlessStage {
    fn has_cue(&self, cue: &CueId) -> bool {
        self.cues.contains(cue)
    }

    fn play(&mut self, cue: &CueId, volume: f32) -> Ticket {
        let ticket = self.issue();
        let playback = Playback {
            ticket,
            cue: cue.clone(),
            volume,
        };
        self.history.push(playback.clone());
        self.playing.push(playback);
        ticket
    }

    fn is_playing(&self, cue: &CueId) -> bool {
        self.playing.iter().any(|p| &p.cue == cue)
    }

    fn set_channel_volume(&mut self, channel: &str, volume: f32) {
        self.channel_volumes.insert(channel.to_string(), volume);
    }

    fn stop(&mut self, ticket: Ticket) {
        self.playing.retain(|p| p.ticket != ticket);
        self.cancelled.push(ticket);
    }
}

impl Scheduler for HeadlessStage {
    fn schedule(&mut self, delay: Duration) -> Ticket {
        let ticket = self.issue();
        self.timers.push(PendingTimer { ticket, delay });
        ticket
    }

    fn cancel_timer(&mut self, ticket: Ticket) {
        self.timers.retain(|t| t.ticket != ticket);
        self.cancelled.push(ticket);
    }
}
