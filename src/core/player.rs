/// The story player: input → gate → page/paragraph progression.
///
/// Wires the scene, the gate, the revealer and the special sequence
/// together, and is the only owner of the playback position.

use std::marker::PhantomData;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::gate::AudioGateKeeper;
use crate::core::position::PlaybackPosition;
use crate::core::reveal::{ParagraphRevealer, RevealError};
use crate::core::scope::{CallbackScope, TicketKind};
use crate::core::special::{
    SequenceAction, SequenceError, SequenceState, SequenceTrigger, SpecialSequenceController,
};
use crate::core::stage::{Fade, NodeId, Resource, Signal, Stage};
use crate::core::tip::TipBlinker;
use crate::schema::config::{ConfigError, PlaybackConfig};
use crate::schema::story::{CueId, Position, Story, StoryError};

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("story error: {0}")]
    Story(#[from] StoryError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("reveal error: {0}")]
    Reveal(#[from] RevealError),
    #[error("special sequence error: {0}")]
    Sequence(#[from] SequenceError),
    #[error("resource not found: {0}")]
    ResourceNotFound(Resource),
    #[error("no story was provided to the builder")]
    MissingStory,
    #[error("the story has already been played to the end")]
    StoryExhausted,
    #[error("the player has been torn down")]
    TornDown,
}

impl PlaybackError {
    /// The missing resource, whichever component reported it.
    pub fn missing_resource(&self) -> Option<&Resource> {
        match self {
            Self::ResourceNotFound(r)
            | Self::Reveal(RevealError::ResourceNotFound(r))
            | Self::Sequence(SequenceError::ResourceNotFound(r)) => Some(r),
            _ => None,
        }
    }
}

/// What an input did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// A paragraph was revealed; `paragraph` is its index on `page`.
    Revealed { page: usize, paragraph: usize },
    /// Dropped because a gating cue is playing.
    Gated { cue: CueId },
    /// Dropped because an input was already processed this frame.
    Debounced,
    /// The first page was exhausted and the special sequence was asked to run.
    Sequence(SequenceTrigger),
    /// The last page was exhausted and the completion callback ran.
    Completed,
}

impl InputOutcome {
    /// True when the input changed playback state.
    pub fn advanced(&self) -> bool {
        matches!(
            self,
            Self::Revealed { .. } | Self::Sequence(SequenceTrigger::Started) | Self::Completed
        )
    }
}

type CompletionCallback = Box<dyn FnOnce()>;

/// Where an input came from. Only the sequence's own resume may advance
/// while the interlude is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputSource {
    User,
    Resume,
}

/// Scene nodes created at build.
#[derive(Debug, Clone)]
struct Scene {
    container: NodeId,
    mask: NodeId,
    surfaces: Vec<NodeId>,
    tip: Option<TipBlinker>,
}

/// The playback state machine. Built via `StoryPlayer::builder()`.
pub struct StoryPlayer<S: Stage> {
    story: Story,
    stage: S,
    config: PlaybackConfig,
    scene: Scene,
    position: PlaybackPosition,
    gate: AudioGateKeeper,
    revealer: ParagraphRevealer,
    special: SpecialSequenceController,
    scope: CallbackScope,
    on_complete: Option<CompletionCallback>,
    completed: bool,
    input_latched: bool,
    torn_down: bool,
}

/// Builder for constructing a `StoryPlayer`. The stage type is fixed by
/// the argument to `build`.
pub struct StoryPlayerBuilder<S> {
    story: Option<Story>,
    render_width: Option<f32>,
    target_height: f32,
    config: PlaybackConfig,
    on_complete: Option<CompletionCallback>,
    stage: PhantomData<fn() -> S>,
}

impl<S: Stage> StoryPlayer<S> {
    pub fn builder() -> StoryPlayerBuilder<S> {
        StoryPlayerBuilder {
            story: None,
            render_width: None,
            target_height: 0.0,
            config: PlaybackConfig::default(),
            on_complete: None,
            stage: PhantomData,
        }
    }

    /// Fade the scene in and reveal the first paragraph.
    pub fn start(&mut self) -> Result<InputOutcome, PlaybackError> {
        info!(
            pages = self.story.page_count(),
            paragraphs = self.story.total_paragraphs(),
            "starting story playback"
        );
        let intro = self.stage.fade(Fade::from_to(
            self.scene.container,
            0.0,
            1.0,
            self.config.intro_fade(),
        ));
        self.scope.track(intro, TicketKind::Fade);
        if let Some(tip) = self.scene.tip.as_mut() {
            tip.start(&mut self.stage, &mut self.scope);
        }
        self.process_input(InputSource::User)
    }

    /// Handle a tap on the scene.
    pub fn on_input(&mut self) -> Result<InputOutcome, PlaybackError> {
        if self.config.debounce_same_frame && self.input_latched && !self.torn_down {
            debug!("input already processed this frame");
            return Ok(InputOutcome::Debounced);
        }
        self.process_input(InputSource::User)
    }

    /// Mark the frame as presented; the next input is processed normally.
    pub fn end_frame(&mut self) {
        self.input_latched = false;
    }

    /// Feed a completion back from the stage.
    ///
    /// Returns the outcome of the automatic reveal when the signal ends the
    /// special sequence, `None` otherwise. Signals the player is not waiting
    /// for are ignored.
    pub fn handle(&mut self, signal: Signal) -> Result<Option<InputOutcome>, PlaybackError> {
        if self.torn_down || !self.scope.settle(&signal) {
            debug!(?signal, "ignoring signal");
            return Ok(None);
        }
        if let Some(tip) = self.scene.tip.as_mut() {
            if tip.on_signal(signal, &mut self.stage, &mut self.scope) {
                return Ok(None);
            }
        }

        match self.special.on_signal(signal, &mut self.stage, &mut self.scope) {
            SequenceAction::Wait => Ok(None),
            SequenceAction::AdvancePage => {
                self.switch_page()?;
                Ok(None)
            }
            SequenceAction::Resume => self.process_input(InputSource::Resume).map(Some),
        }
    }

    /// Cancel every pending completion and stop responding.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for (ticket, kind) in self.scope.close() {
            debug!(?ticket, ?kind, "cancelling pending completion");
            match kind {
                TicketKind::Fade => self.stage.cancel_fade(ticket),
                TicketKind::Cue => self.stage.stop(ticket),
                TicketKind::Timer => self.stage.cancel_timer(ticket),
            }
        }
        self.special.abandon();
        if let Some(tip) = self.scene.tip.as_mut() {
            tip.stop();
        }
        info!("story playback torn down");
    }

    pub fn position(&self) -> PlaybackPosition {
        self.position
    }

    pub fn story(&self) -> &Story {
        &self.story
    }

    pub fn is_page_exhausted(&self, page: usize) -> bool {
        self.position.is_page_exhausted(&self.story, page)
    }

    pub fn is_first_page_exhausted(&self) -> bool {
        self.position.is_first_page_exhausted(&self.story)
    }

    pub fn is_story_complete(&self) -> bool {
        self.position.is_story_complete(&self.story)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn sequence_state(&self) -> SequenceState {
        self.special.state()
    }

    pub fn gate(&self) -> &AudioGateKeeper {
        &self.gate
    }

    /// One surface per page, in page order.
    pub fn surfaces(&self) -> &[NodeId] {
        &self.scene.surfaces
    }

    pub fn scene_node(&self) -> NodeId {
        self.scene.container
    }

    pub fn mask(&self) -> NodeId {
        self.scene.mask
    }

    /// The blinking sprite of the tap hint, when one is configured.
    pub fn tip_sprite(&self) -> Option<NodeId> {
        self.scene.tip.as_ref().map(TipBlinker::sprite)
    }

    pub fn stage(&self) -> &S {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut S {
        &mut self.stage
    }

    fn process_input(&mut self, source: InputSource) -> Result<InputOutcome, PlaybackError> {
        if self.torn_down {
            return Err(PlaybackError::TornDown);
        }
        if self.completed {
            return Err(PlaybackError::StoryExhausted);
        }
        if let Some(cue) = self.gate.active_cue(&self.stage) {
            debug!(cue = %cue, "input gated by playing cue");
            return Ok(InputOutcome::Gated { cue: cue.clone() });
        }
        if source == InputSource::User && self.special.state() != SequenceState::Inactive {
            debug!(state = ?self.special.state(), "input held until the interlude resumes");
            return Ok(InputOutcome::Sequence(SequenceTrigger::InProgress));
        }
        self.input_latched = true;

        if self.position.is_first_page_exhausted(&self.story) {
            let trigger = self.special.trigger(&mut self.stage, &mut self.scope)?;
            return Ok(InputOutcome::Sequence(trigger));
        }

        if self.position.is_story_complete(&self.story) {
            self.completed = true;
            info!("story complete");
            if let Some(callback) = self.on_complete.take() {
                callback();
            }
            return Ok(InputOutcome::Completed);
        }

        if self.position.is_at_page_boundary(&self.story) {
            self.switch_page()?;
        }

        let PlaybackPosition { page, paragraph } = self.position;
        let text = self
            .story
            .paragraph(page, paragraph)
            .ok_or(PlaybackError::StoryExhausted)?;
        let surface = self.surface(page)?;
        let revealed = self.revealer.reveal(&mut self.stage, text, surface)?;
        self.scope.track(revealed.fade, TicketKind::Fade);
        if let Some(cue) = revealed.cue {
            self.scope.track(cue, TicketKind::Cue);
        }
        self.position.paragraph += 1;
        debug!(page, paragraph, "revealed paragraph");

        Ok(InputOutcome::Revealed { page, paragraph })
    }

    fn switch_page(&mut self) -> Result<(), PlaybackError> {
        let from = self.position.page;
        if from + 1 >= self.story.page_count() {
            return Err(PlaybackError::StoryExhausted);
        }
        let old = self.surface(from)?;
        let new = self.surface(from + 1)?;
        self.stage.set_visible(old, false);
        self.position.next_page();
        self.stage.set_visible(new, true);
        info!(from, to = self.position.page, "page advanced");
        Ok(())
    }

    fn surface(&self, page: usize) -> Result<NodeId, PlaybackError> {
        self.scene
            .surfaces
            .get(page)
            .copied()
            .ok_or(PlaybackError::StoryExhausted)
    }
}

impl<S: Stage> Drop for StoryPlayer<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<S: Stage> StoryPlayerBuilder<S> {
    pub fn story(mut self, story: Story) -> Self {
        self.story = Some(story);
        self
    }

    pub fn render_width(mut self, width: f32) -> Self {
        self.render_width = Some(width);
        self
    }

    pub fn target_height(mut self, height: f32) -> Self {
        self.target_height = height;
        self
    }

    pub fn config(mut self, config: PlaybackConfig) -> Self {
        self.config = config;
        self
    }

    /// Called exactly once, on the input after the last paragraph.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Create the scene on `stage` and wire the components. Playback does
    /// not begin until `start` is called.
    pub fn build(self, mut stage: S) -> Result<StoryPlayer<S>, PlaybackError> {
        let story = self.story.ok_or(PlaybackError::MissingStory)?;
        let config = self.config;
        config.validate()?;

        let root = stage.root();
        let container = stage.create_container(root);
        stage.set_opacity(container, 0.0);

        let mask = stage.create_container(container);
        stage.set_position(mask, Position::new(0.0, config.mask_offset_y));
        stage.set_opacity(mask, config.mask_opacity);

        let tip = match (&config.tip, self.render_width) {
            (Some(tip), Some(width)) => {
                let hint = stage.create_container(mask);
                stage.set_position(
                    hint,
                    Position::new(width - tip.inset_right, self.target_height - tip.inset_bottom),
                );
                stage.add_text(hint, &tip.label, Position::default(), width - config.padding);
                let sprite = stage
                    .add_sprite(hint, &tip.asset, tip.sprite_offset)
                    .ok_or_else(|| {
                        PlaybackError::ResourceNotFound(Resource::VisualAsset(tip.asset.clone()))
                    })?;
                Some(TipBlinker::new(sprite, tip.blink_delay(), tip.blink()))
            }
            (Some(_), None) => {
                warn!("no render width set, tap hint left out");
                None
            }
            (None, _) => None,
        };

        let surfaces: Vec<NodeId> = (0..story.page_count())
            .map(|page| {
                let surface = stage.create_container(mask);
                stage.set_visible(surface, page == 0);
                surface
            })
            .collect();

        let special_config = config.special.clone();
        let overlay_y = (self.target_height - special_config.overlay_height) / 2.0 - 20.0;
        let overlay = stage
            .add_sprite(
                container,
                &special_config.overlay_asset,
                Position::new(0.0, overlay_y),
            )
            .ok_or_else(|| {
                PlaybackError::ResourceNotFound(Resource::VisualAsset(
                    special_config.overlay_asset.clone(),
                ))
            })?;
        stage.set_opacity(overlay, 0.0);

        let gate = AudioGateKeeper::from_story(&story, &special_config.cue);
        let wrap_width = self.render_width.map(|w| w - config.padding);
        if wrap_width.is_none() {
            warn!("no render width set, paragraphs cannot be revealed");
        }
        let revealer = ParagraphRevealer::new(wrap_width, config.reveal.clone());
        let special =
            SpecialSequenceController::new(special_config, mask, config.mask_opacity, overlay);

        debug!(
            pages = story.page_count(),
            gating_cues = gate.cues().len(),
            "story player built"
        );

        Ok(StoryPlayer {
            story,
            stage,
            config,
            scene: Scene {
                container,
                mask,
                surfaces,
                tip,
            },
            position: PlaybackPosition::default(),
            gate,
            revealer,
            special,
            scope: CallbackScope::new(),
            on_complete: self.on_complete,
            completed: false,
            input_latched: false,
            torn_down: false,
        })
    }
}
