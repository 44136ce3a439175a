/// Special sequence — the one-shot interlude between the first and second page.
///
/// Ducking: the mask fades out, the overlay fades in, the ambient channel is
/// turned down and the interlude cue starts. Playing: wait for the cue.
/// Restoring: the mask comes back, the overlay fades out, the player moves
/// to the next page and, after a short delay, reveals its first paragraph.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::scope::{CallbackScope, TicketKind};
use crate::core::stage::{Fade, NodeId, Resource, Signal, Stage, Ticket};
use crate::schema::config::SpecialSequenceConfig;

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("resource not found: {0}")]
    ResourceNotFound(Resource),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Inactive,
    Ducking,
    Playing,
    Restoring,
}

/// Result of asking the sequence to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceTrigger {
    Started,
    /// Already running; the request is ignored.
    InProgress,
    /// Ran before; it never runs twice.
    AlreadyRun,
    /// The interlude cue was already playing, so ducking was skipped.
    CueAlreadyPlaying,
}

/// What the player must do after a sequence signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceAction {
    Wait,
    /// Leave the exhausted first page for the next one.
    AdvancePage,
    /// The sequence is over; reveal the next paragraph.
    Resume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Idle,
    Ducking,
    AwaitingCue(Ticket),
    AwaitingOverlayFade(Ticket),
    AwaitingResume(Ticket),
}

#[derive(Debug, Clone)]
pub struct SpecialSequenceController {
    config: SpecialSequenceConfig,
    mask: NodeId,
    mask_opacity: f32,
    overlay: NodeId,
    step: Step,
    has_run: bool,
}

impl SpecialSequenceController {
    pub fn new(
        config: SpecialSequenceConfig,
        mask: NodeId,
        mask_opacity: f32,
        overlay: NodeId,
    ) -> Self {
        Self {
            config,
            mask,
            mask_opacity,
            overlay,
            step: Step::Idle,
            has_run: false,
        }
    }

    pub fn state(&self) -> SequenceState {
        match self.step {
            Step::Idle => SequenceState::Inactive,
            Step::Ducking => SequenceState::Ducking,
            Step::AwaitingCue(_) => SequenceState::Playing,
            Step::AwaitingOverlayFade(_) | Step::AwaitingResume(_) => SequenceState::Restoring,
        }
    }

    pub fn has_run(&self) -> bool {
        self.has_run
    }

    pub fn config(&self) -> &SpecialSequenceConfig {
        &self.config
    }

    pub fn trigger<S: Stage + ?Sized>(
        &mut self,
        stage: &mut S,
        scope: &mut CallbackScope,
    ) -> Result<SequenceTrigger, SequenceError> {
        if self.step != Step::Idle {
            debug!(state = ?self.state(), "special sequence already running");
            return Ok(SequenceTrigger::InProgress);
        }
        if self.has_run {
            debug!("special sequence already ran");
            return Ok(SequenceTrigger::AlreadyRun);
        }
        let cue = &self.config.cue;
        if stage.is_playing(cue) {
            warn!(cue = %cue, "interlude cue already playing, skipping ducking");
            return Ok(SequenceTrigger::CueAlreadyPlaying);
        }
        if !stage.has_cue(cue) {
            return Err(SequenceError::ResourceNotFound(Resource::Cue(cue.clone())));
        }

        self.has_run = true;
        self.step = Step::Ducking;
        info!(cue = %cue, "special sequence: ducking");

        let fade = self.config.fade();
        let mask_out = stage.fade(Fade::to(self.mask, 0.0, fade));
        scope.track(mask_out, TicketKind::Fade);
        stage.set_visible(self.overlay, true);
        let overlay_in = stage.fade(Fade::to(self.overlay, 1.0, fade));
        scope.track(overlay_in, TicketKind::Fade);
        stage.set_channel_volume(&self.config.ambient_channel, self.config.ambient_ducked_volume);

        let ticket = stage.play(cue, self.config.cue_volume);
        scope.track(ticket, TicketKind::Cue);
        self.step = Step::AwaitingCue(ticket);
        info!(cue = %cue, "special sequence: playing");

        Ok(SequenceTrigger::Started)
    }

    /// Advance on a completion the player has already settled against its
    /// scope. Signals that do not belong to the current step are ignored.
    pub fn on_signal<S: Stage + ?Sized>(
        &mut self,
        signal: Signal,
        stage: &mut S,
        scope: &mut CallbackScope,
    ) -> SequenceAction {
        match (self.step, signal) {
            (Step::AwaitingCue(expected), Signal::CueFinished(t)) if expected == t => {
                info!("special sequence: restoring");
                if let Some(volume) = self.config.ambient_restore_volume {
                    stage.set_channel_volume(&self.config.ambient_channel, volume);
                }
                let fade = self.config.fade();
                let mask_in = stage.fade(Fade::to(self.mask, self.mask_opacity, fade));
                scope.track(mask_in, TicketKind::Fade);
                let ticket = stage.fade(Fade::to(self.overlay, 0.0, fade));
                scope.track(ticket, TicketKind::Fade);
                self.step = Step::AwaitingOverlayFade(ticket);
                SequenceAction::Wait
            }
            (Step::AwaitingOverlayFade(expected), Signal::FadeFinished(t)) if expected == t => {
                stage.set_visible(self.overlay, false);
                let ticket = stage.schedule(self.config.auto_advance_delay());
                scope.track(ticket, TicketKind::Timer);
                self.step = Step::AwaitingResume(ticket);
                SequenceAction::AdvancePage
            }
            (Step::AwaitingResume(expected), Signal::TimerFired(t)) if expected == t => {
                info!("special sequence: finished");
                self.step = Step::Idle;
                SequenceAction::Resume
            }
            (step, signal) => {
                debug!(?step, ?signal, "signal does not advance special sequence");
                SequenceAction::Wait
            }
        }
    }

    /// Forget any in-flight step. Used on teardown; the sequence stays spent.
    pub fn abandon(&mut self) {
        if self.step != Step::Idle {
            warn!(state = ?self.state(), "special sequence abandoned");
        }
        self.step = Step::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::headless::HeadlessStage;
    use crate::core::stage::{AudioEngine, Renderer};
    use crate::schema::story::CueId;

    struct Fixture {
        stage: HeadlessStage,
        scope: CallbackScope,
        sequence: SpecialSequenceController,
        mask: NodeId,
        overlay: NodeId,
    }

    fn fixture(config: SpecialSequenceConfig) -> Fixture {
        let mut stage = HeadlessStage::new()
            .with_cue(config.cue.clone())
            .with_asset(config.overlay_asset.clone());
        let root = stage.root();
        let mask = stage.create_container(root);
        stage.set_opacity(mask, 0.8);
        let overlay = stage
            .add_sprite(root, &config.overlay_asset, Default::default())
            .unwrap();
        stage.set_opacity(overlay, 0.0);
        let sequence = SpecialSequenceController::new(config, mask, 0.8, overlay);
        Fixture {
            stage,
            scope: CallbackScope::new(),
            sequence,
            mask,
            overlay,
        }
    }

    /// Forward signals, returning the actions in order.
    fn deliver(f: &mut Fixture, signals: Vec<Signal>) -> Vec<SequenceAction> {
        let mut actions = Vec::new();
        for signal in signals {
            if f.scope.settle(&signal) {
                actions.push(f.sequence.on_signal(signal, &mut f.stage, &mut f.scope));
            }
        }
        actions
    }

    #[test]
    fn full_run() {
        let mut f = fixture(SpecialSequenceConfig::default());
        let cue = CueId::from("new_year");

        let trigger = f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap();
        assert_eq!(trigger, SequenceTrigger::Started);
        assert_eq!(f.sequence.state(), SequenceState::Playing);
        assert!(f.stage.is_playing(&cue));
        assert_eq!(f.stage.played()[0].volume, 1.3);
        assert_eq!(f.stage.channel_volume("bgm"), Some(0.5));

        // Ducking fades are tracked but do not move the sequence on.
        let ducking_fades = f.stage.finish_fades();
        assert_eq!(ducking_fades.len(), 2);
        assert_eq!(
            deliver(&mut f, ducking_fades),
            vec![SequenceAction::Wait, SequenceAction::Wait]
        );
        assert_eq!(f.sequence.state(), SequenceState::Playing);
        assert_eq!(f.stage.opacity(f.mask), Some(0.0));
        assert_eq!(f.stage.opacity(f.overlay), Some(1.0));

        let cue_signals = f.stage.finish_cue(&cue);
        assert_eq!(deliver(&mut f, cue_signals), vec![SequenceAction::Wait]);
        assert_eq!(f.sequence.state(), SequenceState::Restoring);

        let fade_signals = f.stage.finish_fades();
        assert_eq!(
            deliver(&mut f, fade_signals),
            vec![SequenceAction::Wait, SequenceAction::AdvancePage]
        );
        assert!(!f.stage.is_visible(f.overlay));
        assert_eq!(f.stage.opacity(f.mask), Some(0.8));
        assert_eq!(f.stage.pending_timers()[0].delay.as_millis(), 500);

        let timer_signals = f.stage.fire_timers();
        assert_eq!(deliver(&mut f, timer_signals), vec![SequenceAction::Resume]);
        assert_eq!(f.sequence.state(), SequenceState::Inactive);
        assert!(f.sequence.has_run());
    }

    #[test]
    fn runs_at_most_once() {
        let mut f = fixture(SpecialSequenceConfig::default());
        f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap();
        assert_eq!(
            f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap(),
            SequenceTrigger::InProgress
        );

        let signals = f.stage.finish_all_cues();
        deliver(&mut f, signals);
        let signals = f.stage.finish_fades();
        deliver(&mut f, signals);
        let signals = f.stage.fire_timers();
        deliver(&mut f, signals);

        assert_eq!(
            f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap(),
            SequenceTrigger::AlreadyRun
        );
        assert_eq!(f.stage.played().len(), 1);
    }

    #[test]
    fn skips_ducking_when_cue_already_playing() {
        let mut f = fixture(SpecialSequenceConfig::default());
        f.stage.play(&CueId::from("new_year"), 1.0);

        let trigger = f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap();

        assert_eq!(trigger, SequenceTrigger::CueAlreadyPlaying);
        assert_eq!(f.sequence.state(), SequenceState::Inactive);
        assert_eq!(f.stage.channel_volume("bgm"), None);
        assert!(f.stage.pending_fades().is_empty());
        assert!(!f.sequence.has_run());
    }

    #[test]
    fn missing_cue_is_resource_error() {
        let config = SpecialSequenceConfig::default();
        let mut f = fixture(config.clone());
        let mut stage = HeadlessStage::new().with_asset(config.overlay_asset);
        let err = f.sequence.trigger(&mut stage, &mut f.scope).unwrap_err();
        assert!(matches!(err, SequenceError::ResourceNotFound(Resource::Cue(_))));
        assert!(!f.sequence.has_run());
    }

    #[test]
    fn restores_ambient_volume_when_configured() {
        let config = SpecialSequenceConfig {
            ambient_restore_volume: Some(0.8),
            ..SpecialSequenceConfig::default()
        };
        let mut f = fixture(config);
        f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap();
        assert_eq!(f.stage.channel_volume("bgm"), Some(0.5));

        let signals = f.stage.finish_all_cues();
        deliver(&mut f, signals);
        assert_eq!(f.stage.channel_volume("bgm"), Some(0.8));
    }

    #[test]
    fn leaves_ambient_ducked_by_default() {
        let mut f = fixture(SpecialSequenceConfig::default());
        f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap();
        let signals = f.stage.finish_all_cues();
        deliver(&mut f, signals);
        assert_eq!(f.stage.channel_volume("bgm"), Some(0.5));
    }

    #[test]
    fn every_sequence_fade_is_tracked() {
        let mut f = fixture(SpecialSequenceConfig::default());
        f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap();
        let ducking: Vec<Ticket> = f.stage.pending_fades().iter().map(|p| p.ticket).collect();
        assert_eq!(ducking.len(), 2);

        let cue = f.stage.finish_cue(&CueId::from("new_year"));
        deliver(&mut f, cue);
        let restoring: Vec<Ticket> = f
            .stage
            .pending_fades()
            .iter()
            .map(|p| p.ticket)
            .filter(|t| !ducking.contains(t))
            .collect();
        assert_eq!(restoring.len(), 2);

        let outstanding: Vec<Ticket> = f.scope.close().into_iter().map(|(t, _)| t).collect();
        for ticket in ducking.iter().chain(&restoring) {
            assert!(outstanding.contains(ticket), "{:?} not tracked", ticket);
        }
    }

    #[test]
    fn out_of_order_signals_are_ignored() {
        let mut f = fixture(SpecialSequenceConfig::default());
        f.sequence.trigger(&mut f.stage, &mut f.scope).unwrap();
        let action = f.sequence.on_signal(
            Signal::TimerFired(Ticket(999)),
            &mut f.stage,
            &mut f.scope,
        );
        assert_eq!(action, SequenceAction::Wait);
        assert_eq!(f.sequence.state(), SequenceState::Playing);
    }
}
