/// Paragraph reveal — text fade-in plus the paragraph's voice cue.

use thiserror::Error;
use tracing::debug;

use crate::core::stage::{Animator, AudioEngine, Fade, NodeId, Renderer, Resource, Ticket};
use crate::schema::config::RevealConfig;
use crate::schema::story::Paragraph;

#[derive(Debug, Error)]
pub enum RevealError {
    #[error("resource not found: {0}")]
    ResourceNotFound(Resource),
}

/// What a reveal put on stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revealed {
    pub node: NodeId,
    pub fade: Ticket,
    /// Playback of the paragraph's voice cue, if it has one.
    pub cue: Option<Ticket>,
}

#[derive(Debug, Clone)]
pub struct ParagraphRevealer {
    wrap_width: Option<f32>,
    config: RevealConfig,
}

impl ParagraphRevealer {
    pub fn new(wrap_width: Option<f32>, config: RevealConfig) -> Self {
        Self { wrap_width, config }
    }

    pub fn wrap_width(&self) -> Option<f32> {
        self.wrap_width
    }

    /// Append `paragraph` to `surface` fully transparent, fade it in, and
    /// start its cue. The returned tickets are the caller's to track.
    ///
    /// Resources are checked before anything is added, so a failed reveal
    /// leaves the stage untouched.
    pub fn reveal<S>(
        &self,
        stage: &mut S,
        paragraph: &Paragraph,
        surface: NodeId,
    ) -> Result<Revealed, RevealError>
    where
        S: Renderer + Animator + AudioEngine + ?Sized,
    {
        let wrap_width = self
            .wrap_width
            .filter(|w| *w > 0.0)
            .ok_or(RevealError::ResourceNotFound(Resource::RenderWidth))?;

        if let Some(cue) = &paragraph.cue {
            if !stage.has_cue(cue) {
                return Err(RevealError::ResourceNotFound(Resource::Cue(cue.clone())));
            }
        }

        let node = stage.add_text(surface, &paragraph.content, paragraph.position, wrap_width);
        stage.set_opacity(node, 0.0);
        let fade = stage.fade(Fade::from_to(node, 0.0, 1.0, self.config.fade()));

        let cue = paragraph.cue.as_ref().map(|cue| {
            debug!(cue = %cue, volume = self.config.voice_volume, "starting voice cue");
            stage.play(cue, self.config.voice_volume)
        });

        Ok(Revealed { node, fade, cue })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::headless::HeadlessStage;
    use crate::schema::story::{CueId, Position};

    fn revealer() -> ParagraphRevealer {
        ParagraphRevealer::new(Some(340.0), RevealConfig::default())
    }

    #[test]
    fn reveal_adds_transparent_text_and_fades_in() {
        let mut stage = HeadlessStage::new();
        let surface = stage.create_container(stage.root());
        let paragraph = Paragraph::new("The lights came on.", Position::new(20.0, 60.0));

        let revealed = revealer().reveal(&mut stage, &paragraph, surface).unwrap();

        assert_eq!(stage.texts(surface), vec!["The lights came on."]);
        let node = stage.node(revealed.node).unwrap();
        assert_eq!(node.opacity, 0.0);
        assert_eq!(node.position, Position::new(20.0, 60.0));
        assert_eq!(revealed.cue, None);

        let fade = stage.pending_fades()[0];
        assert_eq!(fade.ticket, revealed.fade);
        assert_eq!(fade.fade.to, 1.0);
        assert_eq!(fade.fade.duration.as_millis(), 500);

        stage.finish_fades();
        assert_eq!(stage.opacity(revealed.node), Some(1.0));
    }

    #[test]
    fn reveal_starts_cue_at_voice_volume() {
        let mut stage = HeadlessStage::new().with_cue("aoi_1");
        let surface = stage.create_container(stage.root());
        let paragraph = Paragraph::new("Hello?", Position::default()).with_cue("aoi_1");

        let revealed = revealer().reveal(&mut stage, &paragraph, surface).unwrap();

        assert!(revealed.cue.is_some());
        assert!(stage.is_playing(&CueId::from("aoi_1")));
        assert_eq!(stage.played()[0].volume, 2.8);
    }

    #[test]
    fn missing_cue_fails_without_side_effects() {
        let mut stage = HeadlessStage::new();
        let surface = stage.create_container(stage.root());
        let nodes_before = stage.node_count();
        let paragraph = Paragraph::new("Hello?", Position::default()).with_cue("ghost");

        let err = revealer().reveal(&mut stage, &paragraph, surface).unwrap_err();

        assert!(matches!(
            err,
            RevealError::ResourceNotFound(Resource::Cue(ref c)) if c.as_str() == "ghost"
        ));
        assert_eq!(stage.node_count(), nodes_before);
        assert!(stage.is_idle());
    }

    #[test]
    fn missing_render_width_fails() {
        let mut stage = HeadlessStage::new();
        let surface = stage.create_container(stage.root());
        let paragraph = Paragraph::new("Hello?", Position::default());

        let unsized_revealer = ParagraphRevealer::new(None, RevealConfig::default());
        assert!(matches!(
            unsized_revealer.reveal(&mut stage, &paragraph, surface),
            Err(RevealError::ResourceNotFound(Resource::RenderWidth))
        ));

        let zero_width = ParagraphRevealer::new(Some(0.0), RevealConfig::default());
        assert!(zero_width.reveal(&mut stage, &paragraph, surface).is_err());
    }
}
