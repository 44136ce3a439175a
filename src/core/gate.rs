/// Audio gate — holds input while a voice cue is speaking.

use rustc_hash::FxHashSet;

use crate::core::stage::AudioEngine;
use crate::schema::story::{CueId, Story};

/// The set of cues that suppress input while playing.
///
/// Built from the story's paragraph cues plus the interlude cue. Ambient
/// channels are never part of it.
#[derive(Debug, Clone, Default)]
pub struct AudioGateKeeper {
    cues: FxHashSet<CueId>,
}

impl AudioGateKeeper {
    pub fn new(cues: FxHashSet<CueId>) -> Self {
        Self { cues }
    }

    pub fn from_story(story: &Story, special_cue: &CueId) -> Self {
        let mut cues = story.voice_cues();
        cues.insert(special_cue.clone());
        Self { cues }
    }

    pub fn cues(&self) -> &FxHashSet<CueId> {
        &self.cues
    }

    pub fn is_gate_active<A: AudioEngine + ?Sized>(&self, audio: &A) -> bool {
        self.active_cue(audio).is_some()
    }

    /// A gating cue the engine reports as playing, if any. Ties are broken
    /// by name so the answer is stable.
    pub fn active_cue<A: AudioEngine + ?Sized>(&self, audio: &A) -> Option<&CueId> {
        self.cues
            .iter()
            .filter(|cue| audio.is_playing(cue))
            .min()
    }
}
