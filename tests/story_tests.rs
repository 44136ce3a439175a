/// Story and config loading integration tests.

use narrative_playback::core::headless::{HeadlessStage, NodeKind};
use narrative_playback::core::player::{InputOutcome, StoryPlayer};
use narrative_playback::core::special::SequenceTrigger;
use narrative_playback::schema::config::PlaybackConfig;
use narrative_playback::schema::story::{CueId, Story, StoryError};
use std::path::Path;

#[test]
fn three_two_fixture_loads() {
    let story = Story::load_from_ron(Path::new("tests/fixtures/three_two.ron")).unwrap();
    assert_eq!(story.page_count(), 2);
    assert_eq!(story.paragraph_count(0), 3);
    assert_eq!(story.paragraph_count(1), 2);
    assert!(story.voice_cues().is_empty());
}

#[test]
fn voiced_fixture_collects_cues() {
    let story = Story::load_from_ron(Path::new("tests/fixtures/voiced.ron")).unwrap();
    let cues = story.voice_cues();
    assert_eq!(cues.len(), 2);
    assert!(cues.contains(&CueId::from("aoi_1")));
    assert!(cues.contains(&CueId::from("aoi_2")));
    assert_eq!(story.paragraph(1, 2).unwrap().cue, None);
}

#[test]
fn demo_story_loads() {
    let story = Story::load_from_ron(Path::new("stories/first_snow.ron")).unwrap();
    assert_eq!(story.page_count(), 2);
    assert_eq!(story.total_paragraphs(), 9);

    // Paragraphs run down the page.
    for page in story.pages() {
        let ys: Vec<f32> = page.paragraphs.iter().map(|p| p.position.y).collect();
        assert!(ys.windows(2).all(|w| w[0] < w[1]), "positions out of order: {:?}", ys);
    }
}

#[test]
fn missing_story_file_is_io_error() {
    let err = Story::load_from_ron(Path::new("tests/fixtures/nope.ron")).unwrap_err();
    assert!(matches!(err, StoryError::Io(_)));
}

#[test]
fn config_fixture_overrides_defaults() {
    let config = PlaybackConfig::load_from_ron(Path::new("tests/fixtures/playback.ron")).unwrap();
    assert_eq!(config.padding, 24.0);
    assert_eq!(config.special.cue, CueId::from("bells"));
    assert_eq!(config.special.overlay_asset, "bells_card");
    assert_eq!(config.special.ambient_restore_volume, Some(0.8));
    assert_eq!(config.special.auto_advance_delay_ms, 300);
    assert_eq!(config.special.cue_volume, 1.3);
    assert_eq!(config.reveal.fade_ms, 500);
}

#[test]
fn player_follows_loaded_config() {
    let story = Story::load_from_ron(Path::new("tests/fixtures/three_two.ron")).unwrap();
    let config = PlaybackConfig::load_from_ron(Path::new("tests/fixtures/playback.ron")).unwrap();
    let stage = HeadlessStage::new().with_asset("bells_card").with_cue("bells");

    let mut player = StoryPlayer::builder()
        .story(story)
        .render_width(375.0)
        .target_height(900.0)
        .config(config)
        .build(stage)
        .unwrap();

    assert!(player.gate().cues().contains(&CueId::from("bells")));
    player.start().unwrap();
    player.end_frame();

    let first = player.stage().children(player.surfaces()[0])[0];
    match &player.stage().node(first).unwrap().kind {
        NodeKind::Text { wrap_width, content } => {
            assert_eq!(*wrap_width, 351.0);
            assert_eq!(content, "The station clock stopped at ten to midnight.");
        }
        other => panic!("expected text node, got {:?}", other),
    }

    for _ in 0..2 {
        player.on_input().unwrap();
        player.end_frame();
    }
    assert_eq!(
        player.on_input().unwrap(),
        InputOutcome::Sequence(SequenceTrigger::Started)
    );
    player.end_frame();

    let signals = player.stage_mut().finish_cue(&CueId::from("bells"));
    for signal in signals {
        player.handle(signal).unwrap();
    }
    assert_eq!(player.stage().channel_volume("bgm"), Some(0.8));

    let fades = player.stage_mut().finish_fades();
    for signal in fades {
        player.handle(signal).unwrap();
    }
    assert_eq!(player.stage().pending_timers()[0].delay.as_millis(), 300);
}
