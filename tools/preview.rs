/// Preview — interactive playback shell for checking a story's pacing.
///
/// Usage: preview <story.ron> [--config <path>] [--width <n>] [--height <n>]
///
/// Plays the story on a headless stage. Nothing completes by itself: fades,
/// cues and timers are finished by hand so gating and the interlude can be
/// stepped through.
///
/// Commands:
///   tap          — tap the scene
///   fades        — finish all running fades
///   cue <name>   — finish a playing cue
///   cues         — finish every playing cue
///   timers       — fire pending timers
///   settle       — finish everything until the stage is idle
///   state        — show position, gate and pending work
///   page         — print the paragraphs revealed on the visible page
///   help         — list commands
///   quit         — exit

use narrative_playback::core::headless::HeadlessStage;
use narrative_playback::core::player::{InputOutcome, PlaybackError, StoryPlayer};
use narrative_playback::core::stage::Signal;
use narrative_playback::schema::config::PlaybackConfig;
use narrative_playback::schema::story::{CueId, Story};
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let story_path = args[1].clone();
    let mut config_path = None;
    let mut width: f32 = 375.0;
    let mut height: f32 = 1000.0;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(args[i].clone());
            }
            "--width" if i + 1 < args.len() => {
                i += 1;
                width = args[i].parse().unwrap_or(width);
            }
            "--height" if i + 1 < args.len() => {
                i += 1;
                height = args[i].parse().unwrap_or(height);
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let story = match Story::load_from_ron(Path::new(&story_path)) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Failed to load story: {}", e);
            std::process::exit(1);
        }
    };

    let config = match config_path {
        Some(ref path) => match PlaybackConfig::load_from_ron(Path::new(path)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                std::process::exit(1);
            }
        },
        None => PlaybackConfig::default(),
    };

    let mut stage = HeadlessStage::new()
        .with_asset(config.special.overlay_asset.clone())
        .with_cue(config.special.cue.clone())
        .with_cues(story.voice_cues());
    if let Some(tip) = &config.tip {
        stage = stage.with_asset(tip.asset.clone());
    }

    println!(
        "Loaded {} pages, {} paragraphs",
        story.page_count(),
        story.total_paragraphs()
    );

    let mut player = match StoryPlayer::builder()
        .story(story)
        .render_width(width)
        .target_height(height)
        .config(config)
        .on_complete(|| println!("\n--- The End ---\n"))
        .build(stage)
    {
        Ok(p) => p,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };

    let opening = player.start();
    report(&player, opening);
    player.end_frame();
    println!("Type 'help' for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => print_help(),
            "tap" | "t" => {
                let outcome = player.on_input();
                report(&player, outcome);
            }
            "fades" => {
                let signals = player.stage_mut().finish_fades();
                deliver(&mut player, signals);
            }
            "cue" => {
                if parts.len() < 2 {
                    println!("Usage: cue <name>");
                    continue;
                }
                let signals = player.stage_mut().finish_cue(&CueId::from(parts[1]));
                if signals.is_empty() {
                    println!("'{}' is not playing", parts[1]);
                }
                deliver(&mut player, signals);
            }
            "cues" => {
                let signals = player.stage_mut().finish_all_cues();
                deliver(&mut player, signals);
            }
            "timers" => {
                let signals = player.stage_mut().fire_timers();
                deliver(&mut player, signals);
            }
            "settle" => settle(&mut player),
            "state" => print_state(&player),
            "page" => print_page(&player),
            _ => println!("Unknown command '{}'. Type 'help' for commands.", cmd),
        }
        player.end_frame();

        if player.is_completed() {
            break;
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn deliver(player: &mut StoryPlayer<HeadlessStage>, signals: Vec<Signal>) {
    for signal in signals {
        match player.handle(signal) {
            Ok(Some(outcome)) => report(player, Ok(outcome)),
            Ok(None) => {}
            Err(e) => println!("ERROR: {}", e),
        }
    }
}

/// Finish fades, then cues, then timers, until nothing is left in flight.
/// A blinking tap hint never settles, so the rounds are capped.
fn settle(player: &mut StoryPlayer<HeadlessStage>) {
    let mut rounds = 0;
    while !player.stage().is_idle() && rounds < 16 {
        let fades = player.stage_mut().finish_fades();
        deliver(player, fades);
        let cues = player.stage_mut().finish_all_cues();
        deliver(player, cues);
        let timers = player.stage_mut().fire_timers();
        deliver(player, timers);
        rounds += 1;
    }
    println!("Settled after {} rounds.", rounds);
}

fn report(
    player: &StoryPlayer<HeadlessStage>,
    outcome: Result<InputOutcome, PlaybackError>,
) {
    match outcome {
        Ok(InputOutcome::Revealed { page, paragraph }) => {
            if let Some(p) = player.story().paragraph(page, paragraph) {
                let cue = p
                    .cue
                    .as_ref()
                    .map(|c| format!("  [cue: {}]", c))
                    .unwrap_or_default();
                println!("\n  {}{}\n", p.content, cue);
            }
        }
        Ok(InputOutcome::Gated { cue }) => println!("(held: '{}' is still playing)", cue),
        Ok(InputOutcome::Debounced) => println!("(ignored: already tapped this frame)"),
        Ok(InputOutcome::Sequence(trigger)) => println!("(interlude: {:?})", trigger),
        Ok(InputOutcome::Completed) => {}
        Err(e) => println!("ERROR: {}", e),
    }
}

fn print_state(player: &StoryPlayer<HeadlessStage>) {
    let pos = player.position();
    let stage = player.stage();
    println!("Position: page {} paragraph {}", pos.page, pos.paragraph);
    println!("Interlude: {:?}", player.sequence_state());
    match player.gate().active_cue(stage) {
        Some(cue) => println!("Gate: held by '{}'", cue),
        None => println!("Gate: open"),
    }
    let playing: Vec<String> = stage.playing().iter().map(|p| p.cue.to_string()).collect();
    println!("Playing: {}", if playing.is_empty() { "-".to_string() } else { playing.join(", ") });
    println!(
        "Pending: {} fades, {} timers",
        stage.pending_fades().len(),
        stage.pending_timers().len()
    );
}

fn print_page(player: &StoryPlayer<HeadlessStage>) {
    let stage = player.stage();
    for (i, surface) in player.surfaces().iter().enumerate() {
        if stage.is_visible(*surface) {
            println!("--- Page {} ---", i + 1);
            for text in stage.texts(*surface) {
                println!("  {}", text);
            }
        }
    }
}

fn print_usage() {
    println!("Usage: preview <story.ron> [--config <path>] [--width <n>] [--height <n>]");
}

fn print_help() {
    println!("Commands:");
    println!("  tap          tap the scene");
    println!("  fades        finish all running fades");
    println!("  cue <name>   finish a playing cue");
    println!("  cues         finish every playing cue");
    println!("  timers       fire pending timers");
    println!("  settle       finish everything until the stage is idle");
    println!("  state        show position, gate and pending work");
    println!("  page         print the visible page");
    println!("  quit         exit");
}
