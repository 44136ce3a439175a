/// Story Linter — validates story files before they ship.
///
/// Usage: story_linter <story.ron|dir> [--cues <cue1,cue2,...>]

use narrative_playback::schema::story::{CueId, Story};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: story_linter <story.ron|dir> [--cues <cue1,cue2,...>]");
        process::exit(0);
    }

    let target = Path::new(&args[1]);
    let mut known_cues: HashSet<CueId> = HashSet::new();

    let mut i = 2;
    while i < args.len() {
        if args[i] == "--cues" && i + 1 < args.len() {
            i += 1;
            known_cues.extend(
                args[i]
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(CueId::from),
            );
        }
        i += 1;
    }

    let files = if target.is_file() {
        vec![target.to_path_buf()]
    } else if target.is_dir() {
        let mut found = Vec::new();
        collect_story_files(target, &mut found);
        found.sort();
        found
    } else {
        eprintln!("ERROR: Path '{}' does not exist", target.display());
        process::exit(1);
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for path in &files {
        match Story::load_from_ron(path) {
            Ok(story) => {
                println!("  Loaded: {} ({} pages)", path.display(), story.page_count());
                let (e, w) = lint_story(&story, &known_cues);
                errors.extend(e.into_iter().map(|m| format!("{}: {}", path.display(), m)));
                warnings.extend(w.into_iter().map(|m| format!("{}: {}", path.display(), m)));
            }
            Err(e) => errors.push(format!("{}: {}", path.display(), e)),
        }
    }

    println!("\n=== Story Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} files, {} errors, {} warnings",
        files.len(),
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

fn collect_story_files(dir: &Path, out: &mut Vec<PathBuf>) {
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                collect_story_files(&path, out);
            } else if path.extension().and_then(|s| s.to_str()) == Some("ron") {
                out.push(path);
            }
        }
    }
}

fn lint_story(story: &Story, known_cues: &HashSet<CueId>) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (p, page) in story.pages().iter().enumerate() {
        let mut seen_positions = Vec::new();
        let mut last_y: Option<f32> = None;

        for (i, paragraph) in page.paragraphs.iter().enumerate() {
            let at = format!("page {} paragraph {}", p, i);

            if paragraph.content.trim().is_empty() {
                warnings.push(format!("{} has no text", at));
            }

            let pos = paragraph.position;
            if seen_positions.contains(&(pos.x, pos.y)) {
                errors.push(format!(
                    "{} sits on top of an earlier paragraph at ({}, {})",
                    at, pos.x, pos.y
                ));
            }
            seen_positions.push((pos.x, pos.y));

            if let Some(prev) = last_y {
                if pos.y <= prev {
                    warnings.push(format!(
                        "{} at y={} does not move down the page (previous y={})",
                        at, pos.y, prev
                    ));
                }
            }
            last_y = Some(pos.y);

            if let Some(cue) = &paragraph.cue {
                if !known_cues.is_empty() && !known_cues.contains(cue) {
                    errors.push(format!("{} references unknown cue '{}'", at, cue));
                }
            }
        }
    }

    if story.paragraph(0, 0).and_then(|p| p.cue.as_ref()).is_some() {
        // The first paragraph is revealed on start, before the player can react.
        warnings.push("the opening paragraph is voiced".to_string());
    }

    (errors, warnings)
}
