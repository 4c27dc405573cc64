// Voiceloom voice separation: CLI entry point.
//
// Separates a note sequence into melodic voices and prints the assignment.
// The pipeline: load notes, run the windowed stochastic search, render the
// per-voice result and the whole-passage cost breakdown.
//
// Usage:
//   cargo run -p voiceloom -- [notes.json] [--voices N] [--seed N]
//     [--lookback N] [--config config.json]
//
// notes.json holds an onset-sorted array of notes; without it a built-in
// three-part demo passage is separated instead.

use std::path::Path;
use voiceloom::config::SeparationConfig;
use voiceloom::cost::cost_breakdown;
use voiceloom::notes::{Note, NoteBuffer};
use voiceloom::search::separate;

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    // Parse arguments
    let notes_path = args
        .get(1)
        .filter(|s| !s.starts_with("--"))
        .map(|s| s.as_str());
    let mut config = match parse_flag::<String>(&args, "--config") {
        Some(path) => match SeparationConfig::load(Path::new(&path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => SeparationConfig {
            max_voices: 3,
            ..SeparationConfig::default()
        },
    };
    if let Some(voices) = parse_flag(&args, "--voices") {
        config.max_voices = voices;
    }
    if let Some(seed) = parse_flag(&args, "--seed") {
        config.seed = seed;
    }
    if let Some(lookback) = parse_flag(&args, "--lookback") {
        config.pitch_lookback = lookback;
    }

    println!("=== Voiceloom Voice Separation ===");
    println!("Voices: {}", config.max_voices);
    println!("Seed: {}", config.seed);
    println!("Pitch lookback: {}", config.pitch_lookback);
    println!();

    println!("[1/3] Loading notes...");
    let notes = match notes_path {
        Some(path) => match load_notes(Path::new(path)) {
            Ok(notes) => {
                println!("  Loaded {} notes from {}.", notes.len(), path);
                notes
            }
            Err(e) => {
                eprintln!("  Failed to load {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => {
            let notes = demo_passage();
            println!("  Using the built-in demo passage ({} notes).", notes.len());
            notes
        }
    };

    let mut buffer = match NoteBuffer::from_notes(&notes) {
        Ok(buffer) => buffer,
        Err(e) => {
            eprintln!("  Bad input: {}", e);
            std::process::exit(1);
        }
    };

    println!("[2/3] Separating...");
    let stats = match separate(&mut buffer, &config) {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("  Separation failed: {}", e);
            std::process::exit(1);
        }
    };
    println!("  Windows: {}", stats.windows);
    println!("  Search steps: {}", stats.steps);
    println!("  Committed cost: {:.4}", stats.cost);

    println!("[3/3] Result:");
    print!("{}", buffer.summary());

    // Score the final assignment as one big window over empty history;
    // rethreading from scratch reproduces the committed chains exactly.
    let whole = 0..buffer.len();
    let heads = vec![None; config.max_voices];
    let scored = cost_breakdown(&mut buffer, &whole, &heads, &config);
    println!("Whole-passage penalties:");
    println!("  pitch:   {:.4}", scored.pitch);
    println!("  gap:     {:.4}", scored.gap);
    println!("  chord:   {:.4}", scored.chord);
    println!("  overlap: {:.4}", scored.overlap);
    println!("  cross:   {:.4}", scored.cross);
    println!("  total:   {:.4}", scored.total);
}

fn load_notes(path: &Path) -> Result<Vec<Note>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let notes = serde_json::from_str(&text)?;
    Ok(notes)
}

/// A short three-part phrase: walking bass, sustained tenor, running melody.
fn demo_passage() -> Vec<Note> {
    let mut notes = vec![
        Note::new(0.0, 2.0, 43),
        Note::new(0.0, 1.0, 55),
        Note::new(0.0, 0.5, 67),
        Note::new(0.5, 0.5, 69),
        Note::new(1.0, 1.0, 57),
        Note::new(1.0, 0.5, 71),
        Note::new(1.5, 0.5, 72),
        Note::new(2.0, 2.0, 45),
        Note::new(2.0, 2.0, 59),
        Note::new(2.0, 1.0, 74),
        Note::new(3.0, 1.0, 71),
        Note::new(4.0, 2.0, 47),
        Note::new(4.0, 2.0, 55),
        Note::new(4.0, 1.5, 72),
        Note::new(5.5, 0.5, 69),
        Note::new(6.0, 2.0, 48),
        Note::new(6.0, 2.0, 52),
        Note::new(6.0, 2.0, 67),
    ];
    notes.sort_by(|a, b| a.onset.total_cmp(&b.onset));
    notes
}

fn print_usage() {
    println!("Usage: separate [notes.json] [OPTIONS]");
    println!();
    println!("Separates an onset-sorted note sequence into melodic voices.");
    println!("Without a notes file, a built-in demo passage is used.");
    println!();
    println!("Options:");
    println!("  --voices N      number of voices (default 3)");
    println!("  --seed N        search seed (default 0)");
    println!("  --lookback N    pitch contour lookback in chord groups (default 2)");
    println!("  --config FILE   JSON config; the flags above override its fields");
    println!("  -h, --help      print this message");
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Option<T> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|v| v.parse().ok())
}
