//! Line-oriented front end.
//!
//! - Lines starting with `#` are commands (status, help, quit)
//! - Lines that are bare numbers are creature ids
//! - Any other line is treated as an observed resource URL

use std::io;
use tokio::io::{AsyncBufReadExt, BufReader};
use typedex_core::{render_panel, EntityId, Panel, Presenter, Tracker, TrackerConfig};

/// Prints panels to stdout.
struct TextPresenter;

impl Presenter for TextPresenter {
    fn show(&mut self, panel: &Panel) {
        for line in render_panel(panel) {
            println!("{line}");
        }
        if !panel.is_complete() {
            println!("[PARTIAL] relations not loaded for: {}", panel.unresolved.join(", "));
        }
        println!();
    }

    fn not_found(&mut self, id: EntityId) {
        println!("Pokemon data not found for ID: {id}");
    }
}

/// Run the tracker over stdin until EOF or `#quit`.
pub async fn run_headless(config: TrackerConfig) -> io::Result<()> {
    let tracker = Tracker::connect(config).await;
    let warm = tracker.warm_up().await;

    println!("=== typedex ===");
    println!(
        "Roster: {} creatures ({} new), type relations: {} keys ({} new)",
        tracker.cache().entity_count(),
        warm.roster_added,
        tracker.cache().relations().len(),
        warm.relations_fetched
    );
    println!();

    let mut presenter = TextPresenter;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('#') {
            match command.split_whitespace().next() {
                Some("quit") | Some("exit") => break,
                Some("status") => print_status(&tracker),
                Some("warm") => {
                    let warm = tracker.warm_up().await;
                    println!(
                        "[WARM] {} creatures, {} type relations fetched",
                        warm.roster_added, warm.relations_fetched
                    );
                }
                Some("help") => print_commands(),
                _ => println!("[ERROR] Unknown command: {line}"),
            }
            continue;
        }

        if let Ok(id) = line.parse::<EntityId>() {
            tracker.handle(id, &mut presenter).await;
        } else if !tracker.observe(line, &mut presenter).await {
            tracing::debug!(resource = line, "ignored resource");
        }
    }

    Ok(())
}

fn print_status(tracker: &Tracker) {
    let config = tracker.config();
    println!("[STATUS] API: {}", config.api_base);
    match &config.cache_dir {
        Some(dir) => println!("[STATUS] Cache: {}", dir.display()),
        None => println!("[STATUS] Cache: in memory"),
    }
    println!(
        "[STATUS] {} creatures, {} type relation keys, {} type fetches in flight",
        tracker.cache().entity_count(),
        tracker.cache().relations().len(),
        tracker.entities().in_flight()
    );
}

fn print_commands() {
    println!("Commands:");
    println!("  #status  - Show cache status");
    println!("  #warm    - Retry fetching missing roster and type data");
    println!("  #help    - Show this help");
    println!("  #quit    - Exit");
    println!("Anything else is a creature id or an observed resource URL.");
}
