//! Show session information.

use std::path::PathBuf;

use recast_project_model::time::format_ns;
use recast_project_model::Session;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let session =
        Session::load(&path).map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;

    println!("Session: {}", session.name.as_deref().unwrap_or("(unnamed)"));
    println!("  Path: {}", path.display());
    if let Some((first, last)) = session.time_span() {
        println!("  Events: {} - {}", format_ns(first), format_ns(last));
    }
    println!();

    println!("Media:");
    println!("  Webcam: {}", session.webcam.display());
    println!("  Deskshare: {}", session.deskshare_video.display());
    println!();

    let placeholders = session
        .slides
        .iter()
        .filter(|slide| slide.is_deskshare_placeholder())
        .count();
    let shapes: usize = session
        .annotations
        .iter()
        .map(|group| group.shapes.len())
        .sum();
    let hidden = session.cursor.iter().filter(|c| c.is_hidden()).count();

    println!("Streams:");
    println!(
        "  Slides: {} ({} screen-share placeholders)",
        session.slides.len(),
        placeholders
    );
    println!("  Cursor events: {} ({} hidden)", session.cursor.len(), hidden);
    println!("  Screen-share events: {}", session.deskshare.len());
    println!(
        "  Annotations: {} shapes on {} slides",
        shapes,
        session.annotations.len()
    );

    Ok(())
}
