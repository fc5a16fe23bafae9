//! Validate a recorded session directory.

use std::path::PathBuf;

use recast_project_model::Session;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    println!("Validating session at: {}", path.display());

    let session =
        Session::load(&path).map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;

    println!("  Name: {}", session.name.as_deref().unwrap_or("(unnamed)"));
    println!("  Slides: {}", session.slides.len());
    println!("  Cursor events: {}", session.cursor.len());

    // Check source files
    let errors = session.validate_sources();
    if errors.is_empty() {
        println!("  Sources: All present");
        println!("\nSession is valid.");
    } else {
        println!("\nValidation issues:");
        for error in &errors {
            println!("  - {error}");
        }
        println!(
            "\n{} issue(s) found. Export will fail until they are fixed.",
            errors.len()
        );
    }

    Ok(())
}
