//! Export orchestration: session directory in, project file out.

use std::path::{Path, PathBuf};

use recast_common::config::AssemblyConfig;
use recast_common::error::{RecastError, RecastResult};
use recast_processing_core::assets::MediaProbe;
use recast_processing_core::timeline::TimelineBuilder;
use recast_project_model::composition::Composition;
use recast_project_model::session::Session;

use crate::backend::emit;
use crate::composite::SvgCompositeRenderer;
use crate::probe::FfprobeProbe;
use crate::xges::XgesBackend;

const CURSOR_DOT_FILE: &str = "recast-cursor-dot.svg";
const CURSOR_DOT_SVG: &str = include_str!("../assets/cursor-dot.svg");

/// An export job ready to be run.
#[derive(Debug, Clone)]
pub struct ExportJob {
    /// Session directory (contains `session.json`).
    pub session_dir: PathBuf,

    /// Output project path.
    pub output_path: PathBuf,

    /// Assembly settings.
    pub config: AssemblyConfig,

    /// Directory for generated files (composites, cursor dot).
    /// Defaults to the session directory.
    pub work_dir: Option<PathBuf>,
}

impl ExportJob {
    pub fn new(
        session_dir: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        config: AssemblyConfig,
    ) -> Self {
        Self {
            session_dir: session_dir.into(),
            output_path: output_path.into(),
            config,
            work_dir: None,
        }
    }

    pub fn work_dir(&self) -> &Path {
        self.work_dir.as_deref().unwrap_or(&self.session_dir)
    }
}

/// Export a session to a GES project.
///
/// This is the main entry point. Assembly runs on the blocking pool since
/// probing and composite rendering do synchronous I/O.
pub async fn export_session(job: ExportJob) -> RecastResult<PathBuf> {
    tracing::info!(
        session = %job.session_dir.display(),
        output = %job.output_path.display(),
        "Starting export"
    );

    if !job.session_dir.is_dir() {
        return Err(RecastError::FileNotFound {
            path: job.session_dir.clone(),
        });
    }

    let probe = FfprobeProbe::new();
    if !probe.is_available() {
        return Err(RecastError::config(
            "ffprobe not found in PATH; it is needed to inspect session media",
        ));
    }

    tokio::task::spawn_blocking(move || run_export(&job, &probe))
        .await
        .map_err(|e| RecastError::render(format!("Export task failed: {e}")))?
}

fn run_export(job: &ExportJob, probe: &dyn MediaProbe) -> RecastResult<PathBuf> {
    let composition = assemble_session(&job.session_dir, &job.config, job.work_dir(), probe)?;
    let mut backend = XgesBackend::new(&job.output_path);
    emit(&composition, &mut backend)
}

/// Load a session and assemble its composition without writing a project.
///
/// Annotation composites and the default cursor dot are written to
/// `work_dir`.
pub fn assemble_session(
    session_dir: &Path,
    config: &AssemblyConfig,
    work_dir: &Path,
    probe: &dyn MediaProbe,
) -> RecastResult<Composition> {
    let session = load_session(session_dir)?;

    let renderer = SvgCompositeRenderer::new(work_dir);
    let mut builder = TimelineBuilder::new(config.clone(), &renderer)?;
    if config.cursor && config.cursor_dot.is_none() {
        builder = builder.with_cursor_dot(ensure_cursor_dot_file(work_dir)?);
    }

    builder.build(&session, probe)
}

/// Load `session.json`, surfacing problems as input errors.
pub fn load_session(session_dir: &Path) -> RecastResult<Session> {
    let session = Session::load(session_dir)
        .map_err(|e| RecastError::input(format!("Failed to load session: {e}")))?;

    for missing in session.validate_sources() {
        tracing::warn!("{missing}");
    }
    Ok(session)
}

/// Write the embedded cursor dot into `dir`, refreshing a stale copy.
pub fn ensure_cursor_dot_file(dir: &Path) -> RecastResult<PathBuf> {
    let dot_path = dir.join(CURSOR_DOT_FILE);
    let desired = CURSOR_DOT_SVG.as_bytes();

    let needs_write = match std::fs::read(&dot_path) {
        Ok(existing) => existing != desired,
        Err(_) => true,
    };

    if needs_write {
        std::fs::create_dir_all(dir)?;
        std::fs::write(&dot_path, desired).map_err(|e| {
            RecastError::render(format!(
                "Failed to materialize cursor dot {}: {e}",
                dot_path.display()
            ))
        })?;
    }

    Ok(dot_path)
}
