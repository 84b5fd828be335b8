//! Generation run orchestration.
//!
//! A run moves through the phases of [`Phase`]: the output directory is
//! prepared, the rendering engine is started, documents are walked and
//! processed one at a time, the report is written and the engine is stopped.
//! Per-block and per-document failures are logged and skipped; only
//! failures outside document processing abort the run.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use mmr_config::{Config, ImageFormat};
use mmr_diagrams::{
    BrowserEngine, DiagramFormat, DiagramRenderer, EngineError, RenderSettings, Replacements,
    derive_base_name, embed_reference, extract_blocks, image_link,
};

use crate::manifest::{GenerationManifest, ManifestError, RenderResult};
use crate::walker::{DocumentWalker, WalkError};

/// Stage of a generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    EngineStarting,
    Walking,
    /// Processing the n-th document (zero-based, walk order).
    ProcessingDocument(usize),
    ReportGenerated,
    EngineStopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("preparing output"),
            Self::EngineStarting => f.write_str("starting rendering engine"),
            Self::Walking => f.write_str("walking documents"),
            Self::ProcessingDocument(n) => write!(f, "processing document #{n}"),
            Self::ReportGenerated => f.write_str("writing report"),
            Self::EngineStopped => f.write_str("stopping rendering engine"),
        }
    }
}

/// Fatal run error, tagged with the phase it happened in.
#[derive(Debug, thiserror::Error)]
#[error("{phase}: {kind}")]
pub struct GenerateError {
    pub phase: Phase,
    pub kind: GenerateErrorKind,
}

impl GenerateError {
    fn new(phase: Phase, kind: impl Into<GenerateErrorKind>) -> Self {
        Self {
            phase,
            kind: kind.into(),
        }
    }
}

/// Kind of fatal run error.
#[derive(Debug, thiserror::Error)]
pub enum GenerateErrorKind {
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Walk(#[from] WalkError),
    #[error("cannot write report: {0}")]
    Report(#[from] ManifestError),
    #[error("generation cancelled")]
    Cancelled,
}

/// Outcome of a completed run.
#[derive(Debug)]
pub struct GenerationSummary {
    /// The report as written.
    pub manifest: GenerationManifest,
    /// Where the report was written.
    pub report_path: PathBuf,
    /// Diagrams that failed to render (left as fenced blocks).
    pub failed_blocks: usize,
    /// Documents that could not be read or written back.
    pub failed_documents: usize,
}

impl GenerationSummary {
    /// Whether anything was skipped because of an error.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.failed_blocks > 0 || self.failed_documents > 0
    }
}

/// Counters and results accumulated while documents are processed.
#[derive(Debug, Default)]
struct RunState {
    processed_files: usize,
    results: Vec<RenderResult>,
    failed_blocks: usize,
    failed_documents: usize,
}

/// Runs diagram generation over a docs tree.
pub struct Generator<'a> {
    config: &'a Config,
    cancel: Arc<AtomicBool>,
}

impl<'a> Generator<'a> {
    /// Create a generator for `config`.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Use `flag` to request cancellation; it is checked before each diagram.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Run with a headless browser engine.
    ///
    /// The engine is started once and stopped on every exit path after it
    /// started, whether the run succeeded or failed.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError`] if the engine cannot start, the docs tree
    /// cannot be walked, the report cannot be written, or the run was
    /// cancelled.
    pub fn run(&self) -> Result<GenerationSummary, GenerateError> {
        self.prepare_output()?;

        enter(Phase::EngineStarting);
        let mut engine = BrowserEngine::launch(render_settings(self.config))
            .map_err(|e| GenerateError::new(Phase::EngineStarting, e))?;

        let result = self.generate(&mut engine);

        enter(Phase::EngineStopped);
        engine.shutdown();
        result
    }

    /// Run with an already acquired renderer.
    ///
    /// # Errors
    ///
    /// See [`run`](Self::run).
    pub fn run_with<R: DiagramRenderer>(
        &self,
        renderer: &mut R,
    ) -> Result<GenerationSummary, GenerateError> {
        self.prepare_output()?;
        self.generate(renderer)
    }

    /// Walk, process and report, once the output directory exists.
    fn generate<R: DiagramRenderer>(
        &self,
        renderer: &mut R,
    ) -> Result<GenerationSummary, GenerateError> {
        let output_dir = &self.config.paths.output_dir;

        enter(Phase::Walking);
        let walker = DocumentWalker::new(&self.config.paths.docs_dir);
        let documents = walker
            .walk()
            .map_err(|e| GenerateError::new(Phase::Walking, e))?;

        let mut state = RunState::default();
        for (n, document) in documents.enumerate() {
            let phase = Phase::ProcessingDocument(n);
            match document {
                Ok(path) => {
                    enter(phase);
                    self.process_document(&path, renderer, &mut state)
                        .map_err(|kind| GenerateError::new(phase, kind))?;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable entry");
                }
            }
        }

        enter(Phase::ReportGenerated);
        let RunState {
            processed_files,
            results,
            failed_blocks,
            failed_documents,
        } = state;
        let manifest = GenerationManifest::new(self.config.clone(), processed_files, results);
        let report_path = manifest
            .write(output_dir)
            .map_err(|e| GenerateError::new(Phase::ReportGenerated, e))?;

        tracing::info!(
            processed = manifest.processed_files,
            generated = manifest.generated_images,
            failed = failed_blocks,
            report = %report_path.display(),
            "Generation finished"
        );

        Ok(GenerationSummary {
            manifest,
            report_path,
            failed_blocks,
            failed_documents,
        })
    }

    /// Create the output directory if needed.
    fn prepare_output(&self) -> Result<(), GenerateError> {
        let output_dir = &self.config.paths.output_dir;
        enter(Phase::Idle);
        fs::create_dir_all(output_dir).map_err(|source| {
            GenerateError::new(
                Phase::Idle,
                GenerateErrorKind::OutputDir {
                    path: output_dir.clone(),
                    source,
                },
            )
        })
    }

    /// Render every block of one document and rewrite it.
    ///
    /// Only cancellation is returned as an error; everything else is logged
    /// and recorded in `state`.
    fn process_document<R: DiagramRenderer>(
        &self,
        path: &Path,
        renderer: &mut R,
        state: &mut RunState,
    ) -> Result<(), GenerateErrorKind> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to read document");
                state.failed_documents += 1;
                return Ok(());
            }
        };

        let blocks = extract_blocks(&content);
        if blocks.is_empty() {
            tracing::debug!(path = %path.display(), "No mermaid diagrams");
            return Ok(());
        }
        tracing::info!(path = %path.display(), count = blocks.len(), "Found mermaid diagrams");

        let mut replacements = Replacements::with_capacity(blocks.len());
        for block in &blocks {
            if self.cancel.load(Ordering::Relaxed) {
                return Err(GenerateErrorKind::Cancelled);
            }

            let base_name = derive_base_name(&self.config.paths.docs_dir, path, block.ordinal());
            match renderer.render(block.code(), &base_name) {
                Ok(image) => {
                    let relative_path = image_link(&self.config.image_base_url, &image.file_name);
                    replacements.add(block, embed_reference(&relative_path));
                    tracing::info!(
                        path = %path.display(),
                        index = block.ordinal(),
                        image = %relative_path,
                        "Rendered diagram"
                    );
                    state
                        .results
                        .push(RenderResult::new(path, &image.path, relative_path));
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        index = block.ordinal(),
                        error = %e,
                        "Failed to render diagram"
                    );
                    state.failed_blocks += 1;
                }
            }
        }
        state.processed_files += 1;

        if replacements.is_empty() {
            return Ok(());
        }

        let written = replacements
            .apply(&content)
            .map_err(|e| e.to_string())
            .and_then(|updated| fs::write(path, updated).map_err(|e| e.to_string()));
        if let Err(e) = written {
            tracing::error!(path = %path.display(), error = %e, "Failed to rewrite document");
            state.failed_documents += 1;
        }

        Ok(())
    }
}

/// Log a phase transition.
fn enter(phase: Phase) {
    tracing::debug!(%phase, "Entering phase");
}

/// Map the configuration onto engine settings.
#[must_use]
pub fn render_settings(config: &Config) -> RenderSettings {
    RenderSettings {
        output_dir: config.paths.output_dir.clone(),
        format: match config.image_format {
            ImageFormat::Png => DiagramFormat::Png,
            ImageFormat::Svg => DiagramFormat::Svg,
        },
        scale: config.image_scale,
        theme: config.theme.as_str().to_owned(),
        background_color: config.background_color.clone(),
        viewport: (config.width, config.height),
        custom_css: config.custom_css.clone(),
        mermaid_cdn: config.mermaid_cdn.clone(),
        timeout: config.render_timeout(),
        mermaid_options: serde_json::to_value(&config.mermaid_config).unwrap_or_default(),
    }
}
