//! `mmr generate` command implementation.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Args;
use mmr_config::{CliSettings, Config, ImageFormat, Theme};
use mmr_generator::{GenerationSummary, Generator};

use crate::error::CliError;
use crate::output::Output;

/// Exit code when the run completed but some diagrams failed and
/// `failOnRenderError` is set.
const PARTIAL_FAILURE: u8 = 2;

/// Arguments for the generate command.
#[derive(Args)]
pub(crate) struct GenerateArgs {
    /// Path to configuration file (default: auto-discover mmr.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(short, long)]
    docs_dir: Option<PathBuf>,

    /// Image output directory (overrides config).
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Image format: png or svg (overrides config).
    #[arg(short, long, value_parser = parse_format)]
    format: Option<ImageFormat>,

    /// Resolution scale factor for png output (overrides config).
    #[arg(short, long)]
    scale: Option<f64>,

    /// Mermaid theme (overrides config).
    #[arg(short, long, value_parser = parse_theme)]
    theme: Option<Theme>,

    /// Seconds to wait for each diagram (overrides config).
    #[arg(long)]
    timeout: Option<u64>,

    /// Exit with code 2 when any diagram fails to render.
    #[arg(long)]
    fail_on_render_error: bool,

    /// Enable verbose output (per-diagram progress logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl GenerateArgs {
    /// Execute the generate command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the run aborts.
    pub(crate) fn execute(self) -> Result<ExitCode, CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            docs_dir: self.docs_dir,
            output_dir: self.output_dir,
            image_format: self.format,
            image_scale: self.scale,
            theme: self.theme,
            render_timeout_secs: self.timeout,
            fail_on_render_error: self.fail_on_render_error.then_some(true),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if let Some(path) = &config.config_path {
            output.field("Config", &path.display().to_string());
        }
        output.field("Docs", &config.paths.docs_dir.display().to_string());
        output.field("Output", &config.paths.output_dir.display().to_string());
        output.field(
            "Format",
            &format!("{} (theme {})", config.image_format, config.theme),
        );

        let fail_on_render_error = config.fail_on_render_error;
        let runtime = tokio::runtime::Runtime::new()?;
        let summary = runtime.block_on(run_cancellable(config, &output))?;

        report(&output, &summary);
        Ok(exit_code(&summary, fail_on_render_error))
    }
}

/// Run generation on a blocking thread, cancelling it on Ctrl-C.
///
/// Cancellation takes effect before the next diagram; the engine is still
/// shut down by the generator.
async fn run_cancellable(config: Config, output: &Output) -> Result<GenerationSummary, CliError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    let mut task =
        tokio::task::spawn_blocking(move || Generator::new(&config).with_cancel_flag(flag).run());

    let finished = tokio::select! {
        joined = &mut task => Some(joined),
        Ok(()) = tokio::signal::ctrl_c() => None,
    };

    let joined = match finished {
        Some(joined) => joined,
        None => {
            tracing::info!("Interrupt received, stopping after current diagram");
            output.warning("Interrupted, finishing current diagram...");
            cancel.store(true, Ordering::Relaxed);
            task.await
        }
    };

    let summary = joined.map_err(|e| CliError::Task(e.to_string()))??;
    Ok(summary)
}

fn report(output: &Output, summary: &GenerationSummary) {
    let manifest = &summary.manifest;
    output.success(&format!(
        "Generated {} image(s) from {} document(s)",
        manifest.generated_images, manifest.processed_files
    ));
    if summary.failed_blocks > 0 {
        output.warning(&format!(
            "{} diagram(s) failed to render and were left in place",
            summary.failed_blocks
        ));
    }
    if summary.failed_documents > 0 {
        output.warning(&format!(
            "{} document(s) could not be read or written",
            summary.failed_documents
        ));
    }
    output.info(&format!("Report: {}", summary.report_path.display()));
}

fn exit_code(summary: &GenerationSummary, fail_on_render_error: bool) -> ExitCode {
    if fail_on_render_error && summary.has_failures() {
        ExitCode::from(PARTIAL_FAILURE)
    } else {
        ExitCode::SUCCESS
    }
}

fn parse_format(s: &str) -> Result<ImageFormat, String> {
    ImageFormat::parse(s).ok_or_else(|| format!("unknown format '{s}' (expected png or svg)"))
}

fn parse_theme(s: &str) -> Result<Theme, String> {
    Theme::parse(s).ok_or_else(|| {
        let names: Vec<_> = Theme::ALL.iter().map(|t| t.as_str()).collect();
        format!("unknown theme '{s}' (expected one of {})", names.join(", "))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmr_generator::GenerationManifest;
    use pretty_assertions::assert_eq;

    fn summary(failed_blocks: usize, failed_documents: usize) -> GenerationSummary {
        GenerationSummary {
            manifest: GenerationManifest::new(Config::default(), 0, Vec::new()),
            report_path: PathBuf::from("assets/mermaid/generation-report.json"),
            failed_blocks,
            failed_documents,
        }
    }

    #[test]
    fn test_exit_code_success() {
        assert_eq!(exit_code(&summary(0, 0), true), ExitCode::SUCCESS);
    }

    #[test]
    fn test_exit_code_failures_tolerated_by_default() {
        assert_eq!(exit_code(&summary(2, 0), false), ExitCode::SUCCESS);
    }

    #[test]
    fn test_exit_code_partial_failure() {
        assert_eq!(exit_code(&summary(1, 0), true), ExitCode::from(2));
        assert_eq!(exit_code(&summary(0, 1), true), ExitCode::from(2));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("svg"), Ok(ImageFormat::Svg));
        assert!(parse_format("jpeg").unwrap_err().contains("png or svg"));
    }

    #[test]
    fn test_parse_theme() {
        assert_eq!(parse_theme("forest"), Ok(Theme::Forest));
        let err = parse_theme("solarized").unwrap_err();
        assert!(err.contains("default, dark, forest, neutral, base"), "got {err}");
    }
}
