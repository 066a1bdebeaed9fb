//! The default command: convert a directory tree to one image format.

mod batch;
pub mod types;

pub use types::ReportFormatArg;

use anyhow::Context;
use clap::Args;
use recast_core::config::expand_path;
use recast_core::{BatchSummary, Config, Converter, ReportFormat, TargetFormat};
use std::path::PathBuf;

use batch::{write_report, BatchProgress};

/// Arguments for a conversion run.
///
/// The positionals are optional at the type level so that subcommands can be
/// parsed without them; clap still requires them for a conversion.
#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    /// Target extension, with or without the leading dot (e.g. jpg, .PNG)
    #[arg(required = true)]
    pub extension: Option<String>,

    /// Directory searched recursively for images
    #[arg(required = true)]
    pub from_dir: Option<PathBuf>,

    /// Directory the converted files are written to (created if missing)
    #[arg(required = true)]
    pub to_dir: Option<PathBuf>,

    /// Write a per-file report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Report format (defaults to the config file's output.report_format)
    #[arg(long, value_enum)]
    pub report_format: Option<ReportFormatArg>,

    /// JPEG quality (1-100)
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub jpeg_quality: Option<u8>,

    /// Always develop raw sensor data instead of using embedded previews
    #[arg(long)]
    pub no_preview: bool,
}

/// Resolved inputs of a run.
struct ConvertPlan {
    target: TargetFormat,
    from_dir: PathBuf,
    to_dir: PathBuf,
}

impl ConvertArgs {
    fn plan(&self) -> anyhow::Result<ConvertPlan> {
        let (Some(extension), Some(from_dir), Some(to_dir)) =
            (&self.extension, &self.from_dir, &self.to_dir)
        else {
            anyhow::bail!(
                "Missing arguments.\n\n  Usage: recast <EXTENSION> <FROM_DIR> <TO_DIR>"
            );
        };

        let target = TargetFormat::parse(extension).map_err(|e| {
            anyhow::anyhow!("{e}\n\n  Hint: use an extension with an encoder, e.g. jpg or png.")
        })?;

        Ok(ConvertPlan {
            target,
            from_dir: expand_path(from_dir),
            to_dir: expand_path(to_dir),
        })
    }

    /// Fold command-line overrides into the loaded configuration.
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(quality) = self.jpeg_quality {
            config.output.jpeg_quality = quality;
        }
        if self.no_preview {
            config.raw.prefer_embedded_preview = false;
        }
    }

    fn report_format(&self, config: &Config) -> ReportFormat {
        self.report_format
            .map(ReportFormat::from)
            .or_else(|| ReportFormat::parse(&config.output.report_format))
            .unwrap_or(ReportFormat::Json)
    }
}

/// Execute a conversion run.
///
/// The batch runs on a blocking worker; Ctrl-C while it runs ends the
/// process with exit status 1.
pub async fn execute(args: ConvertArgs, mut config: Config) -> anyhow::Result<()> {
    let plan = args.plan()?;
    args.apply_overrides(&mut config);

    print_banner(&plan);

    let converter = Converter::new(&config);
    let ConvertPlan {
        target,
        from_dir,
        to_dir,
    } = plan;

    let worker = tokio::task::spawn_blocking(move || {
        let mut progress = BatchProgress::new();
        converter.run(&from_dir, &to_dir, &target, &mut progress)
    });

    let summary: BatchSummary = tokio::select! {
        joined = worker => joined.context("Conversion worker stopped unexpectedly")??,
        _ = tokio::signal::ctrl_c() => {
            eprintln!();
            eprintln!("Program interrupted by user.");
            std::process::exit(1);
        }
    };

    if summary.discovered == 0 {
        return Ok(());
    }

    if let Some(report_path) = &args.report {
        let report_path = expand_path(report_path);
        write_report(
            &report_path,
            args.report_format(&config),
            config.output.pretty,
            &summary.records,
        )?;
    }

    Ok(())
}

fn print_banner(plan: &ConvertPlan) {
    println!("Recast image format converter v{}", recast_core::VERSION);
    println!("Target extension: {}", plan.target);
    println!("Source directory: {}", plan.from_dir.display());
    println!("Target directory: {}", plan.to_dir.display());
    println!("{}", "-".repeat(50));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extension: &str) -> ConvertArgs {
        ConvertArgs {
            extension: Some(extension.to_string()),
            from_dir: Some(PathBuf::from("~/in")),
            to_dir: Some(PathBuf::from("out")),
            ..Default::default()
        }
    }

    #[test]
    fn test_plan_normalizes_target_and_paths() {
        let plan = args(".PNG").plan().unwrap();
        assert_eq!(plan.target.extension(), ".png");
        assert_eq!(plan.from_dir, expand_path(std::path::Path::new("~/in")));
        assert_eq!(plan.to_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_plan_rejects_unknown_target() {
        let err = args("xyz").plan().err().unwrap();
        let message = format!("{err:#}");
        assert!(message.contains("Unsupported target extension"));
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        let mut a = args("jpg");
        a.jpeg_quality = Some(70);
        a.no_preview = true;
        a.apply_overrides(&mut config);

        assert_eq!(config.output.jpeg_quality, 70);
        assert!(!config.raw.prefer_embedded_preview);
    }

    #[test]
    fn test_report_format_precedence() {
        let mut config = Config::default();
        config.output.report_format = "jsonl".to_string();

        let mut a = args("jpg");
        assert_eq!(a.report_format(&config), ReportFormat::JsonLines);

        a.report_format = Some(ReportFormatArg::Json);
        assert_eq!(a.report_format(&config), ReportFormat::Json);
    }

    #[tokio::test]
    async fn test_execute_converts_and_writes_report() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        image::DynamicImage::new_rgb8(4, 4)
            .save_with_format(src.path().join("pic.png"), image::ImageFormat::Png)
            .unwrap();
        let report = dst.path().join("report.jsonl");

        let a = ConvertArgs {
            extension: Some("bmp".to_string()),
            from_dir: Some(src.path().to_path_buf()),
            to_dir: Some(dst.path().join("converted")),
            report: Some(report.clone()),
            report_format: Some(ReportFormatArg::Jsonl),
            ..Default::default()
        };
        execute(a, Config::default()).await.unwrap();

        assert!(dst.path().join("converted/pic.bmp").exists());
        let content = std::fs::read_to_string(&report).unwrap();
        assert_eq!(content.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_execute_missing_source_is_error() {
        let root = tempfile::tempdir().unwrap();
        let a = ConvertArgs {
            extension: Some("jpg".to_string()),
            from_dir: Some(root.path().join("nope")),
            to_dir: Some(root.path().join("out")),
            ..Default::default()
        };
        let err = execute(a, Config::default()).await.unwrap_err();
        assert!(err.to_string().contains("Directory not found"));
        assert!(!root.path().join("out").exists());
    }

    #[tokio::test]
    async fn test_execute_empty_source_is_ok() {
        let src = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        let a = ConvertArgs {
            extension: Some("jpg".to_string()),
            from_dir: Some(src.path().to_path_buf()),
            to_dir: Some(root.path().join("out")),
            report: Some(root.path().join("report.json")),
            ..Default::default()
        };
        execute(a, Config::default()).await.unwrap();
        assert!(!root.path().join("out").exists());
        assert!(!root.path().join("report.json").exists());
    }
}
