//! Batch progress display, summary and report output.

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use recast_core::{
    BatchSummary, ConversionEvent, ConversionRecord, OutputWriter, ProgressObserver, ReportFormat,
};

/// Drives an `indicatif` bar from conversion events.
///
/// Per-file lines go to stdout above the bar, failures go through `tracing`.
pub struct BatchProgress {
    bar: Option<ProgressBar>,
    started: Instant,
    processed: u64,
}

impl BatchProgress {
    pub fn new() -> Self {
        Self {
            bar: None,
            started: Instant::now(),
            processed: 0,
        }
    }

    /// Print through the bar so it is not torn by the output.
    fn print(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.suspend(|| println!("{line}")),
            None => println!("{line}"),
        }
    }

    fn advance(&mut self) {
        self.processed += 1;
        if let Some(bar) = &self.bar {
            bar.inc(1);
            let elapsed = self.started.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                bar.set_message(format!("{:.1} img/sec", self.processed as f64 / elapsed));
            }
        }
    }
}

impl Default for BatchProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressObserver for BatchProgress {
    fn on_event(&mut self, event: ConversionEvent<'_>) {
        match event {
            ConversionEvent::Discovered { total } => {
                println!("Processing {total} image files...");
                self.started = Instant::now();
                self.bar = Some(create_progress_bar(total as u64));
            }
            ConversionEvent::NoFiles { dir } => {
                println!("No supported image files found in '{}'.", dir.display());
            }
            ConversionEvent::Converting {
                source,
                destination,
            } => {
                self.print(format!(
                    "Converting: {} -> {}",
                    display_name(source),
                    display_name(destination)
                ));
            }
            ConversionEvent::Converted { .. } => self.advance(),
            ConversionEvent::Failed { source, error } => {
                let name = display_name(source);
                match &self.bar {
                    Some(bar) => {
                        bar.suspend(|| tracing::error!("Failed to convert {name}: {error}"))
                    }
                    None => tracing::error!("Failed to convert {name}: {error}"),
                }
                self.advance();
            }
            ConversionEvent::Finished { summary } => {
                if let Some(bar) = self.bar.take() {
                    bar.finish_and_clear();
                }
                print_summary(summary);
                println!(
                    "Done! Converted files are saved in '{}'.",
                    summary.destination.display()
                );
            }
        }
    }
}

/// File name for progress lines, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write the per-file records to `path`.
pub fn write_report(
    path: &Path,
    format: ReportFormat,
    pretty: bool,
    records: &[ConversionRecord],
) -> anyhow::Result<()> {
    let mut writer = OutputWriter::create(path, format, pretty)
        .with_context(|| format!("Cannot create report file {}", path.display()))?;
    writer
        .write_report(records)
        .with_context(|| format!("Cannot write report file {}", path.display()))?;
    tracing::info!("Report written to {:?} ({} records)", path, writer.items_written());
    Ok(())
}

/// Create a progress bar for batch conversion.
fn create_progress_bar(total: u64) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    )
    .map(|style| style.progress_chars("##-"))
    .unwrap_or_else(|_| ProgressStyle::default_bar());

    let pb = ProgressBar::new(total);
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after the batch.
fn print_summary(summary: &BatchSummary) {
    let mb_read = summary.bytes_read as f64 / 1_000_000.0;
    let secs = summary.elapsed.as_secs_f64();
    let throughput = if secs > 0.0 { mb_read / secs } else { 0.0 };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Converted:    {:>8}", summary.converted);
    if summary.failed > 0 {
        eprintln!("    Failed:       {:>8}", summary.failed);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Total:        {:>8}", summary.discovered);
    eprintln!("    Read:         {:>7.1} MB", mb_read);
    eprintln!("    Duration:     {:>7.1}s", secs);
    eprintln!("    Rate:         {:>7.1} img/sec", summary.rate());
    eprintln!("    Throughput:   {:>7.1} MB/sec", throughput);
    eprintln!("  ====================================");
}
