//! Pipeline orchestration - wires together all conversion stages.

use std::path::Path;
use std::time::Instant;

use crate::codecs;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult, Result, SetupError};
use crate::types::{BatchSummary, ConversionRecord, ConversionStatus, TargetFormat};

use super::decode::ImageDecoder;
use super::discovery::{DiscoveredFile, FileDiscovery};
use super::encode::ImageEncoder;
use super::naming;
use super::validate::Validator;

/// Progress notifications emitted by [`Converter::run`].
#[derive(Debug)]
pub enum ConversionEvent<'a> {
    /// Discovery finished with at least one file
    Discovered { total: usize },
    /// Discovery found nothing; the run stops here
    NoFiles { dir: &'a Path },
    /// A file is about to be decoded and written to `destination`
    Converting {
        source: &'a Path,
        destination: &'a Path,
    },
    /// A file was written
    Converted { record: &'a ConversionRecord },
    /// A file failed; the batch continues
    Failed {
        source: &'a Path,
        error: &'a PipelineError,
    },
    /// The loop is done
    Finished { summary: &'a BatchSummary },
}

/// Receives [`ConversionEvent`]s as the batch progresses.
pub trait ProgressObserver {
    fn on_event(&mut self, event: ConversionEvent<'_>);
}

impl<F> ProgressObserver for F
where
    F: FnMut(ConversionEvent<'_>),
{
    fn on_event(&mut self, event: ConversionEvent<'_>) {
        self(event)
    }
}

/// Converts every supported image under a directory into one target format.
pub struct Converter {
    discovery: FileDiscovery,
    validator: Validator,
    decoder: ImageDecoder,
    encoder: ImageEncoder,
}

impl Converter {
    /// Create a converter from configuration. Registers the optional codecs.
    pub fn new(config: &Config) -> Self {
        codecs::register();
        Self {
            discovery: FileDiscovery::default(),
            validator: Validator::new(config.limits.clone()),
            decoder: ImageDecoder::new(config.limits.clone(), &config.raw),
            encoder: ImageEncoder::new(&config.output),
        }
    }

    /// Discover all supported files under `dir`, sorted by path.
    pub fn discover(&self, dir: &Path) -> std::result::Result<Vec<DiscoveredFile>, SetupError> {
        self.discovery.discover(dir)
    }

    /// Convert every supported file under `from_dir` into `to_dir`.
    ///
    /// Setup problems (missing source, uncreatable destination) are returned
    /// as errors. Per-file failures are reported to `observer`, recorded in the
    /// summary, and never stop the loop.
    pub fn run<O: ProgressObserver + ?Sized>(
        &self,
        from_dir: &Path,
        to_dir: &Path,
        target: &TargetFormat,
        observer: &mut O,
    ) -> Result<BatchSummary> {
        let files = self.discover(from_dir)?;
        let mut summary = BatchSummary {
            destination: to_dir.to_path_buf(),
            discovered: files.len(),
            bytes_read: FileDiscovery::total_size(&files),
            ..Default::default()
        };

        if files.is_empty() {
            tracing::debug!("No supported files under {:?}", from_dir);
            observer.on_event(ConversionEvent::NoFiles { dir: from_dir });
            return Ok(summary);
        }

        std::fs::create_dir_all(to_dir).map_err(|source| SetupError::CreateDestination {
            path: to_dir.to_path_buf(),
            source,
        })?;

        observer.on_event(ConversionEvent::Discovered { total: files.len() });
        tracing::info!("Found {} files to convert", files.len());

        let start = Instant::now();
        for file in &files {
            let record = match self.convert_file(&file.path, to_dir, target, observer) {
                Ok(record) => {
                    summary.converted += 1;
                    observer.on_event(ConversionEvent::Converted { record: &record });
                    record
                }
                Err(error) => {
                    summary.failed += 1;
                    observer.on_event(ConversionEvent::Failed {
                        source: &file.path,
                        error: &error,
                    });
                    ConversionRecord {
                        source: file.path.clone(),
                        destination: None,
                        status: ConversionStatus::Failed,
                        error: Some(error.to_string()),
                        width: None,
                        height: None,
                        decode_path: None,
                        bytes_read: file.size,
                    }
                }
            };
            summary.records.push(record);
        }
        summary.elapsed = start.elapsed();

        observer.on_event(ConversionEvent::Finished { summary: &summary });
        Ok(summary)
    }

    /// Name, validate, decode and encode a single file.
    ///
    /// `Converting` is emitted before any check on the file's contents, so
    /// every failure is preceded by its progress line.
    pub fn convert_file<O: ProgressObserver + ?Sized>(
        &self,
        source: &Path,
        to_dir: &Path,
        target: &TargetFormat,
        observer: &mut O,
    ) -> PipelineResult<ConversionRecord> {
        let start = Instant::now();
        tracing::debug!("Converting: {:?}", source);

        let stem = source
            .file_stem()
            .ok_or_else(|| PipelineError::UnsupportedFormat {
                path: source.to_path_buf(),
                format: "file has no name".to_string(),
            })?;
        let destination = naming::resolve(to_dir, stem, target.extension())?;
        observer.on_event(ConversionEvent::Converting {
            source,
            destination: &destination,
        });

        let validate_start = Instant::now();
        let bytes_read = self.validator.validate(source)?;
        tracing::trace!("  Validate: {:?}", validate_start.elapsed());

        let decode_start = Instant::now();
        let decoded = self.decoder.decode(source)?;
        tracing::trace!(
            "  Decode ({:?}): {:?}",
            decoded.decode_path,
            decode_start.elapsed()
        );

        let encode_start = Instant::now();
        self.encoder.encode(decoded.image, target, &destination)?;
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        tracing::debug!(
            "Converted {:?} -> {:?} in {:?} ({}x{})",
            source,
            destination,
            start.elapsed(),
            decoded.width,
            decoded.height
        );

        Ok(ConversionRecord {
            source: source.to_path_buf(),
            destination: Some(destination),
            status: ConversionStatus::Converted,
            error: None,
            width: Some(decoded.width),
            height: Some(decoded.height),
            decode_path: Some(decoded.decode_path),
            bytes_read,
        })
    }
}
