//! Cheap checks run before a file is handed to a decoder.

use std::io::Read;
use std::path::Path;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Validates files before processing.
pub struct Validator {
    limits: LimitsConfig,
}

impl Validator {
    /// Create a new validator with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Perform quick validation before full decode and return the file size.
    ///
    /// Checks:
    /// - File exists and is readable
    /// - File size is within limits
    /// - File starts with the signature of a supported container
    pub fn validate(&self, path: &Path) -> Result<u64, PipelineError> {
        let metadata = match std::fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::FileNotFound(path.to_path_buf()));
            }
            Err(e) => {
                return Err(PipelineError::Decode {
                    path: path.to_path_buf(),
                    message: format!("Cannot read metadata: {}", e),
                });
            }
        };

        let max_bytes = self.limits.max_file_size_mb * 1024 * 1024;
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.limits.max_file_size_mb,
            });
        }

        self.check_magic_bytes(path)?;
        Ok(metadata.len())
    }

    /// Reject decoded rasters larger than the configured dimension limit.
    pub fn check_dimensions(
        &self,
        path: &Path,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::ImageTooLarge {
                path: path.to_path_buf(),
                width,
                height,
                max_dim,
            });
        }
        Ok(())
    }

    /// Check file magic bytes against the supported containers.
    fn check_magic_bytes(&self, path: &Path) -> Result<(), PipelineError> {
        let mut file = std::fs::File::open(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot open file: {}", e),
        })?;

        let mut header = [0u8; 12];
        let bytes_read = file.read(&mut header).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read header: {}", e),
        })?;

        if bytes_read < 4 {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: "File too small to be a valid image".to_string(),
            });
        }

        if !Self::is_valid_image_header(&header, bytes_read) {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: "Unrecognized image format (invalid magic bytes)".to_string(),
            });
        }

        Ok(())
    }

    /// Check if the header bytes match a supported container.
    fn is_valid_image_header(header: &[u8; 12], bytes_read: usize) -> bool {
        if bytes_read < 4 {
            return false;
        }

        // JPEG: FF D8 FF
        if header[0] == 0xFF && header[1] == 0xD8 && header[2] == 0xFF {
            return true;
        }

        // PNG: 89 50 4E 47
        if header[0] == 0x89 && header[1] == b'P' && header[2] == b'N' && header[3] == b'G' {
            return true;
        }

        // WebP: RIFF....WEBP
        if header[0] == b'R' && header[1] == b'I' && header[2] == b'F' && header[3] == b'F' {
            if bytes_read >= 12 {
                return header[8] == b'W'
                    && header[9] == b'E'
                    && header[10] == b'B'
                    && header[11] == b'P';
            }
            // Could be WebP, allow it to proceed
            return true;
        }

        // BMP: BM
        if header[0] == b'B' && header[1] == b'M' {
            return true;
        }

        // TIFF and DNG: II (little-endian) or MM (big-endian) followed by version 42
        if bytes_read >= 4 {
            let is_tiff_le =
                header[0] == b'I' && header[1] == b'I' && header[2] == 0x2A && header[3] == 0x00;
            let is_tiff_be =
                header[0] == b'M' && header[1] == b'M' && header[2] == 0x00 && header[3] == 0x2A;
            if is_tiff_le || is_tiff_be {
                return true;
            }
        }

        // HEIC/HEIF: ftyp box at offset 4
        if bytes_read >= 12
            && header[4] == b'f'
            && header[5] == b't'
            && header[6] == b'y'
            && header[7] == b'p'
        {
            return true;
        }

        false
    }
}
