// calforge-parsers/src/traits.rs
//! Core traits defining the decoder interface for all asset kinds.
//!
//! Every decoder works on a complete in-memory buffer. File and reader
//! entry points load the bytes, hand them to [`Parser::parse_bytes`] and
//! release the underlying handle before returning, on success and on
//! error alike.

use std::io::Read;
use std::path::Path;

use calforge_core::{Error, Result};

use crate::logging::instrument_parse;
use crate::{log_parse_complete, log_parse_error, log_parse_start};

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T>;

/// Configuration options for decoding
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Factor applied to every position-type field
    pub scale: f32,
    /// Name given to the decoded asset (file stem when decoding from a path)
    pub asset_name: Option<String>,
    /// Whether to use memory mapping for large files
    pub use_memory_mapping: bool,
    /// Minimum file size to enable memory mapping
    pub memory_mapping_threshold: u64,
}

impl ParseOptions {
    /// Default options with the given scale
    pub fn with_scale(scale: f32) -> Self {
        Self {
            scale,
            ..Self::default()
        }
    }

    /// Copy of these options carrying an asset name
    pub fn named(&self, name: impl Into<String>) -> Self {
        Self {
            asset_name: Some(name.into()),
            ..self.clone()
        }
    }

    pub(crate) fn name_or_default(&self) -> String {
        self.asset_name.clone().unwrap_or_default()
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            asset_name: None,
            use_memory_mapping: true,
            memory_mapping_threshold: 10 * 1024 * 1024, // 10 MB
        }
    }
}

/// Core trait for all asset decoders
///
/// `Ok(None)` means the data does not start with this decoder's magic
/// signature, so a caller may try another decoder. Every other failure is
/// an `Err` and ends the decode of that file.
pub trait Parser: Send + Sync {
    /// The decoded output type
    type Output: Send + Sync;

    /// Returns the file extensions this parser handles (e.g., ["csf"])
    fn extensions(&self) -> &[&str];

    /// Returns the magic bytes that identify this file type (if applicable)
    fn magic_bytes(&self) -> Option<&[u8]> {
        None
    }

    /// Returns a human-readable name for this parser
    fn name(&self) -> &str;

    /// Returns the format version(s) this parser was written against
    fn supported_versions(&self) -> &[i32] {
        &[]
    }

    /// Decode a complete in-memory buffer
    fn parse_bytes(&self, data: &[u8], options: &ParseOptions) -> ParseResult<Option<Self::Output>>;

    /// Decode everything a reader yields
    fn parse<R: Read>(&self, mut reader: R, options: &ParseOptions) -> ParseResult<Option<Self::Output>>
    where
        Self: Sized,
    {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.parse_bytes(&data, options)
    }

    /// Decode a file; the asset name defaults to the file stem
    fn parse_file(&self, path: &Path, options: &ParseOptions) -> ParseResult<Option<Self::Output>> {
        log_parse_start!(self.name(), path);

        let options = match (&options.asset_name, path.file_stem()) {
            (None, Some(stem)) => options.named(stem.to_string_lossy()),
            _ => options.clone(),
        };

        let start = std::time::Instant::now();
        let result = instrument_parse(self.name(), || self.decode_file(path, &options));

        match &result {
            Ok(Some(_)) => {
                log_parse_complete!(self.name(), start.elapsed(), 1);
            }
            Ok(None) => {
                tracing::debug!(parser = %self.name(), path = %path.display(), "Magic mismatch");
            }
            Err(e) => {
                log_parse_error!(self.name(), e);
            }
        }

        result.map_err(|e| e.with_context(format!("decoding {}", path.display())))
    }

    #[doc(hidden)]
    fn decode_file(&self, path: &Path, options: &ParseOptions) -> ParseResult<Option<Self::Output>> {
        let file = std::fs::File::open(path)?;

        if options.use_memory_mapping && file.metadata()?.len() >= options.memory_mapping_threshold {
            // SAFETY: the mapping is read-only and dropped before this call
            // returns; concurrent truncation of the file is outside our control.
            #[allow(unsafe_code)]
            let mapped = unsafe { memmap2::Mmap::map(&file)? };
            return self.parse_bytes(&mapped, options);
        }

        let mut data = Vec::new();
        std::io::BufReader::new(file).read_to_end(&mut data)?;
        self.parse_bytes(&data, options)
    }

    /// Check if this parser can handle the given file
    fn can_parse(&self, path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_str = ext.to_string_lossy().to_lowercase();
            if self.extensions().iter().any(|e| e.eq_ignore_ascii_case(&ext_str)) {
                return true;
            }
        }

        if let Some(magic) = self.magic_bytes() {
            if let Ok(file) = std::fs::File::open(path) {
                let mut buffer = vec![0u8; magic.len()];
                if file.take(magic.len() as u64).read_exact(&mut buffer).is_ok() {
                    return buffer == magic;
                }
            }
        }

        false
    }
}

/// Decode a file and treat a magic mismatch as a hard error
pub fn parse_file_required<P: Parser>(
    parser: &P,
    path: &Path,
    options: &ParseOptions,
) -> ParseResult<P::Output> {
    parser.parse_file(path, options)?.ok_or_else(|| Error::FormatMismatch {
        path: path.to_path_buf(),
        expected: parser.name().to_string(),
    })
}

/// Trait for converting decoded data to human-readable formats
pub trait HumanReadable {
    /// Convert to a human-readable string representation
    fn to_readable_string(&self) -> String;

    /// Convert to formatted JSON
    fn to_json(&self) -> serde_json::Value;

    /// Convert to formatted YAML (falls back to the readable string)
    fn to_yaml(&self) -> String {
        serde_yaml::to_string(&self.to_json()).unwrap_or_else(|_| self.to_readable_string())
    }
}
