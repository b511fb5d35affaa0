#![warn(missing_docs)]
//! # site-guard-upload
//!
//! ## Purpose
//! Screens user-uploaded gallery/booking images before the caller stores them.
//!
//! ## Responsibilities
//! - Enforce size bounds and MIME/extension allowlists.
//! - Reject traversal and script-associated filenames.
//! - Decode the raster and check pixel bounds.
//! - Pre-screen the leading bytes for known malicious signatures.
//! - Produce a sanitized storage name and content digest.
//!
//! ## Data flow
//! Caller reads the upload into a [`FileUpload`] -> [`FileValidator::validate`]
//! -> [`FileValidationResult`] -> caller writes bytes under
//! [`AcceptedFile::storage_key`], never the original name.
//!
//! ## Ownership and lifetimes
//! The upload owns its byte buffer; results own their strings so they can be
//! returned across the request boundary.
//!
//! ## Error model
//! Presence failure halts immediately. Every later stage appends an
//! [`UploadError`] so callers can show all problems at once.
//!
//! ## Security and privacy notes
//! The signature list (PHP tag, `<script`, PE, ELF) scans only the first
//! 1 KiB. It is a pre-screen, not a substitute for server-side antivirus.
//! Decoding runs on a scoped worker thread so a decoder panic is reported as an
//! undecodable image instead of unwinding into the caller.

use std::io::Cursor;
use std::thread;

use image::{ImageFormat, ImageReader, Limits};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use site_guard_core::ErrorClass;
use thiserror::Error;

/// Filename segments associated with executable or script content.
pub const DANGEROUS_EXTENSIONS: &[&str] = &[
    "php", "php3", "php4", "php5", "phtml", "asp", "aspx", "jsp", "js", "html", "htm", "exe", "sh",
    "bat", "cmd",
];

/// Substrings rejected anywhere in a lower-cased filename.
pub const SUSPICIOUS_NAME_MARKERS: &[&str] = &["script", "exec"];

const FALLBACK_NAME: &str = "upload";

/// Upload policy constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePolicy {
    /// Lower-case MIME types accepted.
    pub allowed_mime_types: Vec<String>,
    /// Lower-case extensions (without dot) accepted.
    pub allowed_extensions: Vec<String>,
    /// Smaller payloads are treated as corrupt.
    pub min_bytes: usize,
    /// Larger payloads are rejected outright.
    pub max_bytes: usize,
    /// Minimum width in pixels.
    pub min_width: u32,
    /// Minimum height in pixels.
    pub min_height: u32,
    /// Maximum width in pixels.
    pub max_width: u32,
    /// Maximum height in pixels.
    pub max_height: u32,
    /// Leading bytes inspected by the signature screen.
    pub signature_window: usize,
    /// Maximum length of the sanitized filename.
    pub max_name_len: usize,
}

impl Default for FilePolicy {
    fn default() -> Self {
        Self {
            allowed_mime_types: ["image/jpeg", "image/png", "image/webp", "image/gif"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            allowed_extensions: ["jpg", "jpeg", "png", "webp", "gif"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            min_bytes: 1024,
            max_bytes: 10 * 1024 * 1024,
            min_width: 100,
            min_height: 100,
            max_width: 5000,
            max_height: 5000,
            signature_window: 1024,
            max_name_len: 100,
        }
    }
}

/// One uploaded file as received from the form boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Client-supplied filename.
    pub name: String,
    /// Client-declared MIME type.
    pub mime_type: String,
    /// Raw payload.
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Builds an upload from its parts.
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }
}

/// Raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// File that cleared every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedFile {
    /// Sanitized, lower-cased filename.
    pub sanitized_name: String,
    /// Declared (and allowlisted) MIME type.
    pub mime_type: String,
    /// Payload size in bytes.
    pub size: usize,
    /// Decoded raster dimensions.
    pub dimensions: Dimensions,
    /// Lower-case hex SHA-256 of the payload.
    pub content_digest: String,
    /// Deterministic storage name: digest prefix plus sanitized name.
    pub storage_key: String,
}

/// Outcome of validating one upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileValidationResult {
    /// `true` iff `errors` is empty.
    pub is_valid: bool,
    /// Human-readable reasons, one per failed check.
    pub errors: Vec<String>,
    /// Accepted file metadata when valid.
    pub file: Option<AcceptedFile>,
    /// Decoded dimensions whenever decoding succeeded.
    pub dimensions: Option<Dimensions>,
    /// Sanitized filename, computed regardless of outcome.
    pub sanitized_name: String,
}

/// Known malicious leading-byte signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureKind {
    /// `<?php` anywhere in the window.
    PhpOpenTag,
    /// `<script` (any case) anywhere in the window.
    ScriptTag,
    /// `MZ` Windows executable header at offset 0.
    WindowsPe,
    /// `\x7fELF` header at offset 0.
    Elf,
}

/// Stateless upload validator bound to one policy.
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    policy: FilePolicy,
}

impl FileValidator {
    /// Creates a validator for `policy`.
    pub fn new(policy: FilePolicy) -> Self {
        Self { policy }
    }

    /// Returns the active policy.
    pub fn policy(&self) -> &FilePolicy {
        &self.policy
    }

    /// Runs the full pipeline and folds the outcome into a result value.
    pub fn validate(&self, upload: Option<&FileUpload>) -> FileValidationResult {
        let Some(upload) = upload else {
            return rejected(vec![UploadError::Missing], None, FALLBACK_NAME.to_string());
        };

        let sanitized_name = sanitize_filename(&upload.name, self.policy.max_name_len);
        match self.check(upload) {
            Ok(accepted) => {
                tracing::info!(
                    size = accepted.size,
                    mime = %accepted.mime_type,
                    width = accepted.dimensions.width,
                    height = accepted.dimensions.height,
                    "upload accepted"
                );
                FileValidationResult {
                    is_valid: true,
                    errors: Vec::new(),
                    dimensions: Some(accepted.dimensions),
                    sanitized_name,
                    file: Some(accepted),
                }
            }
            Err(rejection) => {
                let classes: Vec<ErrorClass> =
                    rejection.errors.iter().map(UploadError::class).collect();
                tracing::warn!(failures = rejection.errors.len(), ?classes, "upload rejected");
                rejected(rejection.errors, rejection.dimensions, sanitized_name)
            }
        }
    }

    /// Typed form of [`FileValidator::validate`].
    ///
    /// # Errors
    /// Returns every failed check in pipeline order.
    pub fn check(&self, upload: &FileUpload) -> Result<AcceptedFile, Rejection> {
        let policy = &self.policy;

        if upload.name.trim().is_empty() {
            return Err(Rejection {
                errors: vec![UploadError::Missing],
                dimensions: None,
            });
        }

        let mut errors = Vec::new();
        let size = upload.bytes.len();
        let oversized = size > policy.max_bytes;

        if size < policy.min_bytes {
            errors.push(UploadError::TooSmall {
                min: policy.min_bytes,
                actual: size,
            });
        }
        if oversized {
            errors.push(UploadError::TooLarge {
                max: policy.max_bytes,
                actual: size,
            });
        }

        let mime_type = upload.mime_type.trim().to_ascii_lowercase();
        if !policy.allowed_mime_types.iter().any(|allowed| *allowed == mime_type) {
            errors.push(UploadError::MimeNotAllowed(mime_type.clone()));
        }

        let lowered_name = upload.name.trim().to_lowercase();
        let extension = lowered_name
            .rsplit_once('.')
            .map(|(_, extension)| extension.to_string())
            .unwrap_or_default();
        if !policy.allowed_extensions.iter().any(|allowed| *allowed == extension) {
            errors.push(UploadError::ExtensionNotAllowed(extension));
        }

        errors.extend(filename_violations(&lowered_name));

        // Oversized payloads are not decoded.
        let mut dimensions = None;
        if !oversized {
            match self.inspect_raster(&upload.bytes, &mime_type) {
                Ok(decoded) => {
                    dimensions = Some(decoded);
                    errors.extend(self.dimension_violations(decoded));
                }
                Err(error) => errors.push(error),
            }
        }

        if let Some(signature) = scan_signatures(&upload.bytes, policy.signature_window) {
            tracing::warn!(?signature, "upload matched malicious signature");
            errors.push(UploadError::MaliciousSignature(signature));
        }

        if !errors.is_empty() {
            return Err(Rejection { errors, dimensions });
        }

        let Some(dimensions) = dimensions else {
            return Err(Rejection {
                errors: vec![UploadError::Undecodable],
                dimensions: None,
            });
        };

        let sanitized_name = sanitize_filename(&upload.name, policy.max_name_len);
        let content_digest = content_digest(&upload.bytes);
        let storage_key = format!("{}-{}", &content_digest[..16], sanitized_name);

        Ok(AcceptedFile {
            sanitized_name,
            mime_type,
            size,
            dimensions,
            content_digest,
            storage_key,
        })
    }

    fn inspect_raster(&self, bytes: &[u8], declared_mime: &str) -> Result<Dimensions, UploadError> {
        let policy = &self.policy;
        let outcome = thread::scope(|scope| {
            scope
                .spawn(|| decode_raster(bytes, policy, declared_mime))
                .join()
        });

        match outcome {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("image decoder panicked; treating upload as undecodable");
                Err(UploadError::Undecodable)
            }
        }
    }

    fn dimension_violations(&self, dimensions: Dimensions) -> Vec<UploadError> {
        let policy = &self.policy;
        let mut errors = Vec::new();
        if dimensions.width < policy.min_width || dimensions.height < policy.min_height {
            errors.push(UploadError::DimensionsTooSmall {
                min_width: policy.min_width,
                min_height: policy.min_height,
                width: dimensions.width,
                height: dimensions.height,
            });
        }
        if dimensions.width > policy.max_width || dimensions.height > policy.max_height {
            errors.push(UploadError::DimensionsTooLarge {
                max_width: policy.max_width,
                max_height: policy.max_height,
                width: dimensions.width,
                height: dimensions.height,
            });
        }
        errors
    }
}

fn decode_raster(
    bytes: &[u8],
    policy: &FilePolicy,
    declared_mime: &str,
) -> Result<Dimensions, UploadError> {
    let probe = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|_| UploadError::Undecodable)?;
    let detected = probe.format().ok_or(UploadError::Undecodable)?;

    if let Some(declared) = ImageFormat::from_mime_type(declared_mime)
        && declared != detected
    {
        return Err(UploadError::ContentTypeMismatch(declared_mime.to_string()));
    }

    let (width, height) = probe
        .into_dimensions()
        .map_err(|_| UploadError::Undecodable)?;
    let dimensions = Dimensions { width, height };

    // Only in-bounds rasters are fully decoded; headers suffice to reject the rest.
    if width > policy.max_width || height > policy.max_height {
        return Ok(dimensions);
    }

    let mut reader = ImageReader::with_format(Cursor::new(bytes), detected);
    let mut limits = Limits::default();
    limits.max_image_width = Some(policy.max_width);
    limits.max_image_height = Some(policy.max_height);
    reader.limits(limits);
    reader.decode().map_err(|_| UploadError::Undecodable)?;

    Ok(dimensions)
}

fn filename_violations(lowered_name: &str) -> Vec<UploadError> {
    let mut errors = Vec::new();

    if lowered_name.contains("..")
        || lowered_name.contains('/')
        || lowered_name.contains('\\')
        || lowered_name.contains('\0')
    {
        errors.push(UploadError::UnsafeFilename(
            "path separators or traversal sequences",
        ));
    }

    if lowered_name
        .split('.')
        .skip(1)
        .any(|segment| DANGEROUS_EXTENSIONS.contains(&segment))
    {
        errors.push(UploadError::UnsafeFilename("a script or executable extension"));
    }

    if SUSPICIOUS_NAME_MARKERS
        .iter()
        .any(|marker| lowered_name.contains(marker))
    {
        errors.push(UploadError::UnsafeFilename("a suspicious keyword"));
    }

    errors
}

/// Matches the leading `window` bytes against known malicious signatures.
pub fn scan_signatures(bytes: &[u8], window: usize) -> Option<SignatureKind> {
    let head = &bytes[..bytes.len().min(window)];

    if head.starts_with(b"MZ") {
        return Some(SignatureKind::WindowsPe);
    }
    if head.starts_with(b"\x7fELF") {
        return Some(SignatureKind::Elf);
    }

    let lowered = head.to_ascii_lowercase();
    if contains_subslice(&lowered, b"<?php") {
        return Some(SignatureKind::PhpOpenTag);
    }
    if contains_subslice(&lowered, b"<script") {
        return Some(SignatureKind::ScriptTag);
    }
    None
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|candidate| candidate == needle)
}

/// Produces a storage-safe name: lower-cased, `[a-z0-9.-]` only, separator
/// and dot runs collapsed, capped at `max_len` while keeping the extension.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let mut sanitized = String::with_capacity(name.len());
    let mut previous: Option<char> = None;

    for character in name.trim().to_lowercase().chars() {
        let mapped = if character.is_ascii_alphanumeric() || character == '.' || character == '-' {
            character
        } else {
            '_'
        };
        if (mapped == '_' || mapped == '.') && previous == Some(mapped) {
            continue;
        }
        sanitized.push(mapped);
        previous = Some(mapped);
    }

    let sanitized = sanitized.trim_matches(|c| c == '.' || c == '_').to_string();
    if sanitized.is_empty() || max_len == 0 {
        return FALLBACK_NAME.to_string();
    }
    if sanitized.len() <= max_len {
        return sanitized;
    }

    match sanitized.rsplit_once('.') {
        Some((stem, extension)) if extension.len() + 2 <= max_len => {
            let keep = max_len - extension.len() - 1;
            format!("{}.{}", &stem[..keep.min(stem.len())], extension)
        }
        _ => sanitized[..max_len].to_string(),
    }
}

/// Lower-case hex SHA-256 of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

fn rejected(
    errors: Vec<UploadError>,
    dimensions: Option<Dimensions>,
    sanitized_name: String,
) -> FileValidationResult {
    FileValidationResult {
        is_valid: false,
        errors: errors.iter().map(ToString::to_string).collect(),
        file: None,
        dimensions,
        sanitized_name,
    }
}

/// Every failed check for one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Failures in pipeline order.
    pub errors: Vec<UploadError>,
    /// Dimensions when decoding succeeded.
    pub dimensions: Option<Dimensions>,
}

/// Upload check failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    /// No file or no filename.
    #[error("no file was provided")]
    Missing,
    /// Payload under the minimum size.
    #[error("file is too small ({actual} bytes; minimum {min}); it may be corrupt")]
    TooSmall {
        /// Minimum bytes.
        min: usize,
        /// Actual bytes.
        actual: usize,
    },
    /// Payload over the maximum size.
    #[error("file is too large ({actual} bytes; maximum {max})")]
    TooLarge {
        /// Maximum bytes.
        max: usize,
        /// Actual bytes.
        actual: usize,
    },
    /// Declared MIME type not allowlisted.
    #[error("file type {0:?} is not allowed")]
    MimeNotAllowed(String),
    /// Extension not allowlisted.
    #[error("file extension {0:?} is not allowed")]
    ExtensionNotAllowed(String),
    /// Filename carries a dangerous marker.
    #[error("filename contains {0}")]
    UnsafeFilename(&'static str),
    /// Sniffed format disagrees with the declared type.
    #[error("file content does not match declared type {0}")]
    ContentTypeMismatch(String),
    /// Not a decodable raster image.
    #[error("file is not a valid image or is corrupt")]
    Undecodable,
    /// Raster below the pixel floor.
    #[error("image must be at least {min_width}x{min_height} pixels (got {width}x{height})")]
    DimensionsTooSmall {
        /// Minimum width.
        min_width: u32,
        /// Minimum height.
        min_height: u32,
        /// Actual width.
        width: u32,
        /// Actual height.
        height: u32,
    },
    /// Raster above the pixel ceiling.
    #[error("image must be at most {max_width}x{max_height} pixels (got {width}x{height})")]
    DimensionsTooLarge {
        /// Maximum width.
        max_width: u32,
        /// Maximum height.
        max_height: u32,
        /// Actual width.
        width: u32,
        /// Actual height.
        height: u32,
    },
    /// Leading bytes match a known malicious signature.
    #[error("file content matches a known malware signature")]
    MaliciousSignature(SignatureKind),
}

impl UploadError {
    /// Error taxonomy class.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Missing | Self::Undecodable | Self::ContentTypeMismatch(_) => ErrorClass::Format,
            Self::MaliciousSignature(_) => ErrorClass::SecurityRejection,
            _ => ErrorClass::PolicyRejection,
        }
    }
}
