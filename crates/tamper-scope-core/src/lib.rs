#![warn(missing_docs)]
//! # tamper-scope-core
//!
//! ## Purpose
//! Defines the image intake model used across the `tamper-scope` workspace.
//!
//! ## Responsibilities
//! - Validate user-picked files against the accepted media types and size cap.
//! - Own the single [`SelectedImage`] and its preview reference.
//! - Release preview references on every path that discards a selection.
//!
//! ## Data flow
//! The shell reads a file into an [`ImageCandidate`] ->
//! [`IntakeController::select_file`] validates it -> a [`SelectedImage`] with a
//! [`PreviewLease`] is stored until it is replaced or cleared.
//!
//! ## Ownership and lifetimes
//! The controller owns the payload bytes exclusively. Callers only ever see
//! `&SelectedImage`, so nothing can read a preview after its lease is dropped.
//!
//! ## Error model
//! Rejected picks return [`ValidationError`] whose `Display` text is the
//! user-facing message.
//!
//! ## Security and privacy notes
//! Image bytes and preview URIs are never logged; only sizes and media types.
//!
//! ## Example
//! ```rust
//! use tamper_scope_core::{ImageCandidate, IntakeController};
//!
//! let mut intake = IntakeController::default();
//! let candidate = ImageCandidate::new("photo.png", "image/png", vec![0x89, 0x50]);
//! let selected = intake.select_file(candidate).expect("png is accepted");
//! assert_eq!(selected.size(), 2);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

/// Largest accepted image payload in bytes (10 MiB).
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// Media types accepted by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    /// JPEG image (`image/jpeg`, also declared as `image/jpg`).
    Jpeg,
    /// PNG image.
    Png,
    /// WebP image.
    Webp,
}

impl MediaType {
    /// Parses a declared MIME type.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// `image/jpg` is accepted as an alias for `image/jpeg`.
    pub fn from_mime(declared: &str) -> Option<Self> {
        match declared.trim().to_ascii_lowercase().as_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Infers the media type from a file extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim().to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Canonical MIME string sent with uploads.
    pub fn as_mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_mime())
    }
}

/// A file the user picked but that has not been validated yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCandidate {
    /// File name reported by the picker.
    pub file_name: String,
    /// MIME type declared by the picker.
    pub media_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl ImageCandidate {
    /// Creates a candidate from picker output.
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Validates a candidate and returns its parsed media type.
///
/// The media type is checked before the size, so a file that is both the
/// wrong type and too large reports the type problem.
///
/// # Errors
/// Returns [`ValidationError::UnsupportedMediaType`] for types outside
/// jpeg/png/webp and [`ValidationError::TooLarge`] above [`MAX_IMAGE_BYTES`].
pub fn validate_candidate(candidate: &ImageCandidate) -> Result<MediaType, ValidationError> {
    let media_type = MediaType::from_mime(&candidate.media_type).ok_or_else(|| {
        ValidationError::UnsupportedMediaType {
            declared: candidate.media_type.clone(),
        }
    })?;

    let size = candidate.size();
    if size > MAX_IMAGE_BYTES {
        return Err(ValidationError::TooLarge {
            size,
            limit: MAX_IMAGE_BYTES,
        });
    }

    Ok(media_type)
}

/// Display-only reference to a previewable rendition of the selected image.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewRef(String);

impl PreviewRef {
    /// Wraps a preview locator such as a data URI or object URL.
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Returns the preview locator.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Creates and revokes preview references.
///
/// Implementations may hand out object URLs, temp files, or inline URIs; the
/// intake controller only guarantees that every created reference is
/// released exactly once.
pub trait PreviewStore: Send + Sync {
    /// Creates a preview for the given payload.
    fn create(&self, media_type: MediaType, bytes: &[u8]) -> PreviewRef;

    /// Revokes a preview previously returned by [`PreviewStore::create`].
    fn release(&self, preview: &PreviewRef);
}

/// Default store that renders previews as base64 data URIs.
#[derive(Debug, Default)]
pub struct DataUriPreviewStore {
    live: AtomicUsize,
}

impl DataUriPreviewStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of previews created and not yet released.
    pub fn live_previews(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl PreviewStore for DataUriPreviewStore {
    fn create(&self, media_type: MediaType, bytes: &[u8]) -> PreviewRef {
        self.live.fetch_add(1, Ordering::SeqCst);
        PreviewRef::new(format!(
            "data:{};base64,{}",
            media_type.as_mime(),
            STANDARD.encode(bytes)
        ))
    }

    fn release(&self, _preview: &PreviewRef) {
        let _ = self
            .live
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |live| {
                live.checked_sub(1)
            });
    }
}

/// Scoped ownership of one preview reference.
///
/// Dropping the lease releases the preview through its store, so replacing
/// or clearing a selection can never leak a preview.
pub struct PreviewLease {
    preview: PreviewRef,
    store: Arc<dyn PreviewStore>,
}

impl PreviewLease {
    /// Creates a preview through `store` and takes ownership of it.
    pub fn acquire(store: Arc<dyn PreviewStore>, media_type: MediaType, bytes: &[u8]) -> Self {
        let preview = store.create(media_type, bytes);
        Self { preview, store }
    }

    /// Returns the leased preview.
    pub fn preview(&self) -> &PreviewRef {
        &self.preview
    }
}

impl Drop for PreviewLease {
    fn drop(&mut self) {
        self.store.release(&self.preview);
    }
}

impl fmt::Debug for PreviewLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Preview locators can embed the whole payload.
        f.debug_struct("PreviewLease")
            .field("preview_len", &self.preview.as_str().len())
            .finish()
    }
}

/// The user's current, validated file pick.
pub struct SelectedImage {
    file_name: String,
    media_type: MediaType,
    bytes: Vec<u8>,
    preview: PreviewLease,
}

impl SelectedImage {
    /// File name reported by the picker.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Validated media type.
    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    /// Raw payload bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Payload size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Display-only preview reference.
    pub fn preview(&self) -> &PreviewRef {
        self.preview.preview()
    }
}

impl fmt::Debug for SelectedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedImage")
            .field("file_name", &self.file_name)
            .field("media_type", &self.media_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Owns the current selection and its preview.
pub struct IntakeController {
    previews: Arc<dyn PreviewStore>,
    selected: Option<SelectedImage>,
}

impl IntakeController {
    /// Creates an empty controller backed by `previews`.
    pub fn new(previews: Arc<dyn PreviewStore>) -> Self {
        Self {
            previews,
            selected: None,
        }
    }

    /// Validates and stores a new pick.
    ///
    /// # Side effects
    /// On success the previous selection is dropped (releasing its preview)
    /// before the new preview is created. On failure nothing changes.
    ///
    /// # Errors
    /// Returns [`ValidationError`] when the candidate is rejected.
    pub fn select_file(
        &mut self,
        candidate: ImageCandidate,
    ) -> Result<&SelectedImage, ValidationError> {
        let media_type = match validate_candidate(&candidate) {
            Ok(media_type) => media_type,
            Err(error) => {
                tracing::warn!(
                    file = %candidate.file_name,
                    declared_type = %candidate.media_type,
                    size = candidate.size(),
                    %error,
                    "image rejected"
                );
                return Err(error);
            }
        };

        self.selected = None;

        let ImageCandidate {
            file_name, bytes, ..
        } = candidate;
        let preview = PreviewLease::acquire(Arc::clone(&self.previews), media_type, &bytes);
        tracing::debug!(file = %file_name, %media_type, size = bytes.len(), "image selected");

        Ok(&*self.selected.insert(SelectedImage {
            file_name,
            media_type,
            bytes,
            preview,
        }))
    }

    /// Returns the current selection, if any.
    pub fn selected(&self) -> Option<&SelectedImage> {
        self.selected.as_ref()
    }

    /// Drops the current selection and releases its preview.
    ///
    /// Returns `true` when a selection was present.
    pub fn clear(&mut self) -> bool {
        self.selected.take().is_some()
    }
}

impl Default for IntakeController {
    fn default() -> Self {
        Self::new(Arc::new(DataUriPreviewStore::new()))
    }
}

impl fmt::Debug for IntakeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IntakeController")
            .field("selected", &self.selected)
            .finish()
    }
}

/// Reasons a picked file is refused.
///
/// `Display` yields the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Declared media type is not jpeg/png/webp.
    #[error("Invalid file type. Please upload a JPG, PNG, or WebP image.")]
    UnsupportedMediaType {
        /// MIME type the picker declared.
        declared: String,
    },
    /// Payload exceeds [`MAX_IMAGE_BYTES`].
    #[error("File is too large. Maximum size is 10MB.")]
    TooLarge {
        /// Payload size in bytes.
        size: u64,
        /// Accepted maximum in bytes.
        limit: u64,
    },
}
