// src/engine.rs
//
// The core of pixport. A batch conversion engine that:
// 1. Decodes each input with the fastest codec available for its format
// 2. Resolves a canvas plan and composites in a single resample pass
// 3. Encodes to the target format and splices metadata when asked
//
// This file is a facade that delegates to the decomposed modules in engine/

// =============================================================================
// SECURITY LIMITS
// =============================================================================

/// Maximum allowed image dimension (width or height).
/// Images larger than 32768x32768 are rejected to prevent decompression bombs.
/// This is the same limit used by libvips/sharp.
pub const MAX_DIMENSION: u32 = 32768;

/// Maximum allowed total pixels (width * height).
/// 100 megapixels = 400MB uncompressed RGBA. Beyond this is likely malicious.
pub const MAX_PIXELS: u64 = 100_000_000;

// =============================================================================
// MODULE DECOMPOSITION
// =============================================================================

mod archive;
mod batch;
mod compositor;
mod decoder;
mod encoder;
mod geometry;
mod metadata;
mod naming;
mod pipeline;

pub use archive::package;
pub use batch::{run_batch, BatchState, ConversionJob, JobOutcome, JobStatus};
pub use compositor::{compose, resample_region};
pub use decoder::{check_dimensions, decode_image, decode_jpeg_mozjpeg, detect_format};
pub use encoder::{encode, QualitySettings};
pub use geometry::{resolve, CanvasPlan, Composition, Rect};
pub use metadata::{should_splice, splice_exif};
pub use naming::{sanitize_slug, NameSuggester};
pub use pipeline::{convert, Converted};
