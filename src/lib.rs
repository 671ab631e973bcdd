// lib.rs
//
// pixport: a batch image conversion engine
//
// Design goals:
// - Exact output dimensions for every resize method
// - Fast codecs (mozjpeg, zune-png, libwebp) over generic fallbacks
// - One-job-at-a-time batches with observable progress
// - Failures isolated to the job that caused them

pub mod engine;
pub mod error;
pub mod settings;

pub use engine::{
    convert, package, run_batch, BatchState, ConversionJob, Converted, JobOutcome, JobStatus,
    NameSuggester,
};
pub use error::{ConvertError, ErrorScope, Result};
pub use settings::{
    derive_output_name, BackgroundColor, EncodeSettings, OutputFormat, ResizeMethod, ResizeMode,
    ResizePolicy,
};

use image::ImageReader;
use std::io::{BufRead, Cursor, Seek};

/// Image metadata returned by header inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<String>,
}

fn read_inspect_metadata<R: BufRead + Seek>(reader: R) -> Result<InspectMetadata> {
    let reader = ImageReader::new(reader)
        .with_guessed_format()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read image header: {e}")))?;

    let format = reader.format().map(|f| format!("{f:?}").to_lowercase());
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| ConvertError::decode_failed(format!("failed to read dimensions: {e}")))?;

    Ok(InspectMetadata {
        width,
        height,
        format,
    })
}

/// Inspect image metadata WITHOUT decoding pixels.
/// This reads only the header bytes - extremely fast (<1ms).
///
/// Use this to check dimensions before queueing a job, or to reject
/// images that are too large without wasting CPU on decoding.
pub fn inspect_bytes(data: &[u8]) -> Result<InspectMetadata> {
    read_inspect_metadata(Cursor::new(data))
}
