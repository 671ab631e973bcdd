// src/engine/metadata.rs
//
// Metadata Splicer: lifts the EXIF segment out of the original JPEG stream
// and reinserts it into the freshly encoded one. Best-effort by contract -
// a missing or malformed segment degrades to the unmodified encoded stream,
// it never fails the job.

use crate::error::{ConvertError, Result};
use crate::settings::{EncodeSettings, OutputFormat};
use image::ImageFormat;
use img_parts::jpeg::Jpeg;
use img_parts::{Bytes, ImageEXIF};

/// Splicing only applies on JPEG-to-JPEG conversions with preservation
/// requested; every other combination is a pass-through.
pub fn should_splice(source_format: Option<ImageFormat>, settings: &EncodeSettings) -> bool {
    settings.preserve_metadata
        && settings.format == OutputFormat::Jpeg
        && source_format == Some(ImageFormat::Jpeg)
}

/// Carry EXIF from `original` into `encoded`. Returns the spliced stream,
/// or `encoded` unchanged when anything about the metadata is unusable.
pub fn splice_exif(original: &[u8], encoded: Vec<u8>) -> Vec<u8> {
    match try_splice(original, &encoded) {
        Ok(spliced) => spliced,
        Err(err) => {
            // Non-fatal by design: the conversion succeeded, only the tags
            // are lost.
            tracing::warn!(error = %err, "metadata not preserved");
            encoded
        }
    }
}

fn try_splice(original: &[u8], encoded: &[u8]) -> Result<Vec<u8>> {
    let source = Jpeg::from_bytes(Bytes::copy_from_slice(original))
        .map_err(|e| ConvertError::metadata_failed(format!("source JPEG parse failed: {e}")))?;

    let exif_payload = source
        .exif()
        .ok_or_else(|| ConvertError::metadata_failed("source carries no EXIF segment"))?;

    // Reject segments kamadak-exif cannot parse; splicing a corrupt TIFF
    // payload would produce a JPEG that chokes downstream readers.
    let parsed = exif::Reader::new()
        .read_raw(exif_payload.to_vec())
        .map_err(|e| ConvertError::metadata_failed(format!("EXIF payload malformed: {e}")))?;

    let mut target = Jpeg::from_bytes(Bytes::copy_from_slice(encoded))
        .map_err(|e| ConvertError::metadata_failed(format!("encoded JPEG parse failed: {e}")))?;

    target.set_exif(Some(exif_payload));

    let mut output = Vec::with_capacity(encoded.len());
    target
        .encoder()
        .write_to(&mut output)
        .map_err(|e| ConvertError::metadata_failed(format!("failed to write spliced JPEG: {e}")))?;

    tracing::debug!(fields = parsed.fields().count(), "EXIF segment spliced");
    Ok(output)
}
