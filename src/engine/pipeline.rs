// src/engine/pipeline.rs
//
// Per-job conversion pipeline:
//   decode -> resolve geometry -> composite -> encode -> (optional) splice
//
// Each stage owns its buffer exclusively and hands it to the next; at most
// one source buffer, one canvas, and one encode buffer are live at a time.

use crate::engine::{compositor, decoder, encoder, geometry, metadata};
use crate::error::Result;
use crate::settings::{derive_output_name, EncodeSettings, ResizePolicy};

/// One successful conversion: the encoded stream plus derived naming.
#[derive(Clone, Debug)]
pub struct Converted {
    pub bytes: Vec<u8>,
    pub output_name: String,
    pub source_name: String,
}

/// Convert one input image end to end.
///
/// Fails with a job-scoped error on undecodable input, invalid settings, or
/// encode failure; metadata problems degrade silently per the splicer's
/// contract.
pub fn convert(
    source_name: &str,
    input: &[u8],
    resize: &ResizePolicy,
    encode: &EncodeSettings,
) -> Result<Converted> {
    resize.validate()?;
    encode.validate()?;

    let (decoded, source_format) = decoder::decode_image(input)?;
    let source = decoded.into_rgba8();

    let plan = geometry::resolve(source.width(), source.height(), resize);
    // The decode guard only bounds the input; an aggressive upscale policy
    // can still plan a canvas too large to allocate.
    decoder::check_dimensions(plan.width, plan.height)?;
    let canvas = compositor::compose(&source, &plan, resize.background)?;
    drop(source); // keep peak memory at one source + one canvas

    let encoded = encoder::encode(&canvas, encode)?;
    drop(canvas);

    let bytes = if metadata::should_splice(source_format, encode) {
        metadata::splice_exif(input, encoded)
    } else {
        encoded
    };

    Ok(Converted {
        bytes,
        output_name: derive_output_name(source_name, encode.format),
        source_name: source_name.to_string(),
    })
}
