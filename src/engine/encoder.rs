// src/engine/encoder.rs
//
// Encoder operations: JPEG (mozjpeg), PNG (+oxipng), WebP, GIF, AVIF with
// quality settings. Lossless formats (PNG, GIF) ignore the quality factor;
// lossy formats map quality 1-100 onto each codec's native scale.

use crate::error::{ConvertError, Result};
use crate::settings::{EncodeSettings, OutputFormat};
use image::codecs::avif::AvifEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage, RgbaImage};
use mozjpeg::{ColorSpace, Compress, ScanMode};
use std::io::Cursor;

/// Derives per-codec tuning from a single 1-100 quality factor.
/// Quality bands:
/// - High (>=85): visual quality first, AVIF speed 6
/// - Balanced (70-84): quality/speed balance, AVIF speed 7
/// - Fast (50-69): speed-leaning, AVIF speed 8
/// - Fastest (<50): fastest useful settings, AVIF speed 9
#[derive(Debug, Clone, Copy)]
pub struct QualitySettings {
    quality: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QualityBand {
    High,
    Balanced,
    Fast,
    Fastest,
}

impl QualitySettings {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.min(100) as f32,
        }
    }

    fn band(&self) -> QualityBand {
        if self.quality >= 85.0 {
            QualityBand::High
        } else if self.quality >= 70.0 {
            QualityBand::Balanced
        } else if self.quality >= 50.0 {
            QualityBand::Fast
        } else {
            QualityBand::Fastest
        }
    }

    // WebP: method 4 / single pass / no preprocessing is the balanced
    // speed-quality point; only the adaptive strengths vary by band.
    pub fn webp_method(&self) -> i32 {
        4
    }

    pub fn webp_pass(&self) -> i32 {
        1
    }

    pub fn webp_sns_strength(&self) -> i32 {
        match self.band() {
            QualityBand::High => 50,
            QualityBand::Balanced => 70,
            QualityBand::Fast | QualityBand::Fastest => 80,
        }
    }

    pub fn webp_filter_strength(&self) -> i32 {
        if self.quality >= 80.0 {
            20
        } else if self.quality >= 60.0 {
            30
        } else {
            40
        }
    }

    pub fn webp_filter_sharpness(&self) -> i32 {
        match self.band() {
            QualityBand::High => 2,
            _ => 0,
        }
    }

    /// ravif speed: 1 (slowest/best) to 10 (fastest/worst).
    pub fn avif_speed(&self) -> u8 {
        match self.band() {
            QualityBand::High => 6,
            QualityBand::Balanced => 7,
            QualityBand::Fast => 8,
            QualityBand::Fastest => 9,
        }
    }

    /// mozjpeg smoothing factor: heavier smoothing at low quality hides
    /// blocking artifacts and shrinks output.
    pub fn jpeg_smoothing(&self) -> u8 {
        if self.quality >= 90.0 {
            0
        } else if self.quality >= 70.0 {
            5
        } else if self.quality >= 60.0 {
            10
        } else {
            18
        }
    }
}

/// Serialize the canvas into the requested container format.
///
/// Fails with an encode error before touching a codec when the buffer is
/// degenerate (zero dimensions).
pub fn encode(image: &RgbaImage, settings: &EncodeSettings) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return Err(ConvertError::encode_failed(
            settings.format.name(),
            format!("cannot encode degenerate buffer {w}x{h}"),
        ));
    }

    match settings.format {
        OutputFormat::Jpeg => encode_jpeg(image, settings.quality),
        OutputFormat::Png => encode_png(image),
        OutputFormat::WebP => encode_webp(image, settings.quality),
        OutputFormat::Gif => encode_gif(image),
        OutputFormat::Avif => encode_avif(image, settings.quality),
    }
}

fn rgba_to_rgb(image: &RgbaImage) -> Result<RgbImage> {
    let (w, h) = image.dimensions();
    let rgb: Vec<u8> = image
        .as_raw()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect();
    RgbImage::from_raw(w, h, rgb)
        .ok_or_else(|| ConvertError::encode_failed("jpeg", "failed to strip alpha channel"))
}

/// Encode to JPEG using mozjpeg with web-optimized settings: progressive
/// scans, optimized coding, 4:2:0 chroma subsampling.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = rgba_to_rgb(image)?;
    let (w, h) = rgb.dimensions();
    let pixels = rgb.as_raw();

    let settings = QualitySettings::new(quality);

    let mut comp = Compress::new(ColorSpace::JCS_RGB);
    comp.set_size(w as usize, h as usize);
    comp.set_color_space(ColorSpace::JCS_YCbCr);
    comp.set_quality(quality.min(100) as f32);
    comp.set_chroma_sampling_pixel_sizes((2, 2), (2, 2));
    comp.set_progressive_mode();
    comp.set_optimize_coding(true);
    comp.set_optimize_scans(true);
    comp.set_scan_optimization_mode(ScanMode::AllComponentsTogether);
    comp.set_smoothing_factor(settings.jpeg_smoothing());

    let estimated = (w as usize * h as usize * 3 / 10).max(4096);
    let mut output = Vec::with_capacity(estimated);

    let mut writer = comp.start_compress(&mut output).map_err(|e| {
        ConvertError::encode_failed("jpeg", format!("mozjpeg: failed to start compress: {e:?}"))
    })?;

    let stride = w as usize * 3;
    for row in pixels.chunks(stride) {
        writer.write_scanlines(row).map_err(|e| {
            ConvertError::encode_failed("jpeg", format!("mozjpeg: failed to write scanlines: {e:?}"))
        })?;
    }

    writer
        .finish()
        .map_err(|e| ConvertError::encode_failed("jpeg", format!("mozjpeg: failed to finish: {e:?}")))?;

    Ok(output)
}

/// Encode to PNG, then recompress losslessly with oxipng.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| ConvertError::encode_failed("png", format!("PNG encode failed: {e}")))?;

    let mut options = oxipng::Options::from_preset(2);
    options.strip = oxipng::StripChunks::None;

    oxipng::optimize_from_memory(&buf, &options)
        .map_err(|e| ConvertError::encode_failed("png", format!("oxipng optimization failed: {e}")))
}

/// Encode to WebP with quality-band tuning via libwebp's advanced config.
pub fn encode_webp(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let encoder = webp::Encoder::from_rgba(image.as_raw(), w, h);

    let mut config = webp::WebPConfig::new()
        .map_err(|_| ConvertError::encode_failed("webp", "failed to create WebPConfig"))?;

    let settings = QualitySettings::new(quality);
    config.quality = quality.min(100) as f32;
    config.method = settings.webp_method();
    config.pass = settings.webp_pass();
    config.preprocessing = 0;
    config.sns_strength = settings.webp_sns_strength();
    config.autofilter = 1;
    config.filter_strength = settings.webp_filter_strength();
    config.filter_sharpness = settings.webp_filter_sharpness();

    let mem = encoder
        .encode_advanced(&config)
        .map_err(|e| ConvertError::encode_failed("webp", format!("WebP encode failed: {e:?}")))?;

    Ok(mem.to_vec())
}

/// Encode to GIF. Palette quantization happens inside the codec.
pub fn encode_gif(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Gif)
        .map_err(|e| ConvertError::encode_failed("gif", format!("GIF encode failed: {e}")))?;
    Ok(buf)
}

/// Encode to AVIF via the image crate's ravif-backed encoder.
pub fn encode_avif(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let (w, h) = image.dimensions();
    let settings = QualitySettings::new(quality);

    let mut buf = Vec::new();
    let encoder = AvifEncoder::new_with_speed_quality(
        &mut buf,
        settings.avif_speed(),
        quality.min(100),
    );
    encoder
        .write_image(image.as_raw(), w, h, ExtendedColorType::Rgba8)
        .map_err(|e| ConvertError::encode_failed("avif", format!("AVIF encode failed: {e}")))?;

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn test_settings(format: OutputFormat, quality: u8) -> EncodeSettings {
        EncodeSettings {
            format,
            quality,
            preserve_metadata: false,
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        })
    }

    #[test]
    fn test_encode_jpeg_produces_valid_jpeg() {
        let img = gradient(100, 100);
        let result = encode(&img, &test_settings(OutputFormat::Jpeg, 80)).unwrap();
        assert_eq!(&result[0..2], &[0xFF, 0xD8]);
        assert_eq!(&result[result.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_encode_png_produces_valid_png() {
        let img = gradient(100, 100);
        let result = encode(&img, &test_settings(OutputFormat::Png, 80)).unwrap();
        assert_eq!(
            &result[0..8],
            &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]
        );
    }

    #[test]
    fn test_encode_png_ignores_quality() {
        let img = gradient(64, 64);
        let q10 = encode(&img, &test_settings(OutputFormat::Png, 10)).unwrap();
        let q90 = encode(&img, &test_settings(OutputFormat::Png, 90)).unwrap();
        assert_eq!(q10, q90);
    }

    #[test]
    fn test_encode_webp_produces_valid_webp() {
        let img = gradient(100, 100);
        let result = encode(&img, &test_settings(OutputFormat::WebP, 80)).unwrap();
        assert_eq!(&result[0..4], b"RIFF");
        assert_eq!(&result[8..12], b"WEBP");
    }

    #[test]
    fn test_encode_gif_produces_valid_gif() {
        let img = gradient(32, 32);
        let result = encode(&img, &test_settings(OutputFormat::Gif, 80)).unwrap();
        assert_eq!(&result[0..3], b"GIF");
    }

    #[test]
    fn test_encode_avif_produces_valid_avif() {
        let img = gradient(64, 64);
        let result = encode(&img, &test_settings(OutputFormat::Avif, 60)).unwrap();
        assert!(result.len() > 12);
        let has_ftyp = result.windows(4).any(|w| w == b"ftyp");
        assert!(has_ftyp);
    }

    #[test]
    fn test_degenerate_buffer_is_rejected() {
        let img = RgbaImage::new(0, 0);
        let err = encode(&img, &test_settings(OutputFormat::Png, 80)).unwrap_err();
        assert!(matches!(err, ConvertError::EncodeFailed { .. }));
    }

    #[test]
    fn test_quality_band_mapping_boundaries() {
        assert_eq!(QualitySettings::new(90).avif_speed(), 6);
        assert_eq!(QualitySettings::new(75).avif_speed(), 7);
        assert_eq!(QualitySettings::new(60).avif_speed(), 8);
        assert_eq!(QualitySettings::new(40).avif_speed(), 9);
    }

    #[test]
    fn test_webp_tuning_is_stable() {
        let high = QualitySettings::new(90);
        assert_eq!(high.webp_method(), 4);
        assert_eq!(high.webp_pass(), 1);
        assert_eq!(high.webp_sns_strength(), 50);
        assert_eq!(high.webp_filter_strength(), 20);
        assert_eq!(high.webp_filter_sharpness(), 2);

        let fastest = QualitySettings::new(40);
        assert_eq!(fastest.webp_sns_strength(), 80);
        assert_eq!(fastest.webp_filter_strength(), 40);
        assert_eq!(fastest.webp_filter_sharpness(), 0);
    }

    #[test]
    fn test_jpeg_quality_affects_size() {
        let img = gradient(200, 200);
        let high = encode_jpeg(&img, 95).unwrap();
        let low = encode_jpeg(&img, 40).unwrap();
        assert!(!high.is_empty());
        assert!(!low.is_empty());
        assert_eq!(&high[0..2], &[0xFF, 0xD8]);
        assert_eq!(&low[0..2], &[0xFF, 0xD8]);
    }
}
