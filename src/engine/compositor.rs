// src/engine/compositor.rs
//
// Compositor: renders a source RGBA buffer onto a freshly allocated canvas
// according to a CanvasPlan. The canvas is pre-filled with the background
// color; the source crop rectangle is resampled into the destination draw
// rectangle with Lanczos3 convolution (premultiplied alpha around the
// resample, as the filter requires).

use crate::engine::geometry::{CanvasPlan, Composition, Rect};
use crate::error::{ConvertError, Result};
use crate::settings::BackgroundColor;
use fast_image_resize::{self as fir, ImageBufferError, MulDiv, PixelType, ResizeOptions};
use image::{imageops, RgbaImage};

/// Composite `source` onto a new canvas described by `plan`.
///
/// The source buffer is only read; the returned canvas is freshly allocated
/// and owned by the caller.
pub fn compose(
    source: &RgbaImage,
    plan: &CanvasPlan,
    background: BackgroundColor,
) -> Result<RgbaImage> {
    let mut canvas = RgbaImage::from_pixel(plan.width, plan.height, background.to_rgba());

    let (src_rect, dst_rect) = match plan.composition {
        Composition::StretchFill => (
            Rect::full(source.width(), source.height()),
            Rect::full(plan.width, plan.height),
        ),
        Composition::Mapped { src, dst } => (src, dst),
    };

    let drawn = resample_region(source, src_rect, dst_rect.width, dst_rect.height)?;
    imageops::overlay(&mut canvas, &drawn, dst_rect.x as i64, dst_rect.y as i64);

    Ok(canvas)
}

/// Resample `region` of the source into a `dst_width` x `dst_height` buffer.
///
/// Crop and scale happen in one fir pass so no intermediate crop buffer is
/// allocated. Falls back to the image crate's Lanczos3 resize if fir rejects
/// the buffer.
pub fn resample_region(
    source: &RgbaImage,
    region: Rect,
    dst_width: u32,
    dst_height: u32,
) -> Result<RgbaImage> {
    let src_width = source.width();
    let src_height = source.height();

    if src_width == 0 || src_height == 0 || dst_width == 0 || dst_height == 0 {
        return Err(ConvertError::resample_failed(
            (src_width, src_height),
            (dst_width, dst_height),
            "invalid dimensions for resample",
        ));
    }

    if region.width == 0
        || region.height == 0
        || region.x.saturating_add(region.width) > src_width
        || region.y.saturating_add(region.height) > src_height
    {
        return Err(ConvertError::resample_failed(
            (src_width, src_height),
            (dst_width, dst_height),
            format!(
                "crop rect {}+{}x{}+{} exceeds source bounds",
                region.x, region.width, region.y, region.height
            ),
        ));
    }

    // Identity fast path: whole source, same size.
    if region == Rect::full(src_width, src_height)
        && (dst_width, dst_height) == (src_width, src_height)
    {
        return Ok(source.clone());
    }

    let mut src_pixels = source.as_raw().clone();
    let options = ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::Lanczos3))
        .crop(
            region.x as f64,
            region.y as f64,
            region.width as f64,
            region.height as f64,
        );

    let primary = match fir::images::Image::from_slice_u8(
        src_width,
        src_height,
        src_pixels.as_mut_slice(),
        PixelType::U8x4,
    ) {
        Ok(src_image) => resample_with_source_image(src_image, dst_width, dst_height, &options),
        Err(ImageBufferError::InvalidBufferAlignment) => {
            let mut aligned = fir::images::Image::new(src_width, src_height, PixelType::U8x4);
            aligned.buffer_mut().copy_from_slice(&src_pixels);
            resample_with_source_image(aligned, dst_width, dst_height, &options)
        }
        Err(other) => Err(format!("fir source image error: {other:?}")),
    };

    match primary {
        Ok(img) => Ok(img),
        Err(reason) => {
            // Safety net: crop + resize through the image crate.
            tracing::warn!(%reason, "fir resample failed, falling back to image crate");
            let cropped =
                imageops::crop_imm(source, region.x, region.y, region.width, region.height)
                    .to_image();
            Ok(imageops::resize(
                &cropped,
                dst_width,
                dst_height,
                imageops::FilterType::Lanczos3,
            ))
        }
    }
}

fn resample_with_source_image(
    mut src_image: fir::images::Image<'_>,
    dst_width: u32,
    dst_height: u32,
    options: &ResizeOptions,
) -> std::result::Result<RgbaImage, String> {
    let mut dst_image = fir::images::Image::new(dst_width, dst_height, PixelType::U8x4);

    // Convolution filters over straight alpha bleed background into edges;
    // premultiply before and divide after. Fully opaque buffers take the
    // same path - the scan to detect them costs more than the multiply for
    // the canvas sizes this pipeline sees.
    let mul_div = MulDiv::default();
    mul_div
        .multiply_alpha_inplace(&mut src_image)
        .map_err(|e| format!("failed to premultiply alpha: {e}"))?;

    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_image, &mut dst_image, options)
        .map_err(|e| format!("fir resize error: {e:?}"))?;

    mul_div
        .divide_alpha_inplace(&mut dst_image)
        .map_err(|e| format!("failed to unpremultiply alpha: {e}"))?;

    RgbaImage::from_raw(dst_width, dst_height, dst_image.into_vec())
        .ok_or_else(|| "failed to rebuild rgba image from resampled data".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::geometry::Composition;
    use image::Rgba;

    fn solid(width: u32, height: u32, px: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(px))
    }

    fn stretch_plan(width: u32, height: u32) -> CanvasPlan {
        CanvasPlan {
            width,
            height,
            composition: Composition::StretchFill,
        }
    }

    #[test]
    fn stretch_fill_covers_whole_canvas() {
        let source = solid(10, 10, [200, 10, 10, 255]);
        let canvas = compose(&source, &stretch_plan(4, 4), BackgroundColor::WHITE).unwrap();
        assert_eq!(canvas.dimensions(), (4, 4));
        for px in canvas.pixels() {
            assert_eq!(px.0, [200, 10, 10, 255]);
        }
    }

    #[test]
    fn identity_plan_preserves_pixels() {
        let mut source = solid(3, 3, [0, 0, 0, 255]);
        source.put_pixel(1, 1, Rgba([9, 8, 7, 255]));
        let canvas = compose(&source, &stretch_plan(3, 3), BackgroundColor::WHITE).unwrap();
        assert_eq!(canvas.get_pixel(1, 1).0, [9, 8, 7, 255]);
        assert_eq!(canvas.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn letterbox_strips_keep_background_color() {
        // 1000x500 source fit into 400x400: drawn region is y in [100, 300),
        // top and bottom strips stay pure white.
        let source = solid(1000, 500, [10, 10, 10, 255]);
        let plan = CanvasPlan {
            width: 400,
            height: 400,
            composition: Composition::Mapped {
                src: Rect::full(1000, 500),
                dst: Rect::new(0, 100, 400, 200),
            },
        };
        let canvas = compose(&source, &plan, BackgroundColor::WHITE).unwrap();
        assert_eq!(canvas.dimensions(), (400, 400));
        for y in (0..100).chain(300..400) {
            for x in 0..400 {
                assert_eq!(canvas.get_pixel(x, y).0, [255, 255, 255, 255], "at {x},{y}");
            }
        }
        // Drawn region center is source-colored
        assert_eq!(canvas.get_pixel(200, 200).0, [10, 10, 10, 255]);
    }

    #[test]
    fn crop_excludes_pixels_outside_rect() {
        // Left half red, right half green; cropping the right half must
        // produce a canvas with no red contribution.
        let mut source = solid(8, 4, [0, 255, 0, 255]);
        for y in 0..4 {
            for x in 0..4 {
                source.put_pixel(x, y, Rgba([255, 0, 0, 255]));
            }
        }
        let plan = CanvasPlan {
            width: 4,
            height: 4,
            composition: Composition::Mapped {
                src: Rect::new(4, 0, 4, 4),
                dst: Rect::full(4, 4),
            },
        };
        let canvas = compose(&source, &plan, BackgroundColor::WHITE).unwrap();
        for px in canvas.pixels() {
            assert_eq!(px.0, [0, 255, 0, 255]);
        }
    }

    #[test]
    fn alpha_source_blends_over_background() {
        // Fully transparent source leaves the background untouched.
        let source = solid(4, 4, [255, 0, 0, 0]);
        let canvas = compose(&source, &stretch_plan(4, 4), BackgroundColor::WHITE).unwrap();
        for px in canvas.pixels() {
            assert_eq!(px.0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn out_of_bounds_crop_is_rejected() {
        let source = solid(4, 4, [1, 2, 3, 255]);
        let err = resample_region(&source, Rect::new(2, 2, 4, 4), 2, 2).unwrap_err();
        assert!(matches!(err, ConvertError::ResampleFailed { .. }));
    }

    #[test]
    fn zero_target_dimension_is_rejected() {
        let source = solid(4, 4, [1, 2, 3, 255]);
        let err = resample_region(&source, Rect::full(4, 4), 0, 2).unwrap_err();
        match err {
            ConvertError::ResampleFailed {
                target_width,
                target_height,
                ..
            } => {
                assert_eq!((target_width, target_height), (0, 2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
