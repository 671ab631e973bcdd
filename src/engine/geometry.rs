// src/engine/geometry.rs
//
// Geometry Resolver: maps (source dimensions, resize policy) to target
// canvas dimensions and a composition descriptor. Pure math - no pixel
// buffers are touched here, which keeps every branch unit-testable.

use crate::settings::{ResizeMethod, ResizeMode, ResizePolicy};

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }
}

/// How source pixels map onto the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Composition {
    /// Draw the whole source into the whole canvas (identity, percentage,
    /// stretch, and the aspect-preserving fit-width/fit-height cases).
    StretchFill,
    /// Draw `src` (a sub-rectangle of the source) into `dst` (a
    /// sub-rectangle of the canvas). Crop and letterbox cases.
    Mapped { src: Rect, dst: Rect },
}

/// Resolved target canvas plus its composition descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasPlan {
    pub width: u32,
    pub height: u32,
    pub composition: Composition,
}

impl CanvasPlan {
    fn stretch_fill(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            composition: Composition::StretchFill,
        }
    }
}

// A zero-sized source makes every aspect computation meaningless; clamping
// keeps the math total. Decoders reject zero-area images before this runs.
fn round_dim(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

/// Resolve the target canvas and composition for one source image.
///
/// Dimensions are computed in f64 and rounded once, mirroring canvas
/// semantics; any degenerate result is clamped to 1.
pub fn resolve(source_width: u32, source_height: u32, policy: &ResizePolicy) -> CanvasPlan {
    let sw = source_width.max(1);
    let sh = source_height.max(1);

    if !policy.enabled {
        return CanvasPlan::stretch_fill(sw, sh);
    }

    match policy.mode {
        ResizeMode::Percentage => {
            let scale = policy.percentage as f64 / 100.0;
            CanvasPlan::stretch_fill(
                round_dim(sw as f64 * scale),
                round_dim(sh as f64 * scale),
            )
        }
        ResizeMode::Pixels => resolve_pixels(sw, sh, policy),
    }
}

fn resolve_pixels(sw: u32, sh: u32, policy: &ResizePolicy) -> CanvasPlan {
    let target_w = policy.width.max(1);
    let target_h = policy.height.max(1);
    let aspect = sw as f64 / sh as f64;

    match policy.method {
        ResizeMethod::FitWidth => {
            // Aspect preserved by construction, so a plain stretch suffices.
            CanvasPlan::stretch_fill(target_w, round_dim(target_w as f64 / aspect))
        }
        ResizeMethod::FitHeight => {
            CanvasPlan::stretch_fill(round_dim(target_h as f64 * aspect), target_h)
        }
        ResizeMethod::Stretch => CanvasPlan::stretch_fill(target_w, target_h),
        ResizeMethod::Crop => {
            let canvas_aspect = target_w as f64 / target_h as f64;
            let src = if aspect > canvas_aspect {
                // Source is wider: keep full height, trim left/right.
                let crop_w = round_dim(sh as f64 * canvas_aspect).min(sw);
                Rect::new((sw - crop_w) / 2, 0, crop_w, sh)
            } else {
                // Source is taller (or equal): keep full width, trim top/bottom.
                let crop_h = round_dim(sw as f64 / canvas_aspect).min(sh);
                Rect::new(0, (sh - crop_h) / 2, sw, crop_h)
            };
            CanvasPlan {
                width: target_w,
                height: target_h,
                composition: Composition::Mapped {
                    src,
                    dst: Rect::full(target_w, target_h),
                },
            }
        }
        ResizeMethod::Fit => {
            let ratio = (target_w as f64 / sw as f64).min(target_h as f64 / sh as f64);
            let draw_w = round_dim(sw as f64 * ratio).min(target_w);
            let draw_h = round_dim(sh as f64 * ratio).min(target_h);
            let dst = Rect::new(
                (target_w - draw_w) / 2,
                (target_h - draw_h) / 2,
                draw_w,
                draw_h,
            );
            CanvasPlan {
                width: target_w,
                height: target_h,
                composition: Composition::Mapped {
                    src: Rect::full(sw, sh),
                    dst,
                },
            }
        }
    }
}
