// src/settings.rs
//
// Conversion configuration.
// These are cheap, immutable value objects - passed by value into the
// pipeline so no shared mutable state leaks into the core.

use crate::error::{ConvertError, Result};

/// How target dimensions are expressed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeMode {
    /// Explicit pixel dimensions, interpreted per [`ResizeMethod`].
    Pixels,
    /// Uniform scale factor in percent (may exceed 100 for upscaling).
    Percentage,
}

/// Geometric mapping strategy for pixel-mode resizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeMethod {
    /// Center-crop the source to the target aspect ratio, then fill the canvas.
    Crop,
    /// Distort the source to exactly fill the canvas.
    Stretch,
    /// Letterbox/pillarbox: preserve aspect, pad with the background color.
    Fit,
    /// Fix width, derive height from the source aspect ratio.
    FitWidth,
    /// Fix height, derive width from the source aspect ratio.
    FitHeight,
}

/// Opaque RGB background, used by the compositor to pre-fill the canvas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackgroundColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl BackgroundColor {
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a `#RRGGBB` hex string (leading `#` optional).
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConvertError::invalid_argument(
                "background_color",
                hex.to_string(),
                "expected #RRGGBB hex color",
            ));
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&digits[range], 16).map_err(|e| {
                ConvertError::invalid_argument("background_color", hex.to_string(), e.to_string())
            })
        };
        Ok(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    /// Fully opaque RGBA pixel for canvas filling.
    pub fn to_rgba(self) -> image::Rgba<u8> {
        image::Rgba([self.r, self.g, self.b, 255])
    }
}

impl Default for BackgroundColor {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Resize policy for one conversion.
///
/// `width`/`height` apply in [`ResizeMode::Pixels`], `percentage` in
/// [`ResizeMode::Percentage`]. The background color is only consulted by
/// [`ResizeMethod::Fit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResizePolicy {
    pub enabled: bool,
    pub mode: ResizeMode,
    pub percentage: u32,
    pub width: u32,
    pub height: u32,
    pub method: ResizeMethod,
    pub background: BackgroundColor,
}

impl Default for ResizePolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ResizeMode::Pixels,
            percentage: 100,
            width: 1024,
            height: 1024,
            method: ResizeMethod::Crop,
            background: BackgroundColor::WHITE,
        }
    }
}

impl ResizePolicy {
    /// Reject configurations the resolver cannot give meaning to.
    /// Disabled policies are always valid.
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        match self.mode {
            ResizeMode::Percentage => {
                if self.percentage == 0 {
                    return Err(ConvertError::invalid_argument(
                        "percentage",
                        self.percentage.to_string(),
                        "must be a positive integer",
                    ));
                }
            }
            ResizeMode::Pixels => {
                if self.width == 0 || self.height == 0 {
                    return Err(ConvertError::invalid_argument(
                        "dimensions",
                        format!("{}x{}", self.width, self.height),
                        "width and height must be positive integers",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Target container format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
    Gif,
    Avif,
}

impl OutputFormat {
    pub fn from_str(format: &str) -> Result<Self> {
        match format.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            "gif" => Ok(Self::Gif),
            "avif" => Ok(Self::Avif),
            other => Err(ConvertError::unsupported_format(other.to_string())),
        }
    }

    /// Canonical file extension (JPEG maps to `jpg`, everything else to the
    /// lowercase format name).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Avif => "avif",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
            Self::Gif => "image/gif",
            Self::Avif => "image/avif",
        }
    }

    /// Whether the quality factor is consulted during encoding.
    pub fn is_lossy(self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP | Self::Avif)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
            Self::Gif => "gif",
            Self::Avif => "avif",
        }
    }
}

/// Encoding parameters for one conversion.
///
/// `quality` is consulted only for lossy formats; `preserve_metadata` only
/// takes effect on JPEG-to-JPEG conversions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EncodeSettings {
    pub format: OutputFormat,
    pub quality: u8,
    pub preserve_metadata: bool,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 80,
            preserve_metadata: true,
        }
    }
}

impl EncodeSettings {
    pub fn validate(&self) -> Result<()> {
        if self.quality == 0 || self.quality > 100 {
            return Err(ConvertError::invalid_argument(
                "quality",
                self.quality.to_string(),
                "must be in 1..=100",
            ));
        }
        Ok(())
    }
}

/// Derive the output filename from the source name: replace the extension
/// with the canonical one for the target format. A name without an extension
/// keeps its full stem.
pub fn derive_output_name(source_name: &str, format: OutputFormat) -> String {
    let stem = match source_name.rfind('.') {
        // Leading dot (".bashrc" style) is part of the stem, not an extension
        Some(0) | None => source_name,
        Some(idx) => &source_name[..idx],
    };
    format!("{stem}.{}", format.extension())
}
