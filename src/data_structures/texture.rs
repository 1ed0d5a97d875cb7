//! Texture records, decoded images and shader slot naming.
//!
//! This module provides [`Texture`], the lightweight record a mesh keeps for every
//! bound texture, the CPU-side [`DecodedImage`] handed to a GPU context for upload,
//! and [`SlotNamer`], which derives the ordinal uniform names (`material.texture_diffuse1`,
//! `material.texture_diffuse2`, ...) a shading stage uses to address texture units.

use std::fmt;

use image::{DynamicImage, ImageBuffer, imageops::FilterType};

use crate::context::TextureHandle;

/// Role a texture plays in shading.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    Diffuse,
    Specular,
    Normal,
    Height,
}

impl TextureKind {
    /// All kinds in binding order. Mesh texture sequences are concatenated in this order.
    pub const ALL: [TextureKind; 4] = [
        TextureKind::Diffuse,
        TextureKind::Specular,
        TextureKind::Normal,
        TextureKind::Height,
    ];

    /// Uniform name prefix the shading stage declares for this kind.
    pub fn uniform_name(self) -> &'static str {
        match self {
            TextureKind::Diffuse => "texture_diffuse",
            TextureKind::Specular => "texture_specular",
            TextureKind::Normal => "texture_normal",
            TextureKind::Height => "texture_height",
        }
    }

    fn index(self) -> usize {
        match self {
            TextureKind::Diffuse => 0,
            TextureKind::Specular => 1,
            TextureKind::Normal => 2,
            TextureKind::Height => 3,
        }
    }
}

impl fmt::Display for TextureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.uniform_name())
    }
}

/// A texture bound to a mesh.
///
/// `path` is the material's own (relative) reference and doubles as the cache key,
/// so two records with the same path always share the same GPU handle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Texture {
    pub handle: TextureHandle,
    pub kind: TextureKind,
    pub path: String,
}

/// GPU pixel layout derived from the decoded channel count.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Red,
    Rgb,
    Rgba,
}

impl PixelFormat {
    /// 1, 3 and 4 channels are supported; anything else yields `None`.
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Red),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }

    pub fn channels(self) -> u32 {
        match self {
            PixelFormat::Red => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// Tightly packed 8-bit pixels ready for upload.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    /// Number of levels in a full mip chain down to 1x1.
    pub fn mip_level_count(&self) -> u32 {
        32 - self.width.max(self.height).max(1).leading_zeros()
    }

    /// Downsample to the given size with a triangle filter.
    ///
    /// Returns `None` if the pixel buffer does not match the declared dimensions.
    pub fn resized(&self, width: u32, height: u32) -> Option<DecodedImage> {
        let image = self.to_dynamic()?;
        let resized = image.resize_exact(width.max(1), height.max(1), FilterType::Triangle);
        Some(DecodedImage::from_dynamic(resized, self.format))
    }

    /// Every mip level after the base level, each half the size of the previous one.
    pub fn mip_chain(&self) -> Vec<DecodedImage> {
        (1..self.mip_level_count())
            .filter_map(|level| {
                self.resized((self.width >> level).max(1), (self.height >> level).max(1))
            })
            .collect()
    }

    /// Copy the pixels into a four channel buffer, filling alpha with 255.
    pub fn to_rgba(&self) -> Vec<u8> {
        match self.format {
            PixelFormat::Rgba => self.pixels.clone(),
            PixelFormat::Rgb => {
                let mut rgba = Vec::with_capacity(self.pixels.len() / 3 * 4);
                for chunk in self.pixels.chunks(3) {
                    rgba.extend_from_slice(chunk);
                    rgba.push(255);
                }
                rgba
            }
            PixelFormat::Red => self.pixels.iter().flat_map(|&r| [r, r, r, 255]).collect(),
        }
    }

    pub(crate) fn from_dynamic(image: DynamicImage, format: PixelFormat) -> Self {
        let (width, height) = (image.width(), image.height());
        let pixels = match format {
            PixelFormat::Red => image.into_luma8().into_raw(),
            PixelFormat::Rgb => image.into_rgb8().into_raw(),
            PixelFormat::Rgba => image.into_rgba8().into_raw(),
        };
        Self {
            width,
            height,
            format,
            pixels,
        }
    }

    fn to_dynamic(&self) -> Option<DynamicImage> {
        let (w, h, pixels) = (self.width, self.height, self.pixels.clone());
        Some(match self.format {
            PixelFormat::Red => DynamicImage::ImageLuma8(ImageBuffer::from_raw(w, h, pixels)?),
            PixelFormat::Rgb => DynamicImage::ImageRgb8(ImageBuffer::from_raw(w, h, pixels)?),
            PixelFormat::Rgba => DynamicImage::ImageRgba8(ImageBuffer::from_raw(w, h, pixels)?),
        })
    }
}

/// Per-draw ordinal counters, one per [`TextureKind`], starting at 1.
///
/// A fresh namer is created for every mesh draw so the numbering of one mesh never
/// leaks into another.
#[derive(Clone, Debug)]
pub struct SlotNamer {
    counters: [u32; 4],
}

impl Default for SlotNamer {
    fn default() -> Self {
        Self { counters: [1; 4] }
    }
}

impl SlotNamer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for the next texture of `kind`, e.g. `material.texture_specular2`.
    pub fn next_name(&mut self, kind: TextureKind) -> String {
        let counter = &mut self.counters[kind.index()];
        let name = format!("material.{}{}", kind.uniform_name(), counter);
        *counter += 1;
        name
    }
}
