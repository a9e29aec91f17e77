// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: rotate, crop, grayscale, denoise and sharpen page
// bitmaps. Operates on in-memory images using the `image` and `imageproc`
// crates.

use blattwerk_core::error::{BlattwerkError, Result};
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};
use imageproc::filter::median_filter;
use imageproc::geometric_transformations::{self, Interpolation};
use tracing::{debug, instrument};

/// Single-page bitmap processor.
///
/// Each method consumes `self` and returns a new `ImageProcessor` wrapping the
/// transformed image, so steps chain:
///
/// ```ignore
/// let page = ImageProcessor::open("page-1.png")?
///     .rotate(90.0)
///     .denoise()
///     .grayscale()
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load a page bitmap from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            BlattwerkError::Image(format!("failed to open {}: {}", path.as_ref().display(), err))
        })?;
        debug!(width = img.width(), height = img.height(), "Page bitmap loaded");
        Ok(Self { image: img })
    }

    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Rotate clockwise by `degrees` about the image centre.
    ///
    /// Multiples of 90 are lossless and swap dimensions where needed. Any
    /// other angle keeps the canvas size, interpolates bilinearly and fills
    /// uncovered corners with white.
    #[instrument(skip(self), fields(degrees))]
    pub fn rotate(self, degrees: f32) -> Self {
        let normalised = degrees.rem_euclid(360.0);
        let near = |target: f32| (normalised - target).abs() < 0.01;
        if near(0.0) || near(360.0) {
            return self;
        }
        if near(90.0) {
            return Self { image: self.image.rotate90() };
        }
        if near(180.0) {
            return Self { image: self.image.rotate180() };
        }
        if near(270.0) {
            return Self { image: self.image.rotate270() };
        }

        let radians = degrees.to_radians();
        let rotated = match self.image {
            DynamicImage::ImageLuma8(gray) => {
                DynamicImage::ImageLuma8(geometric_transformations::rotate_about_center(
                    &gray,
                    radians,
                    Interpolation::Bilinear,
                    Luma([255u8]),
                ))
            }
            other => DynamicImage::ImageRgb8(geometric_transformations::rotate_about_center(
                &other.to_rgb8(),
                radians,
                Interpolation::Bilinear,
                Rgb([255u8, 255, 255]),
            )),
        };
        debug!(degrees, "General rotation applied");
        Self { image: rotated }
    }

    /// Crop a rectangular region. Values are clamped to image bounds.
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let img_w = self.image.width();
        let img_h = self.image.height();

        let safe_x = x.min(img_w.saturating_sub(1));
        let safe_y = y.min(img_h.saturating_sub(1));
        let safe_w = width.min(img_w - safe_x);
        let safe_h = height.min(img_h - safe_y);

        Self {
            image: self.image.crop_imm(safe_x, safe_y, safe_w, safe_h),
        }
    }

    /// Convert to 8-bit luma.
    pub fn grayscale(self) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(self.image.to_luma8()),
        }
    }

    /// 3x3 median filter. Removes salt-and-pepper speckle from scans.
    #[instrument(skip(self))]
    pub fn denoise(self) -> Self {
        let image = match self.image {
            DynamicImage::ImageLuma8(gray) => DynamicImage::ImageLuma8(median_filter(&gray, 1, 1)),
            other => DynamicImage::ImageRgb8(median_filter(&other.to_rgb8(), 1, 1)),
        };
        Self { image }
    }

    /// Unsharp mask: `1.5 * image - 0.5 * blur(image, sigma)`.
    #[instrument(skip(self), fields(sigma))]
    pub fn unsharp(self, sigma: f32) -> Self {
        let image = match self.image {
            DynamicImage::ImageLuma8(gray) => {
                let blurred = imageproc::filter::gaussian_blur_f32(&gray, sigma);
                DynamicImage::ImageLuma8(GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
                    Luma([sharpen(gray.get_pixel(x, y).0[0], blurred.get_pixel(x, y).0[0])])
                }))
            }
            other => {
                let rgb: RgbImage = other.to_rgb8();
                let blurred = imageproc::filter::gaussian_blur_f32(&rgb, sigma);
                DynamicImage::ImageRgb8(RgbImage::from_fn(rgb.width(), rgb.height(), |x, y| {
                    let src = rgb.get_pixel(x, y).0;
                    let blur = blurred.get_pixel(x, y).0;
                    Rgb([
                        sharpen(src[0], blur[0]),
                        sharpen(src[1], blur[1]),
                        sharpen(src[2], blur[2]),
                    ])
                }))
            }
        };
        Self { image }
    }

    // -- Output ---------------------------------------------------------------

    /// Write the image to a file. The format is inferred from the extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image.save(path.as_ref()).map_err(|err| {
            BlattwerkError::Image(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                err
            ))
        })
    }
}

fn sharpen(source: u8, blurred: u8) -> u8 {
    (1.5 * source as f32 - 0.5 * blurred as f32).round().clamp(0.0, 255.0) as u8
}
