/*
[INPUT]:  Uploaded image dimensions and user edits (quality, width, height, aspect lock)
[OUTPUT]: Validated ProcessingOptions and their wire request
[POS]:    Domain layer - processing options and the form state behind them
[UPDATE]: When adding transform parameters or changing the aspect-ratio rule
*/

use imgpress_adapter::{CompressionRequest, ProcessingRequest, ResizeRequest, UploadedImage};

use crate::error::ValidationError;

pub const DEFAULT_QUALITY: u8 = 80;
pub const MIN_QUALITY: u8 = 1;
pub const MAX_QUALITY: u8 = 100;

/// Transform requested for one uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingOptions {
    pub quality: u8,
    pub width: u32,
    pub height: u32,
    pub keep_aspect_ratio: bool,
}

impl ProcessingOptions {
    /// Check the options against the image they will be applied to.
    ///
    /// With the aspect lock on, `height` must equal the height derived from
    /// `width` and the original image's aspect ratio.
    pub fn validate_for(&self, image: &UploadedImage) -> Result<(), ValidationError> {
        validate_quality(self.quality)?;
        if self.width == 0 || self.height == 0 {
            return Err(ValidationError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }

        if self.keep_aspect_ratio {
            let ratio = aspect_ratio_of(image)?;
            let expected = derive_height(self.width, ratio);
            if expected != self.height {
                return Err(ValidationError::AspectRatioMismatch {
                    expected,
                    actual: self.height,
                });
            }
        }
        Ok(())
    }

    pub fn to_request(&self) -> ProcessingRequest {
        ProcessingRequest {
            compression: CompressionRequest {
                quality: self.quality,
            },
            resize: ResizeRequest {
                width: self.width,
                height: self.height,
                keep_aspect_ratio: self.keep_aspect_ratio,
            },
        }
    }
}

/// `round(width / ratio)`, never below 1 so the result stays a valid dimension.
pub fn derive_height(width: u32, aspect_ratio: f64) -> u32 {
    (f64::from(width) / aspect_ratio).round().max(1.0) as u32
}

/// `round(height * ratio)`, never below 1.
pub fn derive_width(height: u32, aspect_ratio: f64) -> u32 {
    (f64::from(height) * aspect_ratio).round().max(1.0) as u32
}

fn aspect_ratio_of(image: &UploadedImage) -> Result<f64, ValidationError> {
    image
        .aspect_ratio()
        .ok_or(ValidationError::DegenerateImage {
            width: image.width,
            height: image.height,
        })
}

fn validate_quality(quality: u8) -> Result<(), ValidationError> {
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(ValidationError::InvalidQuality { quality });
    }
    Ok(())
}

/// Editable options for one image.
///
/// The aspect ratio is computed once from the original dimensions and held
/// for the lifetime of the form. While the lock is on, height follows width
/// and cannot be edited on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsForm {
    original_width: u32,
    original_height: u32,
    aspect_ratio: f64,
    default_quality: u8,
    quality: u8,
    width: u32,
    height: u32,
    keep_aspect_ratio: bool,
}

impl OptionsForm {
    pub fn for_image(image: &UploadedImage) -> Result<Self, ValidationError> {
        Self::with_default_quality(image, DEFAULT_QUALITY)
    }

    pub fn with_default_quality(
        image: &UploadedImage,
        default_quality: u8,
    ) -> Result<Self, ValidationError> {
        validate_quality(default_quality)?;
        let aspect_ratio = aspect_ratio_of(image)?;
        Ok(Self {
            original_width: image.width,
            original_height: image.height,
            aspect_ratio,
            default_quality,
            quality: default_quality,
            width: image.width,
            height: image.height,
            keep_aspect_ratio: true,
        })
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn keep_aspect_ratio(&self) -> bool {
        self.keep_aspect_ratio
    }

    pub fn set_quality(&mut self, quality: u8) -> Result<(), ValidationError> {
        validate_quality(quality)?;
        self.quality = quality;
        Ok(())
    }

    pub fn set_width(&mut self, width: u32) -> Result<(), ValidationError> {
        if width == 0 {
            return Err(ValidationError::InvalidDimensions {
                width,
                height: self.height,
            });
        }
        self.width = width;
        if self.keep_aspect_ratio {
            self.height = derive_height(width, self.aspect_ratio);
        }
        Ok(())
    }

    pub fn set_height(&mut self, height: u32) -> Result<(), ValidationError> {
        if self.keep_aspect_ratio {
            return Err(ValidationError::HeightLocked);
        }
        if height == 0 {
            return Err(ValidationError::InvalidDimensions {
                width: self.width,
                height,
            });
        }
        self.height = height;
        Ok(())
    }

    /// Turning the lock on snaps height back onto the ratio.
    pub fn set_keep_aspect_ratio(&mut self, keep: bool) {
        self.keep_aspect_ratio = keep;
        if keep {
            self.height = derive_height(self.width, self.aspect_ratio);
        }
    }

    /// Fit within a bounding box, preserving the ratio.
    pub fn fit_within(&mut self, max_width: u32, max_height: u32) -> Result<(), ValidationError> {
        if max_width == 0 || max_height == 0 {
            return Err(ValidationError::InvalidDimensions {
                width: max_width,
                height: max_height,
            });
        }
        self.keep_aspect_ratio = true;
        let width = self.original_width.min(max_width);
        let width = if derive_height(width, self.aspect_ratio) > max_height {
            derive_width(max_height, self.aspect_ratio).min(width)
        } else {
            width
        };
        self.set_width(width)
    }

    pub fn reset_to_original(&mut self) {
        self.quality = self.default_quality;
        self.width = self.original_width;
        self.height = self.original_height;
        self.keep_aspect_ratio = true;
    }

    pub fn build(&self) -> ProcessingOptions {
        ProcessingOptions {
            quality: self.quality,
            width: self.width,
            height: self.height,
            keep_aspect_ratio: self.keep_aspect_ratio,
        }
    }
}
