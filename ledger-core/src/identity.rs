//! Identity code rendering
//!
//! Turns an [`IdentityPayload`] into a scannable image. The payload is encoded
//! as compact JSON so scanners recover both fields without ad hoc parsing.

use crate::{types::IdentityPayload, Error, Result};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::{types::QrError, EcLevel, QrCode};
use std::io::Cursor;

/// Renders identity payloads to image bytes
pub trait IdentityEncoder: Send + Sync {
    /// MIME type of the produced bytes
    fn content_type(&self) -> &'static str;

    /// Encode one payload
    fn encode(&self, payload: &IdentityPayload) -> Result<Vec<u8>>;

    /// Fail with [`Error::InvalidOperation`] if `payload` cannot be rendered
    fn check_capacity(&self, _payload: &IdentityPayload) -> Result<()> {
        Ok(())
    }
}

/// QR code rendered as a greyscale PNG
#[derive(Debug, Clone)]
pub struct QrPngEncoder {
    module_size: u32,
}

impl QrPngEncoder {
    /// Encoder drawing each QR module as a `module_size` pixel square
    pub fn new(module_size: u32) -> Self {
        Self {
            module_size: module_size.max(1),
        }
    }

    fn matrix(payload: &IdentityPayload) -> Result<QrCode> {
        let data = serde_json::to_vec(payload)?;
        QrCode::with_error_correction_level(&data, EcLevel::M).map_err(|e| match e {
            QrError::DataTooLong => Error::InvalidOperation(format!(
                "full_name too long for an identity code ({} payload bytes)",
                data.len()
            )),
            other => Error::from(other),
        })
    }
}

impl Default for QrPngEncoder {
    fn default() -> Self {
        Self::new(10)
    }
}

impl IdentityEncoder for QrPngEncoder {
    fn content_type(&self) -> &'static str {
        "image/png"
    }

    fn encode(&self, payload: &IdentityPayload) -> Result<Vec<u8>> {
        let code = Self::matrix(payload)?;

        let image = code
            .render::<Luma<u8>>()
            .quiet_zone(true)
            .module_dimensions(self.module_size, self.module_size)
            .build();

        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(image).write_to(&mut buffer, ImageFormat::Png)?;

        Ok(buffer.into_inner())
    }

    fn check_capacity(&self, payload: &IdentityPayload) -> Result<()> {
        Self::matrix(payload).map(|_| ())
    }
}
