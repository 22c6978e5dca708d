// # QR Ticket Renderer
//
// Renders ticket codes as PNG QR codes for the ticket email and the
// ticket image route.
//
// ## Output
//
// - Error correction level M
// - 6 pixels per module
// - 4-module quiet zone on every side
// - 8-bit grayscale PNG, black on white

use hackreg_core::{CodeRenderer, Error, Result, TicketImage};
use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, EcLevel, QrCode};
use std::io::Cursor;

/// Pixels per QR module
pub const DEFAULT_SCALE: u32 = 6;

/// Quiet zone width in modules
const QUIET_ZONE: u32 = 4;

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// QR code renderer
#[derive(Debug, Clone)]
pub struct QrCodeRenderer {
    scale: u32,
}

impl Default for QrCodeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl QrCodeRenderer {
    /// Renderer at the default scale
    pub fn new() -> Self {
        Self::with_scale(DEFAULT_SCALE)
    }

    /// Renderer with `scale` pixels per module (at least 1)
    pub fn with_scale(scale: u32) -> Self {
        Self {
            scale: scale.max(1),
        }
    }

    /// Rasterize a ticket code
    pub fn render_image(&self, ticket_code: &str) -> Result<GrayImage> {
        if ticket_code.is_empty() {
            return Err(Error::invalid_input("Ticket code cannot be empty"));
        }

        let code = QrCode::with_error_correction_level(ticket_code.as_bytes(), EcLevel::M)
            .map_err(|e| Error::invalid_input(format!("Cannot encode ticket code: {e}")))?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let side = (modules + 2 * QUIET_ZONE) * self.scale;

        Ok(GrayImage::from_fn(side, side, |x, y| {
            let mx = (x / self.scale).checked_sub(QUIET_ZONE);
            let my = (y / self.scale).checked_sub(QUIET_ZONE);
            match (mx, my) {
                (Some(mx), Some(my)) if mx < modules && my < modules => {
                    match colors[(my * modules + mx) as usize] {
                        Color::Dark => DARK,
                        Color::Light => LIGHT,
                    }
                }
                _ => LIGHT,
            }
        }))
    }
}

impl CodeRenderer for QrCodeRenderer {
    fn render_png(&self, ticket_code: &str) -> Result<TicketImage> {
        let image = self.render_image(ticket_code)?;

        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| Error::notification("qr", format!("PNG encoding failed: {e}")))?;

        tracing::debug!(
            "Rendered ticket {} as {}x{} PNG",
            ticket_code,
            image.width(),
            image.height()
        );

        Ok(TicketImage {
            ticket_code: ticket_code.to_string(),
            png: png.into_inner(),
        })
    }
}
