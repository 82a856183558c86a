//! UPC-A barcode generation
//!
//! Layout: start guard `101`, six left digits (L-codes), centre guard
//! `01010`, six right digits (R-codes), end guard `101`. 95 modules total.

use crate::error::{PrintError, PrintResult};
use crate::font::LabelFonts;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pixels per module
pub const MODULE_PX: u32 = 2;
/// Quiet zone on each side, in modules
pub const QUIET_MODULES: u32 = 9;
/// Height of regular bars in pixels
pub const BAR_HEIGHT: u32 = 60;
/// Modules in a UPC-A symbol
pub const SYMBOL_MODULES: usize = 95;

const TEXT_GAP: u32 = 2;

/// Left-hand (odd parity) digit patterns, 7 modules each, MSB first.
/// Right-hand patterns are the bitwise complement.
const L_CODES: [u8; 10] = [
    0b000_1101, 0b001_1001, 0b001_0011, 0b011_1101, 0b010_0011, 0b011_0001, 0b010_1111,
    0b011_1011, 0b011_0111, 0b000_1011,
];

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Bring a UPC string to 11 or 12 characters.
///
/// * 11 or 12 characters: unchanged
/// * shorter: zero-padded on the left to 11
/// * longer: only the last 12 characters are kept (lossy, logged)
///
/// Surrounding whitespace is ignored. Characters are not validated here;
/// [`UpcA::new`] rejects non-digits.
pub fn normalize_upc(raw: &str) -> String {
    let upc = raw.trim();
    let len = upc.chars().count();
    match len {
        11 | 12 => upc.to_string(),
        n if n < 11 => format!("{upc:0>11}"),
        n => {
            let kept: String = upc.chars().skip(n - 12).collect();
            warn!(upc = %upc, kept = %kept, "UPC longer than 12 characters, leading digits dropped");
            kept
        }
    }
}

/// Computes the UPC-A check digit over the first 11 digits
pub fn check_digit(digits: &[u8; 11]) -> u8 {
    let (odd, even) = digits
        .iter()
        .enumerate()
        .fold((0u32, 0u32), |(odd, even), (i, &d)| {
            if i % 2 == 0 {
                (odd + d as u32, even)
            } else {
                (odd, even + d as u32)
            }
        });
    ((10 - (odd * 3 + even) % 10) % 10) as u8
}

/// A validated UPC-A symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpcA {
    digits: [u8; 12],
}

impl UpcA {
    /// Build from an already normalized 11 or 12 digit string.
    ///
    /// The check digit is always computed from the first 11 digits; a
    /// supplied 12th digit is replaced.
    pub fn new(code: &str) -> PrintResult<Self> {
        let len = code.chars().count();
        if len != 11 && len != 12 {
            return Err(PrintError::Barcode(format!(
                "UPC-A needs 11 or 12 digits, got {len}"
            )));
        }

        let mut body = [0u8; 11];
        for (slot, ch) in body.iter_mut().zip(code.chars()) {
            *slot = ch
                .to_digit(10)
                .ok_or_else(|| PrintError::Barcode(format!("UPC contains non-digit: {code}")))?
                as u8;
        }
        if code.chars().nth(11).is_some_and(|c| !c.is_ascii_digit()) {
            return Err(PrintError::Barcode(format!("UPC contains non-digit: {code}")));
        }

        let mut digits = [0u8; 12];
        digits[..11].copy_from_slice(&body);
        digits[11] = check_digit(&body);
        Ok(Self { digits })
    }

    /// Normalize then validate
    pub fn parse(raw: &str) -> PrintResult<Self> {
        Self::new(&normalize_upc(raw))
    }

    pub fn digits(&self) -> &[u8; 12] {
        &self.digits
    }

    /// Full 12-digit code including the check digit
    pub fn code(&self) -> String {
        self.digits.iter().map(|d| char::from(b'0' + d)).collect()
    }

    /// Module sequence, `true` for a dark bar
    pub fn modules(&self) -> Vec<bool> {
        let mut out = Vec::with_capacity(SYMBOL_MODULES);
        let push_bits = |out: &mut Vec<bool>, pattern: u8, width: u32| {
            for bit in (0..width).rev() {
                out.push(pattern & (1 << bit) != 0);
            }
        };

        push_bits(&mut out, 0b101, 3);
        for &d in &self.digits[..6] {
            push_bits(&mut out, L_CODES[d as usize], 7);
        }
        push_bits(&mut out, 0b01010, 5);
        for &d in &self.digits[6..] {
            push_bits(&mut out, !L_CODES[d as usize] & 0x7f, 7);
        }
        push_bits(&mut out, 0b101, 3);
        out
    }

    /// Rasterize with digits printed underneath
    pub fn render(&self, fonts: &LabelFonts) -> RgbaImage {
        let face = &fonts.regular;
        let (_, text_h) = face.measure("0");
        let text_top = BAR_HEIGHT + TEXT_GAP;
        let height = text_top + text_h + TEXT_GAP;
        let width = (SYMBOL_MODULES as u32 + 2 * QUIET_MODULES) * MODULE_PX;
        let mut canvas = RgbaImage::from_pixel(width, height, WHITE);

        // Guards and the outer digits run down into the text band
        let long_bar = BAR_HEIGHT + text_h / 2;
        for (i, dark) in self.modules().into_iter().enumerate() {
            if !dark {
                continue;
            }
            let x = (QUIET_MODULES + i as u32) * MODULE_PX;
            let bar_h = if is_long_module(i) { long_bar } else { BAR_HEIGHT };
            draw_filled_rect_mut(
                &mut canvas,
                Rect::at(x as i32, 0).of_size(MODULE_PX, bar_h),
                BLACK,
            );
        }

        let y = text_top as i32;
        let mut draw_digit = |digit: u8, centre_px: u32| {
            let s = char::from(b'0' + digit).to_string();
            let (w, _) = face.measure(&s);
            face.draw(&mut canvas, centre_px as i32 - (w / 2) as i32, y, &s, BLACK);
        };

        // System digit and check digit sit in the quiet zones
        draw_digit(self.digits[0], QUIET_MODULES * MODULE_PX / 2);
        draw_digit(self.digits[11], width - QUIET_MODULES * MODULE_PX / 2);
        for (i, &d) in self.digits.iter().enumerate().take(11).skip(1) {
            draw_digit(d, (QUIET_MODULES + digit_start_module(i) + 3) * MODULE_PX + 1);
        }

        canvas
    }
}

/// First module of digit `i` within the symbol
fn digit_start_module(i: usize) -> u32 {
    if i < 6 {
        3 + 7 * i as u32
    } else {
        50 + 7 * (i as u32 - 6)
    }
}

fn is_long_module(i: usize) -> bool {
    // start guard + first digit, centre guard, last digit + end guard
    i < 10 || (45..50).contains(&i) || i >= 85
}

/// Normalize, validate and rasterize a UPC in memory
pub fn barcode_image(upc: &str, fonts: &LabelFonts) -> PrintResult<RgbaImage> {
    let symbol = UpcA::parse(upc)?;
    debug!(code = %symbol.code(), "rendering UPC-A");
    Ok(symbol.render(fonts))
}

/// Write a UPC-A barcode PNG to `path` and return the path.
pub fn generate_upc_barcode(
    upc: &str,
    path: impl AsRef<Path>,
    fonts: &LabelFonts,
) -> PrintResult<PathBuf> {
    let path = path.as_ref();
    let image = barcode_image(upc, fonts)?;
    DynamicImage::ImageRgba8(image)
        .to_rgb8()
        .save_with_format(path, ImageFormat::Png)?;
    Ok(path.to_path_buf())
}
