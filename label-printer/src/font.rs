//! Font pair for label text
//!
//! Scalable TrueType/OpenType faces are preferred. When none can be loaded
//! the built-in 8x8 bitmap font is used instead; it looks coarse but never
//! fails, so rendering always completes.

use ab_glyph::{FontArc, PxScale};
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_text_mut, text_size};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Pixel size of the regular face
pub const REGULAR_PX: f32 = 14.0;
/// Pixel size of the bold face
pub const BOLD_PX: f32 = 18.0;

const REGULAR_CANDIDATES: &[&str] = &[
    "C:\\Windows\\Fonts\\arial.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
];

const BOLD_CANDIDATES: &[&str] = &[
    "C:\\Windows\\Fonts\\arialbd.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans-Bold.ttf",
    "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    "/Library/Fonts/Arial Bold.ttf",
];

/// A single typeface at a fixed size
#[derive(Clone)]
pub enum FontFace {
    Scalable { font: FontArc, scale: PxScale },
    /// 8x8 bitmap glyphs magnified by `scale`; `bold` overstrikes by one pixel
    Bitmap { scale: u32, bold: bool },
}

impl fmt::Debug for FontFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalable { scale, .. } => f
                .debug_struct("Scalable")
                .field("px", &scale.y)
                .finish(),
            Self::Bitmap { scale, bold } => f
                .debug_struct("Bitmap")
                .field("scale", scale)
                .field("bold", bold)
                .finish(),
        }
    }
}

impl FontFace {
    /// Load a TTF/OTF face from disk
    pub fn from_file(path: &Path, px: f32) -> Option<Self> {
        let bytes = std::fs::read(path).ok()?;
        match FontArc::try_from_vec(bytes) {
            Ok(font) => Some(Self::Scalable {
                font,
                scale: PxScale::from(px),
            }),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "font file is not a usable font");
                None
            }
        }
    }

    /// Width and height of `text` in pixels
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match self {
            Self::Scalable { font, scale } => text_size(*scale, font, text),
            Self::Bitmap { scale, bold } => {
                let chars = text.chars().count() as u32;
                let extra = u32::from(*bold && chars > 0);
                (chars * 8 * scale + extra, 8 * scale)
            }
        }
    }

    /// Draw `text` with its top-left corner at (x, y); pixels off-canvas are clipped
    pub fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, text: &str, color: Rgba<u8>) {
        match self {
            Self::Scalable { font, scale } => {
                draw_text_mut(canvas, color, x, y, *scale, font, text);
            }
            Self::Bitmap { scale, bold } => {
                draw_bitmap_text(canvas, x, y, *scale, text, color);
                if *bold {
                    draw_bitmap_text(canvas, x + 1, y, *scale, text, color);
                }
            }
        }
    }
}

fn draw_bitmap_text(canvas: &mut RgbaImage, x: i32, y: i32, scale: u32, text: &str, color: Rgba<u8>) {
    let scale = scale.max(1) as i32;
    let (w, h) = (canvas.width() as i32, canvas.height() as i32);
    let fallback = BASIC_FONTS.get('?').unwrap_or([0; 8]);

    for (i, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS.get(ch).unwrap_or(fallback);
        let gx = x + i as i32 * 8 * scale;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..8 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px0 = gx + col * scale;
                let py0 = y + row as i32 * scale;
                for dy in 0..scale {
                    for dx in 0..scale {
                        let (px, py) = (px0 + dx, py0 + dy);
                        if px >= 0 && py >= 0 && px < w && py < h {
                            canvas.put_pixel(px as u32, py as u32, color);
                        }
                    }
                }
            }
        }
    }
}

/// Preferred font files; unset entries fall through to platform paths
#[derive(Debug, Clone, Default)]
pub struct FontPaths {
    pub regular: Option<PathBuf>,
    pub bold: Option<PathBuf>,
}

/// Regular/bold face pair used by the label renderer
#[derive(Debug, Clone)]
pub struct LabelFonts {
    pub regular: FontFace,
    pub bold: FontFace,
}

impl LabelFonts {
    /// Resolve fonts: configured paths, then platform defaults, then bitmap
    pub fn load(paths: &FontPaths) -> Self {
        let regular = resolve_face(paths.regular.as_deref(), REGULAR_CANDIDATES, REGULAR_PX)
            .unwrap_or_else(|| {
                debug!("no scalable regular font found, using bitmap font");
                FontFace::Bitmap {
                    scale: 2,
                    bold: false,
                }
            });
        let bold = resolve_face(paths.bold.as_deref(), BOLD_CANDIDATES, BOLD_PX).unwrap_or_else(
            || {
                debug!("no scalable bold font found, using bitmap font");
                FontFace::Bitmap {
                    scale: 2,
                    bold: true,
                }
            },
        );
        Self { regular, bold }
    }

    /// Bitmap-only pair; identical output on every machine
    pub fn fallback() -> Self {
        Self {
            regular: FontFace::Bitmap {
                scale: 2,
                bold: false,
            },
            bold: FontFace::Bitmap {
                scale: 2,
                bold: true,
            },
        }
    }
}

impl Default for LabelFonts {
    fn default() -> Self {
        Self::load(&FontPaths::default())
    }
}

fn resolve_face(preferred: Option<&Path>, candidates: &[&str], px: f32) -> Option<FontFace> {
    if let Some(path) = preferred {
        if let Some(face) = FontFace::from_file(path, px) {
            return Some(face);
        }
        warn!(path = %path.display(), "configured font could not be loaded");
    }
    candidates
        .iter()
        .map(Path::new)
        .filter(|p| p.is_file())
        .find_map(|p| FontFace::from_file(p, px))
}
