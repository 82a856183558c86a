//! Label renderer
//!
//! Single pass over the template lines: logo, then text and barcode lines
//! top to bottom, then the lot number in the top-right corner. Output is a
//! pure function of the template, the token map and the referenced files.

use crate::barcode::barcode_image;
use crate::error::PrintResult;
use crate::font::LabelFonts;
use crate::template::{LabelToken, TemplateLine, TokenMap, parse_lines};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Text drawn in place of a barcode that could not be generated
pub const BARCODE_ERROR_TEXT: &str = "ERR: barcode";

/// Fixed label geometry in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelLayout {
    pub width: u32,
    pub height: u32,
    /// Left edge of text lines
    pub text_x: i32,
    /// Initial vertical cursor
    pub top: i32,
    pub line_height: i32,
    pub logo_origin: (i64, i64),
    pub logo_box: u32,
    pub barcode_x: i64,
    pub barcode_box: (u32, u32),
    pub barcode_gap: i32,
    pub barcode_error_advance: i32,
    /// Distance of the lot number from the right edge
    pub lot_margin: i32,
}

impl LabelLayout {
    /// Printed label, 600x400
    pub fn print() -> Self {
        Self::with_size(600, 400)
    }

    /// On-screen preview, 400x300
    pub fn preview() -> Self {
        Self::with_size(400, 300)
    }

    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            text_x: 100,
            top: 10,
            line_height: 18,
            logo_origin: (10, 10),
            logo_box: 80,
            barcode_x: 10,
            barcode_box: (180, 60),
            barcode_gap: 5,
            barcode_error_advance: 20,
            lot_margin: 10,
        }
    }
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self::print()
    }
}

/// Non-fatal degradation encountered while rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderWarning {
    /// Barcode replaced by the error text
    BarcodeFallback { upc: String, reason: String },
    /// Logo file present in the map but not drawn
    LogoSkipped { path: String, reason: String },
}

/// A composed label
#[derive(Debug, Clone)]
pub struct RenderedLabel {
    pub image: RgbImage,
    pub warnings: Vec<RenderWarning>,
}

impl RenderedLabel {
    /// Encode as PNG
    pub fn png_bytes(&self) -> PrintResult<Vec<u8>> {
        let mut buf = Cursor::new(Vec::new());
        self.image.write_to(&mut buf, ImageFormat::Png)?;
        Ok(buf.into_inner())
    }

    /// Write as PNG to `path` and return the path
    pub fn save(&self, path: impl AsRef<Path>) -> PrintResult<PathBuf> {
        let path = path.as_ref();
        self.image.save_with_format(path, ImageFormat::Png)?;
        Ok(path.to_path_buf())
    }
}

/// Composes label images from templates
#[derive(Debug, Clone)]
pub struct LabelRenderer {
    fonts: LabelFonts,
    layout: LabelLayout,
}

impl LabelRenderer {
    pub fn new(fonts: LabelFonts, layout: LabelLayout) -> Self {
        Self { fonts, layout }
    }

    /// Same fonts, different geometry
    pub fn with_layout(&self, layout: LabelLayout) -> Self {
        Self {
            fonts: self.fonts.clone(),
            layout,
        }
    }

    pub fn layout(&self) -> &LabelLayout {
        &self.layout
    }

    pub fn fonts(&self) -> &LabelFonts {
        &self.fonts
    }

    /// Compose a label. Never fails; problems are reported as warnings.
    pub fn render(&self, template: &str, tokens: &TokenMap) -> RenderedLabel {
        let l = &self.layout;
        let mut canvas = RgbaImage::from_pixel(l.width, l.height, WHITE);
        let mut warnings = Vec::new();

        if let Some(path) = tokens.non_empty(LabelToken::LogoPath)
            && let Err(reason) = self.draw_logo(&mut canvas, Path::new(path))
        {
            debug!(path, %reason, "logo skipped");
            warnings.push(RenderWarning::LogoSkipped {
                path: path.to_string(),
                reason,
            });
        }

        let mut y = l.top;
        for (idx, line) in parse_lines(template).into_iter().enumerate() {
            match line {
                TemplateLine::Barcode => {
                    let upc = tokens.get(LabelToken::Upc).unwrap_or_default();
                    match self.fit_barcode(upc) {
                        Ok(bc) => {
                            imageops::overlay(&mut canvas, &bc, l.barcode_x, y as i64);
                            y += bc.height() as i32 + l.barcode_gap;
                        }
                        Err(e) => {
                            warn!(upc, error = %e, "barcode fallback");
                            self.fonts.regular.draw(
                                &mut canvas,
                                l.barcode_x as i32,
                                y,
                                BARCODE_ERROR_TEXT,
                                BLACK,
                            );
                            y += l.barcode_error_advance;
                            warnings.push(RenderWarning::BarcodeFallback {
                                upc: upc.to_string(),
                                reason: e.to_string(),
                            });
                        }
                    }
                }
                TemplateLine::Text(raw) => {
                    let text = tokens.substitute(raw);
                    let face = if idx == 0 {
                        &self.fonts.bold
                    } else {
                        &self.fonts.regular
                    };
                    face.draw(&mut canvas, l.text_x, y, &text, BLACK);
                    y += l.line_height;
                }
            }
        }

        if let Some(lot) = tokens.non_empty(LabelToken::Lot) {
            let (w, _) = self.fonts.bold.measure(lot);
            let x = l.width as i32 - w as i32 - l.lot_margin;
            self.fonts.bold.draw(&mut canvas, x, l.top, lot, BLACK);
        }

        RenderedLabel {
            image: DynamicImage::ImageRgba8(canvas).to_rgb8(),
            warnings,
        }
    }

    /// Render and write a PNG in one step
    pub fn render_to_path(
        &self,
        template: &str,
        tokens: &TokenMap,
        path: impl AsRef<Path>,
    ) -> PrintResult<RenderedLabel> {
        let label = self.render(template, tokens);
        label.save(path)?;
        Ok(label)
    }

    fn draw_logo(&self, canvas: &mut RgbaImage, path: &Path) -> Result<(), String> {
        if !path.is_file() {
            return Err("file not found".to_string());
        }
        let logo = image::open(path).map_err(|e| e.to_string())?;
        let max = self.layout.logo_box;
        // Shrink only, never enlarge
        let logo = if logo.width() > max || logo.height() > max {
            logo.resize(max, max, FilterType::Triangle)
        } else {
            logo
        };
        let (x, y) = self.layout.logo_origin;
        imageops::overlay(canvas, &logo.to_rgba8(), x, y);
        Ok(())
    }

    fn fit_barcode(&self, upc: &str) -> PrintResult<RgbaImage> {
        let raw = barcode_image(upc, &self.fonts)?;
        let (max_w, max_h) = self.layout.barcode_box;
        if raw.width() <= max_w && raw.height() <= max_h {
            return Ok(raw);
        }
        Ok(DynamicImage::ImageRgba8(raw)
            .resize(max_w, max_h, FilterType::Triangle)
            .to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> LabelRenderer {
        LabelRenderer::new(LabelFonts::fallback(), LabelLayout::print())
    }

    fn tokens() -> TokenMap {
        let mut map = TokenMap::new();
        map.set(LabelToken::Description, "Whole Turkey")
            .set(LabelToken::Upc, "01234567890")
            .set(LabelToken::Weight, "3.250")
            .set(LabelToken::Price, "6.47");
        map
    }

    const TEMPLATE: &str = "{{DESCRIPTION}}\n{{UPC}}\n{{UPC_BARCODE}}\nWeight: {{WEIGHT}} lb\nPrice: ${{PRICE}}";

    #[test]
    fn test_render_size_and_background() {
        let label = renderer().render(TEMPLATE, &tokens());
        assert_eq!(label.image.dimensions(), (600, 400));
        assert_eq!(label.image.get_pixel(599, 399).0, [255, 255, 255]);
        assert!(label.warnings.is_empty());
    }

    #[test]
    fn test_preview_size() {
        let label = renderer()
            .with_layout(LabelLayout::preview())
            .render(TEMPLATE, &tokens());
        assert_eq!(label.image.dimensions(), (400, 300));
    }

    #[test]
    fn test_render_is_idempotent() {
        let r = renderer();
        let a = r.render(TEMPLATE, &tokens()).png_bytes().unwrap();
        let b = r.render(TEMPLATE, &tokens()).png_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_tokenless_template_ignores_map() {
        let r = renderer();
        let template = "STATIC LINE\nAnother line";
        let a = r.render(template, &TokenMap::new()).png_bytes().unwrap();
        let b = r.render(template, &tokens()).png_bytes().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_substitution_changes_output() {
        let r = renderer();
        let mut other = tokens();
        other.set(LabelToken::Weight, "9.999");
        let a = r.render(TEMPLATE, &tokens()).png_bytes().unwrap();
        let b = r.render(TEMPLATE, &other).png_bytes().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_upc_falls_back_to_text() {
        let mut map = tokens();
        map.set(LabelToken::Upc, "12AB");
        let label = renderer().render("{{UPC_BARCODE}}", &map);
        assert!(matches!(
            label.warnings.as_slice(),
            [RenderWarning::BarcodeFallback { upc, .. }] if upc == "12AB"
        ));

        // The error text is what got drawn: same pixels as rendering it as plain text
        let fonts = LabelFonts::fallback();
        let mut expected = RgbaImage::from_pixel(600, 400, WHITE);
        fonts
            .regular
            .draw(&mut expected, 10, 10, BARCODE_ERROR_TEXT, BLACK);
        assert_eq!(label.image, DynamicImage::ImageRgba8(expected).to_rgb8());
    }

    #[test]
    fn test_barcode_fits_box() {
        let r = renderer();
        let bc = r.fit_barcode("01234567890").unwrap();
        assert!(bc.width() <= 180 && bc.height() <= 60);
    }

    #[test]
    fn test_missing_logo_is_skipped() {
        let mut map = tokens();
        map.set(LabelToken::LogoPath, "/definitely/not/here.png");
        let label = renderer().render(TEMPLATE, &map);
        assert!(matches!(
            label.warnings.as_slice(),
            [RenderWarning::LogoSkipped { .. }]
        ));
        // Identical to no logo at all
        let plain = renderer().render(TEMPLATE, &tokens());
        assert_eq!(label.image, plain.image);
    }

    #[test]
    fn test_logo_is_shrunk_and_drawn() {
        let dir = tempfile::tempdir().unwrap();
        let logo_path = dir.path().join("logo.png");
        RgbImage::from_pixel(200, 100, image::Rgb([255, 0, 0]))
            .save(&logo_path)
            .unwrap();

        let mut map = TokenMap::new();
        map.set(LabelToken::LogoPath, logo_path.to_string_lossy());
        let label = renderer().render("", &map);
        assert!(label.warnings.is_empty());
        // 200x100 -> 80x40 at (10,10)
        let [r, g, _] = label.image.get_pixel(50, 30).0;
        assert!(r > 200 && g < 50);
        assert_eq!(label.image.get_pixel(50, 60).0, [255, 255, 255]);
        assert_eq!(label.image.get_pixel(95, 30).0, [255, 255, 255]);
    }

    #[test]
    fn test_lot_drawn_top_right() {
        let mut map = TokenMap::new();
        map.set(LabelToken::Lot, "L42");
        let label = renderer().render("", &map);
        let dark_right = (400..600)
            .flat_map(|x| (10..30).map(move |y| (x, y)))
            .any(|(x, y)| label.image.get_pixel(x, y).0 == [0, 0, 0]);
        assert!(dark_right);
    }

    #[test]
    fn test_render_to_path_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label.png");
        renderer()
            .render_to_path(TEMPLATE, &tokens(), &path)
            .unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_render_to_bad_dir_fails() {
        let err = renderer()
            .render_to_path(TEMPLATE, &tokens(), "/no/such/dir/label.png")
            .unwrap_err();
        assert!(matches!(err, crate::PrintError::Render(_)));
    }
}
