//! 字体与文本度量

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use anyhow::{Context, Result};

/// DejaVu Sans, compiled in so rendering never depends on system fonts.
static DEJAVU_SANS: &[u8] = include_bytes!("../../assets/font/DejaVuSans.ttf");

/// Pixel height of the em box at `font_scale == 1.0`.
pub const PX_PER_FONT_SCALE: f32 = 30.0;

/// Rendered footprint of a single line of text, in whole pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextMetrics {
    pub width: u32,
    /// baseline 以上高度
    pub ascent: u32,
    /// baseline 以下深度
    pub baseline: u32,
}

#[derive(Clone, Debug)]
pub struct LabelFont {
    font: FontArc,
}

impl LabelFont {
    pub fn bundled() -> Result<Self> {
        let font = FontArc::try_from_slice(DEJAVU_SANS).context("bundled DejaVu Sans font")?;
        Ok(Self { font })
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = FontArc::try_from_vec(data).context("invalid font data")?;
        Ok(Self { font })
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    pub fn px_scale(&self, font_scale: f32) -> PxScale {
        PxScale::from(font_scale * PX_PER_FONT_SCALE)
    }

    /// Distance from the top of the layout box to the baseline, as used when
    /// positioning glyphs.
    pub fn baseline_offset(&self, font_scale: f32) -> i32 {
        self.font
            .as_scaled(self.px_scale(font_scale))
            .ascent()
            .round() as i32
    }

    /// 测量文本 (与 imageproc 排版一致: 逐字 advance + kerning)
    ///
    /// Strokes thickened by `thickness` widen the footprint by `thickness - 1`.
    pub fn measure(&self, text: &str, font_scale: f32, thickness: u32) -> TextMetrics {
        let scale = self.px_scale(font_scale);
        let scaled = self.font.as_scaled(scale);
        let ascent = scaled.ascent();

        let (mut w, mut right) = (0f32, 0f32);
        let (mut top, mut bottom) = (0f32, ascent - scaled.descent());
        let mut last = None;
        for c in text.chars() {
            let glyph_id = scaled.glyph_id(c);
            let glyph = glyph_id.with_scale_and_position(scale, point(w, ascent));
            w += scaled.h_advance(glyph_id);
            if let Some(g) = self.font.outline_glyph(glyph) {
                if let Some(last) = last {
                    w += scaled.kern(glyph_id, last);
                }
                last = Some(glyph_id);
                let bb = g.px_bounds();
                right = right.max(bb.max.x);
                top = top.min(bb.min.y);
                bottom = bottom.max(bb.max.y);
            }
        }

        let offset = ascent.round();
        TextMetrics {
            width: w.max(right).ceil() as u32 + thickness.saturating_sub(1),
            ascent: (offset - top).ceil() as u32,
            baseline: (bottom - offset).ceil().max(0.0) as u32,
        }
    }
}
