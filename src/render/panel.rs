//! 计数面板

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

use super::font::LabelFont;
use super::overlay::draw_text;
use super::PanelLayout;

/// 面板底色
pub const PANEL_BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

pub fn panel_line(category: &str, count: usize) -> String {
    format!("{}: {}", category.to_uppercase(), count)
}

/// Opaque white panel with one `"{CATEGORY}: {count}"` line per entry,
/// grown downward when the configured height cannot hold every line.
pub fn draw_count_panel<'a, I>(frame: &mut RgbImage, font: &LabelFont, layout: &PanelLayout, lines: I)
where
    I: IntoIterator<Item = (&'a str, usize, Rgb<u8>)>,
{
    let lines: Vec<_> = lines.into_iter().collect();
    let (x, y) = layout.origin;

    let descent = font.measure("Ag", layout.font_scale, 1).baseline;
    let last_baseline = layout.first_baseline + layout.line_spacing * lines.len().saturating_sub(1) as u32;
    let needed = last_baseline + descent + layout.padding;
    let height = layout.size.1.max(needed).max(1);
    let width = layout.size.0.max(1);
    draw_filled_rect_mut(frame, Rect::at(x, y).of_size(width, height), PANEL_BACKGROUND);

    for (i, (category, count, color)) in lines.into_iter().enumerate() {
        let baseline = y + (layout.first_baseline + layout.line_spacing * i as u32) as i32;
        draw_text(
            frame,
            font,
            &panel_line(category, count),
            (x + layout.padding as i32, baseline),
            layout.font_scale,
            layout.thickness,
            color,
        );
    }
}
