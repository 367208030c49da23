//! 单个检测的叠加层: 圆角框 + 带底色标签
//!
//! All drawing is clipped to the frame; coordinates outside it are fine.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::font::LabelFont;

/// 圆角框的四个角 (sx, sy 为角的外侧方向)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Corner {
    /// 180° → 270°
    TopLeft,
    /// 270° → 360°
    TopRight,
    /// 90° → 180°
    BottomLeft,
    /// 0° → 90°
    BottomRight,
}

impl Corner {
    fn outward(self) -> (i32, i32) {
        match self {
            Corner::TopLeft => (-1, -1),
            Corner::TopRight => (1, -1),
            Corner::BottomLeft => (-1, 1),
            Corner::BottomRight => (1, 1),
        }
    }
}

/// 圆角框, 直线与圆弧同色
pub fn draw_box(
    frame: &mut RgbImage,
    bbox: (i32, i32, i32, i32),
    color: Rgb<u8>,
    line_thickness: u32,
    corner_thickness: u32,
    corner_radius: u32,
) {
    draw_box_two_tone(
        frame,
        bbox,
        color,
        color,
        line_thickness,
        corner_thickness,
        corner_radius,
    );
}

/// 圆角框, 直线与圆弧分别着色
pub fn draw_box_two_tone(
    frame: &mut RgbImage,
    (x1, y1, x2, y2): (i32, i32, i32, i32),
    edge_color: Rgb<u8>,
    corner_color: Rgb<u8>,
    line_thickness: u32,
    corner_thickness: u32,
    corner_radius: u32,
) {
    let r = corner_radius as i32;

    // 直线段: 从角内缩 r
    draw_thick_hline(frame, x1 + r, x2 - r, y1, line_thickness, edge_color);
    draw_thick_hline(frame, x1 + r, x2 - r, y2, line_thickness, edge_color);
    draw_thick_vline(frame, x1, y1 + r, y2 - r, line_thickness, edge_color);
    draw_thick_vline(frame, x2, y1 + r, y2 - r, line_thickness, edge_color);

    // 四分之一圆弧: 圆心在角内 r 处
    let arcs = [
        (Corner::TopLeft, x1 + r, y1 + r),
        (Corner::TopRight, x2 - r, y1 + r),
        (Corner::BottomLeft, x1 + r, y2 - r),
        (Corner::BottomRight, x2 - r, y2 - r),
    ];
    for (corner, cx, cy) in arcs {
        draw_quarter_arc(frame, (cx, cy), r, corner_thickness, corner, corner_color);
    }
}

/// 带底色的文本标签, `anchor` 为文本基线左端
pub fn draw_label(
    frame: &mut RgbImage,
    font: &LabelFont,
    text: &str,
    (x, y): (i32, i32),
    font_scale: f32,
    thickness: u32,
    bg_color: Rgb<u8>,
    text_color: Rgb<u8>,
) {
    let m = font.measure(text, font_scale, thickness);
    if m.width > 0 {
        let top = y - m.ascent as i32 - m.baseline as i32;
        let height = m.ascent + 2 * m.baseline;
        draw_filled_rect_mut(frame, Rect::at(x, top).of_size(m.width, height), bg_color);
    }
    draw_text(frame, font, text, (x, y), font_scale, thickness, text_color);
}

/// 在基线 `(x, y)` 处绘制文本; thickness > 1 时水平错位重绘加粗
pub fn draw_text(
    frame: &mut RgbImage,
    font: &LabelFont,
    text: &str,
    (x, y): (i32, i32),
    font_scale: f32,
    thickness: u32,
    color: Rgb<u8>,
) {
    let scale = font.px_scale(font_scale);
    let top = y - font.baseline_offset(font_scale);
    for dx in 0..thickness.max(1) as i32 {
        draw_text_mut(frame, color, x + dx, top, scale, font.font(), text);
    }
}

fn draw_thick_hline(frame: &mut RgbImage, xa: i32, xb: i32, y: i32, thickness: u32, color: Rgb<u8>) {
    let t = thickness.max(1);
    let (left, right) = (xa.min(xb), xa.max(xb));
    let rect = Rect::at(left, y - (t / 2) as i32).of_size((right - left + 1) as u32, t);
    draw_filled_rect_mut(frame, rect, color);
}

fn draw_thick_vline(frame: &mut RgbImage, x: i32, ya: i32, yb: i32, thickness: u32, color: Rgb<u8>) {
    let t = thickness.max(1);
    let (top, bottom) = (ya.min(yb), ya.max(yb));
    let rect = Rect::at(x - (t / 2) as i32, top).of_size(t, (bottom - top + 1) as u32);
    draw_filled_rect_mut(frame, rect, color);
}

/// 圆环扇区扫描: 距圆心 r ± t/2 且位于该角外侧象限的像素
fn draw_quarter_arc(
    frame: &mut RgbImage,
    (cx, cy): (i32, i32),
    radius: i32,
    thickness: u32,
    corner: Corner,
    color: Rgb<u8>,
) {
    let half = thickness.max(1) as f32 / 2.0;
    let (inner, outer) = ((radius as f32 - half).max(0.0), radius as f32 + half);
    let reach = outer.ceil() as i32;
    let (sx, sy) = corner.outward();
    let (w, h) = (frame.width() as i32, frame.height() as i32);

    for dy in 0..=reach {
        for dx in 0..=reach {
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            if d < inner || d > outer {
                continue;
            }
            let (px, py) = (cx + sx * dx, cy + sy * dy);
            if (0..w).contains(&px) && (0..h).contains(&py) {
                frame.put_pixel(px as u32, py as u32, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
    const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
    const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

    fn frame() -> RgbImage {
        RgbImage::from_pixel(200, 160, BLACK)
    }

    #[test]
    fn edges_are_inset_by_radius() {
        let mut img = frame();
        draw_box(&mut img, (20, 20, 120, 100), GREEN, 2, 6, 20);

        // 直线中点
        assert_eq!(*img.get_pixel(70, 20), GREEN);
        assert_eq!(*img.get_pixel(70, 100), GREEN);
        assert_eq!(*img.get_pixel(20, 60), GREEN);
        assert_eq!(*img.get_pixel(120, 60), GREEN);
        // 直角处不画, 框内不填充
        assert_eq!(*img.get_pixel(20, 20), BLACK);
        assert_eq!(*img.get_pixel(120, 100), BLACK);
        assert_eq!(*img.get_pixel(70, 60), BLACK);
    }

    #[test]
    fn arcs_span_outward_quadrants() {
        let mut img = frame();
        draw_box(&mut img, (20, 20, 120, 100), GREEN, 2, 6, 20);

        // 45° 方向上的弧点: 圆心 ± r/√2
        let o = (20.0 / 2f32.sqrt()).round() as u32;
        assert_eq!(*img.get_pixel(40 - o, 40 - o), GREEN);
        assert_eq!(*img.get_pixel(100 + o, 40 - o), GREEN);
        assert_eq!(*img.get_pixel(40 - o, 80 + o), GREEN);
        assert_eq!(*img.get_pixel(100 + o, 80 + o), GREEN);
        // 弧只在外侧象限: 左上圆心的右下方向不画
        assert_eq!(*img.get_pixel(40 + o, 40 + o), BLACK);
        assert_eq!(*img.get_pixel(40, 40), BLACK);
    }

    #[test]
    fn corner_thickness_is_respected() {
        let mut img = frame();
        draw_box(&mut img, (20, 20, 120, 100), GREEN, 2, 6, 20);
        // 左上圆弧最左点 (20, 40), 厚度 6 → x ∈ [17, 23]
        assert_eq!(*img.get_pixel(17, 40), GREEN);
        assert_eq!(*img.get_pixel(23, 40), GREEN);
        assert_eq!(*img.get_pixel(15, 40), BLACK);
        assert_eq!(*img.get_pixel(25, 40), BLACK);
    }

    #[test]
    fn two_tone_box_colors_edges_and_corners_separately() {
        let mut img = frame();
        draw_box_two_tone(&mut img, (20, 20, 120, 100), WHITE, GREEN, 2, 6, 20);
        assert_eq!(*img.get_pixel(70, 20), WHITE);
        assert_eq!(*img.get_pixel(17, 40), GREEN);
    }

    #[test]
    fn drawing_off_frame_is_clipped() {
        let mut img = frame();
        draw_box(&mut img, (-50, -50, 400, 300), GREEN, 2, 6, 20);
        draw_box(&mut img, (150, 120, 60, 40), GREEN, 2, 6, 80);
        let font = LabelFont::bundled().unwrap();
        draw_label(&mut img, &font, "suitcase ID3", (180, 5), 1.0, 2, GREEN, WHITE);
    }

    #[test]
    fn label_background_contains_text() {
        let mut img = frame();
        let font = LabelFont::bundled().unwrap();
        let (x, y) = (30, 80);
        draw_label(&mut img, &font, "backpack ID5", (x, y), 1.0, 2, GREEN, WHITE);

        let m = font.measure("backpack ID5", 1.0, 2);
        let (left, right) = (x, x + m.width as i32);
        let (top, bottom) = (y - (m.ascent + m.baseline) as i32, y + m.baseline as i32);

        let mut text_pixels = 0;
        for (px, py, p) in img.enumerate_pixels() {
            if *p == BLACK {
                continue;
            }
            let (px, py) = (px as i32, py as i32);
            assert!(
                px >= left && px < right && py >= top && py < bottom,
                "pixel ({}, {}) outside label footprint",
                px,
                py
            );
            if *p != GREEN {
                text_pixels += 1;
            }
        }
        assert!(text_pixels > 0);
        // 背景从 (x, y - ascent - baseline) 开始
        assert_eq!(*img.get_pixel(x as u32, top as u32), GREEN);
    }

    #[test]
    fn text_sits_on_baseline() {
        let mut img = frame();
        let font = LabelFont::bundled().unwrap();
        draw_text(&mut img, &font, "H", (40, 60), 1.0, 1, WHITE);
        let rows: Vec<u32> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| **p != BLACK)
            .map(|(_, y, _)| y)
            .collect();
        let lowest = rows.iter().max().copied().unwrap();
        // "H" 无下伸部, 底部贴近基线
        assert!((58..=60).contains(&lowest), "lowest row {}", lowest);
    }
}
