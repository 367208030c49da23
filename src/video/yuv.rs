//! YUV420P ⇄ RGB (BT.601 全范围, 定点运算)

/// 平面布局
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaneLayout {
    pub width: usize,
    pub height: usize,
    pub y_stride: usize,
    pub uv_stride: usize,
}

impl PlaneLayout {
    /// 紧凑布局 (stride == 宽度)
    pub fn packed(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            y_stride: width,
            uv_stride: width.div_ceil(2),
        }
    }

    pub fn chroma_height(&self) -> usize {
        self.height.div_ceil(2)
    }

    /// 最小平面长度 (y, u/v)
    pub fn plane_lens(&self) -> (usize, usize) {
        (
            self.y_stride * self.height,
            self.uv_stride * self.chroma_height(),
        )
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.y_stride >= self.width
            && self.uv_stride >= self.width.div_ceil(2)
    }
}

#[inline]
fn to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as i32;
    let u = u as i32 - 128;
    let v = v as i32 - 128;
    [
        (y + ((v * 179) >> 7)).clamp(0, 255) as u8,
        (y - ((u * 44) >> 7) - ((v * 91) >> 7)).clamp(0, 255) as u8,
        (y + ((u * 227) >> 7)).clamp(0, 255) as u8,
    ]
}

#[inline]
fn luma(rgb: &[u8]) -> u8 {
    let (r, g, b) = (rgb[0] as i32, rgb[1] as i32, rgb[2] as i32);
    ((77 * r + 150 * g + 29 * b + 128) >> 8).clamp(0, 255) as u8
}

#[inline]
fn chroma(r: i32, g: i32, b: i32) -> (u8, u8) {
    let u = ((-43 * r - 85 * g + 128 * b + 128) >> 8) + 128;
    let v = ((128 * r - 107 * g - 21 * b + 128) >> 8) + 128;
    (u.clamp(0, 255) as u8, v.clamp(0, 255) as u8)
}

/// YUV420P → 紧凑 RGB24, `rgb.len() == width * height * 3`
pub fn yuv420p_to_rgb(y: &[u8], u: &[u8], v: &[u8], layout: &PlaneLayout, rgb: &mut [u8]) {
    let mut out_idx = 0;
    for row in 0..layout.height {
        let y_row = row * layout.y_stride;
        let uv_row = (row >> 1) * layout.uv_stride;
        for x in 0..layout.width {
            let px = to_rgb(y[y_row + x], u[uv_row + (x >> 1)], v[uv_row + (x >> 1)]);
            rgb[out_idx..out_idx + 3].copy_from_slice(&px);
            out_idx += 3;
        }
    }
}

/// 把 `rgb` 中相对 `original` 有变化的 2x2 块写回 YUV 平面.
///
/// Untouched blocks keep their exact source samples. Returns the number of
/// blocks written.
pub fn write_changed_blocks(
    rgb: &[u8],
    original: &[u8],
    layout: &PlaneLayout,
    y: &mut [u8],
    u: &mut [u8],
    v: &mut [u8],
) -> usize {
    let (w, h) = (layout.width, layout.height);
    let mut written = 0;
    for by in 0..layout.chroma_height() {
        for bx in 0..w.div_ceil(2) {
            let rows = (by * 2)..((by * 2 + 2).min(h));
            let cols = (bx * 2)..((bx * 2 + 2).min(w));

            let changed = rows.clone().any(|row| {
                let span = (row * w + cols.start) * 3..(row * w + cols.end) * 3;
                rgb[span.clone()] != original[span]
            });
            if !changed {
                continue;
            }

            let (mut r, mut g, mut b, mut n) = (0, 0, 0, 0);
            for row in rows {
                for col in cols.clone() {
                    let idx = (row * w + col) * 3;
                    let px = &rgb[idx..idx + 3];
                    y[row * layout.y_stride + col] = luma(px);
                    r += px[0] as i32;
                    g += px[1] as i32;
                    b += px[2] as i32;
                    n += 1;
                }
            }
            let (cu, cv) = chroma(r / n, g / n, b / n);
            u[by * layout.uv_stride + bx] = cu;
            v[by * layout.uv_stride + bx] = cv;
            written += 1;
        }
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    fn planes(layout: &PlaneLayout, yv: u8, uv: u8, vv: u8) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let (ly, luv) = layout.plane_lens();
        (vec![yv; ly], vec![uv; luv], vec![vv; luv])
    }

    #[test]
    fn gray_converts_to_gray() {
        let layout = PlaneLayout::packed(4, 2);
        let (y, u, v) = planes(&layout, 100, 128, 128);
        let mut rgb = vec![0; 4 * 2 * 3];
        yuv420p_to_rgb(&y, &u, &v, &layout, &mut rgb);
        assert!(rgb.iter().all(|&c| c == 100));
    }

    #[test]
    fn primaries_survive_a_round_trip() {
        for color in [[255u8, 0, 0], [0, 255, 0], [0, 0, 255], [255, 255, 255], [20, 20, 20]] {
            let layout = PlaneLayout::packed(2, 2);
            let (mut y, mut u, mut v) = planes(&layout, 0, 128, 128);
            let original = vec![0u8; 12];
            let rgb: Vec<u8> = color.iter().copied().cycle().take(12).collect();
            assert_eq!(write_changed_blocks(&rgb, &original, &layout, &mut y, &mut u, &mut v), 1);

            let mut back = vec![0; 12];
            yuv420p_to_rgb(&y, &u, &v, &layout, &mut back);
            for (a, b) in back.iter().zip(rgb.iter()) {
                assert!((*a as i32 - *b as i32).abs() <= 4, "{:?} → {:?}", color, &back[..3]);
            }
        }
    }

    #[test]
    fn unchanged_blocks_keep_source_samples() {
        let layout = PlaneLayout {
            width: 5,
            height: 3,
            y_stride: 8,
            uv_stride: 4,
        };
        assert!(layout.is_valid());
        let (mut y, mut u, mut v) = planes(&layout, 77, 90, 160);
        for (i, s) in y.iter_mut().enumerate() {
            *s = (i * 7 % 251) as u8;
        }
        let (y0, u0, v0) = (y.clone(), u.clone(), v.clone());

        let mut original = vec![0; 5 * 3 * 3];
        yuv420p_to_rgb(&y, &u, &v, &layout, &mut original);
        let mut rgb = original.clone();
        // 改动 (4, 2): 右下角的不完整块
        let idx = (2 * 5 + 4) * 3;
        rgb[idx..idx + 3].copy_from_slice(&[255, 255, 255]);

        let written = write_changed_blocks(&rgb, &original, &layout, &mut y, &mut u, &mut v);
        assert_eq!(written, 1);
        assert_eq!(y[2 * 8 + 4], 255);
        for (i, (a, b)) in y.iter().zip(y0.iter()).enumerate() {
            if i != 2 * 8 + 4 {
                assert_eq!(a, b, "luma sample {} changed", i);
            }
        }
        let changed_uv: Vec<usize> = (0..u.len()).filter(|&i| u[i] != u0[i] || v[i] != v0[i]).collect();
        assert_eq!(changed_uv, vec![4 + 2]);
    }

    #[test]
    fn layout_validation() {
        assert!(PlaneLayout::packed(3, 3).is_valid());
        assert_eq!(PlaneLayout::packed(3, 3).plane_lens(), (9, 4));
        let bad = PlaneLayout {
            width: 8,
            height: 2,
            y_stride: 4,
            uv_stride: 4,
        };
        assert!(!bad.is_valid());
    }
}
