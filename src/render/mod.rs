//! 叠加层绘制 (Overlay rendering)
//!
//! - overlay: 圆角框 + 带底色标签
//! - panel:   左上角计数面板
//! - font:    内置字体与文本度量
use serde::{Deserialize, Serialize};

pub mod font;
pub mod overlay;
pub mod panel;

pub use font::{LabelFont, TextMetrics};
pub use overlay::{draw_box, draw_box_two_tone, draw_label, draw_text};
pub use panel::{draw_count_panel, panel_line};

/// 检测框样式
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub line_thickness: u32,
    pub corner_thickness: u32,
    pub corner_radius: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            line_thickness: 2,
            corner_thickness: 6,
            corner_radius: 20,
        }
    }
}

/// 标签样式, 基线位于框顶上方 `offset` 像素
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelStyle {
    pub font_scale: f32,
    pub thickness: u32,
    pub offset: i32,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_scale: 1.0,
            thickness: 2,
            offset: 10,
        }
    }
}

/// 计数面板布局
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelLayout {
    /// 左上角
    pub origin: (i32, i32),
    /// 最小尺寸 (宽, 高)
    pub size: (u32, u32),
    /// 第一行基线相对面板顶部
    pub first_baseline: u32,
    pub line_spacing: u32,
    pub font_scale: f32,
    pub thickness: u32,
    /// 左边距
    pub padding: u32,
}

impl Default for PanelLayout {
    fn default() -> Self {
        Self {
            origin: (0, 0),
            size: (400, 220),
            first_baseline: 50,
            line_spacing: 50,
            font_scale: 1.5,
            thickness: 2,
            padding: 10,
        }
    }
}
