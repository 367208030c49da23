//! 单帧标注: 过滤 → 绘制 → 计数 → 面板
//!
//! Detections are visited left to right. A detection is drawn and credited
//! only if its label is a target category and its confidence is strictly
//! above the threshold. Frames where the tracker attached no identity to some
//! detection are left untouched.

use anyhow::Result;
use image::{Rgb, RgbImage};
use log::{trace, warn};

use crate::config::TallyConfig;
use crate::counting::CountReconciler;
use crate::detection::{Detection, LabelTable};
use crate::render::{
    draw_box_two_tone, draw_count_panel, draw_label, LabelFont, LabelStyle, OverlayStyle,
    PanelLayout,
};

/// 标签文字颜色
pub const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// 目标类别及其显示颜色
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub color: Rgb<u8>,
}

impl Target {
    pub fn new(name: impl Into<String>, color: Rgb<u8>) -> Self {
        Self {
            name: name.into(),
            color,
        }
    }
}

/// 单帧标注结果
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnotationReport {
    /// false: 空帧或缺少跟踪ID, 原样输出
    pub annotated: bool,
    pub drawn: usize,
    /// 本帧新计入的ID数
    pub credited: usize,
    /// 类别表之外的索引
    pub unknown: usize,
}

pub struct FrameAnnotator {
    targets: Vec<Target>,
    threshold: f32,
    overlay: OverlayStyle,
    label: LabelStyle,
    panel: PanelLayout,
    edge_color: Option<Rgb<u8>>,
    font: LabelFont,
}

impl FrameAnnotator {
    pub fn new(targets: Vec<Target>, threshold: f32, font: LabelFont) -> Self {
        Self {
            targets,
            threshold,
            overlay: OverlayStyle::default(),
            label: LabelStyle::default(),
            panel: PanelLayout::default(),
            edge_color: None,
            font,
        }
    }

    pub fn from_config(config: &TallyConfig) -> Result<Self> {
        let targets = config.resolved_targets()?;
        let mut annotator = Self::new(targets, config.threshold, LabelFont::bundled()?)
            .with_overlay_style(config.overlay.clone())
            .with_label_style(config.label.clone())
            .with_panel_layout(config.panel.clone());
        annotator.edge_color = config.edge_color();
        Ok(annotator)
    }

    pub fn with_overlay_style(mut self, style: OverlayStyle) -> Self {
        self.overlay = style;
        self
    }

    pub fn with_label_style(mut self, style: LabelStyle) -> Self {
        self.label = style;
        self
    }

    pub fn with_panel_layout(mut self, layout: PanelLayout) -> Self {
        self.panel = layout;
        self
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// 每个目标类别一个空的去重集合
    pub fn new_reconciler(&self) -> CountReconciler {
        CountReconciler::new(self.targets.iter().map(|t| t.name.clone()))
    }

    pub fn target(&self, label: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == label)
    }

    /// 类别 + 置信度过滤 (严格大于阈值)
    pub fn passes(&self, label: &str, confidence: f32) -> bool {
        self.admit(label, confidence).is_some()
    }

    fn admit(&self, label: &str, confidence: f32) -> Option<&Target> {
        self.target(label).filter(|_| confidence > self.threshold)
    }

    /// Draws the overlays and count panel onto `frame` and credits new IDs.
    pub fn annotate(
        &self,
        frame: &mut RgbImage,
        detections: &[Detection],
        labels: &LabelTable,
        counts: &mut CountReconciler,
    ) -> AnnotationReport {
        let mut report = AnnotationReport::default();
        if detections.is_empty() || detections.iter().any(|d| d.track_id.is_none()) {
            return report;
        }
        report.annotated = true;

        for det in detections {
            let Some(track_id) = det.track_id else {
                continue;
            };
            let label = match labels.resolve(det.class_id()) {
                Ok(label) => label,
                Err(e) => {
                    warn!("skipping ID{}: {}", track_id, e);
                    report.unknown += 1;
                    continue;
                }
            };
            let Some(target) = self.admit(label, det.confidence()) else {
                trace!(
                    "{} ID{} filtered ({:.3}, threshold {:.2})",
                    label,
                    track_id,
                    det.confidence(),
                    self.threshold
                );
                continue;
            };

            let (x1, y1, x2, y2) = det.bbox.corners();
            draw_box_two_tone(
                frame,
                (x1, y1, x2, y2),
                self.edge_color.unwrap_or(target.color),
                target.color,
                self.overlay.line_thickness,
                self.overlay.corner_thickness,
                self.overlay.corner_radius,
            );
            draw_label(
                frame,
                &self.font,
                &format!("{} ID{}", label, track_id),
                (x1, y1 - self.label.offset),
                self.label.font_scale,
                self.label.thickness,
                target.color,
                LABEL_TEXT_COLOR,
            );
            report.drawn += 1;

            if counts.update_count(label, track_id) {
                trace!("{} ID{} credited", label, track_id);
                report.credited += 1;
            }
        }

        let lines = self
            .targets
            .iter()
            .map(|t| (t.name.as_str(), counts.count(&t.name), t.color));
        draw_count_panel(frame, &self.font, &self.panel, lines);

        report
    }
}
