//! 模型统一接口与实现
//!
//! ## Model Trait
//! 统一的模型接口，定义标准流程: preprocess → run → postprocess
//!
//! ```text
//! RgbImage → preprocess → NCHW 张量
//!          ↓
//!     ONNX Runtime run
//!          ↓
//!     原始输出 → postprocess → Vec<BBox> (原图坐标)
//! ```
use anyhow::Result;
use image::RgbImage;
use ndarray::{Array, IxDyn};

use crate::detection::tracker::compute_iou;
use crate::detection::{BBox, LabelTable};

pub mod yolov8; // YOLOv8 完整模型 + 实现 Model trait

pub use yolov8::{YOLOv8, YOLOv8Config};

/// 统一的深度学习模型接口
pub trait Model: Send {
    /// 预处理: 图片 → NCHW 张量
    fn preprocess(&mut self, image: &RgbImage) -> Result<Array<f32, IxDyn>>;

    /// 推理: 执行模型前向传播, 返回原始输出 (未解码)
    fn run(&mut self, xs: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>>;

    /// 后处理: 原始输出 → 检测框
    ///
    /// `image` is the source frame the boxes are scaled back to.
    fn postprocess(&self, ys: Array<f32, IxDyn>, image: &RgbImage) -> Result<Vec<BBox>>;

    /// 完整的推理流程: preprocess → run → postprocess
    fn forward(&mut self, image: &RgbImage) -> Result<Vec<BBox>> {
        let xs = self.preprocess(image)?;
        let ys = self.run(xs)?;
        self.postprocess(ys, image)
    }

    /// 模型输出的类别名称表
    fn labels(&self) -> &LabelTable;

    /// 打印模型信息
    fn summary(&self);
}

/// 非极大值抑制 (按置信度降序, 保留顺序即输出顺序)
pub fn non_max_suppression(xs: &mut Vec<BBox>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence.total_cmp(&b1.confidence));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            let iou = compute_iou(&xs[prev_index], &xs[index]);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_keeps_best_of_overlapping_boxes() {
        let mut boxes = vec![
            BBox::new(0.0, 0.0, 10.0, 10.0, 0.7, 24),
            BBox::new(1.0, 1.0, 11.0, 11.0, 0.9, 24),
            BBox::new(50.0, 50.0, 60.0, 60.0, 0.8, 28),
        ];
        non_max_suppression(&mut boxes, 0.45);
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes[0].confidence, 0.9);
        assert_eq!(boxes[1].class_id, 28);
    }

    #[test]
    fn nms_on_empty_input() {
        let mut boxes = Vec::new();
        non_max_suppression(&mut boxes, 0.45);
        assert!(boxes.is_empty());
    }
}
