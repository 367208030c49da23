// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 完整模型实现
// 包含: 模型加载、预处理、推理、后处理

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use fast_image_resize as fr;
use image::RgbImage;
use log::{info, warn};
use ndarray::{s, Array, ArrayViewD, Axis, IxDyn};
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;

use super::{non_max_suppression, Model};
use crate::detection::{BBox, LabelTable};

const CXYWH_OFFSET: usize = 4;
/// 填充色 (与 Ultralytics letterbox 一致)
const LETTERBOX_FILL: f32 = 144.0 / 255.0;

/// YOLOv8 模型参数
#[derive(Clone, Debug)]
pub struct YOLOv8Config {
    pub model: PathBuf,
    /// 置信度下限 (低于此值的框不送入跟踪器)
    pub conf: f32,
    pub iou: f32,
    /// 正方形输入边长
    pub input_size: u32,
    pub cuda: bool,
    pub device_id: i32,
    pub intra_threads: usize,
}

impl Default for YOLOv8Config {
    fn default() -> Self {
        Self {
            model: PathBuf::from("yolov8n.onnx"),
            conf: 0.10,
            iou: 0.45,
            input_size: 640,
            cuda: false,
            device_id: 0,
            intra_threads: 4,
        }
    }
}

/// YOLOv8 完整模型结构
pub struct YOLOv8 {
    session: Session,
    input_name: String,
    labels: LabelTable,
    config: YOLOv8Config,
    resizer: fr::Resizer,
}

impl YOLOv8 {
    /// 从配置创建 YOLOv8 模型
    pub fn new(config: YOLOv8Config) -> Result<Self> {
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?;
        if config.cuda {
            builder = builder.with_execution_providers([CUDAExecutionProvider::default()
                .with_device_id(config.device_id)
                .build()])?;
        }
        let session = builder
            .commit_from_file(&config.model)
            .with_context(|| format!("failed to load model {}", config.model.display()))?;

        let input_name = match session.inputs.first() {
            Some(input) => input.name.clone(),
            None => bail!("model {} has no inputs", config.model.display()),
        };

        // class names
        let names = session.metadata()?.custom("names")?;
        let labels = match names.as_deref().map(LabelTable::from_metadata) {
            Some(Ok(table)) => table,
            Some(Err(e)) => {
                warn!("unreadable class names in model metadata ({:#}), using COCO names", e);
                LabelTable::coco()
            }
            None => {
                info!("model carries no class names, using COCO names");
                LabelTable::coco()
            }
        };

        Ok(Self {
            session,
            input_name,
            labels,
            config,
            resizer: fr::Resizer::new(),
        })
    }

    pub fn config(&self) -> &YOLOv8Config {
        &self.config
    }
}

impl Model for YOLOv8 {
    fn preprocess(&mut self, image: &RgbImage) -> Result<Array<f32, IxDyn>> {
        let size = self.config.input_size;
        let (w0, h0) = image.dimensions();
        if w0 == 0 || h0 == 0 {
            bail!("empty frame {}x{}", w0, h0);
        }
        let (_, w_new, h_new) = scale_wh(w0 as f32, h0 as f32, size as f32, size as f32);
        let (w_new, h_new) = ((w_new as u32).max(1), (h_new as u32).max(1));

        // 缩放 (fast_image_resize, 双线性)
        let src_image =
            fr::images::Image::from_vec_u8(w0, h0, image.as_raw().clone(), fr::PixelType::U8x3)
                .context("source image layout")?;
        let mut dst_image = fr::images::Image::new(w_new, h_new, fr::PixelType::U8x3);
        self.resizer
            .resize(
                &src_image,
                &mut dst_image,
                &fr::ResizeOptions::new()
                    .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
            )
            .context("letterbox resize")?;

        // 左上角对齐, 其余填充
        let mut ys = Array::from_elem((1, 3, size as usize, size as usize), LETTERBOX_FILL);
        let (w_new, h_new) = (w_new as usize, h_new as usize);
        for (i, rgb) in dst_image.buffer().chunks_exact(3).enumerate() {
            let (x, y) = (i % w_new, i / w_new);
            if y >= h_new {
                break;
            }
            ys[[0, 0, y, x]] = rgb[0] as f32 / 255.0;
            ys[[0, 1, y, x]] = rgb[1] as f32 / 255.0;
            ys[[0, 2, y, x]] = rgb[2] as f32 / 255.0;
        }

        Ok(ys.into_dyn())
    }

    fn run(&mut self, xs: Array<f32, IxDyn>) -> Result<Array<f32, IxDyn>> {
        let tensor = Tensor::from_array(xs)?;
        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => tensor])?;
        let preds = outputs[0].try_extract_array::<f32>()?.into_owned();
        Ok(preds)
    }

    fn postprocess(&self, ys: Array<f32, IxDyn>, image: &RgbImage) -> Result<Vec<BBox>> {
        let size = self.config.input_size as f32;
        let (w0, h0) = (image.width() as f32, image.height() as f32);
        let ratio = (size / w0).min(size / h0);
        decode_predictions(ys.view(), ratio, (w0, h0), self.config.conf, self.config.iou)
    }

    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn summary(&self) {
        info!(
            "YOLOv8: {} | input {}x{} | {} classes | conf {:.2} iou {:.2} | {}",
            self.config.model.display(),
            self.config.input_size,
            self.config.input_size,
            self.labels.len(),
            self.config.conf,
            self.config.iou,
            if self.config.cuda {
                format!("CUDA:{}", self.config.device_id)
            } else {
                "CPU".to_string()
            }
        );
    }
}

fn scale_wh(w0: f32, h0: f32, w1: f32, h1: f32) -> (f32, f32, f32) {
    let r = (w1 / w0).min(h1 / h0);
    (r, (w0 * r).round(), (h0 * r).round())
}

/// 解码 `[1, 4 + nc, anchors]` 输出: argmax 类别 → 置信度下限 → 还原坐标 → NMS
pub fn decode_predictions(
    preds: ArrayViewD<'_, f32>,
    ratio: f32,
    (w0, h0): (f32, f32),
    conf: f32,
    iou: f32,
) -> Result<Vec<BBox>> {
    if preds.ndim() != 3 || preds.shape()[0] != 1 || preds.shape()[1] <= CXYWH_OFFSET {
        bail!("unexpected YOLOv8 output shape {:?}", preds.shape());
    }
    let nc = preds.shape()[1] - CXYWH_OFFSET;

    let mut data = Vec::new();
    let batch = preds.index_axis(Axis(0), 0);
    for pred in batch.axis_iter(Axis(1)) {
        let bbox = pred.slice(s![0..CXYWH_OFFSET]);
        let clss = pred.slice(s![CXYWH_OFFSET..CXYWH_OFFSET + nc]);

        let Some((id, &confidence)) = clss
            .iter()
            .enumerate()
            .reduce(|max, x| if x.1 > max.1 { x } else { max })
        else {
            continue;
        };

        if confidence < conf {
            continue;
        }

        let cx = bbox[0] / ratio;
        let cy = bbox[1] / ratio;
        let w = bbox[2] / ratio;
        let h = bbox[3] / ratio;
        data.push(BBox::new(
            (cx - w / 2.0).clamp(0.0, w0),
            (cy - h / 2.0).clamp(0.0, h0),
            (cx + w / 2.0).clamp(0.0, w0),
            (cy + h / 2.0).clamp(0.0, h0),
            confidence,
            id as u32,
        ));
    }

    non_max_suppression(&mut data, iou);
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// anchors 列: [cx, cy, w, h, cls0, cls1, cls2]
    fn output(anchors: &[[f32; 7]]) -> Array<f32, IxDyn> {
        let mut ys = Array::zeros((1, 7, anchors.len()));
        for (a, values) in anchors.iter().enumerate() {
            for (c, v) in values.iter().enumerate() {
                ys[[0, c, a]] = *v;
            }
        }
        ys.into_dyn()
    }

    #[test]
    fn decodes_and_rescales_boxes() {
        // 1280x720 源图缩放到 640: ratio 0.5
        let ys = output(&[[100.0, 100.0, 40.0, 20.0, 0.1, 0.8, 0.05]]);
        let boxes = decode_predictions(ys.view(), 0.5, (1280.0, 720.0), 0.15, 0.45).unwrap();
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert_eq!(b.class_id, 1);
        assert_relative_eq!(b.confidence, 0.8);
        assert_relative_eq!(b.x1, 160.0);
        assert_relative_eq!(b.y1, 180.0);
        assert_relative_eq!(b.x2, 240.0);
        assert_relative_eq!(b.y2, 220.0);
    }

    #[test]
    fn drops_low_confidence_and_clamps_to_frame() {
        let ys = output(&[
            [5.0, 5.0, 20.0, 20.0, 0.9, 0.0, 0.0],
            [300.0, 300.0, 10.0, 10.0, 0.1, 0.05, 0.12],
        ]);
        let boxes = decode_predictions(ys.view(), 1.0, (640.0, 640.0), 0.15, 0.45).unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].x1, 0.0);
        assert_eq!(boxes[0].y1, 0.0);
        assert_eq!(boxes[0].x2, 15.0);
    }

    #[test]
    fn rejects_wrong_rank() {
        let ys = Array::<f32, _>::zeros((7, 3)).into_dyn();
        assert!(decode_predictions(ys.view(), 1.0, (640.0, 640.0), 0.15, 0.45).is_err());
    }

    #[test]
    fn letterbox_scale_keeps_aspect() {
        let (r, w, h) = scale_wh(1280.0, 720.0, 640.0, 640.0);
        assert_relative_eq!(r, 0.5);
        assert_eq!((w, h), (640.0, 360.0));
    }
}
