//! 多目标跟踪公共组件
//! Common components for multi-object tracking

use super::types::BBox;

// ========== 卡尔曼滤波器 ==========

/// 简化卡尔曼滤波器 (匀速模型, 对角协方差)
/// 状态向量: [cx, cy, w, h, vx, vy, vw, vh]
#[derive(Clone, Debug)]
pub struct KalmanBoxFilter {
    state: [f32; 8],
    /// 估计误差协方差 (对角)
    p: [f32; 8],
    /// 过程噪声
    q: f32,
    /// 观测噪声
    r: f32,
}

impl KalmanBoxFilter {
    /// - `q`: 过程噪声 (0.1-1.0, 越小越平滑)
    /// - `r`: 观测噪声 (越大越信任预测)
    pub fn new(bbox: &BBox, q: f32, r: f32) -> Self {
        let (cx, cy) = bbox.center();
        Self {
            state: [cx, cy, bbox.width(), bbox.height(), 0.0, 0.0, 0.0, 0.0],
            p: [10.0; 8],
            q,
            r,
        }
    }

    /// 预测下一帧状态
    pub fn predict(&mut self) {
        for i in 0..4 {
            self.state[i] += self.state[i + 4];
        }
        // 尺寸不能为负
        self.state[2] = self.state[2].max(1.0);
        self.state[3] = self.state[3].max(1.0);
        for p in &mut self.p {
            *p += self.q;
        }
    }

    /// 融合观测值
    pub fn update(&mut self, bbox: &BBox) {
        let (cx, cy) = bbox.center();
        let z = [cx, cy, bbox.width(), bbox.height()];

        for i in 0..4 {
            let residual = z[i] - self.state[i];

            let k = self.p[i] / (self.p[i] + self.r);
            self.state[i] += k * residual;
            self.p[i] *= 1.0 - k;

            // 速度项观测噪声更大,收敛更慢
            let kv = self.p[i + 4] / (self.p[i + 4] + self.r * 10.0);
            self.state[i + 4] += kv * residual;
            self.p[i + 4] *= 1.0 - kv;
        }
    }

    /// 当前状态对应的边界框, 保留 `template` 的类别与置信度.
    ///
    /// Between [`predict`](Self::predict) and [`update`](Self::update) this is
    /// the prediction for the current frame.
    pub fn state_bbox(&self, template: &BBox) -> BBox {
        Self::to_bbox(&self.state[..4], template)
    }

    pub fn velocity(&self) -> (f32, f32) {
        (self.state[4], self.state[5])
    }

    fn to_bbox(s: &[f32], template: &BBox) -> BBox {
        let w = s[2].max(1.0);
        let h = s[3].max(1.0);
        BBox::from_cxcywh(s[0], s[1], w, h, template.confidence, template.class_id)
    }
}

// ========== 工具函数 ==========

/// 计算两个边界框的IOU (Intersection over Union)
pub fn compute_iou(bbox1: &BBox, bbox2: &BBox) -> f32 {
    let x1 = bbox1.x1.max(bbox2.x1);
    let y1 = bbox1.y1.max(bbox2.y1);
    let x2 = bbox1.x2.min(bbox2.x2);
    let y2 = bbox1.y2.min(bbox2.y2);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let intersection = (x2 - x1) * (y2 - y1);
    let union = bbox1.area() + bbox2.area() - intersection;

    if union <= 0.0 {
        return 0.0;
    }

    intersection / union
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bbox(x1: f32, y1: f32, x2: f32, y2: f32) -> BBox {
        BBox::new(x1, y1, x2, y2, 0.9, 24)
    }

    #[test]
    fn iou_of_identical_boxes_is_one() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        assert_relative_eq!(compute_iou(&a, &a), 1.0);
    }

    #[test]
    fn iou_of_half_overlap() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(5.0, 0.0, 15.0, 10.0);
        // 50 / (100 + 100 - 50)
        assert_relative_eq!(compute_iou(&a, &b), 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn disjoint_boxes_have_zero_iou() {
        let a = bbox(0.0, 0.0, 10.0, 10.0);
        let b = bbox(20.0, 20.0, 30.0, 30.0);
        assert_eq!(compute_iou(&a, &b), 0.0);
    }

    #[test]
    fn filter_follows_constant_motion() {
        let mut kf = KalmanBoxFilter::new(&bbox(0.0, 0.0, 10.0, 10.0), 0.1, 0.5);
        for step in 1..=20 {
            kf.predict();
            let dx = step as f32 * 2.0;
            kf.update(&bbox(dx, 0.0, dx + 10.0, 10.0));
        }
        let (vx, vy) = kf.velocity();
        assert!((vx - 2.0).abs() < 0.5, "vx = {}", vx);
        assert!(vy.abs() < 0.5, "vy = {}", vy);

        let template = bbox(0.0, 0.0, 1.0, 1.0);
        let state = kf.state_bbox(&template);
        assert!((state.x1 - 40.0).abs() < 1.5, "x1 = {}", state.x1);
        assert_eq!(state.class_id, 24);
        kf.predict();
        let predicted = kf.state_bbox(&template);
        assert!(predicted.x1 > state.x1);
        assert_relative_eq!(predicted.center().0, state.center().0 + vx, epsilon = 1e-3);
    }
}
