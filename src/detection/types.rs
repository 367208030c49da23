//! 检测/跟踪数据结构定义
//! Data structures shared by the detector, tracker and annotator

// ========== 数据结构 ==========

/// 检测框 (Detection bounding box), source frame pixel coordinates
#[derive(Clone, Debug, PartialEq)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: u32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: u32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            confidence,
            class_id,
        }
    }

    /// Build from a center/size box, as emitted by YOLO heads.
    pub fn from_cxcywh(cx: f32, cy: f32, w: f32, h: f32, confidence: f32, class_id: u32) -> Self {
        Self::new(
            cx - w / 2.0,
            cy - h / 2.0,
            cx + w / 2.0,
            cy + h / 2.0,
            confidence,
            class_id,
        )
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Integer pixel corners, truncated toward zero like `int(x)`.
    pub fn corners(&self) -> (i32, i32, i32, i32) {
        (
            self.x1 as i32,
            self.y1 as i32,
            self.x2 as i32,
            self.y2 as i32,
        )
    }
}

/// 单帧中的一个目标观测
///
/// `track_id` is `None` while the tracker has not associated the box with
/// an identity yet.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub track_id: Option<u32>,
}

impl Detection {
    pub fn new(bbox: BBox, track_id: Option<u32>) -> Self {
        Self { bbox, track_id }
    }

    pub fn class_id(&self) -> u32 {
        self.bbox.class_id
    }

    pub fn confidence(&self) -> f32 {
        self.bbox.confidence
    }
}

/// 检测器单帧调用结果
///
/// The caller branches on this instead of catching failures: a failed call
/// skips the frame, an untracked frame is forwarded without annotation.
#[derive(Debug)]
pub enum TrackOutcome {
    /// Detections for this frame, left-to-right in detector order.
    Tracked(Vec<Detection>),
    /// The tracker produced no identities for this frame.
    Untracked,
    /// The detect/track call failed for this frame only.
    Failed(anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cxcywh_round_trips_to_corners() {
        let b = BBox::from_cxcywh(50.0, 40.0, 20.0, 10.0, 0.9, 24);
        assert_eq!(b.corners(), (40, 35, 60, 45));
        assert_eq!(b.center(), (50.0, 40.0));
        assert_eq!(b.area(), 200.0);
    }

    #[test]
    fn inverted_box_has_no_area() {
        let b = BBox::new(10.0, 10.0, 5.0, 5.0, 0.5, 0);
        assert_eq!(b.area(), 0.0);
    }

    #[test]
    fn corners_truncate() {
        let b = BBox::new(10.9, 20.2, 30.7, 40.99, 0.5, 0);
        assert_eq!(b.corners(), (10, 20, 30, 40));
    }
}
