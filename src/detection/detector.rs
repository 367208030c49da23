//! 检测器 (Detector)
//! 职责: RgbImage → YOLO检测 → ByteTrack → TrackOutcome

use std::time::Instant;

use image::RgbImage;
use log::{debug, trace};

use super::{ByteTrackConfig, ByteTracker, LabelTable, TrackOutcome, TrackingDetector};
use crate::models::Model;

pub struct YoloTracker {
    model: Box<dyn Model>,
    tracker: ByteTracker,

    // 统计
    count: u64,
    inference_ms: f64,
    tracker_ms: f64,
}

impl YoloTracker {
    pub fn new(model: Box<dyn Model>, tracker_config: ByteTrackConfig) -> Self {
        Self {
            model,
            tracker: ByteTracker::new(tracker_config),
            count: 0,
            inference_ms: 0.0,
            tracker_ms: 0.0,
        }
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }
}

impl TrackingDetector for YoloTracker {
    fn track(&mut self, frame: &RgbImage) -> TrackOutcome {
        // 1. YOLO检测
        let t_inference = Instant::now();
        let boxes = match self.model.forward(frame) {
            Ok(boxes) => boxes,
            Err(e) => return TrackOutcome::Failed(e.context("detection failed")),
        };
        let inference_ms = t_inference.elapsed().as_secs_f64() * 1000.0;

        // 2. 跟踪
        let t_tracker = Instant::now();
        let tracked = self.tracker.update(&boxes);
        let tracker_ms = t_tracker.elapsed().as_secs_f64() * 1000.0;

        self.count += 1;
        self.inference_ms += inference_ms;
        self.tracker_ms += tracker_ms;
        trace!(
            "frame {}: {} boxes → {} tracks ({:.1}ms + {:.1}ms)",
            self.count,
            boxes.len(),
            tracked.len(),
            inference_ms,
            tracker_ms
        );

        if tracked.is_empty() {
            debug!("frame {}: no tracked objects", self.count);
            TrackOutcome::Untracked
        } else {
            TrackOutcome::Tracked(tracked)
        }
    }

    fn labels(&self) -> &LabelTable {
        self.model.labels()
    }

    fn mean_timings(&self) -> Option<(f64, f64)> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some((self.inference_ms / n, self.tracker_ms / n))
    }
}
