//! 检测系统 (Detection System)
//!
//! - Detector: 目标检测 + 跟踪, 对外只暴露 [`TrackingDetector`]
//! - Tracker:  ByteTrack 目标追踪
//! - Labels:   类别名称表
use image::RgbImage;

pub mod bytetrack;
#[cfg(feature = "onnx")]
pub mod detector;
pub mod labels;
pub mod tracker;
pub mod types;

pub use bytetrack::{ByteTrackConfig, ByteTracker};
#[cfg(feature = "onnx")]
pub use detector::YoloTracker;
pub use labels::{LabelTable, UnknownClass};
pub use types::{BBox, Detection, TrackOutcome};

/// 检测 + 跟踪协作者
///
/// One synchronous call per frame, possibly from an ffmpeg worker thread.
/// Implementations keep their tracking state between calls and never panic
/// on a bad frame: failures come back as [`TrackOutcome::Failed`].
pub trait TrackingDetector: Send {
    fn track(&mut self, frame: &RgbImage) -> TrackOutcome;

    /// Class names indexed by `BBox::class_id`, fixed for the detector's lifetime.
    fn labels(&self) -> &LabelTable;

    /// 平均耗时 (检测 ms, 跟踪 ms), 未统计时为 `None`
    fn mean_timings(&self) -> Option<(f64, f64)> {
        None
    }
}

impl<T: TrackingDetector + ?Sized> TrackingDetector for Box<T> {
    fn track(&mut self, frame: &RgbImage) -> TrackOutcome {
        (**self).track(frame)
    }

    fn labels(&self) -> &LabelTable {
        (**self).labels()
    }

    fn mean_timings(&self) -> Option<(f64, f64)> {
        (**self).mean_timings()
    }
}
