// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! Annotate a video stream with tracked detections and keep a running
//! unique-object count per category.
//!
//! ```text
//! decoder ─► TrackingDetector ─► FrameAnnotator ─► encoder
//!                                   │
//!                                   ├─ render::overlay (box + label)
//!                                   ├─ CountReconciler (dedup + counts)
//!                                   └─ render::panel   (count panel)
//! ```
pub mod annotate; // 过滤 + 绘制 + 计数
pub mod config; // 运行参数 (CLI + JSON)
pub mod counting; // 去重计数
pub mod detection; // 检测/跟踪协作者接口
pub mod on_drop; // 资源释放守卫
pub mod pipeline; // 单帧处理流水线
pub mod render; // 叠加层绘制

#[cfg(feature = "onnx")]
pub mod models; // ONNX 检测模型
#[cfg(feature = "video")]
pub mod video; // FFmpeg 视频输入输出

pub use crate::annotate::{AnnotationReport, FrameAnnotator};
pub use crate::config::{Args, TallyConfig};
pub use crate::counting::CountReconciler;
pub use crate::detection::{BBox, Detection, LabelTable, TrackOutcome, TrackingDetector};
pub use crate::pipeline::{FrameVerdict, Pipeline};

use log::LevelFilter;

/// Timestamp used to name default output files, e.g. `2024_05_01_13_45_09`.
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S",
        delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}

/// Initializes logging to *stderr*.
///
/// This crate and the calling binary log at `info` unless `RUST_LOG` says otherwise;
/// ONNX Runtime is kept at `warn`. Does nothing if a logger is already registered.
pub fn init_logger(calling_crate: &'static str) {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Warn)
        .filter(Some(calling_crate), LevelFilter::Info)
        .filter(Some(env!("CARGO_CRATE_NAME")), LevelFilter::Info)
        .filter(Some("ort"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}
