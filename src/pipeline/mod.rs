//! 单帧处理流水线 (Frame Pipeline)
//!
//! 每帧: 检测 + 跟踪 → 过滤 → 绘制 → 计数 → 面板, 处理完一帧再取下一帧.
//! The reconciler is owned here and only touched from [`Pipeline::process`].
pub mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbImage;
use log::{debug, info, warn};

use crate::annotate::{AnnotationReport, FrameAnnotator};
use crate::counting::CountReconciler;
use crate::detection::{TrackOutcome, TrackingDetector};

pub use stats::PipelineStats;

/// 单帧处理结论
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameVerdict {
    /// 输出到编码器 (可能未标注)
    Forward(AnnotationReport),
    /// 检测失败, 该帧不输出
    Drop,
    /// 已请求停止, 该帧及之后的帧都不处理
    Stop,
}

pub struct Pipeline<D: TrackingDetector = Box<dyn TrackingDetector>> {
    detector: D,
    annotator: FrameAnnotator,
    counts: CountReconciler,
    stats: PipelineStats,
    stop: Arc<AtomicBool>,
    max_frames: Option<u64>,
    log_every: u64,
}

impl<D: TrackingDetector> Pipeline<D> {
    pub fn new(detector: D, annotator: FrameAnnotator) -> Self {
        let counts = annotator.new_reconciler();
        Self {
            detector,
            annotator,
            counts,
            stats: PipelineStats::new(),
            stop: Arc::new(AtomicBool::new(false)),
            max_frames: None,
            log_every: 0,
        }
    }

    /// 处理指定帧数后停止
    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// 每 N 帧打印一次统计, 0 关闭
    pub fn with_log_every(mut self, log_every: u64) -> Self {
        self.log_every = log_every;
        self
    }

    /// Setting the flag makes every following call return [`FrameVerdict::Stop`].
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    pub fn process(&mut self, frame: &mut RgbImage) -> FrameVerdict {
        if let Some(max) = self.max_frames {
            if self.stats.frames >= max {
                self.stop.store(true, Ordering::Relaxed);
            }
        }
        if self.stop_requested() {
            return FrameVerdict::Stop;
        }

        self.stats.tick();
        let frame_no = self.stats.frames;

        let verdict = match self.detector.track(frame) {
            TrackOutcome::Failed(e) => {
                warn!("frame {}: {:#}, skipped", frame_no, e);
                self.stats.dropped += 1;
                FrameVerdict::Drop
            }
            TrackOutcome::Untracked => {
                debug!("frame {}: no track IDs, passed through", frame_no);
                self.stats.untracked += 1;
                FrameVerdict::Forward(AnnotationReport::default())
            }
            TrackOutcome::Tracked(detections) => {
                let report = self.annotator.annotate(
                    frame,
                    &detections,
                    self.detector.labels(),
                    &mut self.counts,
                );
                if report.annotated {
                    self.stats.annotated += 1;
                } else {
                    self.stats.untracked += 1;
                }
                self.stats.detections_drawn += report.drawn as u64;
                self.stats.unknown_labels += report.unknown as u64;
                debug!(
                    "frame {}: {} detections, {} drawn, {} new",
                    frame_no,
                    detections.len(),
                    report.drawn,
                    report.credited
                );
                FrameVerdict::Forward(report)
            }
        };
        if let FrameVerdict::Forward(_) = verdict {
            self.stats.forwarded += 1;
        }

        if self.log_every > 0 && frame_no % self.log_every == 0 {
            info!(
                "frame {} | {:.1} fps | dropped {} ({:.1}%) | {}",
                frame_no,
                self.stats.current_fps(),
                self.stats.dropped,
                self.stats.drop_rate(),
                self.counts_line()
            );
        }

        verdict
    }

    /// e.g. `BACKPACK: 2, HANDBAG: 0`
    pub fn counts_line(&self) -> String {
        self.counts
            .counts()
            .map(|(category, count)| crate::render::panel_line(category, count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn log_summary(&self) {
        let s = &self.stats;
        info!(
            "processed {} frames in {:.1}s ({:.1} fps): {} written, {} annotated, {} dropped",
            s.frames,
            s.elapsed().as_secs_f64(),
            s.average_fps(),
            s.forwarded,
            s.annotated,
            s.dropped
        );
        if let Some((detect_ms, track_ms)) = self.detector.mean_timings() {
            info!("mean per frame: detect {:.1}ms, track {:.1}ms", detect_ms, track_ms);
        }
        info!("final counts: {} (total {})", self.counts_line(), self.counts.total());
    }

    pub fn counts(&self) -> &CountReconciler {
        &self.counts
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn annotator(&self) -> &FrameAnnotator {
        &self.annotator
    }
}
