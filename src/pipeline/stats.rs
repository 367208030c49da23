//! 流水线统计

use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub struct PipelineStats {
    /// 送入流水线的帧数
    pub frames: u64,
    /// 输出到编码器的帧数
    pub forwarded: u64,
    /// 绘制了叠加层的帧数
    pub annotated: u64,
    /// 检测失败被丢弃的帧数
    pub dropped: u64,
    /// 无跟踪ID、原样输出的帧数
    pub untracked: u64,
    pub detections_drawn: u64,
    pub unknown_labels: u64,

    started: Instant,
    window_start: Instant,
    window_frames: u64,
    current_fps: f64,
}

impl PipelineStats {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            frames: 0,
            forwarded: 0,
            annotated: 0,
            dropped: 0,
            untracked: 0,
            detections_drawn: 0,
            unknown_labels: 0,
            started: now,
            window_start: now,
            window_frames: 0,
            current_fps: 0.0,
        }
    }

    /// 计数一帧, 每秒刷新一次FPS
    pub fn tick(&mut self) {
        self.frames += 1;
        self.window_frames += 1;
        let elapsed = self.window_start.elapsed().as_secs_f64();
        if elapsed >= 1.0 {
            self.current_fps = self.window_frames as f64 / elapsed;
            self.window_start = Instant::now();
            self.window_frames = 0;
        }
    }

    pub fn current_fps(&self) -> f64 {
        self.current_fps
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 全程平均FPS
    pub fn average_fps(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }

    pub fn drop_rate(&self) -> f64 {
        if self.frames == 0 {
            0.0
        } else {
            self.dropped as f64 / self.frames as f64 * 100.0
        }
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_rate_is_a_percentage() {
        let mut stats = PipelineStats::new();
        assert_eq!(stats.drop_rate(), 0.0);
        for _ in 0..4 {
            stats.tick();
        }
        stats.dropped = 1;
        assert_eq!(stats.frames, 4);
        assert_eq!(stats.drop_rate(), 25.0);
    }
}
