//! ByteTrack 算法实现
//! ByteTrack: Simple and effective multi-object tracking
//!
//! 核心思想:
//! 1. 高低分检测框分开处理
//! 2. 高分框优先匹配 (IOU)
//! 3. 低分框救援丢失的轨迹
//! 4. 纯运动模型,无需外观特征
//!
//! Matching is class-agnostic; a track takes the class of the detection it
//! was last matched with.

use serde::{Deserialize, Serialize};

use super::tracker::{compute_iou, KalmanBoxFilter};
use super::types::{BBox, Detection};

/// 跟踪器参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ByteTrackConfig {
    /// 最大允许丢失帧数
    pub max_lost_frames: u32,
    /// 高分检测阈值
    pub high_score_threshold: f32,
    /// 低分检测阈值 (用于救援)
    pub low_score_threshold: f32,
    /// 高分匹配 IOU 阈值
    pub high_iou_threshold: f32,
    /// 低分匹配 IOU 阈值
    pub low_iou_threshold: f32,
    /// 卡尔曼过程噪声
    pub kalman_process_noise: f32,
    /// 卡尔曼观测噪声
    pub kalman_obs_noise: f32,
}

impl Default for ByteTrackConfig {
    fn default() -> Self {
        Self {
            max_lost_frames: 60,
            high_score_threshold: 0.4,
            low_score_threshold: 0.1,
            high_iou_threshold: 0.4,
            low_iou_threshold: 0.3,
            kalman_process_noise: 0.1,
            kalman_obs_noise: 0.5,
        }
    }
}

/// ByteTrack 跟踪对象
#[derive(Clone, Debug)]
struct Track {
    id: u32,
    /// 最近一次匹配的检测框 (类别/置信度来源)
    last: BBox,
    kalman: KalmanBoxFilter,
    frames_lost: u32,
    total_frames: u32,
}

impl Track {
    fn new(id: u32, bbox: BBox, config: &ByteTrackConfig) -> Self {
        let kalman = KalmanBoxFilter::new(
            &bbox,
            config.kalman_process_noise,
            config.kalman_obs_noise,
        );
        Self {
            id,
            last: bbox,
            kalman,
            frames_lost: 0,
            total_frames: 1,
        }
    }

    fn predict(&mut self) {
        self.kalman.predict();
    }

    fn update(&mut self, bbox: &BBox) {
        self.kalman.update(bbox);
        self.last = bbox.clone();
        self.frames_lost = 0;
        self.total_frames += 1;
    }

    fn mark_lost(&mut self) {
        self.frames_lost += 1;
    }

    /// 预测后为本帧预测框, 更新后为平滑框
    fn bbox(&self) -> BBox {
        self.kalman.state_bbox(&self.last)
    }
}

/// ByteTrack 追踪器
pub struct ByteTracker {
    tracks: Vec<Track>,
    /// 下一个分配的ID
    next_id: u32,
    config: ByteTrackConfig,
}

impl ByteTracker {
    pub fn new(config: ByteTrackConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            config,
        }
    }

    /// 更新跟踪 (ByteTrack 三步匹配)
    ///
    /// Returns the tracks matched or created in this frame, in detection
    /// order, each with its identity attached.
    pub fn update(&mut self, detections: &[BBox]) -> Vec<Detection> {
        // 1. 所有轨迹先预测
        for track in &mut self.tracks {
            track.predict();
        }

        // 2. 分离高低分检测框
        let mut high_dets: Vec<(usize, &BBox)> = Vec::new();
        let mut low_dets: Vec<(usize, &BBox)> = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            if det.confidence >= self.config.high_score_threshold {
                high_dets.push((idx, det));
            } else if det.confidence >= self.config.low_score_threshold {
                low_dets.push((idx, det));
            }
        }

        // det_idx -> track_idx
        let mut det_to_track: Vec<Option<usize>> = vec![None; detections.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        // 3. 第一轮匹配: 高分检测 + 所有轨迹
        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        let assignments =
            self.match_detections_to_tracks(&high_dets, &all_tracks, self.config.high_iou_threshold);
        for (det_idx, track_idx) in assignments {
            det_to_track[det_idx] = Some(track_idx);
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx]);
        }

        // 4. 第二轮匹配: 低分检测 + 未匹配的轨迹 (救援)
        let unmatched_tracks: Vec<usize> = (0..self.tracks.len())
            .filter(|&idx| !matched_track[idx])
            .collect();
        let low_assignments = self.match_detections_to_tracks(
            &low_dets,
            &unmatched_tracks,
            self.config.low_iou_threshold,
        );
        for (det_idx, track_idx) in low_assignments {
            det_to_track[det_idx] = Some(track_idx);
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx]);
        }

        // 5. 未匹配的轨迹 → 标记丢失
        for (track_idx, &matched) in matched_track.iter().enumerate() {
            if !matched {
                self.tracks[track_idx].mark_lost();
            }
        }

        // 6. 未匹配的高分检测 → 新建轨迹
        for (det_idx, det) in detections.iter().enumerate() {
            if det_to_track[det_idx].is_none() && det.confidence >= self.config.high_score_threshold
            {
                self.tracks
                    .push(Track::new(self.next_id, det.clone(), &self.config));
                det_to_track[det_idx] = Some(self.tracks.len() - 1);
                self.next_id += 1;
            }
        }

        let output = det_to_track
            .iter()
            .flatten()
            .map(|&track_idx| {
                let track = &self.tracks[track_idx];
                Detection::new(track.bbox(), Some(track.id))
            })
            .collect();

        // 7. 删除丢失太久的轨迹
        let max_lost = self.config.max_lost_frames;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        output
    }

    /// IOU 贪心匹配, 返回 (det_idx, track_idx)
    fn match_detections_to_tracks(
        &self,
        detections: &[(usize, &BBox)],
        track_indices: &[usize],
        iou_threshold: f32,
    ) -> Vec<(usize, usize)> {
        if detections.is_empty() || track_indices.is_empty() {
            return Vec::new();
        }

        let mut candidates = Vec::new();
        for (local_det_idx, (det_idx, detection)) in detections.iter().enumerate() {
            for (local_track_idx, &track_idx) in track_indices.iter().enumerate() {
                let iou = compute_iou(detection, &self.tracks[track_idx].bbox());
                if iou >= iou_threshold {
                    candidates.push((1.0 - iou, *det_idx, local_det_idx, track_idx, local_track_idx));
                }
            }
        }

        // 按代价排序
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut assignments = Vec::new();
        let mut used_det = vec![false; detections.len()];
        let mut used_track = vec![false; track_indices.len()];
        for (_, det_idx, local_det_idx, track_idx, local_track_idx) in candidates {
            if !used_det[local_det_idx] && !used_track[local_track_idx] {
                assignments.push((det_idx, track_idx));
                used_det[local_det_idx] = true;
                used_track[local_track_idx] = true;
            }
        }

        assignments
    }

    /// 当前存活的轨迹数 (含暂时丢失的)
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// 累计分配过的ID数
    pub fn total_ids(&self) -> u32 {
        self.next_id - 1
    }

    pub fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new(ByteTrackConfig::default())
    }
}
