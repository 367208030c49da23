//! FFmpeg帧过滤器: YUV420P帧 → RgbImage → 流水线 → 写回YUV
//!
//! Frames arrive as `yuv420p` from a `copy` filter, so each frame owns its
//! buffers and can be modified in place.

use std::slice;
use std::sync::{Arc, Mutex};

use ez_ffmpeg::filter::frame_filter::FrameFilter;
use ez_ffmpeg::filter::frame_filter_context::FrameFilterContext;
use ez_ffmpeg::{AVMediaType, Frame};
use image::RgbImage;
use log::{debug, info, warn};

use super::yuv::{write_changed_blocks, yuv420p_to_rgb, PlaneLayout};
use super::STOP_REASON;
use crate::pipeline::{FrameVerdict, Pipeline};

pub struct AnnotateFilter {
    pipeline: Arc<Mutex<Pipeline>>,
    rgb: Vec<u8>,
    original: Vec<u8>,
    pub total_frames: u64,
    /// 空帧/损坏帧/布局异常
    pub bad_frames: u64,
}

impl AnnotateFilter {
    pub fn new(pipeline: Arc<Mutex<Pipeline>>) -> Self {
        Self {
            pipeline,
            rgb: Vec::new(),
            original: Vec::new(),
            total_frames: 0,
            bad_frames: 0,
        }
    }

    fn reject(&mut self, reason: &str) -> Result<Option<Frame>, String> {
        self.bad_frames += 1;
        warn!("丢弃帧 #{}: {}", self.total_frames, reason);
        Ok(None)
    }
}

impl FrameFilter for AnnotateFilter {
    fn media_type(&self) -> AVMediaType {
        AVMediaType::AVMEDIA_TYPE_VIDEO
    }

    fn init(&mut self, _ctx: &FrameFilterContext) -> Result<(), String> {
        debug!("annotate filter started");
        Ok(())
    }

    fn filter_frame(
        &mut self,
        frame: Frame,
        _ctx: &FrameFilterContext,
    ) -> Result<Option<Frame>, String> {
        self.total_frames += 1;

        unsafe {
            // 基本检查：空帧或损坏帧
            if frame.as_ptr().is_null() || frame.is_empty() || frame.is_corrupt() {
                return self.reject("空帧/损坏帧");
            }

            let raw = &*frame.as_ptr();
            if raw.width <= 0 || raw.height <= 0 || raw.linesize[0] <= 0 || raw.linesize[1] <= 0
            {
                return self.reject("非法分辨率或步长");
            }
            let layout = PlaneLayout {
                width: raw.width as usize,
                height: raw.height as usize,
                y_stride: raw.linesize[0] as usize,
                uv_stride: raw.linesize[1] as usize,
            };
            if !layout.is_valid() || raw.linesize[2] != raw.linesize[1] {
                return self.reject("步长异常");
            }

            // YUV420P数据指针
            let (y_ptr, u_ptr, v_ptr) = (raw.data[0], raw.data[1], raw.data[2]);
            if y_ptr.is_null() || u_ptr.is_null() || v_ptr.is_null() {
                return self.reject("YUV指针为空");
            }
            let (y_len, uv_len) = layout.plane_lens();
            let y = slice::from_raw_parts_mut(y_ptr, y_len);
            let u = slice::from_raw_parts_mut(u_ptr, uv_len);
            let v = slice::from_raw_parts_mut(v_ptr, uv_len);

            // YUV420P → RGB
            self.rgb.resize(layout.width * layout.height * 3, 0);
            yuv420p_to_rgb(y, u, v, &layout, &mut self.rgb);
            self.original.clear();
            self.original.extend_from_slice(&self.rgb);

            let Some(mut image) = RgbImage::from_raw(
                layout.width as u32,
                layout.height as u32,
                std::mem::take(&mut self.rgb),
            ) else {
                return self.reject("RGB图像转换失败");
            };

            let verdict = match self.pipeline.lock() {
                Ok(mut pipeline) => pipeline.process(&mut image),
                Err(_) => return Err("pipeline lock poisoned".to_string()),
            };
            self.rgb = image.into_raw();

            match verdict {
                FrameVerdict::Stop => Err(STOP_REASON.to_string()),
                FrameVerdict::Drop => Ok(None),
                FrameVerdict::Forward(report) => {
                    if report.annotated {
                        write_changed_blocks(&self.rgb, &self.original, &layout, y, u, v);
                    }
                    Ok(Some(frame))
                }
            }
        }
    }

    fn uninit(&mut self, _ctx: &FrameFilterContext) {
        info!(
            "annotate filter closed: {} frames in, {} rejected",
            self.total_frames, self.bad_frames
        );
    }
}
