//! 视频输入输出 (ez-ffmpeg)
//!
//! 解码 → `format=yuv420p,copy` → [`AnnotateFilter`] → 编码. The `copy` filter
//! gives every frame its own writable buffers before it reaches the pipeline.
pub mod annotate_filter;
pub mod yuv;

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use ez_ffmpeg::filter::frame_pipeline_builder::FramePipelineBuilder;
use ez_ffmpeg::{AVMediaType, FfmpegContext, Input, Output};
use log::{info, warn};

use crate::on_drop::on_drop;
use crate::pipeline::Pipeline;

pub use annotate_filter::AnnotateFilter;

/// 过滤器在收到停止请求时返回的错误
pub const STOP_REASON: &str = "stop requested";

const FILTER_DESC: &str = "format=yuv420p,copy";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunEnd {
    /// 输入读完
    Finished,
    /// 停止标志或帧数上限
    Stopped,
}

/// 逐帧处理 `input` 并编码到 `output`, 阻塞直到结束.
///
/// Decoder and encoder are released when this returns, on success and on error.
pub fn run_video(input: &str, output: &Path, pipeline: Arc<Mutex<Pipeline>>) -> Result<RunEnd> {
    let _release = on_drop(|| info!("released video resources"));

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }
    let output_url = output
        .to_str()
        .ok_or_else(|| anyhow!("output path is not valid UTF-8: {}", output.display()))?;

    let filter = AnnotateFilter::new(Arc::clone(&pipeline));
    let pipe: FramePipelineBuilder = AVMediaType::AVMEDIA_TYPE_VIDEO.into();
    let pipe = pipe.filter("annotate", Box::new(filter));
    let out = Output::new(output_url).add_frame_pipeline(pipe);

    info!("{} → {}", input, output.display());
    let ctx = FfmpegContext::builder()
        .input(Input::new(input))
        .filter_desc(FILTER_DESC)
        .output(out)
        .build()
        .map_err(|e| anyhow!("failed to open {}: {}", input, e))?;
    let sch = ctx
        .start()
        .map_err(|e| anyhow!("failed to start video job: {}", e))?;

    let result = sch.wait();
    let stopped = match pipeline.lock() {
        Ok(p) => p.stop_requested(),
        Err(_) => return Err(anyhow!("pipeline lock poisoned")),
    };
    match result {
        Ok(()) if stopped => Ok(RunEnd::Stopped),
        Ok(()) => Ok(RunEnd::Finished),
        Err(e) if stopped => {
            warn!("video job ended after stop: {}", e);
            Ok(RunEnd::Stopped)
        }
        Err(e) => Err(anyhow!("video job failed: {}", e)),
    }
}
