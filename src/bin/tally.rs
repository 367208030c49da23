//! 视频目标计数
//!
//! 解码 → YOLOv8 + ByteTrack → 过滤/绘制/计数 → 编码

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use object_tally::detection::{TrackingDetector, YoloTracker};
use object_tally::models::{Model, YOLOv8, YOLOv8Config};
use object_tally::video::{run_video, RunEnd};
use object_tally::{init_logger, Args, FrameAnnotator, Pipeline, TallyConfig};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    init_logger(env!("CARGO_CRATE_NAME"));
    let args = Args::parse();

    // ========== 配置 ==========
    let config = TallyConfig::from_args(&args)?;
    config.summary();

    // ========== 检测模型 ==========
    let model = YOLOv8::new(YOLOv8Config {
        model: args.model.clone(),
        conf: config.detector.conf,
        iou: config.detector.iou,
        input_size: config.detector.input_size,
        cuda: args.cuda,
        device_id: args.device_id,
        intra_threads: config.detector.intra_threads,
    })?;
    model.summary();
    let detector = YoloTracker::new(Box::new(model), config.tracker.clone());
    config
        .check_labels(detector.labels())
        .context("target categories must be known to the model")?;

    // ========== 流水线 ==========
    let annotator = FrameAnnotator::from_config(&config)?;
    let detector: Box<dyn TrackingDetector> = Box::new(detector);
    let pipeline = Pipeline::new(detector, annotator)
        .with_max_frames(args.max_frames)
        .with_log_every(args.log_every);
    let pipeline = Arc::new(Mutex::new(pipeline));

    // ========== 视频 ==========
    let output = args.output_path();
    let end = run_video(&args.input, &output, Arc::clone(&pipeline))?;
    match end {
        RunEnd::Finished => info!("input finished, written to {}", output.display()),
        RunEnd::Stopped => warn!("stopped early, partial output in {}", output.display()),
    }

    match pipeline.lock() {
        Ok(p) => p.log_summary(),
        Err(_) => warn!("pipeline lock poisoned, no summary"),
    }
    Ok(())
}
