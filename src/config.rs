//! 运行参数 - 命令行 + JSON 配置文件
//!
//! Everything is fixed at startup. The JSON file may omit any field; missing
//! fields take the defaults below.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use image::Rgb;
use log::info;
use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::annotate::Target;
use crate::detection::{ByteTrackConfig, LabelTable};
use crate::render::{LabelStyle, OverlayStyle, PanelLayout};

/// 默认置信度阈值 (严格大于)
pub const DEFAULT_THRESHOLD: f32 = 0.6;

/// 命名颜色 (RGB)
static NAMED_COLORS: phf::Map<&'static str, [u8; 3]> = phf_map! {
    "black" => [0, 0, 0],
    "white" => [255, 255, 255],
    "red" => [255, 0, 0],
    "green" => [0, 255, 0],
    "blue" => [0, 0, 255],
    "yellow" => [255, 255, 0],
    "magenta" => [255, 0, 255],
    "cyan" => [0, 255, 255],
    "orange" => [255, 128, 0],
    "pink" => [255, 0, 128],
    "lime" => [128, 255, 0],
    "sky" => [0, 128, 255],
    "purple" => [128, 0, 255],
    "gray" => [128, 128, 128],
};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "视频目标计数: 检测 + 跟踪 + 去重计数", long_about = None)]
pub struct Args {
    /// 输入视频文件或流地址
    #[arg(short, long)]
    pub input: String,

    /// 输出视频 (默认 outputs/tally_<时间>.mp4)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// ONNX 检测模型
    #[arg(short, long, default_value = "yolov8x.onnx")]
    pub model: PathBuf,

    /// JSON 配置文件
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 覆盖配置中的置信度阈值
    #[arg(long)]
    pub conf: Option<f32>,

    /// 使用 CUDA
    #[arg(long)]
    pub cuda: bool,

    /// CUDA 设备号
    #[arg(long, default_value_t = 0)]
    pub device_id: i32,

    /// 处理指定帧数后停止
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// 每 N 帧打印一次统计
    #[arg(long, default_value_t = 100)]
    pub log_every: u64,
}

impl Args {
    pub fn output_path(&self) -> PathBuf {
        match &self.output {
            Some(path) => path.clone(),
            None => PathBuf::from("outputs")
                .join(format!("tally_{}.mp4", crate::gen_time_string("_"))),
        }
    }
}

/// 配置校验错误
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoTargets,
    DuplicateTarget(String),
    BlankTarget,
    UnknownColor { target: String, color: String },
    ThresholdOutOfRange(f32),
    ZeroSize(&'static str),
    /// 目标类别不在模型的类别表中
    UnknownTarget(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoTargets => write!(f, "at least one target category is required"),
            ConfigError::DuplicateTarget(name) => write!(f, "target {:?} is listed twice", name),
            ConfigError::BlankTarget => write!(f, "target name is blank"),
            ConfigError::UnknownColor { target, color } => {
                write!(f, "target {:?}: unknown color {:?}", target, color)
            }
            ConfigError::ThresholdOutOfRange(t) => {
                write!(f, "threshold {} is outside [0, 1)", t)
            }
            ConfigError::ZeroSize(what) => write!(f, "{} must be positive", what),
            ConfigError::UnknownTarget(name) => {
                write!(f, "target {:?} is not a class of the detector", name)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// 颜色: `[r, g, b]` 或颜色名
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorSpec {
    Rgb([u8; 3]),
    Named(String),
}

impl ColorSpec {
    pub fn resolve(&self) -> Option<Rgb<u8>> {
        match self {
            ColorSpec::Rgb(rgb) => Some(Rgb(*rgb)),
            ColorSpec::Named(name) => NAMED_COLORS
                .get(name.trim().to_lowercase().as_str())
                .map(|rgb| Rgb(*rgb)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub color: ColorSpec,
}

impl TargetConfig {
    fn new(name: &str, rgb: [u8; 3]) -> Self {
        Self {
            name: name.to_string(),
            color: ColorSpec::Rgb(rgb),
        }
    }
}

/// 检测模型参数
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// 送入跟踪器的置信度下限
    pub conf: f32,
    pub iou: f32,
    pub input_size: u32,
    pub intra_threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            conf: 0.10,
            iou: 0.45,
            input_size: 640,
            intra_threads: 4,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfig {
    /// 目标类别, 顺序即面板行顺序
    pub targets: Vec<TargetConfig>,
    pub threshold: f32,
    /// 直线段颜色, 缺省与类别同色
    pub edge_color: Option<ColorSpec>,
    pub overlay: OverlayStyle,
    pub label: LabelStyle,
    pub panel: PanelLayout,
    pub detector: DetectorConfig,
    pub tracker: ByteTrackConfig,
}

impl Default for TallyConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                TargetConfig::new("backpack", [0, 255, 0]),
                TargetConfig::new("handbag", [255, 0, 0]),
                TargetConfig::new("suitcase", [0, 0, 255]),
            ],
            threshold: DEFAULT_THRESHOLD,
            edge_color: None,
            overlay: OverlayStyle::default(),
            label: LabelStyle::default(),
            panel: PanelLayout::default(),
            detector: DetectorConfig::default(),
            tracker: ByteTrackConfig::default(),
        }
    }
}

impl TallyConfig {
    /// 从JSON文件加载并校验
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        info!("config loaded from {}", path.display());
        Ok(config)
    }

    /// 配置文件 (若给出) + 命令行覆盖
    pub fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Some(conf) = args.conf {
            config.threshold = conf;
        }
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolved_targets()?;
        if !(0.0..1.0).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.threshold));
        }
        if let Some(color) = &self.edge_color {
            if color.resolve().is_none() {
                return Err(ConfigError::UnknownColor {
                    target: "edge_color".to_string(),
                    color: format!("{:?}", color),
                });
            }
        }
        let sizes = [
            ("overlay.line_thickness", self.overlay.line_thickness),
            ("overlay.corner_thickness", self.overlay.corner_thickness),
            ("label.thickness", self.label.thickness),
            ("panel.size.0", self.panel.size.0),
            ("panel.size.1", self.panel.size.1),
            ("panel.line_spacing", self.panel.line_spacing),
            ("panel.thickness", self.panel.thickness),
            ("detector.input_size", self.detector.input_size),
        ];
        if let Some((what, _)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::ZeroSize(*what));
        }
        if self.label.font_scale <= 0.0 {
            return Err(ConfigError::ZeroSize("label.font_scale"));
        }
        if self.panel.font_scale <= 0.0 {
            return Err(ConfigError::ZeroSize("panel.font_scale"));
        }
        Ok(())
    }

    /// 目标类别 + 解析后的颜色, 按配置顺序
    pub fn resolved_targets(&self) -> Result<Vec<Target>, ConfigError> {
        if self.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        let mut targets: Vec<Target> = Vec::with_capacity(self.targets.len());
        for t in &self.targets {
            let name = t.name.trim();
            if name.is_empty() {
                return Err(ConfigError::BlankTarget);
            }
            if targets.iter().any(|existing| existing.name == name) {
                return Err(ConfigError::DuplicateTarget(name.to_string()));
            }
            let color = t.color.resolve().ok_or_else(|| ConfigError::UnknownColor {
                target: name.to_string(),
                color: format!("{:?}", t.color),
            })?;
            targets.push(Target::new(name, color));
        }
        Ok(targets)
    }

    pub fn edge_color(&self) -> Option<Rgb<u8>> {
        self.edge_color.as_ref().and_then(ColorSpec::resolve)
    }

    /// 所有目标类别都必须存在于检测器的类别表中
    pub fn check_labels(&self, labels: &LabelTable) -> Result<(), ConfigError> {
        for t in &self.targets {
            if labels.index_of(t.name.trim()).is_none() {
                return Err(ConfigError::UnknownTarget(t.name.clone()));
            }
        }
        Ok(())
    }

    pub fn summary(&self) {
        let names: Vec<&str> = self.targets.iter().map(|t| t.name.as_str()).collect();
        info!(
            "targets: {} | threshold > {:.2} | box {}/{}/r{} | tracker max_lost {}",
            names.join(", "),
            self.threshold,
            self.overlay.line_thickness,
            self.overlay.corner_thickness,
            self.overlay.corner_radius,
            self.tracker.max_lost_frames
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = TallyConfig::default();
        assert_eq!(config.validate(), Ok(()));
        let targets = config.resolved_targets().unwrap();
        let names: Vec<_> = targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["backpack", "handbag", "suitcase"]);
        assert_eq!(targets[0].color, Rgb([0, 255, 0]));
        assert_eq!(config.threshold, 0.6);
        assert_eq!(config.overlay, OverlayStyle::default());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let json = r#"{
            "targets": [
                {"name": "suitcase", "color": "Orange"},
                {"name": "backpack", "color": [10, 20, 30]}
            ],
            "overlay": {"corner_radius": 12}
        }"#;
        let config: TallyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.validate(), Ok(()));
        let targets = config.resolved_targets().unwrap();
        assert_eq!(targets[0].name, "suitcase");
        assert_eq!(targets[0].color, Rgb([255, 128, 0]));
        assert_eq!(targets[1].color, Rgb([10, 20, 30]));
        assert_eq!(config.overlay.corner_radius, 12);
        assert_eq!(config.overlay.line_thickness, 2);
        assert_eq!(config.panel, PanelLayout::default());
        assert_eq!(config.tracker, ByteTrackConfig::default());
    }

    #[test]
    fn rejects_bad_configs() {
        let mut config = TallyConfig {
            targets: vec![],
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::NoTargets));

        config.targets = vec![
            TargetConfig::new("backpack", [0, 0, 0]),
            TargetConfig::new("backpack", [1, 1, 1]),
        ];
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateTarget("backpack".into()))
        );

        config.targets = vec![TargetConfig {
            name: "handbag".into(),
            color: ColorSpec::Named("chartreuse-ish".into()),
        }];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownColor { .. })
        ));

        let config = TallyConfig {
            threshold: 1.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ThresholdOutOfRange(1.0)));

        let mut config = TallyConfig::default();
        config.overlay.line_thickness = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroSize("overlay.line_thickness"))
        );
    }

    #[test]
    fn targets_must_be_detector_classes() {
        let mut config = TallyConfig::default();
        assert_eq!(config.check_labels(&LabelTable::coco()), Ok(()));
        config.targets.push(TargetConfig::new("trolley", [1, 2, 3]));
        assert_eq!(
            config.check_labels(&LabelTable::coco()),
            Err(ConfigError::UnknownTarget("trolley".into()))
        );
    }

    #[test]
    fn cli_threshold_overrides_config() {
        let args = Args::parse_from(["tally", "-i", "in.mp4", "--conf", "0.75"]);
        let config = TallyConfig::from_args(&args).unwrap();
        assert_eq!(config.threshold, 0.75);
        assert!(args.output_path().starts_with("outputs"));

        let args = Args::parse_from(["tally", "-i", "in.mp4", "--conf", "1.5"]);
        assert!(TallyConfig::from_args(&args).is_err());
    }

    #[test]
    fn config_file_round_trip() {
        let path = std::env::temp_dir().join(format!("tally_config_{}.json", std::process::id()));
        let mut config = TallyConfig::default();
        config.threshold = 0.5;
        config.edge_color = Some(ColorSpec::Named("white".into()));
        config.save(&path).unwrap();
        let loaded = TallyConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
        assert_eq!(loaded.edge_color(), Some(Rgb([255, 255, 255])));
    }
}
