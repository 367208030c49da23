//! 类别名称表 (label table)
//!
//! Built once at startup from the detector's class names and immutable
//! afterwards. Lookups by index are checked.

use std::fmt;

use anyhow::{bail, Context, Result};
use regex::Regex;

/// COCO class names (80 classes), used when the model carries no `names` metadata.
pub const COCO_NAMES: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// A class index the label table does not know about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownClass {
    pub index: u32,
    pub table_len: usize,
}

impl fmt::Display for UnknownClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "class index {} is outside the label table (0..{})",
            self.index, self.table_len
        )
    }
}

impl std::error::Error for UnknownClass {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            bail!("label table is empty");
        }
        if let Some(i) = names.iter().position(|n| n.trim().is_empty()) {
            bail!("label table entry {} is blank", i);
        }
        Ok(Self { names })
    }

    pub fn coco() -> Self {
        Self {
            names: COCO_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Parse the `names` metadata entry of an Ultralytics ONNX export,
    /// e.g. `{0: 'person', 1: 'bicycle'}`. Indices must be contiguous from 0.
    pub fn from_metadata(raw: &str) -> Result<Self> {
        let re = Regex::new(r#"(\d+)\s*:\s*['"]([^'"]*)['"]"#).context("names pattern")?;
        let mut entries = Vec::new();
        for cap in re.captures_iter(raw) {
            let index: usize = cap[1]
                .parse()
                .with_context(|| format!("bad class index {:?}", &cap[1]))?;
            entries.push((index, cap[2].to_string()));
        }
        entries.sort_by_key(|(i, _)| *i);
        for (expected, (index, _)) in entries.iter().enumerate() {
            if *index != expected {
                bail!(
                    "class names metadata is not contiguous: expected index {}, found {}",
                    expected,
                    index
                );
            }
        }
        Self::new(entries.into_iter().map(|(_, name)| name))
    }

    pub fn resolve(&self, index: u32) -> Result<&str, UnknownClass> {
        self.names
            .get(index as usize)
            .map(String::as_str)
            .ok_or(UnknownClass {
                index,
                table_len: self.names.len(),
            })
    }

    pub fn index_of(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
