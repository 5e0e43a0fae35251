// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/yolov5.rs - YOLOv5 检测流水线
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::time::Instant;

use image::RgbImage;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Detection, Model, decode, letterbox, restore_coordinates, suppress},
  runtime::{Device, InferenceSession, RuntimeError},
  status::DetectError,
};

const YOLOV5_INPUT_SIZE: u32 = 640;
const YOLOV5_CONF_THRESH: f32 = 0.4;
const YOLOV5_IOU_THRESH: f32 = 0.5;
const WARM_UP_THRESH: f32 = 1.0;

/// 检测参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectConfig {
  /// 网络输入边长
  pub input_size: u32,
  pub confidence_threshold: f32,
  pub iou_threshold: f32,
  /// 解码阶段保留的最大候选数，0 表示不限制
  pub max_results: usize,
  pub device: Device,
}

impl Default for DetectConfig {
  fn default() -> Self {
    Self {
      input_size: YOLOV5_INPUT_SIZE,
      confidence_threshold: YOLOV5_CONF_THRESH,
      iou_threshold: YOLOV5_IOU_THRESH,
      max_results: 0,
      device: Device::Cpu,
    }
  }
}

pub struct Yolov5<S> {
  session: S,
  config: DetectConfig,
}

impl<S: InferenceSession> Yolov5<S> {
  pub fn with_session(session: S, config: DetectConfig) -> Self {
    Self { session, config }
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  pub fn config_mut(&mut self) -> &mut DetectConfig {
    &mut self.config
  }

  pub fn into_session(self) -> S {
    self.session
  }

  /// 完整流水线：letterbox、推理、解码、NMS、坐标还原
  pub fn detect(
    &mut self,
    image: &RgbImage,
    confidence_threshold: f32,
    iou_threshold: f32,
  ) -> Result<Vec<Detection>, DetectError> {
    let now = Instant::now();
    let (blob, letterbox) = letterbox(image, self.config.input_size)?;
    debug!("预处理完成，耗时: {:.2?}", now.elapsed());

    let now = Instant::now();
    let tensor = self.session.forward(&blob, self.config.device)?;
    debug!("推理完成，耗时: {:.2?}", now.elapsed());

    let candidates = decode(&tensor, confidence_threshold, self.config.max_results)?;
    tensor.release();
    if candidates.is_empty() {
      debug!("没有候选框通过置信度筛选");
      return Ok(Vec::new());
    }

    let keep = suppress(&candidates, confidence_threshold, iou_threshold);
    let original = image.dimensions();
    let detections: Vec<Detection> = keep
      .into_iter()
      .map(|idx| {
        let mut item = candidates[idx].clone();
        item.bbox = restore_coordinates(item.bbox, &letterbox, original);
        item
      })
      .collect();

    debug!("检测到 {} 个物体", detections.len());
    Ok(detections)
  }

  /// 用全黑图像做一次空推理，阈值均为 1.0
  pub fn warm_up(&mut self) -> Result<(), DetectError> {
    info!("预热推理...");
    let size = self.config.input_size;
    let blank = RgbImage::new(size, size);
    let now = Instant::now();
    self.detect(&blank, WARM_UP_THRESH, WARM_UP_THRESH)?;
    info!("预热完成，耗时: {:.2?}", now.elapsed());
    Ok(())
  }
}

impl<S: InferenceSession> Model for Yolov5<S> {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = DetectError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let DetectConfig {
      confidence_threshold,
      iou_threshold,
      ..
    } = self.config;
    self
      .detect(input, confidence_threshold, iou_threshold)
      .map(DetectResult::from)
  }
}

/// 从 URL 构造模型：`onnx:///path/model.onnx?size=640&device=cpu&conf=0.4&iou=0.5&max=0`
#[derive(Debug, Clone)]
pub struct Yolov5Builder {
  model_path: String,
  config: DetectConfig,
}

impl FromUrlWithScheme for Yolov5Builder {
  const SCHEME: &'static str = "onnx";
}

fn query_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, RuntimeError> {
  value
    .parse()
    .map_err(|_| RuntimeError::ModelPathError(format!("参数 {} 的值 '{}' 无效", key, value)))
}

impl FromUrl for Yolov5Builder {
  type Error = RuntimeError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RuntimeError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut config = DetectConfig::default();
    for (k, v) in url.query_pairs() {
      match &*k {
        "size" => config.input_size = query_value(&k, &v)?,
        "device" => config.device = v.parse()?,
        "conf" => config.confidence_threshold = query_value(&k, &v)?,
        "iou" => config.iou_threshold = query_value(&k, &v)?,
        "max" => config.max_results = query_value(&k, &v)?,
        _ => debug!("忽略未知的模型参数: {}={}", k, v),
      }
    }

    Ok(Yolov5Builder {
      model_path: url.path().to_string(),
      config,
    })
  }
}

impl Yolov5Builder {
  pub fn model_path(&self) -> &str {
    &self.model_path
  }

  pub fn config(&self) -> &DetectConfig {
    &self.config
  }

  pub fn device(mut self, device: Device) -> Self {
    self.config.device = device;
    self
  }

  pub fn confidence_threshold(mut self, threshold: f32) -> Self {
    self.config.confidence_threshold = threshold;
    self
  }

  pub fn iou_threshold(mut self, threshold: f32) -> Self {
    self.config.iou_threshold = threshold;
    self
  }

  pub fn max_results(mut self, max_results: usize) -> Self {
    self.config.max_results = max_results;
    self
  }

  /// 用给定会话构造，跳过模型文件加载
  pub fn build_with<S: InferenceSession>(self, session: S) -> Yolov5<S> {
    Yolov5::with_session(session, self.config)
  }

  #[cfg(feature = "tract_backend")]
  pub fn build(self) -> Result<Yolov5<crate::runtime::TractSession>, RuntimeError> {
    let session = crate::runtime::TractSession::load(
      &self.model_path,
      self.config.input_size,
      self.config.device,
    )?;
    Ok(self.build_with(session))
  }
}
