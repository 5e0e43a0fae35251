// 该文件是 Kanjian （看见） 项目的一部分。
// src/runtime.rs - 推理后端接口
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

use std::{fmt, str::FromStr};

use thiserror::Error;

use crate::frame::InputBlob;

#[cfg(feature = "tract_backend")]
mod tract_backend;
#[cfg(feature = "tract_backend")]
pub use self::tract_backend::TractSession;

#[derive(Error, Debug)]
pub enum RuntimeError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("输入形状不匹配: {0}")]
  InputShapeMismatch(String),
  #[error("不支持的设备: {0}")]
  UnsupportedDevice(Device),
  #[error("设备描述无法解析: {0}")]
  InvalidDevice(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[cfg(feature = "tract_backend")]
  #[error("Tract 错误: {0}")]
  TractError(tract_onnx::prelude::TractError),
}

impl From<std::io::Error> for RuntimeError {
  fn from(err: std::io::Error) -> Self {
    RuntimeError::ModelLoadError(err)
  }
}

#[cfg(feature = "tract_backend")]
impl From<tract_onnx::prelude::TractError> for RuntimeError {
  fn from(err: tract_onnx::prelude::TractError) -> Self {
    RuntimeError::TractError(err)
  }
}

/// 推理设备，显式地传递给每一次调用
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Device {
  #[default]
  Cpu,
  Cuda(u16),
  Mps,
  Vulkan(u16),
}

impl fmt::Display for Device {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Device::Cpu => write!(f, "cpu"),
      Device::Cuda(index) => write!(f, "cuda:{}", index),
      Device::Mps => write!(f, "mps"),
      Device::Vulkan(index) => write!(f, "vulkan:{}", index),
    }
  }
}

impl FromStr for Device {
  type Err = RuntimeError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let lower = s.trim().to_ascii_lowercase();
    let (kind, index) = match lower.split_once(':') {
      Some((kind, index)) => {
        let index = index
          .parse::<u16>()
          .map_err(|_| RuntimeError::InvalidDevice(s.to_string()))?;
        (kind, index)
      }
      None => (lower.as_str(), 0),
    };

    match kind {
      "cpu" => Ok(Device::Cpu),
      "cuda" => Ok(Device::Cuda(index)),
      "mps" => Ok(Device::Mps),
      "vulkan" => Ok(Device::Vulkan(index)),
      _ => Err(RuntimeError::InvalidDevice(s.to_string())),
    }
  }
}

/// 推理后端返回的原始输出张量，行优先排布
#[derive(Debug, Clone)]
pub struct RawTensor {
  shape: Vec<usize>,
  data: Box<[f32]>,
}

impl RawTensor {
  pub fn new(shape: Vec<usize>, data: impl Into<Box<[f32]>>) -> Self {
    Self {
      shape,
      data: data.into(),
    }
  }

  pub fn shape(&self) -> &[usize] {
    &self.shape
  }

  pub fn data(&self) -> &[f32] {
    &self.data
  }

  /// 显式释放；与 drop 等价
  pub fn release(self) {}
}

/// 已加载的模型会话
///
/// `forward` 需要 `&mut self`：同一个会话同一时刻只有一个使用者，
/// 需要并行推理时请为每个线程创建独立的会话。
pub trait InferenceSession {
  fn forward(&mut self, blob: &InputBlob, device: Device) -> Result<RawTensor, RuntimeError>;
}

impl<S: InferenceSession + ?Sized> InferenceSession for Box<S> {
  fn forward(&mut self, blob: &InputBlob, device: Device) -> Result<RawTensor, RuntimeError> {
    (**self).forward(blob, device)
  }
}
