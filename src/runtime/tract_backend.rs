// 该文件是 Kanjian （看见） 项目的一部分。
// src/runtime/tract_backend.rs - 基于 tract 的 ONNX 推理后端
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

use std::path::Path;

use tracing::{debug, error, info};
use tract_onnx::prelude::*;

use crate::{
  frame::InputBlob,
  runtime::{Device, InferenceSession, RawTensor, RuntimeError},
};

const EXPECTED_NUM_INPUTS: usize = 1;

type Plan = RunnableModel<TypedFact, Box<dyn TypedOp>, TypedModel>;

/// tract 模型会话，drop 时释放
pub struct TractSession {
  model: Plan,
  input_size: usize,
}

fn ensure_cpu(device: Device) -> Result<(), RuntimeError> {
  if device != Device::Cpu {
    error!("tract 后端仅支持 CPU, 请求的设备为 {}", device);
    return Err(RuntimeError::UnsupportedDevice(device));
  }
  Ok(())
}

impl TractSession {
  /// 加载 ONNX 模型，输入固定为 `[1, 3, input_size, input_size]`
  pub fn load(
    path: impl AsRef<Path>,
    input_size: u32,
    device: Device,
  ) -> Result<Self, RuntimeError> {
    ensure_cpu(device)?;

    let path = path.as_ref();
    info!("加载模型文件: {}", path.display());
    let model_data = std::fs::read(path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let model = tract_onnx::onnx().model_for_read(&mut model_data.as_slice())?;

    let num_inputs = model.inputs.len();
    let num_outputs = model.outputs.len();
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != EXPECTED_NUM_INPUTS {
      error!(
        "预期模型输入数量为 {}, 实际为 {}",
        EXPECTED_NUM_INPUTS, num_inputs
      );
      return Err(RuntimeError::ModelInvalid(format!(
        "预期模型输入数量为 {}, 实际为 {}",
        EXPECTED_NUM_INPUTS, num_inputs
      )));
    }
    if num_outputs == 0 {
      return Err(RuntimeError::ModelInvalid("模型没有输出".to_string()));
    }

    let size = input_size as usize;
    info!("优化模型计算图, 输入尺寸 {}x{}", size, size);
    let model = model
      .with_input_fact(0, f32::fact([1, 3, size, size]).into())?
      .into_optimized()?
      .into_runnable()?;
    info!("模型加载完成");

    Ok(Self {
      model,
      input_size: size,
    })
  }

  pub fn input_size(&self) -> usize {
    self.input_size
  }

  /// 显式释放；与 drop 等价
  pub fn release(self) {
    debug!("释放模型会话");
  }
}

impl InferenceSession for TractSession {
  fn forward(&mut self, blob: &InputBlob, device: Device) -> Result<RawTensor, RuntimeError> {
    ensure_cpu(device)?;

    let (c, h, w) = (blob.channels(), blob.height(), blob.width());
    let size = self.input_size();
    if blob.batch() != 1 || h != size || w != size {
      return Err(RuntimeError::InputShapeMismatch(format!(
        "期望 [1, {}, {}, 3], 实际 [{}, {}, {}, {}]",
        size,
        size,
        blob.batch(),
        h,
        w,
        c
      )));
    }

    // NHWC -> NCHW
    let input: Tensor = tract_ndarray::ArrayView4::from_shape((1, h, w, c), blob.as_nhwc())
      .map_err(|e| RuntimeError::InputShapeMismatch(e.to_string()))?
      .permuted_axes([0, 3, 1, 2])
      .as_standard_layout()
      .into_owned()
      .into();

    let outputs = self.model.run(tvec!(input.into()))?;
    let output = outputs
      .first()
      .ok_or_else(|| RuntimeError::ModelInvalid("推理未产生输出".to_string()))?;

    let view = output.to_array_view::<f32>()?;
    debug!("模型输出形状: {:?}", view.shape());

    Ok(RawTensor::new(
      view.shape().to_vec(),
      view.iter().copied().collect::<Vec<_>>(),
    ))
  }
}
