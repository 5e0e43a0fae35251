// 该文件是 Kanjian （看见） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use kanjian::{
  FromUrl,
  input::InputWrapper,
  label::ClassNames,
  model::Yolov5Builder,
  output::{OutputWrapper, draw::Draw},
  status::{DetectError, Status},
  task::{OneShotTask, Task},
};

/// 检测失败时打印状态并以状态码退出
fn exit_with_status(err: &DetectError) -> ! {
  let mut status = Status::from(err);
  error!("检测失败: {}", status);
  let code = status.code();
  status.clear();
  std::process::exit(code);
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let names = match &args.names {
    Some(path) => ClassNames::from_path(path)?,
    None => ClassNames::default(),
  };
  let draw = Draw::new(names);
  let draw = match &args.font {
    Some(font) => draw.with_font_file(font)?,
    None => draw.with_system_font(),
  };

  let mut builder = Yolov5Builder::from_url(&args.model)?;
  if let Some(confidence) = args.confidence {
    builder = builder.confidence_threshold(confidence);
  }
  if let Some(iou) = args.nms_threshold {
    builder = builder.iou_threshold(iou);
  }
  if let Some(max_results) = args.max_results {
    builder = builder.max_results(max_results);
  }
  if let Some(device) = args.device {
    builder = builder.device(device);
  }
  info!("检测参数: {:?}", builder.config());

  let mut model = builder.build()?;
  if !args.no_warmup
    && let Err(err) = model.warm_up()
  {
    error!("预热失败");
    exit_with_status(&err);
  }

  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?.with_draw(draw);

  let result = OneShotTask.run_task(input, model, output);
  if let Err(err) = &result
    && let Some(detect_err) = err.downcast_ref::<DetectError>()
  {
    exit_with_status(detect_err);
  }
  result
}
