// 该文件是 Kanjian （看见） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use kanjian::runtime::Device;
use url::Url;

/// Kanjian 目标检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型
  /// 例: onnx:///models/yolov5s.onnx?size=640&device=cpu
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// 例: image:///data/input.jpeg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持:
  /// - 图片: image:///data/result.png
  /// - 目录: folder:///data/records?record=name&always
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 类别名称文件，每行一个（默认 COCO）
  #[arg(long, value_name = "FILE")]
  pub names: Option<PathBuf>,

  /// 标签字体文件（TTF/OTF）
  /// 不指定时尝试常见系统字体（如 DejaVuSans），均不可用时只绘制边框、不绘制标签
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 置信度阈值 (0.0 - 1.0)，覆盖模型 URL 中的 conf
  #[arg(long, value_name = "THRESHOLD")]
  pub confidence: Option<f32>,

  /// NMS IOU 阈值 (0.0 - 1.0)，覆盖模型 URL 中的 iou
  #[arg(long, value_name = "THRESHOLD")]
  pub nms_threshold: Option<f32>,

  /// 解码阶段最多保留的候选数，0 表示不限制
  #[arg(long, value_name = "COUNT")]
  pub max_results: Option<usize>,

  /// 推理设备，如 cpu、cuda:0
  #[arg(long, value_name = "DEVICE")]
  pub device: Option<Device>,

  /// 跳过预热推理
  #[arg(long)]
  pub no_warmup: bool,
}
