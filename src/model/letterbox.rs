// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/letterbox.rs - 保持宽高比的缩放与填充
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

use image::{Rgb, RgbImage, imageops::FilterType};
use tracing::debug;

use crate::{frame::InputBlob, status::DetectError};

/// 填充颜色
pub const LETTERBOX_FILL: [u8; 3] = [114, 114, 114];

/// 一次 letterbox 变换的参数，用于把检测框映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
  pub scale: f32,
  pub top: i32,
  pub bottom: i32,
  pub left: i32,
  pub right: i32,
}

impl Letterbox {
  /// 计算 `width x height` 图像到 `target x target` 的变换参数
  ///
  /// 返回参数和缩放后（未填充）的尺寸。
  pub fn compute(width: u32, height: u32, target: u32) -> Result<(Self, (u32, u32)), DetectError> {
    if width == 0 || height == 0 || target == 0 {
      return Err(DetectError::precondition(format!(
        "图像尺寸 {}x{} 或目标尺寸 {} 为零",
        width, height, target
      )));
    }

    let (w, h, t) = (width as f32, height as f32, target as f32);
    let scale = (t / w).min(t / h);
    let new_w = (w * scale).round() as u32;
    let new_h = (h * scale).round() as u32;

    let dw = (target as f32 - new_w as f32) / 2.0;
    let dh = (target as f32 - new_h as f32) / 2.0;

    // ±0.1 让半像素的填充落到尾边
    let letterbox = Letterbox {
      scale,
      top: (dh - 0.1).round() as i32,
      bottom: (dh + 0.1).round() as i32,
      left: (dw - 0.1).round() as i32,
      right: (dw + 0.1).round() as i32,
    };

    Ok((letterbox, (new_w, new_h)))
  }
}

/// 缩放并填充到 `target x target`，返回 u8 图像
pub fn letterbox_image(image: &RgbImage, target: u32) -> Result<(RgbImage, Letterbox), DetectError> {
  let (width, height) = image.dimensions();
  let (letterbox, (new_w, new_h)) = Letterbox::compute(width, height, target)?;
  debug!(
    "letterbox: {}x{} -> {}x{}, 缩放 {:.4}, 填充 上{} 下{} 左{} 右{}",
    width,
    height,
    new_w,
    new_h,
    letterbox.scale,
    letterbox.top,
    letterbox.bottom,
    letterbox.left,
    letterbox.right
  );

  let out_w = new_w as i64 + letterbox.left as i64 + letterbox.right as i64;
  let out_h = new_h as i64 + letterbox.top as i64 + letterbox.bottom as i64;
  if out_w != target as i64 || out_h != target as i64 {
    return Err(DetectError::precondition(format!(
      "填充后尺寸 {}x{} 与目标 {} 不一致",
      out_w, out_h, target
    )));
  }

  let mut canvas = RgbImage::from_pixel(target, target, Rgb(LETTERBOX_FILL));
  if (new_w, new_h) == (width, height) {
    image::imageops::replace(&mut canvas, image, letterbox.left as i64, letterbox.top as i64);
  } else {
    let resized = image::imageops::resize(image, new_w, new_h, FilterType::Triangle);
    image::imageops::replace(
      &mut canvas,
      &resized,
      letterbox.left as i64,
      letterbox.top as i64,
    );
  }

  Ok((canvas, letterbox))
}

/// 预处理：letterbox 后转换为归一化的 RGB 网络输入
pub fn letterbox(image: &RgbImage, target: u32) -> Result<(InputBlob, Letterbox), DetectError> {
  let (canvas, letterbox) = letterbox_image(image, target)?;
  Ok((InputBlob::from_rgb_image(&canvas), letterbox))
}
