// 该文件是 Kanjian （看见） 项目的一部分。
// src/frame.rs - 网络输入帧定义
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

use image::RgbImage;

const RGB_CHANNELS: usize = 3;

/// 归一化后的网络输入，NHWC 排布，批大小固定为 1
#[derive(Debug, Clone)]
pub struct InputBlob {
  data: Box<[f32]>,
  height: usize,
  width: usize,
}

impl InputBlob {
  /// 由 RGB 图像生成输入，像素值缩放到 [0, 1]
  pub fn from_rgb_image(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    let data = image
      .as_raw()
      .iter()
      .map(|&v| v as f32 / 255.0)
      .collect::<Vec<_>>()
      .into_boxed_slice();

    Self {
      data,
      height: height as usize,
      width: width as usize,
    }
  }

  pub fn batch(&self) -> usize {
    1
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  /// 像素优先排布：`(y * width + x) * channels + c`
  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, y: usize, x: usize, c: usize) -> f32 {
    self.data[(y * self.width + x) * RGB_CHANNELS + c]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;
  use image::Rgb;

  #[test]
  fn blob_is_normalized_and_pixel_major() {
    let mut image = RgbImage::new(2, 1);
    image.put_pixel(0, 0, Rgb([255, 0, 51]));
    image.put_pixel(1, 0, Rgb([114, 114, 114]));

    let blob = InputBlob::from_rgb_image(&image);
    assert_eq!((blob.batch(), blob.channels()), (1, 3));
    assert_eq!((blob.height(), blob.width()), (1, 2));
    assert_eq!(blob.as_nhwc().len(), 6);
    assert_relative_eq!(blob.get(0, 0, 0), 1.0);
    assert_relative_eq!(blob.get(0, 0, 1), 0.0);
    assert_relative_eq!(blob.get(0, 0, 2), 0.2);
    assert_relative_eq!(blob.get(0, 1, 1), 114.0 / 255.0);
  }
}
