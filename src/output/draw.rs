// 该文件是 Kanjian （看见） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  label::ClassNames,
  model::{DetectResult, Detection},
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_HEIGHT_OFFSET: i32 = 5;
const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const TEXT_COLOR: [u8; 3] = [0, 0, 0];

/// 未指定字体时依次尝试的系统字体
pub const SYSTEM_FONTS: &[&str] = &[
  "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/TTF/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu/DejaVuSans.ttf",
  "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
  "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
  "/System/Library/Fonts/Supplemental/Arial.ttf",
  "/Library/Fonts/Arial.ttf",
  "C:\\Windows\\Fonts\\arial.ttf",
];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("无法读取字体文件: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

pub struct Draw {
  names: ClassNames,
  font: Option<FontVec>,
  font_size: f32,
  label_height_offset: i32,
  box_color: [u8; 3],
  text_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self::new(ClassNames::default())
  }
}

impl Draw {
  pub fn new(names: ClassNames) -> Self {
    Self {
      names,
      font: None,
      font_size: LABEL_FONT_SIZE,
      label_height_offset: LABEL_HEIGHT_OFFSET,
      box_color: BOX_COLOR,
      text_color: TEXT_COLOR,
    }
  }

  /// 加载 TTF/OTF 字体；没有字体时只绘制边框
  pub fn with_font_file(mut self, path: impl AsRef<Path>) -> Result<Self, DrawError> {
    let path = path.as_ref();
    info!("加载字体: {}", path.display());
    let data = std::fs::read(path)?;
    self.font = Some(FontVec::try_from_vec(data)?);
    Ok(self)
  }

  /// 依次尝试候选字体，使用第一个可用的；都不可用时只绘制边框
  pub fn with_first_font<P: AsRef<Path>>(mut self, candidates: impl IntoIterator<Item = P>) -> Self {
    for path in candidates {
      let path = path.as_ref();
      let Ok(data) = std::fs::read(path) else {
        continue;
      };
      match FontVec::try_from_vec(data) {
        Ok(font) => {
          info!("使用字体: {}", path.display());
          self.font = Some(font);
          return self;
        }
        Err(err) => debug!("跳过字体 {}: {}", path.display(), err),
      }
    }
    warn!("未找到可用字体，标签文本将不会绘制");
    self
  }

  pub fn with_system_font(self) -> Self {
    self.with_first_font(SYSTEM_FONTS)
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn names(&self) -> &ClassNames {
    &self.names
  }

  /// 标签文本，如 `person 0.87`
  pub fn label(&self, item: &Detection) -> String {
    format!("{} {:.2}", self.names.name(item.class_id), item.score)
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &Detection) {
    let bbox = item.bbox;
    if bbox.is_empty() {
      return;
    }

    let color = Rgb(self.box_color);
    let rect = Rect::at(bbox.x, bbox.y).of_size(bbox.width as u32, bbox.height as u32);
    draw_hollow_rect_mut(image, rect, color);

    let Some(font) = &self.font else {
      return;
    };

    let label = self.label(item);
    let scale = PxScale::from(self.font_size);
    let (text_w, text_h) = text_size(scale, font, &label);
    if text_w == 0 || text_h == 0 {
      return;
    }

    // 标签背景在边框左上角上方
    let label_top = bbox.y - text_h as i32 - self.label_height_offset;
    let background = Rect::at(bbox.x, label_top).of_size(text_w, text_h + self.label_height_offset as u32);
    draw_filled_rect_mut(image, background, color);
    draw_text_mut(image, Rgb(self.text_color), bbox.x, label_top, scale, font, &label);
  }

  pub fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.items.iter() {
      self.draw_bbox_with_label(image, item);
    }
  }

  pub fn draw_detection(&self, frame: &RgbImage, result: &DetectResult) -> RgbImage {
    let mut image = frame.clone();
    self.draw_detections_on_image(&mut image, result);
    image
  }
}

/// 把检测结果写成文本，每行一个目标: `名称或编号, 得分, x, y, w, h`
pub struct Record {
  pub label_with_name: bool,
  pub names: ClassNames,
}

impl Record {
  pub fn lines(&self, result: &DetectResult) -> Vec<String> {
    result
      .items
      .iter()
      .map(|item| {
        let name = if self.label_with_name {
          self.names.name(item.class_id).to_string()
        } else {
          item.class_id.to_string()
        };
        format!(
          "{}, {:.4}, {}, {}, {}, {}",
          name, item.score, item.bbox.x, item.bbox.y, item.bbox.width, item.bbox.height
        )
      })
      .collect()
  }

  pub fn record(&self, result: &DetectResult, path: &Path) -> Result<(), std::io::Error> {
    let path = path.with_extension("txt");
    debug!("写入检测记录: {}", path.display());
    std::fs::write(path, self.lines(result).join("\n"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BBox;

  fn result() -> DetectResult {
    DetectResult::from(vec![
      Detection {
        bbox: BBox::new(2, 3, 10, 6),
        score: 0.8765,
        class_id: 0,
      },
      Detection {
        bbox: BBox::new(0, 0, 0, 5),
        score: 0.5,
        class_id: 200,
      },
    ])
  }

  #[test]
  fn label_uses_name_and_two_decimals() {
    let draw = Draw::default();
    assert_eq!(draw.label(&result().items[0]), "person 0.88");
    assert_eq!(draw.label(&result().items[1]), "unknown 0.50");
  }

  #[test]
  fn draws_box_outline_without_font() {
    let frame = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
    let image = Draw::default().draw_detection(&frame, &result());
    assert_eq!(image.get_pixel(2, 3).0, BOX_COLOR);
    assert_eq!(image.get_pixel(11, 8).0, BOX_COLOR);
    assert_eq!(image.get_pixel(6, 5).0, [255, 255, 255]);
    // 原图不变
    assert_eq!(frame.get_pixel(2, 3).0, [255, 255, 255]);
  }

  #[test]
  fn record_lines() {
    let record = Record {
      label_with_name: true,
      names: ClassNames::default(),
    };
    let lines = record.lines(&result());
    assert_eq!(lines[0], "person, 0.8765, 2, 3, 10, 6");

    let record = Record {
      label_with_name: false,
      names: ClassNames::default(),
    };
    assert_eq!(record.lines(&result())[1], "200, 0.5000, 0, 0, 0, 5");
  }

  #[test]
  fn unusable_font_candidates_fall_back_to_outline() {
    let dir = tempfile::tempdir().unwrap();
    let garbage = dir.path().join("garbage.ttf");
    std::fs::write(&garbage, b"not a font").unwrap();
    let missing = dir.path().join("missing.ttf");

    let draw = Draw::default().with_first_font([&missing, &garbage]);
    assert!(!draw.has_font());

    let frame = RgbImage::from_pixel(20, 20, Rgb([255, 255, 255]));
    let image = draw.draw_detection(&frame, &result());
    assert_eq!(image.get_pixel(2, 3).0, BOX_COLOR);
  }

  #[test]
  fn invalid_font_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"not a font").unwrap();
    assert!(matches!(
      Draw::default().with_font_file(file.path()),
      Err(DrawError::InvalidFont(_))
    ));
  }
}
