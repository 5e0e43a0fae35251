// 该文件是 Kanjian （看见） 项目的一部分。
// src/model.rs - 模型与检测结果
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 轴对齐的整数像素矩形
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BBox {
  pub x: i32,
  pub y: i32,
  pub width: i32,
  pub height: i32,
}

impl BBox {
  pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }

  /// 由两个角点构造，角点顺序任意
  pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
    Self {
      x: x1.min(x2),
      y: y1.min(y2),
      width: span(x1, x2),
      height: span(y1, y2),
    }
  }

  pub fn left(&self) -> i32 {
    self.x
  }

  pub fn top(&self) -> i32 {
    self.y
  }

  /// 坐标在 `i32` 边界处饱和
  pub fn right(&self) -> i32 {
    self.x.saturating_add(self.width)
  }

  pub fn bottom(&self) -> i32 {
    self.y.saturating_add(self.height)
  }

  pub fn area(&self) -> i64 {
    self.width as i64 * self.height as i64
  }

  pub fn is_empty(&self) -> bool {
    self.width <= 0 || self.height <= 0
  }

  pub fn translate(&self, dx: i32, dy: i32) -> Self {
    Self {
      x: self.x.saturating_add(dx),
      y: self.y.saturating_add(dy),
      ..*self
    }
  }

  /// 交集，无重叠时返回空矩形
  pub fn intersection(&self, other: &BBox) -> BBox {
    let x1 = self.left().max(other.left());
    let y1 = self.top().max(other.top());
    let x2 = self.right().min(other.right());
    let y2 = self.bottom().min(other.bottom());
    if x2 <= x1 || y2 <= y1 {
      return BBox::default();
    }
    BBox::new(x1, y1, span(x1, x2), span(y1, y2))
  }

  /// 交并比；两个矩形面积都为 0 时视为完全重叠
  pub fn iou(&self, other: &BBox) -> f32 {
    let area_a = self.area();
    let area_b = other.area();
    let total = area_a as f64 + area_b as f64;
    if total <= 0.0 {
      return 1.0;
    }
    let inter = self.intersection(other).area() as f64;
    (inter / (total - inter)) as f32
  }
}

fn span(a: i32, b: i32) -> i32 {
  i32::try_from(a.abs_diff(b)).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: BBox,
  pub score: f32,
  pub class_id: u32,
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

pub mod decode;
pub mod letterbox;
pub mod nms;
pub mod restore;
mod yolov5;

pub use self::decode::{DecodedBox, decode, decode_boxes};
pub use self::letterbox::{LETTERBOX_FILL, Letterbox, letterbox, letterbox_image};
pub use self::nms::{CLASS_OFFSET, nms_boxes, suppress};
pub use self::restore::restore_coordinates;
pub use self::yolov5::{DetectConfig, Yolov5, Yolov5Builder};
