// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/restore.rs - 检测框坐标还原
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

use crate::model::{BBox, Letterbox};

/// 把 letterbox 空间中的框映射回原图，并裁剪到 `[0, 宽/高]`
///
/// 右、下边分别用右、下填充量还原，与填充时每条边各自的偏移对应。
pub fn restore_coordinates(bbox: BBox, letterbox: &Letterbox, original: (u32, u32)) -> BBox {
  let (width, height) = (original.0 as i32, original.1 as i32);
  let unpad = |v: i32, pad: i32| (v.saturating_sub(pad) as f32 / letterbox.scale).round() as i32;

  let x1 = unpad(bbox.left(), letterbox.left).clamp(0, width);
  let y1 = unpad(bbox.top(), letterbox.top).clamp(0, height);
  let x2 = unpad(bbox.right(), letterbox.right).clamp(0, width);
  let y2 = unpad(bbox.bottom(), letterbox.bottom).clamp(0, height);

  BBox::from_corners(x1, y1, x2, y2)
}

#[cfg(test)]
mod tests {
  use super::*;

  /// 原图到 letterbox 空间的正向映射
  fn forward(bbox: BBox, lb: &Letterbox) -> BBox {
    let map = |v: i32, pad: i32| (v as f32 * lb.scale).round() as i32 + pad;
    BBox::from_corners(
      map(bbox.left(), lb.left),
      map(bbox.top(), lb.top),
      map(bbox.right(), lb.left),
      map(bbox.bottom(), lb.top),
    )
  }

  fn assert_close(a: BBox, b: BBox, tol: i32) {
    for (x, y) in [
      (a.left(), b.left()),
      (a.top(), b.top()),
      (a.right(), b.right()),
      (a.bottom(), b.bottom()),
    ] {
      assert!((x - y).abs() <= tol, "{:?} vs {:?}", a, b);
    }
  }

  #[test]
  fn identity_transform_keeps_box() {
    let lb = Letterbox::compute(640, 640, 640).unwrap().0;
    let b = BBox::new(12, 34, 56, 78);
    assert_eq!(restore_coordinates(b, &lb, (640, 640)), b);
  }

  #[test]
  fn round_trip_within_one_pixel() {
    for (w, h) in [(1280, 720), (320, 200), (800, 600), (480, 640)] {
      let lb = Letterbox::compute(w, h, 640).unwrap().0;
      let original = BBox::new(w as i32 / 4, h as i32 / 4, w as i32 / 3, h as i32 / 5);
      let restored = restore_coordinates(forward(original, &lb), &lb, (w, h));
      assert_close(restored, original, 1);
    }
  }

  #[test]
  fn coordinates_are_clipped_to_image() {
    let lb = Letterbox::compute(1280, 720, 640).unwrap().0;
    // 完全落在上方填充区并越过右边界
    let b = BBox::new(600, 0, 100, 100);
    let r = restore_coordinates(b, &lb, (1280, 720));
    assert_eq!(r, BBox::new(1200, 0, 80, 0));
  }

  #[test]
  fn trailing_edges_use_trailing_padding() {
    let (lb, _) = Letterbox::compute(640, 319, 640).unwrap();
    assert_eq!((lb.top, lb.bottom), (160, 161));
    let b = BBox::new(0, 170, 10, 100);
    let r = restore_coordinates(b, &lb, (640, 319));
    // 上边减 160，下边减 161
    assert_eq!(r, BBox::new(0, 10, 10, 99));
  }

  #[test]
  fn saturated_edges_are_clipped() {
    let (lb, _) = Letterbox::compute(1280, 720, 640).unwrap();
    let restored = restore_coordinates(BBox::new(i32::MAX, 310, 100, 100), &lb, (1280, 720));
    assert_eq!(restored, BBox::new(1280, 340, 0, 200));
    let restored = restore_coordinates(BBox::new(i32::MIN, i32::MIN, 100, 100), &lb, (1280, 720));
    assert_eq!(restored, BBox::new(0, 0, 0, 0));
  }
}
