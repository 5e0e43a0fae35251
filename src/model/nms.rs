// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/nms.rs - 按类别的非极大值抑制
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

use tracing::debug;

use crate::model::{BBox, Detection};

/// 每个类别的空间偏移量
///
/// 必须大于 letterbox 空间的最大边长，否则不同类别的框可能在偏移后重叠。
/// 超出该范围的输入属于已知限制。
pub const CLASS_OFFSET: i32 = 4096;

/// 与类别无关的贪心 NMS，返回保留下来的下标（按得分降序）
///
/// 只考虑 `score > score_threshold` 的框；同分按原始顺序。
/// 与已保留框的 IoU 大于 `iou_threshold` 的框被抑制。
pub fn nms_boxes(
  boxes: &[BBox],
  scores: &[f32],
  score_threshold: f32,
  iou_threshold: f32,
) -> Vec<usize> {
  debug_assert_eq!(boxes.len(), scores.len());

  let mut order: Vec<usize> = (0..boxes.len().min(scores.len()))
    .filter(|&i| scores[i] > score_threshold)
    .collect();
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut keep: Vec<usize> = Vec::new();
  for idx in order {
    let suppressed = keep
      .iter()
      .any(|&kept| boxes[idx].iou(&boxes[kept]) > iou_threshold);
    if !suppressed {
      keep.push(idx);
    }
  }
  keep
}

/// 按类别 NMS，返回 `detections` 中保留的下标
///
/// 每个框平移 `(class_id * CLASS_OFFSET, class_id * CLASS_OFFSET)`，
/// 不同类别互不重叠，一次与类别无关的 NMS 即等价于逐类别 NMS。
pub fn suppress(detections: &[Detection], score_threshold: f32, iou_threshold: f32) -> Vec<usize> {
  let (boxes, scores): (Vec<BBox>, Vec<f32>) = detections
    .iter()
    .map(|d| {
      let offset = i32::try_from(d.class_id)
        .unwrap_or(i32::MAX)
        .saturating_mul(CLASS_OFFSET);
      (d.bbox.translate(offset, offset), d.score)
    })
    .unzip();

  let keep = nms_boxes(&boxes, &scores, score_threshold, iou_threshold);
  debug!("NMS: {} 个候选保留 {} 个", detections.len(), keep.len());
  keep
}
