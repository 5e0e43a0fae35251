// 该文件是 Kanjian （看见） 项目的一部分。
// src/model/decode.rs - 输出张量解码
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

use crate::{
  model::{BBox, Detection},
  runtime::RawTensor,
  status::DetectError,
};

// 每行: 0 中心 x, 1 中心 y, 2 宽, 3 高, 4 目标置信度, 5.. 类别置信度
const ITEM_ATTR_SIZE: usize = 5;
const OBJECT_CONFIDENCE_IDX: usize = 4;

/// 解码后的候选框，中心点形式，位于 letterbox 空间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedBox {
  pub center_x: f32,
  pub center_y: f32,
  pub width: f32,
  pub height: f32,
  pub score: f32,
  pub class_id: u32,
}

impl From<DecodedBox> for Detection {
  fn from(b: DecodedBox) -> Self {
    Detection {
      bbox: BBox::new(
        (b.center_x - b.width / 2.0).round() as i32,
        (b.center_y - b.height / 2.0).round() as i32,
        b.width.round() as i32,
        b.height.round() as i32,
      ),
      score: b.score,
      class_id: b.class_id,
    }
  }
}

/// 形状为 `[1, N, 5 + C]` 的张量中，取出 `(N, 5 + C)`
fn candidate_layout(tensor: &RawTensor) -> Result<(usize, usize), DetectError> {
  let shape = tensor.shape();
  if shape.len() != 3 {
    return Err(DetectError::decode(format!(
      "期望三维输出张量 [1, N, 5 + C], 实际形状 {:?}",
      shape
    )));
  }
  if shape[0] != 1 {
    return Err(DetectError::InvalidBatchSize(shape[0]));
  }

  let (num_rows, row_size) = (shape[1], shape[2]);
  if row_size <= ITEM_ATTR_SIZE {
    return Err(DetectError::decode(format!(
      "每个候选的属性数 {} 不足, 至少需要 {}",
      row_size,
      ITEM_ATTR_SIZE + 1
    )));
  }
  if tensor.data().len() != num_rows * row_size {
    return Err(DetectError::decode(format!(
      "张量数据长度 {} 与形状 {:?} 不符",
      tensor.data().len(),
      shape
    )));
  }

  Ok((num_rows, row_size))
}

/// 解码为中心点形式的候选框，不做 NMS
///
/// 只保留 `目标置信度 > confidence_threshold` 的行；`max_results > 0` 时
/// 按得分降序保留前 `max_results` 个，为 0 表示不限制。
pub fn decode_boxes(
  tensor: &RawTensor,
  confidence_threshold: f32,
  max_results: usize,
) -> Result<Vec<DecodedBox>, DetectError> {
  let (num_rows, row_size) = candidate_layout(tensor)?;

  let mut boxes = Vec::new();
  for row in tensor.data().chunks_exact(row_size).take(num_rows) {
    let object_confidence = row[OBJECT_CONFIDENCE_IDX];
    if object_confidence.is_nan() || object_confidence <= confidence_threshold {
      continue;
    }

    let (score, class_id) = row[ITEM_ATTR_SIZE..]
      .iter()
      .map(|&class_confidence| object_confidence * class_confidence)
      .enumerate()
      .fold((f32::NEG_INFINITY, 0usize), |best, (idx, score)| {
        if score > best.0 { (score, idx) } else { best }
      });

    boxes.push(DecodedBox {
      center_x: row[0],
      center_y: row[1],
      width: row[2],
      height: row[3],
      score,
      class_id: class_id as u32,
    });
  }

  debug!("{} 个候选中 {} 个通过置信度筛选", num_rows, boxes.len());

  if max_results > 0 && boxes.len() > max_results {
    // 稳定排序，同分保持原顺序
    boxes.sort_by(|a, b| b.score.total_cmp(&a.score));
    boxes.truncate(max_results);
    debug!("截断为前 {} 个候选", max_results);
  }

  Ok(boxes)
}

/// 解码为 [`Detection`]，检测框仍在 letterbox 空间
pub fn decode(
  tensor: &RawTensor,
  confidence_threshold: f32,
  max_results: usize,
) -> Result<Vec<Detection>, DetectError> {
  Ok(
    decode_boxes(tensor, confidence_threshold, max_results)?
      .into_iter()
      .map(Detection::from)
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use approx::assert_relative_eq;

  const NUM_CLASSES: usize = 3;

  fn row(cx: f32, cy: f32, w: f32, h: f32, obj: f32, cls: [f32; NUM_CLASSES]) -> Vec<f32> {
    let mut r = vec![cx, cy, w, h, obj];
    r.extend_from_slice(&cls);
    r
  }

  fn tensor(rows: &[Vec<f32>]) -> RawTensor {
    let data: Vec<f32> = rows.iter().flatten().copied().collect();
    RawTensor::new(vec![1, rows.len(), 5 + NUM_CLASSES], data)
  }

  #[test]
  fn nothing_above_threshold_is_empty_not_error() {
    let t = tensor(&[
      row(10.0, 10.0, 4.0, 4.0, 0.1, [1.0, 0.0, 0.0]),
      row(20.0, 20.0, 4.0, 4.0, 0.4, [0.0, 1.0, 0.0]),
    ]);
    let boxes = decode(&t, 0.4, 0).unwrap();
    assert!(boxes.is_empty());
  }

  #[test]
  fn threshold_is_strict() {
    let t = tensor(&[row(10.0, 10.0, 4.0, 4.0, 0.5, [1.0, 0.0, 0.0])]);
    assert!(decode_boxes(&t, 0.5, 0).unwrap().is_empty());
    assert_eq!(decode_boxes(&t, 0.49, 0).unwrap().len(), 1);
  }

  #[test]
  fn score_is_object_times_best_class() {
    let t = tensor(&[row(50.0, 60.0, 10.0, 20.0, 0.8, [0.1, 0.2, 0.5])]);
    let boxes = decode_boxes(&t, 0.25, 0).unwrap();
    assert_eq!(boxes.len(), 1);
    assert_eq!(boxes[0].class_id, 2);
    assert_relative_eq!(boxes[0].score, 0.8 * 0.5);
    assert_relative_eq!(boxes[0].center_x, 50.0);
  }

  #[test]
  fn class_ties_pick_first_class() {
    let t = tensor(&[row(5.0, 5.0, 2.0, 2.0, 0.9, [0.3, 0.3, 0.1])]);
    assert_eq!(decode_boxes(&t, 0.5, 0).unwrap()[0].class_id, 0);
  }

  #[test]
  fn max_results_keeps_top_k_scores() {
    let objs = [0.6, 0.95, 0.7, 0.99, 0.8];
    let rows: Vec<_> = objs
      .iter()
      .enumerate()
      .map(|(i, &o)| row(i as f32 * 10.0, 0.0, 4.0, 4.0, o, [1.0, 0.0, 0.0]))
      .collect();
    let t = tensor(&rows);

    let all = decode_boxes(&t, 0.5, 0).unwrap();
    assert_eq!(all.len(), 5);

    let top = decode_boxes(&t, 0.5, 2).unwrap();
    assert_eq!(top.len(), 2);
    assert_relative_eq!(top[0].score, 0.99);
    assert_relative_eq!(top[1].score, 0.95);

    let mut scores: Vec<f32> = all.iter().map(|b| b.score).collect();
    scores.sort_by(|a, b| b.total_cmp(a));
    let kept: Vec<f32> = decode_boxes(&t, 0.5, 3).unwrap().iter().map(|b| b.score).collect();
    assert_eq!(kept, scores[..3].to_vec());
  }

  #[test]
  fn max_results_not_exceeded_keeps_order() {
    let t = tensor(&[
      row(1.0, 0.0, 4.0, 4.0, 0.6, [1.0, 0.0, 0.0]),
      row(2.0, 0.0, 4.0, 4.0, 0.9, [1.0, 0.0, 0.0]),
    ]);
    let boxes = decode_boxes(&t, 0.5, 5).unwrap();
    assert_relative_eq!(boxes[0].center_x, 1.0);
    assert_relative_eq!(boxes[1].center_x, 2.0);
  }

  #[test]
  fn center_box_converts_to_rounded_corner_box() {
    let det = Detection::from(DecodedBox {
      center_x: 640.0,
      center_y: 360.0,
      width: 100.0,
      height: 50.0,
      score: 0.81,
      class_id: 0,
    });
    assert_eq!(det.bbox, BBox::new(590, 335, 100, 50));

    let det = Detection::from(DecodedBox {
      center_x: 10.3,
      center_y: 20.0,
      width: 5.0,
      height: 3.4,
      score: 0.5,
      class_id: 1,
    });
    assert_eq!(det.bbox, BBox::new(8, 18, 5, 3));
  }

  #[test]
  fn wrong_batch_size_is_rejected() {
    let t = RawTensor::new(vec![2, 1, 8], vec![0.0; 16]);
    assert!(matches!(
      decode(&t, 0.4, 0),
      Err(DetectError::InvalidBatchSize(2))
    ));
  }

  #[test]
  fn malformed_shape_is_decode_error() {
    let t = RawTensor::new(vec![1, 8], vec![0.0; 8]);
    assert!(matches!(decode(&t, 0.4, 0), Err(DetectError::DecodeError(_))));

    let t = RawTensor::new(vec![1, 2, 5], vec![0.0; 10]);
    assert!(matches!(decode(&t, 0.4, 0), Err(DetectError::DecodeError(_))));

    let t = RawTensor::new(vec![1, 2, 8], vec![0.0; 15]);
    assert!(matches!(decode(&t, 0.4, 0), Err(DetectError::DecodeError(_))));
  }

  #[test]
  fn empty_candidate_set_is_fine() {
    let t = RawTensor::new(vec![1, 0, 85], Vec::new());
    assert!(decode(&t, 0.4, 0).unwrap().is_empty());
  }
}
