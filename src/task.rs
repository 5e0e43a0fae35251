// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 推理任务
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

use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::{model::Model, output::Render};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 取一帧，推理一次，渲染一次
pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    let now = Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一帧重复推理，统计平均耗时（跳过前两次）
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, mut model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat_times);
    let mut last = None;
    for i in 0..self.repeat_times {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(result);
    }

    if let Some(result) = last {
      output.render_result(&frame, &result)?;
    }

    if times.len() > 2 {
      warn!(
        "平均推理时间: {:.2?}",
        times.iter().skip(2).sum::<Duration>() / (times.len() - 2) as u32
      );
    }

    Ok(())
  }
}

/// 不输出任何内容
pub struct Discard;

impl<F, D> Render<F, D> for Discard {
  type Error = std::convert::Infallible;

  fn render_result(&self, _frame: &F, _result: &D) -> Result<(), Self::Error> {
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::Cell;

  #[derive(Debug, thiserror::Error)]
  #[error("boom")]
  struct Boom;

  struct Doubler {
    fail: bool,
  }

  impl Model for Doubler {
    type Input = u32;
    type Output = u32;
    type Error = Boom;

    fn infer(&mut self, input: &u32) -> Result<u32, Boom> {
      if self.fail { Err(Boom) } else { Ok(input * 2) }
    }
  }

  struct Capture<'a>(&'a Cell<Option<u32>>);

  impl Render<u32, u32> for Capture<'_> {
    type Error = std::convert::Infallible;

    fn render_result(&self, _frame: &u32, result: &u32) -> Result<(), Self::Error> {
      self.0.set(Some(*result));
      Ok(())
    }
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let seen = Cell::new(None);
    OneShotTask
      .run_task(
        vec![21u32, 5].into_iter(),
        Doubler { fail: false },
        Capture(&seen),
      )
      .unwrap();
    assert_eq!(seen.get(), Some(42));
  }

  #[test]
  fn one_shot_without_input_fails() {
    let seen = Cell::new(None);
    let model = Doubler { fail: false };
    assert!(
      OneShotTask
        .run_task(std::iter::empty::<u32>(), model, Capture(&seen))
        .is_err()
    );
  }

  #[test]
  fn model_error_propagates() {
    let model = Doubler { fail: true };
    let err = OneShotTask
      .run_task(vec![1u32].into_iter(), model, Discard)
      .unwrap_err();
    assert_eq!(err.to_string(), "boom");
  }

  #[test]
  fn repeat_shot_renders_last_result() {
    let seen = Cell::new(None);
    RepeatShotTask::default()
      .with_repeat_times(5)
      .run_task(
        vec![3u32].into_iter(),
        Doubler { fail: false },
        Capture(&seen),
      )
      .unwrap();
    assert_eq!(seen.get(), Some(6));
  }
}
