// 该文件是 Kanjian （看见） 项目的一部分。
// src/status.rs - 状态与错误通道
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

use std::fmt;

use thiserror::Error;

use crate::runtime::RuntimeError;

/// 检测流水线错误
///
/// 空检测结果不是错误，由 `Ok(vec![])` 表示。
#[derive(Error, Debug)]
pub enum DetectError {
  #[error("批大小必须为 1, 实际为 {0}")]
  InvalidBatchSize(usize),
  #[error("输入不满足前置条件: {0}")]
  PreconditionViolation(String),
  #[error("输出张量解码失败: {0}")]
  DecodeError(String),
  #[error("推理后端错误: {0}")]
  GatewayFailure(#[from] RuntimeError),
}

impl DetectError {
  pub fn precondition(msg: impl Into<String>) -> Self {
    DetectError::PreconditionViolation(msg.into())
  }

  pub fn decode(msg: impl Into<String>) -> Self {
    DetectError::DecodeError(msg.into())
  }

  /// 状态码，0 保留给成功
  pub fn code(&self) -> i32 {
    match self {
      DetectError::InvalidBatchSize(_) => 1,
      DetectError::PreconditionViolation(_) => 2,
      DetectError::DecodeError(_) => 3,
      DetectError::GatewayFailure(_) => 4,
    }
  }
}

/// 调用状态：状态码与可读消息
///
/// 消息由填充它的一方生成，调用方检查后需显式调用 [`Status::clear`] 释放，
/// 下一次使用不会隐式覆盖。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Status {
  code: i32,
  message: Option<String>,
}

impl Status {
  pub fn ok() -> Self {
    Self::default()
  }

  pub fn from_result<T>(result: &Result<T, DetectError>) -> Self {
    match result {
      Ok(_) => Self::ok(),
      Err(e) => Self::from(e),
    }
  }

  pub fn code(&self) -> i32 {
    self.code
  }

  pub fn message(&self) -> Option<&str> {
    self.message.as_deref()
  }

  pub fn is_ok(&self) -> bool {
    self.code == 0
  }

  /// 释放消息并重置为成功状态
  pub fn clear(&mut self) {
    self.message = None;
    self.code = 0;
  }
}

impl From<&DetectError> for Status {
  fn from(err: &DetectError) -> Self {
    Status {
      code: err.code(),
      message: Some(err.to_string()),
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.message {
      Some(msg) => write!(f, "[{}] {}", self.code, msg),
      None => write!(f, "[{}]", self.code),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn status_from_error_keeps_code_and_message() {
    let err = DetectError::InvalidBatchSize(4);
    let mut status = Status::from(&err);
    assert_eq!(status.code(), 1);
    assert!(!status.is_ok());
    assert!(status.message().unwrap().contains('4'));

    status.clear();
    assert!(status.is_ok());
    assert_eq!(status.message(), None);
  }

  #[test]
  fn status_from_ok_result_is_success() {
    let result: Result<usize, DetectError> = Ok(0);
    assert_eq!(Status::from_result(&result), Status::ok());
  }

  #[test]
  fn error_codes_are_distinct_and_nonzero() {
    let codes = [
      DetectError::InvalidBatchSize(2).code(),
      DetectError::precondition("x").code(),
      DetectError::decode("x").code(),
      DetectError::from(RuntimeError::ModelPathError("x".into())).code(),
    ];
    for (i, a) in codes.iter().enumerate() {
      assert_ne!(*a, 0);
      for b in codes.iter().skip(i + 1) {
        assert_ne!(a, b);
      }
    }
  }
}
