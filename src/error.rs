use serde::Serialize;
use thiserror::Error;

use crate::host::HostError;

/// Failure of a bridged call as seen by the renderer.
#[derive(Debug, Error)]
pub enum BridgeError {
  #[error("{entity} {id} not found")]
  NotFound {entity: &'static str, id: String},

  #[error("{0}")]
  PreconditionFailed(String),

  /// A host failure, passed through without rewrapping.
  #[error(transparent)]
  Underlying(#[from] HostError),

  #[error("invalid params for {method}: {reason}")]
  InvalidParams {method: String, reason: String},

  #[error("method not found: {0}")]
  MethodNotFound(String),

  #[error("serialization error: {0}")]
  Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
  pub code: String,
  pub message: String,
}

impl BridgeError {
  pub fn window_not_found(id: u64) -> Self {
    BridgeError::NotFound {entity: "Window", id: id.to_string()}
  }

  pub fn invalid_params(method: impl Into<String>, reason: impl Into<String>) -> Self {
    BridgeError::InvalidParams {method: method.into(), reason: reason.into()}
  }

  pub fn code(&self) -> String {
    match self {
      BridgeError::NotFound {..} => "NotFound".to_string(),
      BridgeError::PreconditionFailed(_) => "PreconditionFailed".to_string(),
      BridgeError::Underlying(e) => e.code.clone().unwrap_or_else(|| "Error".to_string()),
      BridgeError::InvalidParams {..} => "InvalidParams".to_string(),
      BridgeError::MethodNotFound(_) => "MethodNotFound".to_string(),
      BridgeError::Serialize(_) => "InternalError".to_string(),
    }
  }

  /// What the transport sends back in place of a result.
  pub fn payload(&self) -> ErrorPayload {
    ErrorPayload {code: self.code(), message: self.to_string()}
  }
}

pub type BridgeResult<T> = Result<T, BridgeError>;
