//! The seam between the bridge and the embedding application's platform
//! objects (app singleton, windows, trays, sessions, ...).

use std::{fmt, io, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;

/// Failure raised by a host object. The bridge hands it to the caller as is.
#[derive(Debug, Clone, PartialEq)]
pub struct HostError {
  pub code: Option<String>,
  pub message: String,
}

impl HostError {
  pub fn new(message: impl Into<String>) -> Self {
    HostError {code: None, message: message.into()}
  }

  pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
    HostError {code: Some(code.into()), message: message.into()}
  }

  /// Node style error for a failed filesystem call, e.g.
  /// `ENOENT: no such file or directory, open '/tmp/x'`.
  pub fn from_io(e: &io::Error, syscall: &str, path: &str) -> Self {
    let (code, text) = io_code(e);
    HostError::with_code(code, format!("{}: {}, {} '{}'", code, text, syscall, path))
  }
}

fn io_code(e: &io::Error) -> (&'static str, &'static str) {
  use io::ErrorKind::*;
  match e.kind() {
    NotFound => ("ENOENT", "no such file or directory"),
    PermissionDenied => ("EACCES", "permission denied"),
    AlreadyExists => ("EEXIST", "file already exists"),
    NotADirectory => ("ENOTDIR", "not a directory"),
    IsADirectory => ("EISDIR", "illegal operation on a directory"),
    DirectoryNotEmpty => ("ENOTEMPTY", "directory not empty"),
    InvalidInput | InvalidData => ("EINVAL", "invalid argument"),
    Unsupported => ("ENOSYS", "function not implemented"),
    _ => ("EIO", "i/o error"),
  }
}

impl fmt::Display for HostError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.message)
  }
}

impl std::error::Error for HostError {}

impl From<io::Error> for HostError {
  fn from(e: io::Error) -> Self {
    let (code, _) = io_code(&e);
    HostError::with_code(code, e.to_string())
  }
}

pub type HostResult<T> = Result<T, HostError>;

pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;
pub type ListenerId = u64;

/// A platform object whose methods are reached by name.
///
/// Event support is optional: hosts without events keep the default `on`,
/// which never calls the listener.
#[async_trait]
pub trait HostObject: Send + Sync {
  async fn invoke(&self, method: &str, args: Vec<Value>) -> HostResult<Value>;

  fn on(&self, _event: &str, _listener: Listener) -> ListenerId {
    0
  }

  fn remove_listener(&self, _event: &str, _id: ListenerId) {}
}

/// Registry of live windows.
#[async_trait]
pub trait WindowHost: Send + Sync {
  async fn create(&self, options: Value) -> HostResult<u64>;
  fn from_id(&self, id: u64) -> Option<Arc<dyn HostObject>>;
  fn all_windows(&self) -> Vec<(u64, Arc<dyn HostObject>)>;
  fn focused_window(&self) -> Option<u64>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
  Progressing,
  Paused,
  Completed,
  Cancelled,
  Interrupted,
}

impl DownloadState {
  pub fn as_str(&self) -> &'static str {
    match self {
      DownloadState::Progressing => "progressing",
      DownloadState::Paused => "paused",
      DownloadState::Completed => "completed",
      DownloadState::Cancelled => "cancelled",
      DownloadState::Interrupted => "interrupted",
    }
  }
}

/// One download in flight, handed over by a session host.
pub trait DownloadItem: Send + Sync {
  fn url(&self) -> String;
  fn filename(&self) -> String;
  fn total_bytes(&self) -> u64;
  fn received_bytes(&self) -> u64;
  fn save_path(&self) -> String;
  fn state(&self) -> DownloadState;
  fn is_paused(&self) -> bool {
    self.state() == DownloadState::Paused
  }
  fn pause(&self);
  fn resume(&self);
  fn cancel(&self);
  fn set_save_path(&self, path: &str);
  fn on_updated(&self, listener: Box<dyn Fn() + Send + Sync>);
  /// Called once with the final state.
  fn on_done(&self, listener: Box<dyn Fn(DownloadState) + Send + Sync>);
}

pub type DownloadListener = Arc<dyn Fn(Arc<dyn DownloadItem>) + Send + Sync>;

pub trait SessionHost: HostObject {
  fn on_will_download(&self, listener: DownloadListener);
}
