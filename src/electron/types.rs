use serde::{Deserialize, Serialize};

use crate::types::Rectangle;

/// One entry of `browserWindow.getAllWindows`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WindowInfo {
  pub id: u64,
  pub title: String,
  pub url: String,
  pub bounds: Rectangle,
  #[serde(rename = "isMaximized")]
  pub is_maximized: bool,
  #[serde(rename = "isMinimized")]
  pub is_minimized: bool,
  #[serde(rename = "isFullscreen")]
  pub is_fullscreen: bool,
  #[serde(rename = "isResizable")]
  pub is_resizable: bool,
  #[serde(rename = "isMovable")]
  pub is_movable: bool,
  #[serde(rename = "isClosable")]
  pub is_closable: bool,
  #[serde(rename = "isFocused")]
  pub is_focused: bool,
  #[serde(rename = "isVisible")]
  pub is_visible: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadItemRecord {
  pub id: String,
  pub url: String,
  pub filename: String,
  #[serde(rename = "totalBytes")]
  pub total_bytes: u64,
  #[serde(rename = "receivedBytes")]
  pub received_bytes: u64,
  #[serde(rename = "savePath")]
  pub save_path: String,
  pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WillDownloadEvent {
  pub item: DownloadItemRecord,
  #[serde(rename = "sessionHash")]
  pub session_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadProgressEvent {
  pub id: String,
  #[serde(rename = "receivedBytes")]
  pub received_bytes: u64,
  #[serde(rename = "totalBytes")]
  pub total_bytes: u64,
  pub state: String,
  #[serde(rename = "sessionHash")]
  pub session_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadDoneEvent {
  pub id: String,
  pub state: String,
  pub path: String,
  #[serde(rename = "sessionHash")]
  pub session_hash: String,
}

/// Payload of `systemPreferences.*notification` topics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationEvent {
  pub event: String,
  #[serde(rename = "userInfo")]
  pub user_info: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcceleratorEvent {
  pub accelerator: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileDialogOptions {
  pub title: Option<String>,
  #[serde(rename = "defaultPath")]
  pub default_path: Option<String>,
  #[serde(rename = "buttonLabel")]
  pub button_label: Option<String>,
  pub filters: Option<Vec<FileFilter>>,
  pub properties: Option<Vec<String>>,
  pub message: Option<String>,
}

impl FileDialogOptions {
  pub fn has(&self, property: &str) -> bool {
    self.properties.as_ref().is_some_and(|p| p.iter().any(|x| x == property))
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileFilter {
  pub name: String,
  pub extensions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageBoxOptions {
  #[serde(default)]
  pub message: String,
  #[serde(rename = "type")]
  pub msg_type: Option<String>,
  pub title: Option<String>,
  pub detail: Option<String>,
  pub buttons: Option<Vec<String>>,
  #[serde(rename = "cancelId")]
  pub cancel_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenDialogResult {
  pub canceled: bool,
  #[serde(rename = "filePaths")]
  pub file_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveDialogResult {
  pub canceled: bool,
  #[serde(rename = "filePath")]
  pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageBoxResult {
  pub response: i64,
  #[serde(rename = "checkboxChecked")]
  pub checkbox_checked: bool,
}
