use std::sync::Arc;

use crate::{host::HostObject, schema::{forward_operations, Operation, Param, Shape, Singleton}, Bridge};

pub static OPERATIONS: &[Operation] = &[
  Operation::new("showOpenDialog", &[Param::object("options").optional()]),
  Operation::new("showSaveDialog", &[Param::object("options").optional()]),
  Operation::new("showMessageBox", &[Param::object("options").optional()]),
  Operation::new("showErrorBox", &[Param::string("title"), Param::string("content")]).shaped(Shape::Unit),
];

pub fn register(bridge: &Bridge, dialog: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "dialog", Arc::new(Singleton(dialog)), OPERATIONS);
}

#[cfg(feature = "native-dialogs")]
pub use native::NativeDialogs;

/// Dialog host on top of the platform's own file and message dialogs.
#[cfg(feature = "native-dialogs")]
mod native {
  use std::path::Path;

  use async_trait::async_trait;
  use log::trace;
  use rfd::{AsyncFileDialog, AsyncMessageDialog, MessageButtons, MessageDialogResult, MessageLevel};
  use serde_json::Value;

  use crate::{electron::types::{FileDialogOptions, MessageBoxOptions, MessageBoxResult, OpenDialogResult, SaveDialogResult}, host::{HostError, HostObject, HostResult}};

  #[derive(Default)]
  pub struct NativeDialogs;

  fn options<T: serde::de::DeserializeOwned + Default>(args: Vec<Value>) -> HostResult<T> {
    match args.into_iter().next() {
      None | Some(Value::Null) => Ok(T::default()),
      Some(v) => serde_json::from_value(v).map_err(|e| HostError::new(format!("invalid dialog options: {}", e))),
    }
  }

  fn file_dialog(options: &FileDialogOptions) -> AsyncFileDialog {
    let mut fd = AsyncFileDialog::new();
    if let Some(filters) = &options.filters {
      for filter in filters {
        let ext: Vec<&str> = filter.extensions.iter().map(|e| &**e).collect();
        fd = fd.add_filter(&filter.name, &ext);
      }
    }
    if let Some(title) = &options.title {
      fd = fd.set_title(title);
    }
    if let Some(default_path) = &options.default_path {
      let path = Path::new(default_path);
      if path.is_dir() {
        fd = fd.set_directory(path);
      } else {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
          fd = fd.set_directory(dir);
        }
        if let Some(name) = path.file_name() {
          fd = fd.set_file_name(name.to_string_lossy());
        }
      }
    }
    if options.has("createDirectory") {
      fd = fd.set_can_create_directories(true);
    }
    fd
  }

  async fn show_open(options: FileDialogOptions) -> OpenDialogResult {
    let fd = file_dialog(&options);
    let multi = options.has("multiSelections");
    let picked = if options.has("openDirectory") {
      if multi {
        fd.pick_folders().await.unwrap_or_default()
      } else {
        fd.pick_folder().await.into_iter().collect()
      }
    } else if multi {
      fd.pick_files().await.unwrap_or_default()
    } else {
      fd.pick_file().await.into_iter().collect()
    };
    let file_paths: Vec<String> = picked.iter().map(|h| h.path().to_string_lossy().to_string()).collect();
    OpenDialogResult {canceled: file_paths.is_empty(), file_paths}
  }

  async fn show_message(options: MessageBoxOptions) -> MessageBoxResult {
    let mut dialog = AsyncMessageDialog::new();
    let mut desc = options.message;
    if let Some(detail) = options.detail {
      desc = desc + " - " + detail.as_str();
    }
    dialog = dialog.set_description(desc);
    if let Some(title) = &options.title {
      dialog = dialog.set_title(title.as_str());
    }
    dialog = match options.msg_type.as_deref() {
      Some("error") => dialog.set_level(MessageLevel::Error),
      Some("warning") => dialog.set_level(MessageLevel::Warning),
      Some("info") => dialog.set_level(MessageLevel::Info),
      _ => dialog,
    };
    let buttons = options.buttons.unwrap_or_default();
    dialog = match buttons.as_slice() {
      [] => dialog,
      [ok] => dialog.set_buttons(MessageButtons::OkCustom(ok.clone())),
      [ok, cancel] => dialog.set_buttons(MessageButtons::OkCancelCustom(ok.clone(), cancel.clone())),
      [yes, no, cancel, ..] => dialog.set_buttons(MessageButtons::YesNoCancelCustom(yes.clone(), no.clone(), cancel.clone())),
    };
    let cancel_id = options.cancel_id.unwrap_or(if buttons.len() > 1 { 1 } else { 0 });
    let response = match dialog.show().await {
      MessageDialogResult::Custom(label) => buttons.iter().position(|b| *b == label).map(|i| i as i64).unwrap_or(cancel_id),
      MessageDialogResult::Ok | MessageDialogResult::Yes => 0,
      MessageDialogResult::No => 1,
      MessageDialogResult::Cancel => cancel_id,
    };
    MessageBoxResult {response, checkbox_checked: false}
  }

  #[async_trait]
  impl HostObject for NativeDialogs {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> HostResult<Value> {
      trace!("native dialog {}", method);
      let res = match method {
        "showOpenDialog" => serde_json::to_value(show_open(options(args)?).await),
        "showSaveDialog" => {
          let options: FileDialogOptions = options(args)?;
          let file_path = file_dialog(&options).save_file().await.map(|h| h.path().to_string_lossy().to_string());
          serde_json::to_value(SaveDialogResult {canceled: file_path.is_none(), file_path})
        },
        "showMessageBox" => serde_json::to_value(show_message(options(args)?).await),
        "showErrorBox" => {
          let mut args = args.into_iter().map(|a| a.as_str().unwrap_or_default().to_string());
          let title = args.next().unwrap_or_default();
          let content = args.next().unwrap_or_default();
          AsyncMessageDialog::new().set_level(MessageLevel::Error).set_title(title.as_str()).set_description(content).show().await;
          Ok(Value::Null)
        },
        other => return Err(HostError::new(format!("dialog.{} is not supported", other))),
      };
      res.map_err(|e| HostError::new(e.to_string()))
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::{json, Value};

  use super::*;
  use crate::{config::BridgeConfig, error::BridgeError, rpc::ChannelPublisher, testing::FakeHost};

  #[tokio::test]
  async fn dialogs_forward_options() {
    let (p, _rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let host = Arc::new(FakeHost::new());
    host.returns("showOpenDialog", json!({"canceled": false, "filePaths": ["/tmp/a"]}));
    register(&bridge, host.clone());
    let res = bridge.call("dialog.showOpenDialog", vec![json!({"properties": ["openFile"]})]).await.unwrap();
    assert_eq!(res["filePaths"], json!(["/tmp/a"]));
    assert_eq!(bridge.call("dialog.showErrorBox", vec![json!("Oops"), json!("broken")]).await.unwrap(), Value::Null);
    assert_eq!(host.calls()[1], ("showErrorBox".to_string(), vec![json!("Oops"), json!("broken")]));
    assert!(matches!(bridge.call("dialog.showErrorBox", vec![json!("Oops")]).await, Err(BridgeError::InvalidParams {..})));
  }
}
