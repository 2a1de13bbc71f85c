use std::{io::Write, path::Path, sync::Arc};

use async_trait::async_trait;
use log::trace;
use serde_json::Value;

use crate::{host::{HostError, HostObject, HostResult}, schema::{forward_operations, Lit, Operation, Param, Shape, Singleton}, Bridge};

pub static OPERATIONS: &[Operation] = &[
  Operation::new("openExternal", &[Param::string("url"), Param::object("options").optional()]).shaped(Shape::Unit),
  // resolves to an error message, empty on success
  Operation::new("openPath", &[Param::string("path")]),
  Operation::new("showItemInFolder", &[Param::string("path")]).shaped(Shape::Unit),
  Operation::new("beep", &[]).shaped(Shape::Unit),
  Operation::new("trashItem", &[Param::string("path")]).shaped(Shape::Unit),
  Operation::new("writeShortcutLink", &[Param::string("shortcutPath"), Param::string("operation").or(Lit::Str("create")), Param::object("options").optional()]),
  Operation::new("readShortcutLink", &[Param::string("shortcutPath")]),
];

pub fn register(bridge: &Bridge, shell: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "shell", Arc::new(Singleton(shell)), OPERATIONS);
}

/// Shell host for when the embedder has none: hands paths and URLs to the
/// desktop's default handlers.
#[derive(Default)]
pub struct SystemShell;

fn text(args: &[Value], i: usize) -> String {
  args.get(i).and_then(Value::as_str).unwrap_or_default().to_string()
}

fn unsupported(method: &str) -> HostError {
  HostError::with_code("ENOSYS", format!("shell.{} is not supported on this platform", method))
}

#[async_trait]
impl HostObject for SystemShell {
  async fn invoke(&self, method: &str, args: Vec<Value>) -> HostResult<Value> {
    trace!("system shell {}", method);
    match method {
      "openExternal" => {
        open::that_detached(text(&args, 0))?;
        Ok(Value::Null)
      },
      "openPath" => {
        let path = text(&args, 0);
        if !Path::new(&path).exists() {
          return Ok(Value::String(format!("Failed to open path {}", path)));
        }
        Ok(Value::String(open::that_detached(&path).err().map(|e| e.to_string()).unwrap_or_default()))
      },
      "showItemInFolder" => {
        let path = text(&args, 0);
        let folder = Path::new(&path).parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        open::that_detached(folder)?;
        Ok(Value::Null)
      },
      "beep" => {
        let mut err = std::io::stderr();
        err.write_all(b"\x07")?;
        err.flush()?;
        Ok(Value::Null)
      },
      other => Err(unsupported(other)),
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{config::BridgeConfig, error::BridgeError, rpc::ChannelPublisher, testing::FakeHost};

  #[tokio::test]
  async fn shortcut_operation_defaults_to_create() {
    let (p, _rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let host = Arc::new(FakeHost::new());
    host.returns("writeShortcutLink", json!(true));
    register(&bridge, host.clone());
    assert_eq!(bridge.call("shell.writeShortcutLink", vec![json!("C:\\a.lnk")]).await.unwrap(), json!(true));
    assert_eq!(host.calls()[0].1, vec![json!("C:\\a.lnk"), json!("create")]);
    bridge.call("shell.writeShortcutLink", vec![json!("C:\\a.lnk"), json!("update"), json!({"target": "x"})]).await.unwrap();
    assert_eq!(host.calls()[1].1, vec![json!("C:\\a.lnk"), json!("update"), json!({"target": "x"})]);
  }

  #[tokio::test]
  async fn system_shell_reports_unsupported_calls() {
    let (p, _rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    register(&bridge, Arc::new(SystemShell));
    match bridge.call("shell.readShortcutLink", vec![json!("C:\\a.lnk")]).await {
      Err(BridgeError::Underlying(e)) => assert_eq!(e.code.as_deref(), Some("ENOSYS")),
      other => panic!("unexpected {:?}", other),
    }
    let missing = bridge.call("shell.openPath", vec![json!("/definitely/not/here")]).await.unwrap();
    assert_eq!(missing, json!("Failed to open path /definitely/not/here"));
  }
}
