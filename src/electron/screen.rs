use std::sync::Arc;

use crate::{events::{Binding, Payload}, host::HostObject, schema::{forward_operations, Operation, Param, Singleton}, Bridge};

use super::bind_singleton;

pub static OPERATIONS: &[Operation] = &[
  Operation::new("getCursorScreenPoint", &[]),
  Operation::new("getPrimaryDisplay", &[]),
  Operation::new("getAllDisplays", &[]),
  Operation::new("getDisplayNearestPoint", &[Param::object("point")]),
  Operation::new("getDisplayMatching", &[Param::object("rect")]),
  Operation::new("screenToDipPoint", &[Param::object("point")]),
  Operation::new("dipToScreenPoint", &[Param::object("point")]),
  // a null window id means the display nearest to rect
  Operation::new("screenToDipRect", &[Param::integer("windowId").nullable(), Param::object("rect")]),
  Operation::new("dipToScreenRect", &[Param::integer("windowId").nullable(), Param::object("rect")]),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("display-added", Payload::First),
  Binding::new("display-removed", Payload::First),
  Binding::new("display-metrics-changed", Payload::Named(&["display", "changedMetrics"])),
];

pub fn register(bridge: &Bridge, screen: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "screen", Arc::new(Singleton(screen.clone())), OPERATIONS);
  bind_singleton(bridge, &screen, "screen", BINDINGS);
}

#[cfg(test)]
mod tests {
  use serde_json::{json, Value};

  use super::*;
  use crate::{config::BridgeConfig, error::BridgeError, rpc::ChannelPublisher, testing::FakeHost};

  #[tokio::test]
  async fn rect_conversion_takes_null_window() {
    let (p, mut rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let host = Arc::new(FakeHost::new());
    register(&bridge, host.clone());
    let rect = json!({"x": 0, "y": 0, "width": 10, "height": 10});
    bridge.call("screen.screenToDipRect", vec![Value::Null, rect.clone()]).await.unwrap();
    assert_eq!(host.calls()[0].1, vec![Value::Null, rect.clone()]);
    assert!(matches!(bridge.call("screen.screenToDipRect", vec![rect]).await, Err(BridgeError::InvalidParams {..})));

    host.emit("display-metrics-changed", &[json!({"id": 1}), json!(["bounds"])]);
    assert_eq!(rx.try_recv().unwrap().payload, Some(json!({"display": {"id": 1}, "changedMetrics": ["bounds"]})));
  }
}
