use std::sync::Arc;

use crate::{host::HostObject, schema::{forward_operations, Operation, Param, Singleton}, Bridge};

pub static OPERATIONS: &[Operation] = &[
  // prevent-app-suspension or prevent-display-sleep
  Operation::new("start", &[Param::string("type")]),
  Operation::new("stop", &[Param::integer("id")]),
  Operation::new("isStarted", &[Param::integer("id")]),
];

pub fn register(bridge: &Bridge, blocker: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "powerSaveBlocker", Arc::new(Singleton(blocker)), OPERATIONS);
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{config::BridgeConfig, rpc::ChannelPublisher, testing::FakeHost};

  #[tokio::test]
  async fn start_returns_host_id() {
    let (p, _rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let host = Arc::new(FakeHost::new());
    host.returns("start", json!(3));
    host.returns("isStarted", json!(true));
    register(&bridge, host.clone());
    assert_eq!(bridge.call("powerSaveBlocker.start", vec![json!("prevent-display-sleep")]).await.unwrap(), json!(3));
    assert_eq!(bridge.call("powerSaveBlocker.isStarted", vec![json!(3)]).await.unwrap(), json!(true));
  }
}
