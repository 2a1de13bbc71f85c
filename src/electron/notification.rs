use std::sync::Arc;

use crate::{events::{Binding, Payload}, host::HostObject, schema::{Operation, Shape}, Bridge};

use super::InstanceModule;

pub static OPERATIONS: &[Operation] = &[
  Operation::new("show", &[]).shaped(Shape::Unit),
  Operation::new("close", &[]).shaped(Shape::Unit),
  Operation::new("getTitle", &[]),
  Operation::new("getSubtitle", &[]),
  Operation::new("getBody", &[]),
  Operation::new("getSilent", &[]),
  Operation::new("getReplyPlaceholder", &[]),
  Operation::new("getSound", &[]),
  Operation::new("getCloseButtonText", &[]),
  Operation::new("getHasReply", &[]),
  Operation::new("getUrgency", &[]),
  Operation::new("getTimeoutType", &[]),
  Operation::new("getActions", &[]),
  Operation::new("getToastXml", &[]),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("show", Payload::Empty),
  Binding::new("click", Payload::Empty),
  Binding::new("close", Payload::Empty),
  Binding::new("reply", Payload::First),
  Binding::new("action", Payload::First),
  Binding::new("failed", Payload::First),
];

pub fn register(bridge: &Bridge, notification: Option<Arc<dyn HostObject>>) -> Arc<InstanceModule> {
  let module = InstanceModule::register(bridge, "notification", "Notification instance not provided", OPERATIONS, BINDINGS);
  if let Some(notification) = notification {
    module.attach(notification);
  }
  module
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{config::BridgeConfig, error::BridgeError, rpc::ChannelPublisher, testing::FakeHost};

  #[tokio::test]
  async fn late_attach_and_raw_payloads() {
    let (p, mut rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let module = register(&bridge, None);
    assert!(matches!(bridge.call("notification.show", vec![]).await, Err(BridgeError::PreconditionFailed(_))));

    let n = Arc::new(FakeHost::new());
    n.returns("getBody", json!("hello"));
    module.attach(n.clone());
    assert_eq!(bridge.call("notification.getBody", vec![]).await.unwrap(), json!("hello"));

    n.emit("reply", &[json!("thanks")]);
    n.emit("action", &[json!(1)]);
    let reply = rx.try_recv().unwrap();
    assert_eq!((reply.topic.as_str(), reply.payload), ("notification.reply", Some(json!("thanks"))));
    assert_eq!(rx.try_recv().unwrap().payload, Some(json!(1)));
  }
}
