use std::sync::Arc;

use crate::{events::{Binding, Payload}, host::HostObject, schema::{forward_operations, Operation, Shape, Singleton}, Bridge};

use super::bind_singleton;

pub static OPERATIONS: &[Operation] = &[
  // resolves to the device token
  Operation::new("registerForAPNSNotifications", &[]),
  Operation::new("unregisterForAPNSNotifications", &[]).shaped(Shape::Unit),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("received-apns-notification", Payload::First),
];

pub fn register(bridge: &Bridge, push: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "pushNotifications", Arc::new(Singleton(push.clone())), OPERATIONS);
  bind_singleton(bridge, &push, "pushNotifications", BINDINGS);
}
