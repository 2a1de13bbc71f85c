use std::sync::Arc;

use crate::{events::{Binding, Payload}, host::HostObject, schema::{forward_operations, Operation, Param, Singleton}, Bridge};

use super::bind_singleton;

pub static OPERATIONS: &[Operation] = &[
  Operation::new("getSystemIdleState", &[Param::integer("idleThreshold")]),
  Operation::new("getSystemIdleTime", &[]),
  Operation::new("getCurrentThermalState", &[]),
  Operation::new("isOnBatteryPower", &[]),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("suspend", Payload::Empty),
  Binding::new("resume", Payload::Empty),
  Binding::new("on-ac", Payload::Empty),
  Binding::new("on-battery", Payload::Empty),
  Binding::new("thermal-state-change", Payload::Named(&["state"])),
  Binding::new("speed-limit-change", Payload::Named(&["limit"])),
  Binding::new("shutdown", Payload::Empty),
  Binding::new("lock-screen", Payload::Empty),
  Binding::new("unlock-screen", Payload::Empty),
  Binding::new("user-did-become-active", Payload::Empty),
  Binding::new("user-did-resign-active", Payload::Empty),
];

pub fn register(bridge: &Bridge, power_monitor: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "powerMonitor", Arc::new(Singleton(power_monitor.clone())), OPERATIONS);
  bind_singleton(bridge, &power_monitor, "powerMonitor", BINDINGS);
}
