use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde_json::{json, Value};

use crate::{events::{Binding, Payload}, host::HostObject, schema::{forward_operations, Operation, Param, Shape, Singleton}, Bridge};

use super::bind_singleton;

pub static OPERATIONS: &[Operation] = &[
  Operation::new("checkForUpdates", &[]).shaped(Shape::Unit),
  Operation::new("quitAndInstall", &[]).shaped(Shape::Unit),
  Operation::new("setFeedURL", &[Param::object("options")]).shaped(Shape::Unit),
  Operation::new("getFeedURL", &[]),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("checking-for-update", Payload::Empty),
  Binding::new("update-available", Payload::Empty),
  Binding::new("update-not-available", Payload::Empty),
  Binding::new("update-downloaded", Payload::Custom(update_downloaded)),
  Binding::new("error", Payload::Custom(update_error)),
  Binding::new("before-quit-for-update", Payload::Empty),
];

/// `releaseDate` leaves as an ISO 8601 string whether the host reports it as
/// text or as epoch milliseconds.
fn update_downloaded(args: &[Value]) -> Option<Value> {
  let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Null);
  let release_date = match args.get(2) {
    Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis)
      .map(|d| json!(d.to_rfc3339_opts(SecondsFormat::Millis, true)))
      .unwrap_or(Value::Null),
    Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
      .map(|d| json!(d.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)))
      .unwrap_or_else(|_| json!(s)),
    _ => Value::Null,
  };
  Some(json!({"releaseNotes": arg(0), "releaseName": arg(1), "releaseDate": release_date, "updateURL": arg(3)}))
}

fn update_error(args: &[Value]) -> Option<Value> {
  Some(match args.first() {
    Some(Value::String(message)) => json!({"message": message, "stack": Value::Null}),
    Some(e) => json!({
      "message": e.get("message").cloned().unwrap_or(Value::Null),
      "stack": e.get("stack").cloned().unwrap_or(Value::Null),
    }),
    None => json!({"message": Value::Null, "stack": Value::Null}),
  })
}

/// Registers the calls; event listeners go onto the host only the first time
/// per bridge.
pub fn register(bridge: &Bridge, updater: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "autoUpdater", Arc::new(Singleton(updater.clone())), OPERATIONS);
  if !bridge.claim_once("autoUpdater") {
    warn!("autoUpdater listeners already registered");
    return;
  }
  bind_singleton(bridge, &updater, "autoUpdater", BINDINGS);
}
