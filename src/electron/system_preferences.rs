//! System preferences. Notification subscriptions get ids issued here; the
//! host's own subscription ids stay on this side. The host delivers a
//! matching notification through the `notification`, `local-notification` or
//! `workspace-notification` event with `(hostId, event, userInfo)`.

use std::{collections::HashMap, sync::{atomic::{AtomicU64, Ordering}, Arc, Mutex}};

use log::{debug, trace};
use serde_json::{json, Value};

use crate::{error::BridgeResult, events::{Binding, Payload}, host::{HostObject, Listener}, rpc::Publisher, schema::{forward_operations, Lit, Operation, Param, Shape, Singleton}, Bridge};

use super::{bind_singleton, types::NotificationEvent};

pub static OPERATIONS: &[Operation] = &[
  Operation::new("isSwipeTrackingFromScrollEventsEnabled", &[]),
  Operation::new("postNotification", &[Param::string("event"), Param::object("userInfo").optional(), Param::bool("deliverImmediately").optional()]).shaped(Shape::Unit),
  Operation::new("postLocalNotification", &[Param::string("event"), Param::object("userInfo").optional()]).shaped(Shape::Unit),
  Operation::new("postWorkspaceNotification", &[Param::string("event"), Param::object("userInfo").optional()]).shaped(Shape::Unit),
  Operation::new("registerDefaults", &[Param::object("defaults")]).shaped(Shape::Unit),
  Operation::new("getUserDefault", &[Param::string("key"), Param::string("type")]),
  Operation::new("setUserDefault", &[Param::string("key"), Param::string("type"), Param::any("value")]).shaped(Shape::Unit),
  Operation::new("removeUserDefault", &[Param::string("key")]).shaped(Shape::Unit),
  Operation::new("getAccentColor", &[]),
  Operation::new("getColor", &[Param::string("color")]),
  Operation::new("getSystemColor", &[Param::string("color")]),
  Operation::new("getEffectiveAppearance", &[]),
  Operation::new("canPromptTouchID", &[]),
  Operation::new("promptTouchID", &[Param::string("reason")]).shaped(Shape::Unit),
  Operation::new("isTrustedAccessibilityClient", &[Param::bool("prompt").or(Lit::Bool(false))]),
  Operation::new("getMediaAccessStatus", &[Param::string("mediaType")]),
  Operation::new("askForMediaAccess", &[Param::string("mediaType")]),
  Operation::new("getAnimationSettings", &[]),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("accent-color-changed", Payload::First),
  Binding::new("color-changed", Payload::Empty),
];

// a null event matches every notification
const SUBSCRIBE: Operation = Operation::new("subscribe", &[Param::string("event").nullable()]);
const UNSUBSCRIBE: Operation = Operation::new("unsubscribe", &[Param::integer("id")]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
  Distributed,
  Local,
  Workspace,
}

impl NotificationKind {
  const ALL: [NotificationKind; 3] = [NotificationKind::Distributed, NotificationKind::Local, NotificationKind::Workspace];

  /// Middle part of the host method names, e.g. `subscribeLocalNotification`.
  fn infix(&self) -> &'static str {
    match self {
      NotificationKind::Distributed => "",
      NotificationKind::Local => "Local",
      NotificationKind::Workspace => "Workspace",
    }
  }

  /// Host event and published topic suffix.
  fn event(&self) -> &'static str {
    match self {
      NotificationKind::Distributed => "notification",
      NotificationKind::Local => "local-notification",
      NotificationKind::Workspace => "workspace-notification",
    }
  }
}

#[derive(Default)]
struct State {
  subscriptions: HashMap<u64, (NotificationKind, Value)>,
  /// subscribe calls still waiting for the host
  pending: HashMap<NotificationKind, usize>,
  /// notifications that arrived for a host id not known yet
  early: Vec<(NotificationKind, Value, NotificationEvent)>,
}

/// Bridge id to host id, per notification kind.
pub struct NotificationSubscriptions {
  host: Arc<dyn HostObject>,
  publisher: Arc<dyn Publisher>,
  next_id: AtomicU64,
  state: Mutex<State>,
}

impl NotificationSubscriptions {
  fn new(host: Arc<dyn HostObject>, publisher: Arc<dyn Publisher>) -> Self {
    NotificationSubscriptions {host, publisher, next_id: AtomicU64::new(1), state: Mutex::new(State::default())}
  }

  fn state(&self) -> std::sync::MutexGuard<'_, State> {
    self.state.lock().unwrap_or_else(|e| e.into_inner())
  }

  pub fn len(&self) -> usize {
    self.state().subscriptions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  fn publish(&self, kind: NotificationKind, event: NotificationEvent) {
    let topic = format!("systemPreferences.{}", kind.event());
    match serde_json::to_value(event) {
      Ok(payload) => self.publisher.publish(&topic, Some(payload)),
      Err(e) => debug!("{}: {}", topic, e),
    }
  }

  /// A host notification. While a subscribe call is in flight, one for an
  /// unknown host id is held until that call returns.
  fn deliver(&self, kind: NotificationKind, host_id: Value, event: NotificationEvent) {
    {
      let mut state = self.state();
      let known = state.subscriptions.values().any(|(k, h)| *k == kind && *h == host_id);
      if !known {
        if state.pending.get(&kind).copied().unwrap_or(0) > 0 {
          state.early.push((kind, host_id, event));
        }
        return;
      }
    }
    self.publish(kind, event);
  }

  /// Ends one pending subscribe call and returns the held notifications for
  /// `host_id`.
  fn settle(&self, kind: NotificationKind, subscription: Option<(u64, Value)>) -> Vec<NotificationEvent> {
    let mut state = self.state();
    let mut held = Vec::new();
    if let Some((id, host_id)) = subscription {
      let (mine, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut state.early).into_iter()
        .partition(|(k, h, _)| *k == kind && *h == host_id);
      state.early = rest;
      held = mine.into_iter().map(|(_, _, e)| e).collect();
      state.subscriptions.insert(id, (kind, host_id));
    }
    let pending = state.pending.entry(kind).or_default();
    *pending = pending.saturating_sub(1);
    if *pending == 0 {
      state.early.retain(|(k, _, _)| *k != kind);
    }
    held
  }

  pub async fn subscribe(&self, kind: NotificationKind, event: Value) -> BridgeResult<u64> {
    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
    *self.state().pending.entry(kind).or_default() += 1;
    let host_id = match self.host.invoke(&format!("subscribe{}Notification", kind.infix()), vec![event]).await {
      Ok(host_id) => host_id,
      Err(e) => {
        self.settle(kind, None);
        return Err(e.into());
      },
    };
    trace!("{} subscription {} -> host {}", kind.event(), id, host_id);
    for held in self.settle(kind, Some((id, host_id))) {
      self.publish(kind, held);
    }
    Ok(id)
  }

  /// Unknown ids, or ids of another kind, are ignored.
  pub async fn unsubscribe(&self, kind: NotificationKind, id: u64) -> BridgeResult<()> {
    let host_id = {
      let mut state = self.state();
      match state.subscriptions.get(&id) {
        Some((k, _)) if *k == kind => state.subscriptions.remove(&id).map(|(_, h)| h),
        _ => None,
      }
    };
    if let Some(host_id) = host_id {
      self.host.invoke(&format!("unsubscribe{}Notification", kind.infix()), vec![host_id]).await?;
    }
    Ok(())
  }
}

fn install_notification_listener(subs: &Arc<NotificationSubscriptions>, kind: NotificationKind) {
  let tracked = Arc::downgrade(subs);
  let listener: Listener = Arc::new(move |args: &[Value]| {
    let Some(subs) = tracked.upgrade() else {
      return;
    };
    let event = NotificationEvent {
      event: args.get(1).and_then(Value::as_str).unwrap_or_default().to_string(),
      user_info: args.get(2).cloned().unwrap_or_else(|| json!({})),
    };
    subs.deliver(kind, args.first().cloned().unwrap_or(Value::Null), event);
  });
  subs.host.on(kind.event(), listener);
}

pub fn register(bridge: &Bridge, prefs: Arc<dyn HostObject>) -> Arc<NotificationSubscriptions> {
  let dispatcher = bridge.dispatcher();
  forward_operations(dispatcher, "systemPreferences", Arc::new(Singleton(prefs.clone())), OPERATIONS);
  bind_singleton(bridge, &prefs, "systemPreferences", BINDINGS);

  let subs = Arc::new(NotificationSubscriptions::new(prefs, bridge.publisher()));
  for kind in NotificationKind::ALL {
    install_notification_listener(&subs, kind);

    let s = subs.clone();
    let method = format!("systemPreferences.subscribe{}Notification", kind.infix());
    let name = method.clone();
    dispatcher.register(method, move |args| {
      let s = s.clone();
      let name = name.clone();
      async move {
        let event = SUBSCRIBE.prepare(&name, args)?.into_iter().next().unwrap_or(Value::Null);
        Ok(json!(s.subscribe(kind, event).await?))
      }
    });

    let s = subs.clone();
    let method = format!("systemPreferences.unsubscribe{}Notification", kind.infix());
    let name = method.clone();
    dispatcher.register(method, move |args| {
      let s = s.clone();
      let name = name.clone();
      async move {
        let args = UNSUBSCRIBE.prepare(&name, args)?;
        s.unsubscribe(kind, args.first().and_then(Value::as_u64).unwrap_or_default()).await?;
        Ok(Value::Null)
      }
    });
  }
  subs
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{config::BridgeConfig, rpc::ChannelPublisher, testing::FakeHost};

  #[tokio::test]
  async fn subscriptions_map_ids_and_publish() {
    let (p, mut rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let host = Arc::new(FakeHost::new());
    host.returns("subscribeLocalNotification", json!(77));
    let subs = register(&bridge, host.clone());

    let id = bridge.call("systemPreferences.subscribeLocalNotification", vec![json!("AppleInterfaceThemeChangedNotification")]).await.unwrap();
    assert_eq!(id, json!(1));
    host.emit("local-notification", &[json!(77), json!("AppleInterfaceThemeChangedNotification"), json!({"dark": true})]);
    let p = rx.try_recv().unwrap();
    assert_eq!(p.topic, "systemPreferences.local-notification");
    assert_eq!(p.payload, Some(json!({"event": "AppleInterfaceThemeChangedNotification", "userInfo": {"dark": true}})));

    // a workspace unsubscribe does not touch a local subscription
    bridge.call("systemPreferences.unsubscribeWorkspaceNotification", vec![json!(1)]).await.unwrap();
    assert_eq!(subs.len(), 1);
    bridge.call("systemPreferences.unsubscribeLocalNotification", vec![json!(1)]).await.unwrap();
    assert!(subs.is_empty());
    assert_eq!(host.calls().last(), Some(&("unsubscribeLocalNotification".to_string(), vec![json!(77)])));
    host.emit("local-notification", &[json!(77), json!("x"), json!({})]);
    assert!(rx.try_recv().is_err());
    bridge.call("systemPreferences.unsubscribeNotification", vec![json!(42)]).await.unwrap();
  }

  /// Fires a matching notification before its subscribe call returns.
  struct EagerHost(FakeHost);

  #[async_trait::async_trait]
  impl HostObject for EagerHost {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> crate::host::HostResult<Value> {
      if method == "subscribeWorkspaceNotification" {
        self.0.emit("workspace-notification", &[json!(5), json!("NSWorkspaceDidWakeNotification"), json!({})]);
        self.0.emit("workspace-notification", &[json!(6), json!("other"), json!({})]);
        return Ok(json!(5));
      }
      self.0.invoke(method, args).await
    }

    fn on(&self, event: &str, listener: Listener) -> crate::host::ListenerId {
      self.0.on(event, listener)
    }
  }

  #[tokio::test]
  async fn notifications_during_subscribe_are_kept() {
    let (p, mut rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let host = Arc::new(EagerHost(FakeHost::new()));
    register(&bridge, host.clone());
    bridge.call("systemPreferences.subscribeWorkspaceNotification", vec![Value::Null]).await.unwrap();
    let p = rx.try_recv().unwrap();
    assert_eq!(p.topic, "systemPreferences.workspace-notification");
    assert_eq!(p.payload, Some(json!({"event": "NSWorkspaceDidWakeNotification", "userInfo": {}})));
    // host id 6 never got a subscription
    assert!(rx.try_recv().is_err());
  }

  #[tokio::test]
  async fn accessibility_prompt_defaults_to_false() {
    let (p, mut rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let host = Arc::new(FakeHost::new());
    register(&bridge, host.clone());
    bridge.call("systemPreferences.isTrustedAccessibilityClient", vec![]).await.unwrap();
    assert_eq!(host.calls()[0], ("isTrustedAccessibilityClient".to_string(), vec![json!(false)]));
    host.emit("accent-color-changed", &[json!("ff0000ff")]);
    assert_eq!(rx.try_recv().unwrap().payload, Some(json!("ff0000ff")));
  }
}
