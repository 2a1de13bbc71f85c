//! Host event forwarding: reference-counted per-entity subscriptions and
//! unconditional bindings for singleton hosts.

use std::{collections::HashMap, fmt::Display, hash::Hash, sync::{Arc, Mutex}};

use log::{debug, trace};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::{host::{HostObject, Listener, ListenerId}, rpc::Publisher, schema::named};

struct Subscription {
  count: usize,
  listener: ListenerId,
  target: Arc<dyn HostObject>,
}

/// `(entity, event)` to subscriber count. A host listener is installed while
/// the count is above zero.
pub struct SubscriptionRegistry<K> {
  scope: &'static str,
  publisher: Arc<dyn Publisher>,
  entries: Mutex<HashMap<(K, String), Subscription>>,
}

impl<K> SubscriptionRegistry<K>
where
  K: Eq + Hash + Clone + Display + Serialize + Send + Sync + 'static,
{
  pub fn new(scope: &'static str, publisher: Arc<dyn Publisher>) -> Self {
    SubscriptionRegistry {scope, publisher, entries: Mutex::new(HashMap::new())}
  }

  pub fn topic(&self, key: &K, event: &str) -> String {
    format!("{}.{}.{}", self.scope, key, event)
  }

  /// Host calls happen outside the lock; a host may emit or subscribe from
  /// inside `on` or `remove_listener`.
  pub fn subscribe(&self, key: K, event: &str, target: Arc<dyn HostObject>) {
    let k = (key.clone(), event.to_string());
    if self.bump(&k) {
      return;
    }
    let topic = self.topic(&key, event);
    let id = serde_json::to_value(&key).unwrap_or(Value::Null);
    let publisher = self.publisher.clone();
    let listener_topic = topic.clone();
    let listener: Listener = Arc::new(move |args: &[Value]| {
      publisher.publish(&listener_topic, Some(indexed_payload(&id, args)));
    });
    let listener = target.on(event, listener);

    let raced = {
      let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
      match entries.get_mut(&k) {
        Some(sub) => {
          sub.count += 1;
          true
        },
        None => {
          entries.insert(k, Subscription {count: 1, listener, target: target.clone()});
          false
        },
      }
    };
    if raced {
      // another subscriber installed first
      target.remove_listener(event, listener);
    } else {
      debug!("subscribe {} installed", topic);
    }
  }

  fn bump(&self, k: &(K, String)) -> bool {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    match entries.get_mut(k) {
      Some(sub) => {
        sub.count += 1;
        trace!("subscribe {} count {}", self.topic(&k.0, &k.1), sub.count);
        true
      },
      None => false,
    }
  }

  pub fn unsubscribe(&self, key: &K, event: &str) {
    let k = (key.clone(), event.to_string());
    let removed = {
      let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
      match entries.get_mut(&k) {
        Some(sub) if sub.count > 1 => {
          sub.count -= 1;
          None
        },
        Some(_) => entries.remove(&k),
        None => None,
      }
    };
    if let Some(sub) = removed {
      sub.target.remove_listener(event, sub.listener);
      debug!("unsubscribe {} removed", self.topic(key, event));
    }
  }

  /// Drops every subscription of `key` whatever its count.
  pub fn release_entity(&self, key: &K) {
    let released: Vec<((K, String), Subscription)> = {
      let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
      let keys: Vec<(K, String)> = entries.keys().filter(|(k, _)| k == key).cloned().collect();
      keys.into_iter().filter_map(|k| entries.remove(&k).map(|sub| (k, sub))).collect()
    };
    for ((_, event), sub) in released {
      sub.target.remove_listener(&event, sub.listener);
    }
    debug!("{} {} released", self.scope, key);
  }

  pub fn count(&self, key: &K, event: &str) -> usize {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
      .get(&(key.clone(), event.to_string())).map(|s| s.count).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.entries.lock().unwrap_or_else(|e| e.into_inner()).is_empty()
  }
}

/// `{id, "0": a0, "1": a1, ...}`
pub fn indexed_payload(id: &Value, args: &[Value]) -> Value {
  let mut m = Map::new();
  m.insert("id".to_string(), id.clone());
  for (i, a) in args.iter().enumerate() {
    m.insert(i.to_string(), a.clone());
  }
  Value::Object(m)
}

#[derive(Clone, Copy)]
pub enum Payload {
  /// no payload
  Empty,
  /// positional args as named fields
  Named(&'static [&'static str]),
  /// first arg as is
  First,
  /// selected fields of the first arg
  Pick(&'static [&'static str]),
  Custom(fn(&[Value]) -> Option<Value>),
}

impl Payload {
  pub fn shape(&self, args: &[Value]) -> Option<Value> {
    match self {
      Payload::Empty => None,
      Payload::Named(names) => Some(named(names, args)),
      Payload::First => Some(args.first().cloned().unwrap_or(Value::Null)),
      Payload::Pick(keys) => {
        let first = args.first();
        let mut m = Map::new();
        for k in keys.iter() {
          m.insert(k.to_string(), first.and_then(|f| f.get(k)).cloned().unwrap_or(Value::Null));
        }
        Some(Value::Object(m))
      },
      Payload::Custom(f) => f(args),
    }
  }
}

/// A host event always forwarded to `<prefix>.<event>`.
#[derive(Clone, Copy)]
pub struct Binding {
  pub event: &'static str,
  pub payload: Payload,
}

impl Binding {
  pub const fn new(event: &'static str, payload: Payload) -> Self {
    Binding {event, payload}
  }
}

/// Installs `bindings` on `host`. Returns the listener ids so an instance
/// host can be detached later.
pub fn install_bindings(host: &Arc<dyn HostObject>, prefix: &str, bindings: &'static [Binding], publisher: &Arc<dyn Publisher>) -> Vec<(&'static str, ListenerId)> {
  let mut installed = Vec::with_capacity(bindings.len());
  for b in bindings {
    let topic = format!("{}.{}", prefix, b.event);
    let publisher = publisher.clone();
    let payload = b.payload;
    let listener: Listener = Arc::new(move |args: &[Value]| {
      publisher.publish(&topic, payload.shape(args));
    });
    installed.push((b.event, host.on(b.event, listener)));
  }
  debug!("{}: {} event bindings installed", prefix, bindings.len());
  installed
}

pub fn remove_bindings(host: &Arc<dyn HostObject>, installed: Vec<(&'static str, ListenerId)>) {
  for (event, id) in installed {
    host.remove_listener(event, id);
  }
}
