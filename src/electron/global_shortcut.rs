//! Global shortcuts. The host reports a pressed shortcut through its
//! `accelerator` event; the bridge publishes it while the accelerator is
//! registered through this module.

use std::{collections::BTreeSet, sync::{Arc, Mutex}};

use log::debug;
use serde_json::{json, Value};

use crate::{error::BridgeResult, host::{HostObject, Listener}, rpc::Publisher, schema::{forward_operations, Operation, Param, Singleton}, Bridge};

use super::types::AcceleratorEvent;

const REGISTER: Operation = Operation::new("register", &[Param::string("accelerator")]);
const REGISTER_ALL: Operation = Operation::new("registerAll", &[Param::array("accelerators")]);
const UNREGISTER: Operation = Operation::new("unregister", &[Param::string("accelerator")]);

pub static OPERATIONS: &[Operation] = &[
  Operation::new("isRegistered", &[Param::string("accelerator")]),
];

pub struct GlobalShortcuts {
  host: Arc<dyn HostObject>,
  registered: Mutex<BTreeSet<String>>,
}

impl GlobalShortcuts {
  fn new(host: Arc<dyn HostObject>) -> Self {
    GlobalShortcuts {host, registered: Mutex::new(BTreeSet::new())}
  }

  pub fn registered(&self) -> Vec<String> {
    self.registered.lock().unwrap_or_else(|e| e.into_inner()).iter().cloned().collect()
  }

  fn is_tracked(&self, accelerator: &str) -> bool {
    self.registered.lock().unwrap_or_else(|e| e.into_inner()).contains(accelerator)
  }

  pub async fn register(&self, accelerator: &str) -> BridgeResult<bool> {
    let ok = self.host.invoke("register", vec![json!(accelerator)]).await?.as_bool().unwrap_or(false);
    if ok {
      self.registered.lock().unwrap_or_else(|e| e.into_inner()).insert(accelerator.to_string());
    } else {
      debug!("global shortcut {} not registered", accelerator);
    }
    Ok(ok)
  }

  pub async fn unregister(&self, accelerator: &str) -> BridgeResult<()> {
    self.registered.lock().unwrap_or_else(|e| e.into_inner()).remove(accelerator);
    self.host.invoke("unregister", vec![json!(accelerator)]).await?;
    Ok(())
  }

  pub async fn unregister_all(&self) -> BridgeResult<()> {
    self.registered.lock().unwrap_or_else(|e| e.into_inner()).clear();
    self.host.invoke("unregisterAll", vec![]).await?;
    Ok(())
  }
}

fn publish_accelerator(publisher: &Arc<dyn Publisher>, accelerator: &str) {
  match serde_json::to_value(AcceleratorEvent {accelerator: accelerator.to_string()}) {
    Ok(payload) => publisher.publish("globalShortcut.accelerator", Some(payload)),
    Err(e) => debug!("globalShortcut.accelerator: {}", e),
  }
}

pub fn register(bridge: &Bridge, host: Arc<dyn HostObject>) -> Arc<GlobalShortcuts> {
  let dispatcher = bridge.dispatcher();
  forward_operations(dispatcher, "globalShortcut", Arc::new(Singleton(host.clone())), OPERATIONS);
  let shortcuts = Arc::new(GlobalShortcuts::new(host.clone()));

  let publisher = bridge.publisher();
  let tracked = Arc::downgrade(&shortcuts);
  let listener: Listener = Arc::new(move |args: &[Value]| {
    let Some(accelerator) = args.first().and_then(Value::as_str) else {
      return;
    };
    if tracked.upgrade().is_some_and(|s| s.is_tracked(accelerator)) {
      publish_accelerator(&publisher, accelerator);
    }
  });
  host.on("accelerator", listener);

  let s = shortcuts.clone();
  dispatcher.register("globalShortcut.register", move |args| {
    let s = s.clone();
    async move {
      let args = REGISTER.prepare("globalShortcut.register", args)?;
      let accelerator = args.first().and_then(Value::as_str).unwrap_or_default();
      Ok(Value::Bool(s.register(accelerator).await?))
    }
  });

  let s = shortcuts.clone();
  dispatcher.register("globalShortcut.registerAll", move |args| {
    let s = s.clone();
    async move {
      let args = REGISTER_ALL.prepare("globalShortcut.registerAll", args)?;
      let accelerators: Vec<String> = args.first().and_then(Value::as_array).map(|a| {
        a.iter().filter_map(Value::as_str).map(str::to_string).collect()
      }).unwrap_or_default();
      let mut results = Vec::with_capacity(accelerators.len());
      for accelerator in &accelerators {
        results.push(Value::Bool(s.register(accelerator).await?));
      }
      Ok(Value::Array(results))
    }
  });

  let s = shortcuts.clone();
  dispatcher.register("globalShortcut.unregister", move |args| {
    let s = s.clone();
    async move {
      let args = UNREGISTER.prepare("globalShortcut.unregister", args)?;
      s.unregister(args.first().and_then(Value::as_str).unwrap_or_default()).await?;
      Ok(Value::Null)
    }
  });

  let s = shortcuts.clone();
  dispatcher.register("globalShortcut.unregisterAll", move |_| {
    let s = s.clone();
    async move {
      s.unregister_all().await?;
      Ok(Value::Null)
    }
  });
  shortcuts
}
