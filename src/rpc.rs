//! Method dispatch table and the outbound publication channel.

use std::{collections::HashMap, future::Future, sync::{Arc, RwLock}};

use futures_util::{future::BoxFuture, FutureExt};
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::{BridgeError, BridgeResult};

pub type Handler = Arc<dyn Fn(Vec<Value>) -> BoxFuture<'static, BridgeResult<Value>> + Send + Sync>;

/// Inbound call as it arrives from the renderer transport.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Invocation {
  pub method: String,
  #[serde(default)]
  pub params: Vec<Value>,
}

/// Name to handler table. Registering a name twice keeps the last handler.
#[derive(Default)]
pub struct Dispatcher {
  handlers: RwLock<HashMap<String, Handler>>,
}

impl Dispatcher {
  pub fn new() -> Self {
    Dispatcher::default()
  }

  pub fn register<F, Fut>(&self, name: impl Into<String>, handler: F)
  where
    F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BridgeResult<Value>> + Send + 'static,
  {
    let handler: Handler = Arc::new(move |params| handler(params).boxed());
    self.register_handler(name, handler);
  }

  pub fn register_handler(&self, name: impl Into<String>, handler: Handler) {
    let name = name.into();
    let mut handlers = self.handlers.write().unwrap_or_else(|e| e.into_inner());
    if handlers.insert(name.clone(), handler).is_some() {
      warn!("rpc handler {} replaced", name);
    } else {
      trace!("rpc handler {} registered", name);
    }
  }

  pub async fn call(&self, method: &str, params: Vec<Value>) -> BridgeResult<Value> {
    let handler = {
      let handlers = self.handlers.read().unwrap_or_else(|e| e.into_inner());
      handlers.get(method).cloned()
    };
    match handler {
      Some(handler) => {
        trace!("rpc call {} {:?}", method, params);
        let res = handler(params).await;
        if let Err(e) = &res {
          debug!("rpc call {} failed: {}", method, e);
        }
        res
      },
      None => Err(BridgeError::MethodNotFound(method.to_string()))
    }
  }

  pub fn contains(&self, method: &str) -> bool {
    self.handlers.read().unwrap_or_else(|e| e.into_inner()).contains_key(method)
  }

  pub fn methods(&self) -> Vec<String> {
    let mut names: Vec<String> = self.handlers.read().unwrap_or_else(|e| e.into_inner()).keys().cloned().collect();
    names.sort();
    names
  }
}

/// Outbound topic notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Publication {
  pub topic: String,
  pub payload: Option<Value>,
}

/// Fire-and-forget sink for events headed to the renderer.
pub trait Publisher: Send + Sync {
  fn publish(&self, topic: &str, payload: Option<Value>);
}

/// Publisher feeding an unbounded channel the transport drains.
#[derive(Clone)]
pub struct ChannelPublisher {
  sender: UnboundedSender<Publication>,
}

impl ChannelPublisher {
  pub fn new() -> (Self, UnboundedReceiver<Publication>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelPublisher {sender}, receiver)
  }
}

impl Publisher for ChannelPublisher {
  fn publish(&self, topic: &str, payload: Option<Value>) {
    trace!("publish {} {:?}", topic, payload);
    if self.sender.send(Publication {topic: topic.to_string(), payload}).is_err() {
      debug!("publish {}: receiver dropped", topic);
    }
  }
}
