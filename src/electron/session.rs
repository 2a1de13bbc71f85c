//! Session calls plus download tracking. Downloads get ids local to the
//! session, `"1"`, `"2"`, ..., and are forgotten once done.

use std::{collections::HashMap, sync::{atomic::{AtomicU64, Ordering}, Arc, Mutex, Weak}};

use async_trait::async_trait;
use log::{debug, trace};
use serde::Serialize;
use serde_json::{json, Value};

use crate::{error::BridgeResult, host::{DownloadItem, DownloadState, HostObject, HostResult, SessionHost}, rpc::Publisher, schema::{forward_operations, Operation, Param, Shape, Singleton}, Bridge};

use super::types::{DownloadDoneEvent, DownloadItemRecord, DownloadProgressEvent, WillDownloadEvent};

pub static OPERATIONS: &[Operation] = &[
  Operation::new("setDownloadPath", &[Param::string("path")]).shaped(Shape::Unit),
  Operation::new("getCacheSize", &[]),
  Operation::new("clearCache", &[]).shaped(Shape::Unit),
  Operation::new("clearStorageData", &[Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("clearData", &[Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("getStoragePath", &[]),
  Operation::new("isPersistent", &[]),
  Operation::new("getUserAgent", &[]),
];

const DOWNLOAD_URL: Operation = Operation::new("downloadURL", &[Param::string("url")]);
const SET_USER_AGENT: Operation = Operation::new("setUserAgent", &[Param::object("options")]);
const ITEM: Operation = Operation::new("item", &[Param::string("id")]);
const ITEM_SAVE_PATH: Operation = Operation::new("item.setSavePath", &[Param::string("id"), Param::string("path")]);

/// Lets the generic forwarder reach a session host.
struct SessionObject(Arc<dyn SessionHost>);

#[async_trait]
impl HostObject for SessionObject {
  async fn invoke(&self, method: &str, args: Vec<Value>) -> HostResult<Value> {
    self.0.invoke(method, args).await
  }
}

/// Downloads in flight for one session.
pub struct Downloads {
  hash: String,
  publisher: Arc<dyn Publisher>,
  next_id: AtomicU64,
  items: Mutex<HashMap<String, Arc<dyn DownloadItem>>>,
}

impl Downloads {
  fn new(hash: String, publisher: Arc<dyn Publisher>) -> Self {
    Downloads {hash, publisher, next_id: AtomicU64::new(0), items: Mutex::new(HashMap::new())}
  }

  pub fn hash(&self) -> &str {
    &self.hash
  }

  pub fn get(&self, id: &str) -> Option<Arc<dyn DownloadItem>> {
    self.items.lock().unwrap_or_else(|e| e.into_inner()).get(id).cloned()
  }

  pub fn len(&self) -> usize {
    self.items.lock().unwrap_or_else(|e| e.into_inner()).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Publishes on the session scoped topic and the shared one.
  fn publish<T: Serialize>(&self, event: &str, payload: &T) {
    let payload = match serde_json::to_value(payload) {
      Ok(v) => v,
      Err(e) => {
        debug!("session {}: cannot serialize {}: {}", self.hash, event, e);
        return;
      }
    };
    self.publisher.publish(&format!("session.{}.{}", self.hash, event), Some(payload.clone()));
    self.publisher.publish(&format!("session.{}", event), Some(payload));
  }

  fn track(self: &Arc<Self>, item: Arc<dyn DownloadItem>) {
    let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
    self.items.lock().unwrap_or_else(|e| e.into_inner()).insert(id.clone(), item.clone());
    trace!("session {}: download {} {}", self.hash, id, item.url());
    self.publish("will-download", &WillDownloadEvent {item: record(&id, &*item), session_hash: self.hash.clone()});

    let downloads: Weak<Downloads> = Arc::downgrade(self);
    let weak_item = Arc::downgrade(&item);
    let item_id = id.clone();
    item.on_updated(Box::new(move || {
      let (Some(downloads), Some(item)) = (downloads.upgrade(), weak_item.upgrade()) else {
        return;
      };
      let state = match item.state() {
        DownloadState::Progressing => "progressing",
        _ => "paused",
      };
      downloads.publish("download-progress", &DownloadProgressEvent {
        id: item_id.clone(),
        received_bytes: item.received_bytes(),
        total_bytes: item.total_bytes(),
        state: state.to_string(),
        session_hash: downloads.hash.clone(),
      });
    }));

    let downloads: Weak<Downloads> = Arc::downgrade(self);
    let weak_item = Arc::downgrade(&item);
    item.on_done(Box::new(move |state| {
      let Some(downloads) = downloads.upgrade() else {
        return;
      };
      let path = weak_item.upgrade().map(|i| i.save_path()).unwrap_or_default();
      downloads.publish("download-done", &DownloadDoneEvent {
        id: id.clone(),
        state: state.as_str().to_string(),
        path,
        session_hash: downloads.hash.clone(),
      });
      downloads.items.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
    }));
  }
}

fn record(id: &str, item: &dyn DownloadItem) -> DownloadItemRecord {
  DownloadItemRecord {
    id: id.to_string(),
    url: item.url(),
    filename: item.filename(),
    total_bytes: item.total_bytes(),
    received_bytes: item.received_bytes(),
    save_path: item.save_path(),
    state: item.state().as_str().to_string(),
  }
}

/// Registers the `session.*` calls for `session`. Without `hash` a random one
/// is issued.
pub fn register(bridge: &Bridge, session: Arc<dyn SessionHost>, hash: Option<String>) -> Arc<Downloads> {
  let hash = hash.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
  let dispatcher = bridge.dispatcher();
  let object: Arc<dyn HostObject> = Arc::new(SessionObject(session.clone()));
  forward_operations(dispatcher, "session", Arc::new(Singleton(object.clone())), OPERATIONS);

  let downloads = Arc::new(Downloads::new(hash.clone(), bridge.publisher()));
  let tracker = Arc::downgrade(&downloads);
  session.on_will_download(Arc::new(move |item| {
    if let Some(downloads) = tracker.upgrade() {
      downloads.track(item);
    }
  }));

  let host = object.clone();
  dispatcher.register("session.downloadURL", move |args| {
    let host = host.clone();
    async move {
      let args = DOWNLOAD_URL.prepare("session.downloadURL", args)?;
      host.invoke("downloadURL", args.clone()).await?;
      Ok(args.into_iter().next().unwrap_or(Value::Null))
    }
  });

  let host = object;
  dispatcher.register("session.setUserAgent", move |args| {
    let host = host.clone();
    async move {
      let args = SET_USER_AGENT.prepare("session.setUserAgent", args)?;
      let options = args.into_iter().next().unwrap_or(Value::Null);
      let mut call = vec![options.get("userAgent").cloned().unwrap_or(Value::Null)];
      if let Some(languages) = options.get("acceptLanguages") {
        call.push(languages.clone());
      }
      host.invoke("setUserAgent", call).await?;
      Ok(Value::Null)
    }
  });

  dispatcher.register("session.getSessionHash", move |_| {
    let hash = hash.clone();
    async move { Ok(json!(hash)) }
  });

  register_item(bridge, &downloads, "pause", |item, _| item.pause());
  register_item(bridge, &downloads, "resume", |item, _| item.resume());
  register_item(bridge, &downloads, "cancel", |item, _| item.cancel());
  register_item(bridge, &downloads, "setSavePath", |item, path| item.set_save_path(path.unwrap_or_default()));
  debug!("session {} registered", downloads.hash());
  downloads
}

/// `session.item.<action>(id, ...)`; an unknown id is ignored.
fn register_item(bridge: &Bridge, downloads: &Arc<Downloads>, action: &'static str, f: fn(&dyn DownloadItem, Option<&str>)) {
  let downloads = downloads.clone();
  let method = format!("session.item.{}", action);
  let name = method.clone();
  bridge.dispatcher().register(method, move |args| {
    let downloads = downloads.clone();
    let name = name.clone();
    async move {
      let op = if action == "setSavePath" { ITEM_SAVE_PATH } else { ITEM };
      let args = op.prepare(&name, args)?;
      item_call(&downloads, &args, f)
    }
  });
}

fn item_call(downloads: &Downloads, args: &[Value], f: fn(&dyn DownloadItem, Option<&str>)) -> BridgeResult<Value> {
  let id = args.first().and_then(Value::as_str).unwrap_or_default();
  if let Some(item) = downloads.get(id) {
    f(&*item, args.get(1).and_then(Value::as_str));
  }
  Ok(Value::Null)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{config::BridgeConfig, rpc::{ChannelPublisher, Publication}, testing::FakeSession};

  fn setup() -> (Bridge, Arc<FakeSession>, Arc<Downloads>, tokio::sync::mpsc::UnboundedReceiver<Publication>) {
    let (p, rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let session = Arc::new(FakeSession::new());
    let downloads = register(&bridge, session.clone(), Some("abc".to_string()));
    (bridge, session, downloads, rx)
  }

  #[tokio::test]
  async fn download_lifecycle() {
    let (bridge, session, downloads, mut rx) = setup();
    let item = session.start_download("https://x.test/file.zip");

    let scoped = rx.try_recv().unwrap();
    let shared = rx.try_recv().unwrap();
    assert_eq!(scoped.topic, "session.abc.will-download");
    assert_eq!(shared.topic, "session.will-download");
    assert_eq!(scoped.payload, shared.payload);
    let payload = scoped.payload.unwrap();
    assert_eq!(payload["item"]["id"], json!("1"));
    assert_eq!(payload["item"]["filename"], json!("file.zip"));
    assert_eq!(payload["item"]["state"], json!("progressing"));
    assert_eq!(payload["sessionHash"], json!("abc"));

    item.progress(40);
    let progress = rx.try_recv().unwrap();
    assert_eq!(progress.topic, "session.abc.download-progress");
    assert_eq!(progress.payload, Some(json!({"id": "1", "receivedBytes": 40, "totalBytes": 100, "state": "progressing", "sessionHash": "abc"})));
    rx.try_recv().unwrap();

    bridge.call("session.item.setSavePath", vec![json!("1"), json!("/tmp/file.zip")]).await.unwrap();
    bridge.call("session.item.pause", vec![json!("1")]).await.unwrap();
    assert!(item.is_paused());
    item.progress(50);
    assert_eq!(rx.try_recv().unwrap().payload.unwrap()["state"], json!("paused"));
    rx.try_recv().unwrap();

    item.finish(DownloadState::Completed);
    let done = rx.try_recv().unwrap();
    assert_eq!(done.topic, "session.abc.download-done");
    assert_eq!(done.payload, Some(json!({"id": "1", "state": "completed", "path": "/tmp/file.zip", "sessionHash": "abc"})));
    assert!(downloads.is_empty());
  }

  #[tokio::test]
  async fn ids_are_sequential_and_unknown_ids_ignored() {
    let (bridge, session, downloads, _rx) = setup();
    session.start_download("https://x.test/a");
    session.start_download("https://x.test/b");
    assert_eq!(downloads.get("2").map(|i| i.url()), Some("https://x.test/b".to_string()));
    assert_eq!(bridge.call("session.item.cancel", vec![json!("99")]).await.unwrap(), Value::Null);
  }

  #[tokio::test]
  async fn calls_reach_the_host() {
    let (bridge, session, _downloads, _rx) = setup();
    session.host.returns("getCacheSize", json!(1024));
    assert_eq!(bridge.call("session.getCacheSize", vec![]).await.unwrap(), json!(1024));
    assert_eq!(bridge.call("session.downloadURL", vec![json!("https://x.test/c")]).await.unwrap(), json!("https://x.test/c"));
    bridge.call("session.setUserAgent", vec![json!({"userAgent": "UA/1", "acceptLanguages": "en"})]).await.unwrap();
    assert_eq!(bridge.call("session.getSessionHash", vec![]).await.unwrap(), json!("abc"));
    let calls = session.host.calls();
    assert_eq!(calls[1], ("downloadURL".to_string(), vec![json!("https://x.test/c")]));
    assert_eq!(calls[2], ("setUserAgent".to_string(), vec![json!("UA/1"), json!("en")]));
  }

  #[test]
  fn hash_defaults_to_random() {
    let (p, _rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let downloads = register(&bridge, Arc::new(FakeSession::new()), None);
    assert_eq!(downloads.hash().len(), 32);
  }
}
