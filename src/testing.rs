//! Recording host doubles for unit tests.

use std::{collections::{BTreeMap, HashMap}, sync::{atomic::{AtomicU64, Ordering}, Arc, Mutex}};

use async_trait::async_trait;
use serde_json::Value;

use crate::host::{DownloadItem, DownloadListener, DownloadState, HostError, HostObject, HostResult, Listener, ListenerId, SessionHost, WindowHost};

type Calls = Vec<(String, Vec<Value>)>;

#[derive(Default)]
pub struct FakeHost {
  calls: Mutex<Calls>,
  results: Mutex<HashMap<String, HostResult<Value>>>,
  listeners: Mutex<HashMap<String, Vec<(ListenerId, Listener)>>>,
  next_listener: AtomicU64,
}

impl FakeHost {
  pub fn new() -> Self {
    FakeHost::default()
  }

  pub fn returns(&self, method: &str, v: Value) {
    self.results.lock().unwrap().insert(method.to_string(), Ok(v));
  }

  pub fn fails(&self, method: &str, e: HostError) {
    self.results.lock().unwrap().insert(method.to_string(), Err(e));
  }

  pub fn calls(&self) -> Calls {
    self.calls.lock().unwrap().clone()
  }

  pub fn emit(&self, event: &str, args: &[Value]) {
    let listeners: Vec<Listener> = self.listeners.lock().unwrap()
      .get(event).map(|l| l.iter().map(|(_, f)| f.clone()).collect()).unwrap_or_default();
    for l in listeners {
      l(args);
    }
  }

  pub fn listener_count(&self, event: &str) -> usize {
    self.listeners.lock().unwrap().get(event).map(|l| l.len()).unwrap_or(0)
  }
}

#[async_trait]
impl HostObject for FakeHost {
  async fn invoke(&self, method: &str, args: Vec<Value>) -> HostResult<Value> {
    self.calls.lock().unwrap().push((method.to_string(), args));
    self.results.lock().unwrap().get(method).cloned().unwrap_or(Ok(Value::Null))
  }

  fn on(&self, event: &str, listener: Listener) -> ListenerId {
    let id = self.next_listener.fetch_add(1, Ordering::SeqCst) + 1;
    self.listeners.lock().unwrap().entry(event.to_string()).or_default().push((id, listener));
    id
  }

  fn remove_listener(&self, event: &str, id: ListenerId) {
    if let Some(l) = self.listeners.lock().unwrap().get_mut(event) {
      l.retain(|(i, _)| *i != id);
    }
  }
}

#[derive(Default)]
pub struct FakeWindows {
  windows: Mutex<BTreeMap<u64, Arc<FakeHost>>>,
  created: Mutex<Vec<Value>>,
  focused: Mutex<Option<u64>>,
  next_id: AtomicU64,
}

impl FakeWindows {
  pub fn new() -> Self {
    FakeWindows::default()
  }

  pub fn window(&self, id: u64) -> Arc<FakeHost> {
    self.windows.lock().unwrap().get(&id).cloned().unwrap()
  }

  pub fn created(&self) -> Vec<Value> {
    self.created.lock().unwrap().clone()
  }

  pub fn focus(&self, id: Option<u64>) {
    *self.focused.lock().unwrap() = id;
  }

  /// Emits `closed` and forgets the window.
  pub fn close(&self, id: u64) {
    let w = self.window(id);
    w.emit("closed", &[]);
    self.windows.lock().unwrap().remove(&id);
  }
}

#[async_trait]
impl WindowHost for FakeWindows {
  async fn create(&self, options: Value) -> HostResult<u64> {
    let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    let w = Arc::new(FakeHost::new());
    if let Some(title) = options.get("title") {
      w.returns("getTitle", title.clone());
    }
    self.created.lock().unwrap().push(options);
    self.windows.lock().unwrap().insert(id, w);
    Ok(id)
  }

  fn from_id(&self, id: u64) -> Option<Arc<dyn HostObject>> {
    self.windows.lock().unwrap().get(&id).map(|w| w.clone() as Arc<dyn HostObject>)
  }

  fn all_windows(&self) -> Vec<(u64, Arc<dyn HostObject>)> {
    self.windows.lock().unwrap().iter().map(|(id, w)| (*id, w.clone() as Arc<dyn HostObject>)).collect()
  }

  fn focused_window(&self) -> Option<u64> {
    *self.focused.lock().unwrap()
  }
}

pub struct FakeDownload {
  pub url: String,
  state: Mutex<(DownloadState, u64, String)>,
  updated: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
  done: Mutex<Vec<Box<dyn Fn(DownloadState) + Send + Sync>>>,
}

impl FakeDownload {
  pub fn new(url: &str) -> Self {
    FakeDownload {
      url: url.to_string(),
      state: Mutex::new((DownloadState::Progressing, 0, String::new())),
      updated: Mutex::new(Vec::new()),
      done: Mutex::new(Vec::new()),
    }
  }

  pub fn progress(&self, received: u64) {
    self.state.lock().unwrap().1 = received;
    for l in self.updated.lock().unwrap().iter() {
      l();
    }
  }

  pub fn finish(&self, state: DownloadState) {
    self.state.lock().unwrap().0 = state;
    for l in self.done.lock().unwrap().iter() {
      l(state);
    }
  }
}

impl DownloadItem for FakeDownload {
  fn url(&self) -> String { self.url.clone() }
  fn filename(&self) -> String { self.url.rsplit('/').next().unwrap_or("").to_string() }
  fn total_bytes(&self) -> u64 { 100 }
  fn received_bytes(&self) -> u64 { self.state.lock().unwrap().1 }
  fn save_path(&self) -> String { self.state.lock().unwrap().2.clone() }
  fn state(&self) -> DownloadState { self.state.lock().unwrap().0 }
  fn pause(&self) { self.state.lock().unwrap().0 = DownloadState::Paused; }
  fn resume(&self) { self.state.lock().unwrap().0 = DownloadState::Progressing; }
  fn cancel(&self) { self.state.lock().unwrap().0 = DownloadState::Cancelled; }
  fn set_save_path(&self, path: &str) { self.state.lock().unwrap().2 = path.to_string(); }
  fn on_updated(&self, listener: Box<dyn Fn() + Send + Sync>) { self.updated.lock().unwrap().push(listener); }
  fn on_done(&self, listener: Box<dyn Fn(DownloadState) + Send + Sync>) { self.done.lock().unwrap().push(listener); }
}

#[derive(Default)]
pub struct FakeSession {
  pub host: FakeHost,
  downloads: Mutex<Vec<DownloadListener>>,
}

impl FakeSession {
  pub fn new() -> Self {
    FakeSession::default()
  }

  pub fn start_download(&self, url: &str) -> Arc<FakeDownload> {
    let item = Arc::new(FakeDownload::new(url));
    let listeners = self.downloads.lock().unwrap().clone();
    for l in listeners {
      l(item.clone());
    }
    item
  }
}

#[async_trait]
impl HostObject for FakeSession {
  async fn invoke(&self, method: &str, args: Vec<Value>) -> HostResult<Value> {
    self.host.invoke(method, args).await
  }
}

impl SessionHost for FakeSession {
  fn on_will_download(&self, listener: DownloadListener) {
    self.downloads.lock().unwrap().push(listener);
  }
}
