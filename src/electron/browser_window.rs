use std::{collections::HashSet, sync::{Arc, Mutex}};

use log::{debug, trace};
use serde_json::{json, Value};

use crate::{error::{BridgeError, BridgeResult}, events::SubscriptionRegistry, host::{HostObject, Listener, WindowHost}, schema::{forward_operations, Operation, Param, Shape, WindowTarget}, types::Rectangle, Bridge};

use super::types::WindowInfo;

const ID: Param = Param::integer("id");

const CREATE: Operation = Operation::new("create", &[Param::object("options").optional()]);
const EXISTS: Operation = Operation::new("exists", &[ID]);
const EVENT: Operation = Operation::new("subscribeEvent", &[ID, Param::string("eventName")]);

const fn flag(name: &'static str) -> [Param; 2] {
  [ID, Param::bool(name)]
}

/// Operations on one window. The window id comes first and is stripped
/// before the host call.
pub static WINDOW_OPERATIONS: &[Operation] = &[
  Operation::new("close", &[ID]).shaped(Shape::Unit),
  Operation::new("destroy", &[ID]).shaped(Shape::Unit),
  Operation::new("show", &[ID]).shaped(Shape::Unit),
  Operation::new("hide", &[ID]).shaped(Shape::Unit),
  Operation::new("minimize", &[ID]).shaped(Shape::Unit),
  Operation::new("maximize", &[ID]).shaped(Shape::Unit),
  Operation::new("unmaximize", &[ID]).shaped(Shape::Unit),
  Operation::new("restore", &[ID]).shaped(Shape::Unit),
  Operation::new("setFullScreen", &flag("fullscreen")).shaped(Shape::Unit),
  Operation::new("isFullScreen", &[ID]),
  Operation::new("focus", &[ID]).shaped(Shape::Unit),
  Operation::new("blur", &[ID]).shaped(Shape::Unit),
  Operation::new("setTitle", &[ID, Param::string("title")]).shaped(Shape::Unit),
  Operation::new("getTitle", &[ID]),
  Operation::new("getBounds", &[ID]),
  Operation::new("setBounds", &[ID, Param::object("bounds")]).shaped(Shape::Unit),
  Operation::new("getSize", &[ID]).shaped(Shape::Size),
  Operation::new("setSize", &[ID, Param::object("size")]).shaped(Shape::Unit),
  Operation::new("getPosition", &[ID]).shaped(Shape::Point),
  Operation::new("setPosition", &[ID, Param::object("position")]).shaped(Shape::Unit),
  Operation::new("center", &[ID]).shaped(Shape::Unit),
  Operation::new("getMinimumSize", &[ID]).shaped(Shape::Size),
  Operation::new("setMinimumSize", &[ID, Param::object("size")]).shaped(Shape::Unit),
  Operation::new("getMaximumSize", &[ID]).shaped(Shape::Size),
  Operation::new("setMaximumSize", &[ID, Param::object("size")]).shaped(Shape::Unit),
  Operation::new("setResizable", &flag("resizable")).shaped(Shape::Unit),
  Operation::new("isResizable", &[ID]),
  Operation::new("setMovable", &flag("movable")).shaped(Shape::Unit),
  Operation::new("isMovable", &[ID]),
  Operation::new("setMinimizable", &flag("minimizable")).shaped(Shape::Unit),
  Operation::new("isMinimizable", &[ID]),
  Operation::new("setMaximizable", &flag("maximizable")).shaped(Shape::Unit),
  Operation::new("isMaximizable", &[ID]),
  Operation::new("setClosable", &flag("closable")).shaped(Shape::Unit),
  Operation::new("isClosable", &[ID]),
  Operation::new("setFocusable", &flag("focusable")).shaped(Shape::Unit),
  Operation::new("isFocusable", &[ID]),
  Operation::new("setAlwaysOnTop", &[ID, Param::bool("flag"), Param::string("level").optional(), Param::integer("relativeLevel").optional()]).shaped(Shape::Unit),
  Operation::new("isAlwaysOnTop", &[ID]),
  Operation::new("setMenuBarVisibility", &flag("visible")).shaped(Shape::Unit),
  Operation::new("isMenuBarVisible", &[ID]),
  Operation::new("setAutoHideMenuBar", &flag("autoHide")).shaped(Shape::Unit),
  Operation::new("isMenuBarAutoHide", &[ID]),
  Operation::new("loadURL", &[ID, Param::string("url"), Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("loadFile", &[ID, Param::string("path"), Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("reload", &[ID]).shaped(Shape::Unit),
  Operation::new("openDevTools", &[ID, Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("closeDevTools", &[ID]).shaped(Shape::Unit),
  Operation::new("isDevToolsOpened", &[ID]),
  Operation::new("executeJavaScript", &[ID, Param::string("code"), Param::bool("userGesture").optional()]),
  Operation::new("isMaximized", &[ID]),
  Operation::new("isMinimized", &[ID]),
  Operation::new("isVisible", &[ID]),
  Operation::new("isFocused", &[ID]),
  Operation::new("setProgressBar", &[ID, Param::number("progress"), Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("flashFrame", &flag("flag")).shaped(Shape::Unit),
  Operation::new("setBackgroundColor", &[ID, Param::string("backgroundColor")]).shaped(Shape::Unit),
  Operation::new("setOpacity", &[ID, Param::number("opacity")]).shaped(Shape::Unit),
  Operation::new("getOpacity", &[ID]),
  Operation::new("setKiosk", &flag("flag")).shaped(Shape::Unit),
  Operation::new("isKiosk", &[ID]),
  Operation::new("setSimpleFullScreen", &flag("flag")).shaped(Shape::Unit),
  Operation::new("isSimpleFullScreen", &[ID]),
  Operation::new("setSkipTaskbar", &flag("skip")).shaped(Shape::Unit),
  Operation::new("setContentProtection", &flag("enable")).shaped(Shape::Unit),
];

pub fn register(bridge: &Bridge, windows: Arc<dyn WindowHost>) {
  let dispatcher = bridge.dispatcher();
  forward_operations(dispatcher, "browserWindow", Arc::new(WindowTarget(windows.clone())), WINDOW_OPERATIONS);

  let cleanup = Arc::new(WindowCleanup::new(bridge.window_subscriptions().clone()));
  let host = windows.clone();
  let c = cleanup.clone();
  dispatcher.register("browserWindow.create", move |args| {
    let host = host.clone();
    let cleanup = c.clone();
    async move {
      let args = CREATE.prepare("browserWindow.create", args)?;
      let options = args.into_iter().next().unwrap_or(Value::Null);
      create(&*host, &cleanup, options).await.map(|id| json!(id))
    }
  });

  let host = windows.clone();
  dispatcher.register("browserWindow.getAllWindows", move |_| {
    let host = host.clone();
    async move {
      let infos = all_windows(&*host).await?;
      Ok(serde_json::to_value(infos)?)
    }
  });

  let host = windows.clone();
  dispatcher.register("browserWindow.getFocusedWindow", move |_| {
    let host = host.clone();
    async move { Ok(host.focused_window().map(|id| json!(id)).unwrap_or(Value::Null)) }
  });

  let host = windows.clone();
  dispatcher.register("browserWindow.exists", move |args| {
    let host = host.clone();
    async move {
      let args = EXISTS.prepare("browserWindow.exists", args)?;
      let id = args.first().and_then(Value::as_u64).unwrap_or_default();
      Ok(Value::Bool(host.from_id(id).is_some()))
    }
  });

  let target = Arc::new(WindowTarget(windows.clone()));
  let registry = bridge.window_subscriptions().clone();
  dispatcher.register("browserWindow.subscribeEvent", move |args| {
    let target = target.clone();
    let registry = registry.clone();
    let cleanup = cleanup.clone();
    async move {
      let (id, event) = event_args("browserWindow.subscribeEvent", args)?;
      let (id, window) = target.window(&id)?;
      // windows opened by the host itself get their close hook here
      cleanup.watch(id, &window);
      registry.subscribe(id, &event, window);
      Ok(Value::Null)
    }
  });

  let registry = bridge.window_subscriptions().clone();
  let host = windows;
  dispatcher.register("browserWindow.unsubscribeEvent", move |args| {
    let registry = registry.clone();
    let host = host.clone();
    async move {
      let (id, event) = event_args("browserWindow.unsubscribeEvent", args)?;
      // an unknown window has nothing left to unsubscribe
      if let Some(id) = id.as_u64().filter(|id| host.from_id(*id).is_some()) {
        registry.unsubscribe(&id, &event);
      }
      Ok(Value::Null)
    }
  });
}

fn event_args(method: &str, args: Vec<Value>) -> BridgeResult<(Value, String)> {
  let mut args = EVENT.prepare(method, args)?.into_iter();
  let id = args.next().unwrap_or(Value::Null);
  let event = args.next().and_then(|e| e.as_str().map(str::to_string))
    .ok_or_else(|| BridgeError::invalid_params(method, "missing parameter eventName"))?;
  Ok((id, event))
}

/// Drops a window's subscriptions once the host reports it closed. Each
/// window gets one `closed` listener however often it is watched.
pub struct WindowCleanup {
  registry: Arc<SubscriptionRegistry<u64>>,
  hooked: Mutex<HashSet<u64>>,
}

impl WindowCleanup {
  pub fn new(registry: Arc<SubscriptionRegistry<u64>>) -> Self {
    WindowCleanup {registry, hooked: Mutex::new(HashSet::new())}
  }

  pub fn watch(self: &Arc<Self>, id: u64, window: &Arc<dyn HostObject>) {
    if !self.hooked.lock().unwrap_or_else(|e| e.into_inner()).insert(id) {
      return;
    }
    let cleanup = Arc::downgrade(self);
    let listener: Listener = Arc::new(move |_: &[Value]| {
      if let Some(cleanup) = cleanup.upgrade() {
        cleanup.hooked.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
        cleanup.registry.release_entity(&id);
      }
    });
    window.on("closed", listener);
    trace!("window {} watched for close", id);
  }
}

/// Opens a window and watches it for close. A parent reference cannot cross
/// the bridge and is removed from the options.
pub async fn create(host: &dyn WindowHost, cleanup: &Arc<WindowCleanup>, mut options: Value) -> BridgeResult<u64> {
  if let Some(o) = options.as_object_mut() {
    o.remove("parent");
  } else {
    options = json!({});
  }
  let id = host.create(options).await?;
  if let Some(window) = host.from_id(id) {
    cleanup.watch(id, &window);
  }
  debug!("window {} created", id);
  Ok(id)
}

pub async fn all_windows(host: &dyn WindowHost) -> BridgeResult<Vec<WindowInfo>> {
  let mut infos = Vec::new();
  for (id, window) in host.all_windows() {
    infos.push(window_info(id, &*window).await?);
  }
  Ok(infos)
}

async fn window_info(id: u64, window: &dyn HostObject) -> BridgeResult<WindowInfo> {
  let text = |v: Value| v.as_str().unwrap_or_default().to_string();
  let bounds: Rectangle = match window.invoke("getBounds", vec![]).await? {
    Value::Null => Rectangle::default(),
    v => serde_json::from_value(v)?,
  };
  Ok(WindowInfo {
    id,
    title: text(window.invoke("getTitle", vec![]).await?),
    url: text(window.invoke("getURL", vec![]).await?),
    bounds,
    is_maximized: flag_of(window, "isMaximized").await?,
    is_minimized: flag_of(window, "isMinimized").await?,
    is_fullscreen: flag_of(window, "isFullScreen").await?,
    is_resizable: flag_of(window, "isResizable").await?,
    is_movable: flag_of(window, "isMovable").await?,
    is_closable: flag_of(window, "isClosable").await?,
    is_focused: flag_of(window, "isFocused").await?,
    is_visible: flag_of(window, "isVisible").await?,
  })
}

async fn flag_of(window: &dyn HostObject, method: &str) -> BridgeResult<bool> {
  Ok(window.invoke(method, vec![]).await?.as_bool().unwrap_or(false))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{config::BridgeConfig, rpc::{ChannelPublisher, Publication}, testing::FakeWindows};

  fn setup() -> (Bridge, Arc<FakeWindows>, tokio::sync::mpsc::UnboundedReceiver<Publication>) {
    let (p, rx) = ChannelPublisher::new();
    let bridge = Bridge::new(BridgeConfig::default(), Arc::new(p));
    let windows = Arc::new(FakeWindows::new());
    register(&bridge, windows.clone());
    (bridge, windows, rx)
  }

  #[tokio::test]
  async fn create_drops_parent_and_returns_id() {
    let (bridge, windows, _rx) = setup();
    let id = bridge.call("browserWindow.create", vec![json!({"title": "T", "parent": 9})]).await.unwrap();
    assert_eq!(id, json!(1));
    assert_eq!(windows.created(), vec![json!({"title": "T"})]);
    assert_eq!(bridge.call("browserWindow.getTitle", vec![json!(1)]).await.unwrap(), json!("T"));
  }

  #[tokio::test]
  async fn window_operations_strip_the_id() {
    let (bridge, windows, _rx) = setup();
    bridge.call("browserWindow.create", vec![json!({})]).await.unwrap();
    windows.window(1).returns("getSize", json!([800, 600]));
    bridge.call("browserWindow.setTitle", vec![json!(1), json!("New")]).await.unwrap();
    assert_eq!(bridge.call("browserWindow.getSize", vec![json!(1)]).await.unwrap(), json!({"width": 800, "height": 600}));
    assert_eq!(windows.window(1).calls()[0], ("setTitle".to_string(), vec![json!("New")]));
  }

  #[tokio::test]
  async fn unknown_window_is_not_found() {
    let (bridge, _windows, _rx) = setup();
    let err = bridge.call("browserWindow.close", vec![json!(999)]).await.unwrap_err();
    assert_eq!(err.to_string(), "Window 999 not found");
    assert_eq!(bridge.call("browserWindow.exists", vec![json!(999)]).await.unwrap(), json!(false));
    assert!(matches!(bridge.call("browserWindow.subscribeEvent", vec![json!(999), json!("blur")]).await, Err(BridgeError::NotFound {..})));
    assert_eq!(bridge.call("browserWindow.unsubscribeEvent", vec![json!(999), json!("blur")]).await.unwrap(), Value::Null);
  }

  #[tokio::test]
  async fn subscriptions_publish_and_end_with_the_window() {
    let (bridge, windows, mut rx) = setup();
    bridge.call("browserWindow.create", vec![json!({})]).await.unwrap();
    bridge.call("browserWindow.subscribeEvent", vec![json!(1), json!("resize")]).await.unwrap();
    bridge.call("browserWindow.subscribeEvent", vec![json!(1), json!("resize")]).await.unwrap();
    let window = windows.window(1);
    assert_eq!(window.listener_count("resize"), 1);
    window.emit("resize", &[]);
    let p = rx.try_recv().unwrap();
    assert_eq!((p.topic.as_str(), p.payload), ("window.1.resize", Some(json!({"id": 1}))));

    windows.close(1);
    assert_eq!(bridge.window_subscriptions().count(&1, "resize"), 0);
    assert_eq!(window.listener_count("resize"), 0);
  }

  #[tokio::test]
  async fn host_opened_windows_are_released_on_close() {
    let (bridge, windows, _rx) = setup();
    let id = windows.create(json!({})).await.unwrap();
    bridge.call("browserWindow.subscribeEvent", vec![json!(id), json!("focus")]).await.unwrap();
    bridge.call("browserWindow.subscribeEvent", vec![json!(id), json!("blur")]).await.unwrap();
    let window = windows.window(id);
    assert_eq!(window.listener_count("closed"), 1);

    windows.close(id);
    let registry = bridge.window_subscriptions();
    assert_eq!(registry.count(&id, "focus"), 0);
    assert!(registry.is_empty());
    assert_eq!(window.listener_count("focus"), 0);
  }

  #[tokio::test]
  async fn created_windows_are_hooked_once() {
    let (bridge, windows, _rx) = setup();
    bridge.call("browserWindow.create", vec![json!({})]).await.unwrap();
    for _ in 0..3 {
      bridge.call("browserWindow.subscribeEvent", vec![json!(1), json!("move")]).await.unwrap();
      bridge.call("browserWindow.unsubscribeEvent", vec![json!(1), json!("move")]).await.unwrap();
    }
    assert_eq!(windows.window(1).listener_count("closed"), 1);
  }

  #[tokio::test]
  async fn all_windows_and_focus() {
    let (bridge, windows, _rx) = setup();
    bridge.call("browserWindow.create", vec![json!({"title": "A"})]).await.unwrap();
    bridge.call("browserWindow.create", vec![json!({"title": "B"})]).await.unwrap();
    let w = windows.window(2);
    w.returns("getURL", json!("app://b"));
    w.returns("getBounds", json!({"x": 1, "y": 2, "width": 300, "height": 200}));
    w.returns("isFullScreen", json!(true));
    let all = bridge.call("browserWindow.getAllWindows", vec![]).await.unwrap();
    assert_eq!(all.as_array().map(Vec::len), Some(2));
    assert_eq!(all[1]["title"], json!("B"));
    assert_eq!(all[1]["url"], json!("app://b"));
    assert_eq!(all[1]["bounds"]["width"], json!(300.0));
    assert_eq!(all[1]["isFullscreen"], json!(true));
    assert_eq!(all[0]["isVisible"], json!(false));

    assert_eq!(bridge.call("browserWindow.getFocusedWindow", vec![]).await.unwrap(), Value::Null);
    windows.focus(Some(2));
    assert_eq!(bridge.call("browserWindow.getFocusedWindow", vec![]).await.unwrap(), json!(2));
  }

  #[tokio::test]
  async fn window_id_must_be_integer() {
    let (bridge, _windows, _rx) = setup();
    assert!(matches!(bridge.call("browserWindow.show", vec![json!("1")]).await, Err(BridgeError::InvalidParams {..})));
  }
}
