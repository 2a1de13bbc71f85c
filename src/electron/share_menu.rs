//! Share sheet. The host creates a menu for a sharing item (`create`, returns
//! a handle), pops it up (`popup(handle, options)`) and closes it
//! (`closePopup(handle, windowId)`). Handles are kept per window so a later
//! `closePopup` finds the menu again.

use std::{collections::HashMap, sync::{Arc, Mutex}};

use log::trace;
use serde_json::{Map, Value};

use crate::{error::BridgeResult, host::{HostObject, WindowHost}, schema::{Operation, Param}, Bridge};

const POPUP: Operation = Operation::new("popup", &[Param::object("sharingItem"), Param::object("options").optional()]);
const CLOSE_POPUP: Operation = Operation::new("closePopup", &[Param::integer("windowId").optional()]);

pub struct ShareMenus {
  host: Arc<dyn HostObject>,
  windows: Option<Arc<dyn WindowHost>>,
  active: Mutex<HashMap<u64, Value>>,
}

impl ShareMenus {
  fn new(host: Arc<dyn HostObject>, windows: Option<Arc<dyn WindowHost>>) -> Self {
    ShareMenus {host, windows, active: Mutex::new(HashMap::new())}
  }

  fn window_exists(&self, id: u64) -> bool {
    self.windows.as_ref().is_some_and(|w| w.from_id(id).is_some())
  }

  /// Window ids that currently hold an open share menu.
  pub fn active_windows(&self) -> Vec<u64> {
    let mut ids: Vec<u64> = self.active.lock().unwrap_or_else(|e| e.into_inner()).keys().copied().collect();
    ids.sort_unstable();
    ids
  }

  fn target_window(&self, options: &Value) -> Option<u64> {
    match options.get("browserWindow").and_then(Value::as_u64) {
      Some(id) => self.window_exists(id).then_some(id),
      None => self.windows.as_ref().and_then(|w| w.focused_window()),
    }
  }

  pub async fn popup(&self, sharing_item: Value, options: Value) -> BridgeResult<()> {
    let window = self.target_window(&options);
    let handle = self.host.invoke("create", vec![sharing_item]).await?;

    let mut popup = Map::new();
    if let Some(id) = window {
      popup.insert("windowId".to_string(), Value::from(id));
    }
    if let (Some(x), Some(y)) = (options.get("x"), options.get("y")) {
      popup.insert("x".to_string(), x.clone());
      popup.insert("y".to_string(), y.clone());
    }
    if let Some(item) = options.get("positioningItem") {
      popup.insert("positioningItem".to_string(), item.clone());
    }

    if let Some(id) = window {
      self.active.lock().unwrap_or_else(|e| e.into_inner()).insert(id, handle.clone());
    }
    trace!("share menu popup on window {:?}", window);
    self.host.invoke("popup", vec![handle, Value::Object(popup)]).await?;
    Ok(())
  }

  /// Closes the menu of one window, or of every window when `window_id` is
  /// `None`. Unknown windows are ignored.
  pub async fn close_popup(&self, window_id: Option<u64>) -> BridgeResult<()> {
    let closing: Vec<(u64, Value)> = {
      let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
      match window_id {
        Some(id) if self.window_exists(id) => active.remove(&id).map(|h| (id, h)).into_iter().collect(),
        Some(_) => Vec::new(),
        None => active.drain().filter(|(id, _)| self.window_exists(*id)).collect(),
      }
    };
    for (id, handle) in closing {
      self.host.invoke("closePopup", vec![handle, Value::from(id)]).await?;
    }
    Ok(())
  }
}

pub fn register(bridge: &Bridge, host: Arc<dyn HostObject>, windows: Option<Arc<dyn WindowHost>>) -> Arc<ShareMenus> {
  let dispatcher = bridge.dispatcher();
  let menus = Arc::new(ShareMenus::new(host, windows));

  let m = menus.clone();
  dispatcher.register("shareMenu.popup", move |args| {
    let m = m.clone();
    async move {
      let mut args = POPUP.prepare("shareMenu.popup", args)?.into_iter();
      let sharing_item = args.next().unwrap_or(Value::Null);
      let options = args.next().unwrap_or(Value::Null);
      m.popup(sharing_item, options).await?;
      Ok(Value::Null)
    }
  });

  let m = menus.clone();
  dispatcher.register("shareMenu.closePopup", move |args| {
    let m = m.clone();
    async move {
      let args = CLOSE_POPUP.prepare("shareMenu.closePopup", args)?;
      m.close_popup(args.first().and_then(Value::as_u64)).await?;
      Ok(Value::Null)
    }
  });
  menus
}
