//! Electron style modules. Each forwards its operation table to a host object
//! and publishes the host's events.

use std::sync::{Arc, Mutex};

use log::debug;

use crate::{events::{install_bindings, remove_bindings, Binding}, host::{HostObject, ListenerId, SessionHost, WindowHost}, rpc::Publisher, schema::{forward_operations, InstanceSlot, Operation}, Bridge};

pub mod app;
pub mod auto_updater;
pub mod browser_window;
pub mod dialog;
pub mod global_shortcut;
pub mod menu;
pub mod notification;
pub mod power_monitor;
pub mod power_save_blocker;
pub mod push_notifications;
pub mod safe_storage;
pub mod screen;
pub mod session;
pub mod share_menu;
pub mod shell;
pub mod system_preferences;
pub mod tray;
pub mod types;

/// Platform objects handed over by the embedding application. A module whose
/// host is missing is not registered, except the instance modules which
/// answer `PreconditionFailed` until an instance is attached.
#[derive(Default, Clone)]
pub struct Hosts {
  pub app: Option<Arc<dyn HostObject>>,
  pub windows: Option<Arc<dyn WindowHost>>,
  pub dialog: Option<Arc<dyn HostObject>>,
  pub tray: Option<Arc<dyn HostObject>>,
  pub notification: Option<Arc<dyn HostObject>>,
  pub menu: Option<Arc<dyn HostObject>>,
  pub menu_instance: Option<Arc<dyn HostObject>>,
  pub session: Option<Arc<dyn SessionHost>>,
  pub power_monitor: Option<Arc<dyn HostObject>>,
  pub power_save_blocker: Option<Arc<dyn HostObject>>,
  pub screen: Option<Arc<dyn HostObject>>,
  /// Falls back to [`shell::SystemShell`].
  pub shell: Option<Arc<dyn HostObject>>,
  pub safe_storage: Option<Arc<dyn HostObject>>,
  pub global_shortcut: Option<Arc<dyn HostObject>>,
  pub auto_updater: Option<Arc<dyn HostObject>>,
  pub system_preferences: Option<Arc<dyn HostObject>>,
  pub share_menu: Option<Arc<dyn HostObject>>,
  pub push_notifications: Option<Arc<dyn HostObject>>,
}

/// What registration hands back: instance modules to attach to, and the
/// state of the modules that keep some.
#[derive(Default)]
pub struct Modules {
  pub tray: Option<Arc<InstanceModule>>,
  pub notification: Option<Arc<InstanceModule>>,
  pub menu: Option<Arc<InstanceModule>>,
  pub downloads: Option<Arc<session::Downloads>>,
  pub global_shortcuts: Option<Arc<global_shortcut::GlobalShortcuts>>,
  pub share_menus: Option<Arc<share_menu::ShareMenus>>,
  pub notifications: Option<Arc<system_preferences::NotificationSubscriptions>>,
}

/// A module bound to one host instance at a time, e.g. the tray icon.
pub struct InstanceModule {
  prefix: &'static str,
  bindings: &'static [Binding],
  publisher: Arc<dyn Publisher>,
  slot: Arc<InstanceSlot>,
  installed: Mutex<Vec<(&'static str, ListenerId)>>,
}

impl InstanceModule {
  pub fn register(bridge: &Bridge, prefix: &'static str, missing: &'static str, operations: &'static [Operation], bindings: &'static [Binding]) -> Arc<Self> {
    let slot = Arc::new(InstanceSlot::new(missing));
    forward_operations(bridge.dispatcher(), prefix, slot.clone(), operations);
    Arc::new(InstanceModule {prefix, bindings, publisher: bridge.publisher(), slot, installed: Mutex::new(Vec::new())})
  }

  /// Replaces the current instance, moving the event bindings over.
  pub fn attach(&self, instance: Arc<dyn HostObject>) {
    self.detach();
    let installed = install_bindings(&instance, self.prefix, self.bindings, &self.publisher);
    *self.installed.lock().unwrap_or_else(|e| e.into_inner()) = installed;
    self.slot.attach(instance);
    debug!("{} instance attached", self.prefix);
  }

  pub fn detach(&self) {
    if let Some(old) = self.slot.detach() {
      let installed = std::mem::take(&mut *self.installed.lock().unwrap_or_else(|e| e.into_inner()));
      remove_bindings(&old, installed);
      debug!("{} instance detached", self.prefix);
    }
  }

  pub fn is_attached(&self) -> bool {
    self.slot.get().is_ok()
  }
}

pub(crate) fn bind_singleton(bridge: &Bridge, host: &Arc<dyn HostObject>, prefix: &str, bindings: &'static [Binding]) {
  install_bindings(host, prefix, bindings, &bridge.publisher());
}
