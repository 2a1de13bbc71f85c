use std::{collections::HashSet, sync::{Arc, Mutex}};

use log::debug;
use serde_json::Value;

use crate::{config::BridgeConfig, electron::{self, Hosts, Modules}, error::BridgeResult, events::SubscriptionRegistry, host::HostObject, rpc::{Dispatcher, Invocation, Publisher}};

/// One running bridge: the dispatch table, the outbound publisher and the
/// per-window subscription registry. Modules register into it.
pub struct Bridge {
  config: BridgeConfig,
  dispatcher: Dispatcher,
  publisher: Arc<dyn Publisher>,
  windows: Arc<SubscriptionRegistry<u64>>,
  bound: Mutex<HashSet<&'static str>>,
}

impl Bridge {
  pub fn new(config: BridgeConfig, publisher: Arc<dyn Publisher>) -> Self {
    let windows = Arc::new(SubscriptionRegistry::new("window", publisher.clone()));
    Bridge {config, dispatcher: Dispatcher::new(), publisher, windows, bound: Mutex::new(HashSet::new())}
  }

  pub fn config(&self) -> &BridgeConfig {
    &self.config
  }

  pub fn dispatcher(&self) -> &Dispatcher {
    &self.dispatcher
  }

  pub fn publisher(&self) -> Arc<dyn Publisher> {
    self.publisher.clone()
  }

  pub fn window_subscriptions(&self) -> &Arc<SubscriptionRegistry<u64>> {
    &self.windows
  }

  /// True the first time `name` is claimed on this bridge.
  pub fn claim_once(&self, name: &'static str) -> bool {
    self.bound.lock().unwrap_or_else(|e| e.into_inner()).insert(name)
  }

  /// False for modules outside the configured allow-list.
  pub fn enabled(&self, module: &str) -> bool {
    let enabled = self.config.is_enabled(module);
    if !enabled {
      debug!("module {} disabled by config", module);
    }
    enabled
  }

  pub async fn call(&self, method: &str, params: Vec<Value>) -> BridgeResult<Value> {
    self.dispatcher.call(method, params).await
  }

  pub async fn invoke(&self, invocation: Invocation) -> BridgeResult<Value> {
    self.dispatcher.call(&invocation.method, invocation.params).await
  }

  /// Registers the natively implemented `fs` and `path` modules.
  pub fn register_node_modules(&self) {
    if self.enabled("fs") {
      crate::node::fs::register(&self.dispatcher);
    }
    if self.enabled("path") {
      crate::node::path::register(&self.dispatcher);
    }
  }

  /// Registers every enabled Electron module whose host was handed over.
  /// `tray`, `notification` and `menu` are always registered when enabled and
  /// fail with `PreconditionFailed` until an instance is attached.
  pub fn register_electron_modules(&self, hosts: Hosts) -> Modules {
    let mut modules = Modules::default();
    if let Some(app) = hosts.app.filter(|_| self.enabled("app")) {
      electron::app::register(self, app);
    }
    if let Some(windows) = hosts.windows.clone().filter(|_| self.enabled("browserWindow")) {
      electron::browser_window::register(self, windows);
    }
    if self.enabled("dialog") {
      if let Some(dialog) = hosts.dialog.or_else(default_dialog) {
        electron::dialog::register(self, dialog);
      }
    }
    if self.enabled("tray") {
      modules.tray = Some(electron::tray::register(self, hosts.tray));
    }
    if self.enabled("notification") {
      modules.notification = Some(electron::notification::register(self, hosts.notification));
    }
    if self.enabled("menu") {
      modules.menu = Some(electron::menu::register(self, hosts.menu, hosts.menu_instance));
    }
    if let Some(session) = hosts.session.filter(|_| self.enabled("session")) {
      modules.downloads = Some(electron::session::register(self, session, None));
    }
    if let Some(host) = hosts.power_monitor.filter(|_| self.enabled("powerMonitor")) {
      electron::power_monitor::register(self, host);
    }
    if let Some(host) = hosts.power_save_blocker.filter(|_| self.enabled("powerSaveBlocker")) {
      electron::power_save_blocker::register(self, host);
    }
    if let Some(host) = hosts.screen.filter(|_| self.enabled("screen")) {
      electron::screen::register(self, host);
    }
    if self.enabled("shell") {
      let shell = hosts.shell.unwrap_or_else(|| Arc::new(electron::shell::SystemShell) as Arc<dyn HostObject>);
      electron::shell::register(self, shell);
    }
    if let Some(host) = hosts.safe_storage.filter(|_| self.enabled("safeStorage")) {
      electron::safe_storage::register(self, host);
    }
    if let Some(host) = hosts.global_shortcut.filter(|_| self.enabled("globalShortcut")) {
      modules.global_shortcuts = Some(electron::global_shortcut::register(self, host));
    }
    if let Some(host) = hosts.auto_updater.filter(|_| self.enabled("autoUpdater")) {
      electron::auto_updater::register(self, host);
    }
    if let Some(host) = hosts.system_preferences.filter(|_| self.enabled("systemPreferences")) {
      modules.notifications = Some(electron::system_preferences::register(self, host));
    }
    if let Some(host) = hosts.share_menu.filter(|_| self.enabled("shareMenu")) {
      modules.share_menus = Some(electron::share_menu::register(self, host, hosts.windows));
    }
    if let Some(host) = hosts.push_notifications.filter(|_| self.enabled("pushNotifications")) {
      electron::push_notifications::register(self, host);
    }
    debug!("{} methods registered", self.dispatcher.methods().len());
    modules
  }
}

#[cfg(feature = "native-dialogs")]
fn default_dialog() -> Option<Arc<dyn HostObject>> {
  Some(Arc::new(electron::dialog::NativeDialogs))
}

#[cfg(not(feature = "native-dialogs"))]
fn default_dialog() -> Option<Arc<dyn HostObject>> {
  None
}
