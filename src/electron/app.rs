use std::sync::Arc;

use serde_json::json;

use crate::{events::{Binding, Payload}, host::HostObject, schema::{forward_operations, Lit, Operation, Param, Shape, Singleton}, Bridge};

use super::bind_singleton;

const PROTOCOL: &[Param] = &[Param::string("protocol"), Param::string("path").optional(), Param::array("args").optional()];

pub static OPERATIONS: &[Operation] = &[
  Operation::new("getName", &[]),
  Operation::new("setName", &[Param::string("name")]).shaped(Shape::Unit),
  Operation::new("getVersion", &[]),
  Operation::new("getAppPath", &[]),
  Operation::new("getLocale", &[]),
  Operation::new("getSystemLocale", &[]),
  Operation::new("getPreferredSystemLanguages", &[]),
  Operation::new("getLocaleCountryCode", &[]),
  Operation::new("isReady", &[]),
  Operation::new("getPath", &[Param::string("name")]),
  Operation::new("setPath", &[Param::string("name"), Param::string("path")]).shaped(Shape::Unit),
  Operation::new("setAppLogsPath", &[Param::string("path").optional()]).shaped(Shape::Unit),
  Operation::new("quit", &[]).shaped(Shape::Unit),
  Operation::new("exit", &[Param::integer("exitCode").optional()]).shaped(Shape::Unit),
  Operation::new("relaunch", &[Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("focus", &[Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("hide", &[]).shaped(Shape::Unit),
  Operation::new("show", &[]).shaped(Shape::Unit),
  Operation::new("addRecentDocument", &[Param::string("path")]).shaped(Shape::Unit),
  Operation::new("clearRecentDocuments", &[]).shaped(Shape::Unit),
  Operation::new("setAsDefaultProtocolClient", PROTOCOL),
  Operation::new("removeAsDefaultProtocolClient", PROTOCOL),
  Operation::new("isDefaultProtocolClient", PROTOCOL),
  Operation::new("requestSingleInstanceLock", &[Param::object("additionalData").optional()]),
  Operation::new("hasSingleInstanceLock", &[]),
  Operation::new("releaseSingleInstanceLock", &[]).shaped(Shape::Unit),
  Operation::new("setBadgeCount", &[Param::integer("count").or(Lit::Int(0))]).shaped(Shape::Unit),
  Operation::new("getBadgeCount", &[]),
  Operation::new("getLoginItemSettings", &[Param::object("options").optional()]).shaped(Shape::LoginItem),
  Operation::new("setLoginItemSettings", &[Param::object("settings")]).shaped(Shape::Unit),
  Operation::new("isAccessibilitySupportEnabled", &[]),
  Operation::new("setAccessibilitySupportEnabled", &[Param::bool("enabled")]).shaped(Shape::Unit),
  Operation::new("showAboutPanel", &[]).shaped(Shape::Unit),
  Operation::new("setAboutPanelOptions", &[Param::object("options")]).shaped(Shape::Unit),
  Operation::new("getGPUFeatureStatus", &[]),
  Operation::new("getGPUInfo", &[Param::string("infoType")]),
  Operation::new("getAppMetrics", &[]),
  Operation::new("isEmojiPanelSupported", &[]),
  Operation::new("showEmojiPanel", &[]).shaped(Shape::Unit),
  Operation::new("getFileIcon", &[Param::string("path"), Param::object("options").optional()]).shaped(Shape::NativeImage),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("window-all-closed", Payload::Empty),
  Binding::new("quit", Payload::Named(&["exitCode"])),
  // windows are reduced to id and title
  Binding::new("browser-window-created", Payload::Pick(&["id", "title"])),
  Binding::new("browser-window-focus", Payload::Pick(&["id", "title"])),
  Binding::new("browser-window-blur", Payload::Pick(&["id", "title"])),
  Binding::new("web-contents-created", Payload::Pick(&["id"])),
  Binding::new("open-file", Payload::Named(&["path"])),
  Binding::new("open-url", Payload::Named(&["url"])),
  Binding::new("second-instance", Payload::Named(&["argv", "workingDirectory"])),
  Binding::new("accessibility-support-changed", Payload::Named(&["enabled"])),
];

pub fn register(bridge: &Bridge, app: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "app", Arc::new(Singleton(app.clone())), OPERATIONS);
  // the host keeps no recent document list
  bridge.dispatcher().register("app.getRecentDocuments", |_| async { Ok(json!([])) });
  bind_singleton(bridge, &app, "app", BINDINGS);
}
