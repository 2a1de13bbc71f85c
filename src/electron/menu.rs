use std::sync::Arc;

use crate::{events::{Binding, Payload}, host::HostObject, schema::{forward_operations, Operation, Param, Shape, Singleton}, Bridge};

use super::InstanceModule;

/// Application wide menu calls.
pub static STATIC_OPERATIONS: &[Operation] = &[
  // null removes the application menu
  Operation::new("setApplicationMenu", &[Param::array("template").nullable()]).shaped(Shape::Unit),
  Operation::new("getApplicationMenu", &[]),
  Operation::new("buildFromTemplate", &[Param::array("template")]),
  Operation::new("sendActionToFirstResponder", &[Param::string("action")]).shaped(Shape::Unit),
];

/// Calls on the menu instance handed over at registration.
pub static OPERATIONS: &[Operation] = &[
  Operation::new("popup", &[Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("closePopup", &[Param::integer("windowId").optional()]).shaped(Shape::Unit),
  Operation::new("append", &[Param::object("menuItem")]).shaped(Shape::Unit),
  Operation::new("getMenuItemById", &[Param::string("id")]),
  Operation::new("insert", &[Param::integer("pos"), Param::object("menuItem")]).shaped(Shape::Unit),
  Operation::new("getItems", &[]),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("menu-will-show", Payload::Empty),
  Binding::new("menu-will-close", Payload::Empty),
];

/// Registers the static calls when `menu` is given, and the instance calls in
/// any case.
pub fn register(bridge: &Bridge, menu: Option<Arc<dyn HostObject>>, instance: Option<Arc<dyn HostObject>>) -> Arc<InstanceModule> {
  if let Some(menu) = menu {
    forward_operations(bridge.dispatcher(), "menu", Arc::new(Singleton(menu)), STATIC_OPERATIONS);
  }
  let module = InstanceModule::register(bridge, "menu", "Menu instance not provided during registration", OPERATIONS, BINDINGS);
  if let Some(instance) = instance {
    module.attach(instance);
  }
  module
}
