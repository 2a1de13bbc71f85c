use std::sync::Arc;

use crate::{events::{Binding, Payload}, host::HostObject, schema::{Operation, Param, Shape}, Bridge};

use super::InstanceModule;

pub static OPERATIONS: &[Operation] = &[
  Operation::new("destroy", &[]).shaped(Shape::Unit),
  Operation::new("setImage", &[Param::string("image")]).shaped(Shape::Unit),
  Operation::new("setPressedImage", &[Param::string("image")]).shaped(Shape::Unit),
  Operation::new("setToolTip", &[Param::string("toolTip")]).shaped(Shape::Unit),
  Operation::new("setTitle", &[Param::string("title"), Param::object("options").optional()]).shaped(Shape::Unit),
  Operation::new("getTitle", &[]),
  Operation::new("setIgnoreDoubleClickEvents", &[Param::bool("ignore")]).shaped(Shape::Unit),
  Operation::new("getIgnoreDoubleClickEvents", &[]),
  // null clears the menu
  Operation::new("setContextMenu", &[Param::array("template").nullable()]).shaped(Shape::Unit),
  Operation::new("displayBalloon", &[Param::object("options")]).shaped(Shape::Unit),
  Operation::new("removeBalloon", &[]).shaped(Shape::Unit),
  Operation::new("focus", &[]).shaped(Shape::Unit),
  Operation::new("getBounds", &[]),
  Operation::new("getGUID", &[]),
  Operation::new("isDestroyed", &[]),
];

pub static BINDINGS: &[Binding] = &[
  Binding::new("click", Payload::Named(&["bounds", "position"])),
  Binding::new("right-click", Payload::Named(&["bounds"])),
  Binding::new("double-click", Payload::Named(&["bounds"])),
  Binding::new("middle-click", Payload::Named(&["bounds"])),
  Binding::new("mouse-up", Payload::Named(&["position"])),
  Binding::new("mouse-down", Payload::Named(&["position"])),
  Binding::new("mouse-enter", Payload::Named(&["position"])),
  Binding::new("mouse-leave", Payload::Named(&["position"])),
  Binding::new("mouse-move", Payload::Named(&["position"])),
  Binding::new("balloon-show", Payload::Empty),
  Binding::new("balloon-click", Payload::Empty),
  Binding::new("balloon-closed", Payload::Empty),
];

pub fn register(bridge: &Bridge, tray: Option<Arc<dyn HostObject>>) -> Arc<InstanceModule> {
  let module = InstanceModule::register(bridge, "tray", "Tray instance not provided", OPERATIONS, BINDINGS);
  if let Some(tray) = tray {
    module.attach(tray);
  }
  module
}
