//! Declarative operation tables and the generic forwarder that validates
//! arguments, resolves the host object and reshapes the result.

use std::sync::{Arc, RwLock};

use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, trace};
use serde_json::{json, Map, Value};

use crate::{common::{bytes_from_value, bytes_to_value}, error::{BridgeError, BridgeResult}, host::{HostObject, WindowHost}, rpc::Dispatcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
  String,
  Number,
  Integer,
  Bool,
  Object,
  Array,
  /// Base64 text, handed to the host as a byte array.
  Base64,
  Any,
}

impl Kind {
  fn accepts(&self, v: &Value) -> bool {
    match self {
      Kind::String | Kind::Base64 => v.is_string(),
      Kind::Number => v.is_number(),
      Kind::Integer => v.is_i64() || v.is_u64(),
      Kind::Bool => v.is_boolean(),
      Kind::Object => v.is_object(),
      Kind::Array => v.is_array(),
      Kind::Any => true,
    }
  }

  fn name(&self) -> &'static str {
    match self {
      Kind::String => "string",
      Kind::Number => "number",
      Kind::Integer => "integer",
      Kind::Bool => "boolean",
      Kind::Object => "object",
      Kind::Array => "array",
      Kind::Base64 => "base64 string",
      Kind::Any => "any",
    }
  }
}

/// Literal substituted for an absent optional argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lit {
  Bool(bool),
  Int(i64),
  Str(&'static str),
}

impl Lit {
  fn value(&self) -> Value {
    match self {
      Lit::Bool(b) => Value::Bool(*b),
      Lit::Int(i) => json!(i),
      Lit::Str(s) => Value::String(s.to_string()),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
  pub name: &'static str,
  pub kind: Kind,
  pub optional: bool,
  pub nullable: bool,
  pub variadic: bool,
  pub default: Option<Lit>,
}

impl Param {
  pub const fn new(name: &'static str, kind: Kind) -> Self {
    Param {name, kind, optional: false, nullable: false, variadic: false, default: None}
  }
  pub const fn string(name: &'static str) -> Self { Param::new(name, Kind::String) }
  pub const fn number(name: &'static str) -> Self { Param::new(name, Kind::Number) }
  pub const fn integer(name: &'static str) -> Self { Param::new(name, Kind::Integer) }
  pub const fn bool(name: &'static str) -> Self { Param::new(name, Kind::Bool) }
  pub const fn object(name: &'static str) -> Self { Param::new(name, Kind::Object) }
  pub const fn array(name: &'static str) -> Self { Param::new(name, Kind::Array) }
  pub const fn any(name: &'static str) -> Self { Param::new(name, Kind::Any) }

  pub const fn optional(mut self) -> Self {
    self.optional = true;
    self
  }

  /// Must be present but may be `null`.
  pub const fn nullable(mut self) -> Self {
    self.nullable = true;
    self
  }

  /// Swallows every remaining argument.
  pub const fn variadic(mut self) -> Self {
    self.variadic = true;
    self.optional = true;
    self
  }

  pub const fn or(mut self, default: Lit) -> Self {
    self.optional = true;
    self.default = Some(default);
    self
  }

  fn check(&self, method: &str, v: &Value) -> BridgeResult<()> {
    if self.kind.accepts(v) {
      Ok(())
    } else {
      Err(BridgeError::invalid_params(method, format!("{} must be {}", self.name, self.kind.name())))
    }
  }
}

/// Fixed reshaping of a host result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
  Raw,
  Unit,
  /// `[w, h]` to `{width, height}`
  Size,
  /// `[x, y]` to `{x, y}`
  Point,
  LoginItem,
  NativeImage,
  Base64,
}

impl Shape {
  pub fn apply(&self, v: Value) -> BridgeResult<Value> {
    Ok(match self {
      Shape::Raw => v,
      Shape::Unit => Value::Null,
      Shape::Size => match pair(&v) {
        Some((w, h)) => json!({"width": w, "height": h}),
        None => v,
      },
      Shape::Point => match pair(&v) {
        Some((x, y)) => json!({"x": x, "y": y}),
        None => v,
      },
      Shape::LoginItem => {
        let pick = |k: &str| v.get(k).cloned().unwrap_or(Value::Bool(false));
        json!({"openAtLogin": pick("openAtLogin"), "openAsHidden": pick("openAsHidden")})
      },
      Shape::NativeImage => shape_native_image(&v)?,
      Shape::Base64 => match bytes_from_value(&v) {
        Some(bytes) => Value::String(STANDARD.encode(bytes)),
        None => v,
      },
    })
  }
}

fn pair(v: &Value) -> Option<(Value, Value)> {
  match v.as_array() {
    Some(a) if a.len() == 2 => Some((a[0].clone(), a[1].clone())),
    _ => None,
  }
}

/// Host images arrive as `{png, size}` with the PNG either as base64 text or
/// a byte array.
pub fn shape_native_image(v: &Value) -> BridgeResult<Value> {
  let png = match v.get("png") {
    Some(Value::String(s)) => STANDARD.decode(s)
      .map_err(|e| BridgeError::invalid_params("nativeImage", format!("png: {}", e)))?,
    Some(other) => bytes_from_value(other).unwrap_or_default(),
    None => Vec::new(),
  };
  let size = v.get("size").cloned().unwrap_or_else(|| json!({"width": 0, "height": 0}));
  let data_url = format!("data:image/png;base64,{}", STANDARD.encode(&png));
  Ok(json!({"_data": bytes_to_value(&png), "size": size, "dataURL": data_url}))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operation {
  pub name: &'static str,
  pub params: &'static [Param],
  pub shape: Shape,
  pub host_method: Option<&'static str>,
}

impl Operation {
  pub const fn new(name: &'static str, params: &'static [Param]) -> Self {
    Operation {name, params, shape: Shape::Raw, host_method: None}
  }

  /// Host method name when it differs from the operation name.
  pub const fn calls(mut self, host_method: &'static str) -> Self {
    self.host_method = Some(host_method);
    self
  }

  pub const fn shaped(mut self, shape: Shape) -> Self {
    self.shape = shape;
    self
  }

  pub fn host_method(&self) -> &'static str {
    self.host_method.unwrap_or(self.name)
  }

  /// Checks `args` against the parameter list and returns the argument list
  /// the host sees: defaults filled in and base64 decoded. Absent trailing
  /// optionals stay absent.
  pub fn prepare(&self, method: &str, args: Vec<Value>) -> BridgeResult<Vec<Value>> {
    let mut out = Vec::with_capacity(args.len());
    let mut keep = 0;
    let mut rest = args.into_iter();
    for param in self.params {
      if param.variadic {
        for v in rest.by_ref() {
          param.check(method, &v)?;
          out.push(convert(param, v)?);
        }
        keep = out.len();
        break;
      }
      match rest.next() {
        Some(Value::Null) if param.nullable => {
          out.push(Value::Null);
          keep = out.len();
        },
        arg @ (None | Some(Value::Null)) if param.optional => {
          match param.default {
            Some(d) => {
              out.push(d.value());
              keep = out.len();
            },
            None => {
              out.push(Value::Null);
              if arg.is_some() {
                keep = out.len();
              }
            }
          }
        },
        None | Some(Value::Null) => {
          return Err(BridgeError::invalid_params(method, format!("missing parameter {}", param.name)));
        },
        Some(v) => {
          param.check(method, &v)?;
          out.push(convert(param, v)?);
          keep = out.len();
        }
      }
    }
    if rest.any(|v| !v.is_null()) {
      return Err(BridgeError::invalid_params(method, format!("expected at most {} arguments", self.params.len())));
    }
    out.truncate(keep);
    Ok(out)
  }
}

fn convert(param: &Param, v: Value) -> BridgeResult<Value> {
  match (param.kind, &v) {
    (Kind::Base64, Value::String(s)) => {
      let bytes = STANDARD.decode(s)
        .map_err(|e| BridgeError::invalid_params(param.name, e.to_string()))?;
      Ok(bytes_to_value(&bytes))
    },
    _ => Ok(v),
  }
}

/// Resolves the host object an operation runs against.
pub trait Target: Send + Sync {
  /// May consume leading arguments (e.g. the window id).
  fn resolve(&self, args: Vec<Value>) -> BridgeResult<(Arc<dyn HostObject>, Vec<Value>)>;
}

pub struct Singleton(pub Arc<dyn HostObject>);

impl Target for Singleton {
  fn resolve(&self, args: Vec<Value>) -> BridgeResult<(Arc<dyn HostObject>, Vec<Value>)> {
    Ok((self.0.clone(), args))
  }
}

/// Holder for an instance-scoped host attached after registration.
pub struct InstanceSlot {
  missing: &'static str,
  instance: RwLock<Option<Arc<dyn HostObject>>>,
}

impl InstanceSlot {
  pub fn new(missing: &'static str) -> Self {
    InstanceSlot {missing, instance: RwLock::new(None)}
  }

  pub fn attach(&self, instance: Arc<dyn HostObject>) {
    *self.instance.write().unwrap_or_else(|e| e.into_inner()) = Some(instance);
  }

  pub fn detach(&self) -> Option<Arc<dyn HostObject>> {
    self.instance.write().unwrap_or_else(|e| e.into_inner()).take()
  }

  pub fn get(&self) -> BridgeResult<Arc<dyn HostObject>> {
    self.instance.read().unwrap_or_else(|e| e.into_inner()).clone()
      .ok_or_else(|| BridgeError::PreconditionFailed(self.missing.to_string()))
  }
}

impl Target for InstanceSlot {
  fn resolve(&self, args: Vec<Value>) -> BridgeResult<(Arc<dyn HostObject>, Vec<Value>)> {
    Ok((self.get()?, args))
  }
}

/// First argument is a window id, stripped before the host call.
pub struct WindowTarget(pub Arc<dyn WindowHost>);

impl WindowTarget {
  pub fn window(&self, id: &Value) -> BridgeResult<(u64, Arc<dyn HostObject>)> {
    let id = id.as_u64().ok_or_else(|| BridgeError::invalid_params("browserWindow", "id must be integer"))?;
    match self.0.from_id(id) {
      Some(w) => Ok((id, w)),
      None => Err(BridgeError::window_not_found(id)),
    }
  }
}

impl Target for WindowTarget {
  fn resolve(&self, mut args: Vec<Value>) -> BridgeResult<(Arc<dyn HostObject>, Vec<Value>)> {
    if args.is_empty() {
      return Err(BridgeError::invalid_params("browserWindow", "missing parameter id"));
    }
    let id = args.remove(0);
    let (_, window) = self.window(&id)?;
    Ok((window, args))
  }
}

/// Registers `<prefix>.<name>` for every operation, each forwarding to the
/// host object `target` resolves.
pub fn forward_operations(dispatcher: &Dispatcher, prefix: &str, target: Arc<dyn Target>, operations: &'static [Operation]) {
  for op in operations {
    let method = format!("{}.{}", prefix, op.name);
    let target = target.clone();
    let name = method.clone();
    dispatcher.register(method, move |args| {
      let target = target.clone();
      let name = name.clone();
      async move {
        let args = op.prepare(&name, args)?;
        let (host, args) = target.resolve(args)?;
        trace!("forward {} -> {}", name, op.host_method());
        let res = host.invoke(op.host_method(), args).await?;
        op.shape.apply(res)
      }
    });
  }
  debug!("{}: {} operations forwarded", prefix, operations.len());
}

/// Builds an object from positional values.
pub fn named(names: &[&str], args: &[Value]) -> Value {
  let mut m = Map::new();
  for (i, n) in names.iter().enumerate() {
    m.insert(n.to_string(), args.get(i).cloned().unwrap_or(Value::Null));
  }
  Value::Object(m)
}
