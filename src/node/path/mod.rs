//! Node style path handling for both platform flavors. `path.*` follows the
//! platform the crate was built for.

pub mod posix;
pub mod win32;

use log::debug;
use serde_json::Value;

use crate::{error::{BridgeError, BridgeResult}, rpc::Dispatcher, schema::{Operation, Param}};

use super::types::{ParsedPath, PathObject};

/// Path functions of one flavor.
pub struct Flavor {
  pub sep: &'static str,
  pub delimiter: &'static str,
  pub basename: fn(&str, Option<&str>) -> String,
  pub dirname: fn(&str) -> String,
  pub extname: fn(&str) -> String,
  pub join: fn(&[String]) -> String,
  pub normalize: fn(&str) -> String,
  pub parse: fn(&str) -> ParsedPath,
  pub format: fn(&PathObject) -> String,
  pub is_absolute: fn(&str) -> bool,
  pub relative: fn(&str, &str) -> String,
  pub resolve: fn(&[String]) -> String,
}

#[cfg(not(windows))]
pub static NATIVE: &Flavor = &posix::FLAVOR;
#[cfg(windows)]
pub static NATIVE: &Flavor = &win32::FLAVOR;

static OPERATIONS: &[Operation] = &[
  Operation::new("basename", &[Param::string("path"), Param::string("suffix").optional()]),
  Operation::new("dirname", &[Param::string("path")]),
  Operation::new("extname", &[Param::string("path")]),
  Operation::new("join", &[Param::string("paths").variadic()]),
  Operation::new("normalize", &[Param::string("path")]),
  Operation::new("parse", &[Param::string("path")]),
  Operation::new("format", &[Param::object("pathObject")]),
  Operation::new("isAbsolute", &[Param::string("path")]),
  Operation::new("relative", &[Param::string("from"), Param::string("to")]),
  Operation::new("resolve", &[Param::string("paths").variadic()]),
];

static NATIVE_ONLY: &[Operation] = &[
  Operation::new("sep", &[]),
  Operation::new("delimiter", &[]),
  Operation::new("cwd", &[]),
];

pub fn register(dispatcher: &Dispatcher) {
  register_flavor(dispatcher, "path", NATIVE, OPERATIONS);
  register_flavor(dispatcher, "path", NATIVE, NATIVE_ONLY);
  register_flavor(dispatcher, "path.posix", &posix::FLAVOR, OPERATIONS);
  register_flavor(dispatcher, "path.win32", &win32::FLAVOR, OPERATIONS);
  debug!("path: registered");
}

fn register_flavor(dispatcher: &Dispatcher, prefix: &str, flavor: &'static Flavor, operations: &'static [Operation]) {
  for op in operations {
    let method = format!("{}.{}", prefix, op.name);
    let name = method.clone();
    dispatcher.register(method, move |args| {
      let res = op.prepare(&name, args).and_then(|args| process_path_command(flavor, op.name, args));
      async move { res }
    });
  }
}

fn strings(args: &[Value]) -> Vec<String> {
  args.iter().filter_map(|v| v.as_str().map(str::to_string)).collect()
}

fn string_at(args: &[Value], i: usize) -> &str {
  args.get(i).and_then(Value::as_str).unwrap_or("")
}

pub fn process_path_command(flavor: &Flavor, op: &str, args: Vec<Value>) -> BridgeResult<Value> {
  Ok(match op {
    "basename" => Value::String((flavor.basename)(string_at(&args, 0), args.get(1).and_then(Value::as_str))),
    "dirname" => Value::String((flavor.dirname)(string_at(&args, 0))),
    "extname" => Value::String((flavor.extname)(string_at(&args, 0))),
    "join" => Value::String((flavor.join)(&strings(&args))),
    "normalize" => Value::String((flavor.normalize)(string_at(&args, 0))),
    "parse" => serde_json::to_value((flavor.parse)(string_at(&args, 0)))?,
    "format" => {
      let object: PathObject = serde_json::from_value(args.first().cloned().unwrap_or(Value::Null))
        .map_err(|e| BridgeError::invalid_params("path.format", e.to_string()))?;
      Value::String((flavor.format)(&object))
    },
    "isAbsolute" => Value::Bool((flavor.is_absolute)(string_at(&args, 0))),
    "relative" => Value::String((flavor.relative)(string_at(&args, 0), string_at(&args, 1))),
    "resolve" => Value::String((flavor.resolve)(&strings(&args))),
    "sep" => Value::String(flavor.sep.to_string()),
    "delimiter" => Value::String(flavor.delimiter.to_string()),
    "cwd" => Value::String(process_cwd()),
    other => return Err(BridgeError::MethodNotFound(format!("path.{}", other))),
  })
}

pub(crate) fn process_cwd() -> String {
  std::env::current_dir().map(|p| p.to_string_lossy().into_owned()).unwrap_or_else(|_| ".".to_string())
}

/// Byte range of `p` as an owned string.
pub(crate) fn slice(p: &str, start: usize, end: usize) -> String {
  String::from_utf8_lossy(&p.as_bytes()[start..end]).into_owned()
}

/// Resolves `.` and `..` segments. Leading `..` are kept only when
/// `allow_above_root`.
pub(crate) fn normalize_string(path: &str, allow_above_root: bool, separator: u8, is_sep: fn(u8) -> bool) -> String {
  let bytes = path.as_bytes();
  let mut res: Vec<u8> = Vec::new();
  let mut last_segment_length: isize = 0;
  let mut last_slash: isize = -1;
  let mut dots: isize = 0;
  let mut code: u8 = 0;
  let len = bytes.len() as isize;
  let mut i: isize = 0;
  while i <= len {
    if i < len {
      code = bytes[i as usize];
    } else if is_sep(code) {
      break;
    } else {
      code = b'/';
    }
    if is_sep(code) {
      if last_slash == i - 1 || dots == 1 {
        // empty or `.` segment
      } else if dots == 2 {
        let ends_in_dots = res.len() >= 2 && last_segment_length == 2
          && res[res.len() - 1] == b'.' && res[res.len() - 2] == b'.';
        if !ends_in_dots {
          if res.len() > 2 {
            match res.iter().rposition(|c| *c == separator) {
              None => {
                res.clear();
                last_segment_length = 0;
              },
              Some(idx) => {
                res.truncate(idx);
                last_segment_length = match res.iter().rposition(|c| *c == separator) {
                  Some(j) => res.len() as isize - 1 - j as isize,
                  None => res.len() as isize,
                };
              }
            }
            last_slash = i;
            dots = 0;
            i += 1;
            continue;
          } else if !res.is_empty() {
            res.clear();
            last_segment_length = 0;
            last_slash = i;
            dots = 0;
            i += 1;
            continue;
          }
        }
        if allow_above_root {
          if !res.is_empty() {
            res.push(separator);
          }
          res.extend_from_slice(b"..");
          last_segment_length = 2;
        }
      } else {
        if !res.is_empty() {
          res.push(separator);
        }
        res.extend_from_slice(&bytes[(last_slash + 1) as usize..i as usize]);
        last_segment_length = i - last_slash - 1;
      }
      last_slash = i;
      dots = 0;
    } else if code == b'.' && dots != -1 {
      dots += 1;
    } else {
      dots = -1;
    }
    i += 1;
  }
  String::from_utf8_lossy(&res).into_owned()
}

pub(crate) fn basename_from(path: &str, suffix: Option<&str>, first: usize, is_sep: fn(u8) -> bool) -> String {
  let bytes = path.as_bytes();
  let len = bytes.len();
  let mut start = first;
  let mut end: isize = -1;
  let mut matched_slash = true;
  if let Some(suffix) = suffix.filter(|s| !s.is_empty() && s.len() <= len) {
    if suffix == path {
      return String::new();
    }
    let suffix = suffix.as_bytes();
    let mut ext_idx = suffix.len() as isize - 1;
    let mut first_non_slash_end: isize = -1;
    for i in (first..len).rev() {
      let code = bytes[i];
      if is_sep(code) {
        if !matched_slash {
          start = i + 1;
          break;
        }
      } else {
        if first_non_slash_end == -1 {
          matched_slash = false;
          first_non_slash_end = i as isize + 1;
        }
        if ext_idx >= 0 {
          if code == suffix[ext_idx as usize] {
            ext_idx -= 1;
            if ext_idx == -1 {
              end = i as isize;
            }
          } else {
            ext_idx = -1;
            end = first_non_slash_end;
          }
        }
      }
    }
    if start as isize == end {
      end = first_non_slash_end;
    } else if end == -1 {
      end = len as isize;
    }
    if end < start as isize {
      return String::new();
    }
    return slice(path, start, end as usize);
  }
  for i in (first..len).rev() {
    if is_sep(bytes[i]) {
      if !matched_slash {
        start = i + 1;
        break;
      }
    } else if end == -1 {
      matched_slash = false;
      end = i as isize + 1;
    }
  }
  if end == -1 {
    return String::new();
  }
  slice(path, start, end as usize)
}

pub(crate) fn extname_from(path: &str, first: usize, is_sep: fn(u8) -> bool) -> String {
  let bytes = path.as_bytes();
  let mut start_dot: isize = -1;
  let mut start_part = first as isize;
  let mut end: isize = -1;
  let mut matched_slash = true;
  let mut pre_dot_state = 0;
  for i in (first..bytes.len()).rev() {
    let code = bytes[i];
    if is_sep(code) {
      if !matched_slash {
        start_part = i as isize + 1;
        break;
      }
      continue;
    }
    if end == -1 {
      matched_slash = false;
      end = i as isize + 1;
    }
    if code == b'.' {
      if start_dot == -1 {
        start_dot = i as isize;
      } else if pre_dot_state != 1 {
        pre_dot_state = 1;
      }
    } else if start_dot != -1 {
      pre_dot_state = -1;
    }
  }
  if start_dot == -1 || end == -1 || pre_dot_state == 0
    || (pre_dot_state == 1 && start_dot == end - 1 && start_dot == start_part + 1) {
    return String::new();
  }
  slice(path, start_dot as usize, end as usize)
}

/// Fills name, base and ext of `ret` from the last segment of
/// `path[lower..]`. Returns where that segment starts, or `init_part` when
/// there is no separator before it.
pub(crate) fn parse_tail(path: &str, lower: usize, init_part: usize, is_sep: fn(u8) -> bool, ret: &mut ParsedPath) -> usize {
  let bytes = path.as_bytes();
  let mut start_dot: isize = -1;
  let mut start_part = init_part;
  let mut end: isize = -1;
  let mut matched_slash = true;
  let mut pre_dot_state = 0;
  for i in (lower..bytes.len()).rev() {
    let code = bytes[i];
    if is_sep(code) {
      if !matched_slash {
        start_part = i + 1;
        break;
      }
      continue;
    }
    if end == -1 {
      matched_slash = false;
      end = i as isize + 1;
    }
    if code == b'.' {
      if start_dot == -1 {
        start_dot = i as isize;
      } else if pre_dot_state != 1 {
        pre_dot_state = 1;
      }
    } else if start_dot != -1 {
      pre_dot_state = -1;
    }
  }
  if end != -1 {
    let start = start_part.max(lower);
    let end = end as usize;
    if start_dot == -1 || pre_dot_state == 0
      || (pre_dot_state == 1 && start_dot == end as isize - 1 && start_dot == start_part as isize + 1) {
      ret.base = slice(path, start, end);
      ret.name = ret.base.clone();
    } else {
      let start_dot = start_dot as usize;
      ret.name = slice(path, start, start_dot);
      ret.base = slice(path, start, end);
      ret.ext = slice(path, start_dot, end);
    }
  }
  start_part
}

pub(crate) fn format_with(sep: &str, object: &PathObject) -> String {
  let root = object.root.clone().unwrap_or_default();
  let dir = object.dir.clone().filter(|d| !d.is_empty()).unwrap_or_else(|| root.clone());
  let base = match object.base.clone().filter(|b| !b.is_empty()) {
    Some(base) => base,
    None => {
      let ext = match object.ext.as_deref() {
        Some(e) if !e.is_empty() => if e.starts_with('.') { e.to_string() } else { format!(".{}", e) },
        _ => String::new(),
      };
      format!("{}{}", object.name.clone().unwrap_or_default(), ext)
    }
  };
  if dir.is_empty() {
    base
  } else if dir == root {
    format!("{}{}", dir, base)
  } else {
    format!("{}{}{}", dir, sep, base)
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[tokio::test]
  async fn flavors_are_registered() {
    let d = Dispatcher::new();
    register(&d);
    assert_eq!(d.call("path.posix.join", vec![json!("a"), json!("b")]).await.unwrap(), json!("a/b"));
    assert_eq!(d.call("path.win32.join", vec![json!("a"), json!("b")]).await.unwrap(), json!("a\\b"));
    assert_eq!(d.call("path.win32.parse", vec![json!("C:\\x\\y.txt")]).await.unwrap(),
      json!({"root": "C:\\", "dir": "C:\\x", "base": "y.txt", "ext": ".txt", "name": "y"}));
    assert_eq!(d.call("path.posix.format", vec![json!({"dir": "/a", "name": "b", "ext": "c"})]).await.unwrap(), json!("/a/b.c"));
    assert_eq!(d.call("path.sep", vec![]).await.unwrap(), json!(NATIVE.sep));
    assert_eq!(d.call("path.cwd", vec![]).await.unwrap(), json!(process_cwd()));
    assert!(!d.contains("path.posix.cwd"));
  }

  #[tokio::test]
  async fn bad_arguments() {
    let d = Dispatcher::new();
    register(&d);
    assert!(matches!(d.call("path.posix.basename", vec![json!(1)]).await, Err(BridgeError::InvalidParams {..})));
    assert!(matches!(d.call("path.posix.join", vec![json!("a"), json!(2)]).await, Err(BridgeError::InvalidParams {..})));
  }

  #[test]
  fn normalize_string_collapses_dots() {
    let is_sep = |c: u8| c == b'/';
    assert_eq!(normalize_string("a/b/../c/./d", false, b'/', is_sep), "a/c/d");
    assert_eq!(normalize_string("../../a", true, b'/', is_sep), "../../a");
    assert_eq!(normalize_string("../../a", false, b'/', is_sep), "a");
    assert_eq!(normalize_string("a/../../b", true, b'/', is_sep), "../b");
  }
}
