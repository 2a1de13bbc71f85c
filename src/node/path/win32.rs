use crate::node::types::{ParsedPath, PathObject};

use super::{basename_from, extname_from, format_with, normalize_string, parse_tail, slice, Flavor};

pub static FLAVOR: Flavor = Flavor {
  sep: "\\",
  delimiter: ";",
  basename,
  dirname,
  extname,
  join,
  normalize,
  parse,
  format,
  is_absolute,
  relative,
  resolve,
};

fn is_sep(c: u8) -> bool {
  c == b'/' || c == b'\\'
}

fn is_device_root(c: u8) -> bool {
  c.is_ascii_alphabetic()
}

fn has_drive(b: &[u8]) -> bool {
  b.len() >= 2 && is_device_root(b[0]) && b[1] == b':'
}

/// `\\server\share` prefix: returns (server range, share range end) when
/// both parts are present.
fn unc(b: &[u8]) -> Option<(usize, usize, usize)> {
  let len = b.len();
  let mut j = 2;
  let mut last = j;
  while j < len && !is_sep(b[j]) {
    j += 1;
  }
  if j >= len || j == last {
    return None;
  }
  let server_end = j;
  last = j;
  while j < len && is_sep(b[j]) {
    j += 1;
  }
  if j >= len || j == last {
    return None;
  }
  let share_start = j;
  while j < len && !is_sep(b[j]) {
    j += 1;
  }
  Some((server_end, share_start, j))
}

fn env_cwd_for(device: &str) -> Option<String> {
  std::env::var(format!("={}", device)).ok()
}

pub fn resolve(paths: &[String]) -> String {
  resolve_with(&super::process_cwd(), env_cwd_for, paths)
}

/// `resolve` with an explicit working directory and per-drive lookup.
pub fn resolve_with(cwd: &str, drive_cwd: fn(&str) -> Option<String>, paths: &[String]) -> String {
  let mut resolved_device = String::new();
  let mut resolved_tail = String::new();
  let mut resolved_absolute = false;
  let mut i = paths.len() as isize - 1;
  while i >= -1 {
    let path: String = if i >= 0 {
      let p = paths[i as usize].clone();
      if p.is_empty() {
        i -= 1;
        continue;
      }
      p
    } else if resolved_device.is_empty() {
      cwd.to_string()
    } else {
      let p = drive_cwd(&resolved_device).unwrap_or_else(|| cwd.to_string());
      let pb = p.as_bytes();
      let other_drive = pb.len() >= 3 && !slice(&p, 0, 2).eq_ignore_ascii_case(&resolved_device) && pb[2] == b'\\';
      if other_drive || pb.len() < 2 {
        format!("{}\\", resolved_device)
      } else {
        p
      }
    };
    let b = path.as_bytes();
    let len = b.len();
    let mut root_end = 0;
    let mut device = String::new();
    let mut is_absolute = false;
    let code = b[0];
    if len == 1 {
      if is_sep(code) {
        root_end = 1;
        is_absolute = true;
      }
    } else if is_sep(code) {
      is_absolute = true;
      if is_sep(b[1]) {
        if let Some((server_end, share_start, j)) = unc(b) {
          if j == len || j != share_start {
            device = format!("\\\\{}\\{}", slice(&path, 2, server_end), slice(&path, share_start, j));
            root_end = j;
          }
        }
      } else {
        root_end = 1;
      }
    } else if has_drive(b) {
      device = slice(&path, 0, 2);
      root_end = 2;
      if len > 2 && is_sep(b[2]) {
        is_absolute = true;
        root_end = 3;
      }
    }
    if !device.is_empty() {
      if !resolved_device.is_empty() {
        if !device.eq_ignore_ascii_case(&resolved_device) {
          i -= 1;
          continue;
        }
      } else {
        resolved_device = device;
      }
    }
    if resolved_absolute {
      if !resolved_device.is_empty() {
        break;
      }
    } else {
      resolved_tail = format!("{}\\{}", slice(&path, root_end, len), resolved_tail);
      resolved_absolute = is_absolute;
      if is_absolute && !resolved_device.is_empty() {
        break;
      }
    }
    i -= 1;
  }
  let tail = normalize_string(&resolved_tail, !resolved_absolute, b'\\', is_sep);
  let out = if resolved_absolute {
    format!("{}\\{}", resolved_device, tail)
  } else {
    format!("{}{}", resolved_device, tail)
  };
  if out.is_empty() { ".".to_string() } else { out }
}

pub fn normalize(path: &str) -> String {
  let b = path.as_bytes();
  let len = b.len();
  if len == 0 {
    return ".".to_string();
  }
  let mut root_end = 0;
  let mut device: Option<String> = None;
  let mut is_absolute = false;
  let code = b[0];
  if len == 1 {
    return if code == b'/' { "\\".to_string() } else { path.to_string() };
  }
  if is_sep(code) {
    is_absolute = true;
    if is_sep(b[1]) {
      if let Some((server_end, share_start, j)) = unc(b) {
        if j == len {
          return format!("\\\\{}\\{}\\", slice(path, 2, server_end), slice(path, share_start, len));
        }
        if j != share_start {
          device = Some(format!("\\\\{}\\{}", slice(path, 2, server_end), slice(path, share_start, j)));
          root_end = j;
        }
      }
    } else {
      root_end = 1;
    }
  } else if has_drive(b) {
    device = Some(slice(path, 0, 2));
    root_end = 2;
    if len > 2 && is_sep(b[2]) {
      is_absolute = true;
      root_end = 3;
    }
  }
  let mut tail = if root_end < len {
    normalize_string(&slice(path, root_end, len), !is_absolute, b'\\', is_sep)
  } else {
    String::new()
  };
  if tail.is_empty() && !is_absolute {
    tail = ".".to_string();
  }
  if !tail.is_empty() && is_sep(b[len - 1]) {
    tail.push('\\');
  }
  match device {
    None => if is_absolute { format!("\\{}", tail) } else { tail },
    Some(device) => if is_absolute { format!("{}\\{}", device, tail) } else { format!("{}{}", device, tail) },
  }
}

pub fn is_absolute(path: &str) -> bool {
  let b = path.as_bytes();
  if b.is_empty() {
    return false;
  }
  is_sep(b[0]) || (b.len() > 2 && has_drive(b) && is_sep(b[2]))
}

pub fn join(paths: &[String]) -> String {
  let parts: Vec<&str> = paths.iter().map(String::as_str).filter(|p| !p.is_empty()).collect();
  let first = match parts.first() {
    Some(first) => first.as_bytes(),
    None => return ".".to_string(),
  };
  let mut joined = parts.join("\\");
  // keep a UNC root, collapse any other run of leading separators
  let mut needs_replace = true;
  let mut slash_count = 0;
  if is_sep(first[0]) {
    slash_count += 1;
    if first.len() > 1 && is_sep(first[1]) {
      slash_count += 1;
      if first.len() > 2 {
        if is_sep(first[2]) {
          slash_count += 1;
        } else {
          needs_replace = false;
        }
      }
    }
  }
  if needs_replace {
    let jb = joined.as_bytes();
    while slash_count < jb.len() && is_sep(jb[slash_count]) {
      slash_count += 1;
    }
    if slash_count >= 2 {
      joined = format!("\\{}", slice(&joined, slash_count, jb.len()));
    }
  }
  normalize(&joined)
}

pub fn relative(from: &str, to: &str) -> String {
  relative_with(&super::process_cwd(), from, to)
}

pub fn relative_with(cwd: &str, from: &str, to: &str) -> String {
  if from == to {
    return String::new();
  }
  let from_orig = resolve_with(cwd, |_| None, &[from.to_string()]);
  let to_orig = resolve_with(cwd, |_| None, &[to.to_string()]);
  if from_orig == to_orig {
    return String::new();
  }
  let from = from_orig.to_ascii_lowercase();
  let to = to_orig.to_ascii_lowercase();
  if from == to {
    return String::new();
  }
  let (f, t) = (from.as_bytes(), to.as_bytes());

  let mut from_start = 0;
  while from_start < f.len() && f[from_start] == b'\\' {
    from_start += 1;
  }
  let mut from_end = f.len();
  while from_end > from_start + 1 && f[from_end - 1] == b'\\' {
    from_end -= 1;
  }
  let from_len = from_end - from_start;

  let mut to_start = 0;
  while to_start < t.len() && t[to_start] == b'\\' {
    to_start += 1;
  }
  let mut to_end = t.len();
  while to_end > to_start + 1 && t[to_end - 1] == b'\\' {
    to_end -= 1;
  }
  let to_len = to_end - to_start;

  let length = from_len.min(to_len);
  let mut last_common_sep: isize = -1;
  let mut i = 0;
  while i < length {
    let code = f[from_start + i];
    if code != t[to_start + i] {
      break;
    } else if code == b'\\' {
      last_common_sep = i as isize;
    }
    i += 1;
  }
  if i != length {
    if last_common_sep == -1 {
      return to_orig;
    }
  } else {
    if to_len > length {
      if t[to_start + i] == b'\\' {
        return slice(&to_orig, to_start + i + 1, t.len());
      }
      if i == 2 {
        return slice(&to_orig, to_start + i, t.len());
      }
    }
    if from_len > length {
      if f[from_start + i] == b'\\' {
        last_common_sep = i as isize;
      } else if i == 2 {
        last_common_sep = 3;
      }
    }
    if last_common_sep == -1 {
      last_common_sep = 0;
    }
  }
  let mut out = String::new();
  let mut j = from_start + last_common_sep as usize + 1;
  while j <= from_end {
    if j == from_end || f[j] == b'\\' {
      out.push_str(if out.is_empty() { ".." } else { "\\.." });
    }
    j += 1;
  }
  let mut to_start = to_start + last_common_sep as usize;
  if !out.is_empty() {
    return format!("{}{}", out, slice(&to_orig, to_start.min(to_end), to_end));
  }
  if to_start < t.len() && t[to_start] == b'\\' {
    to_start += 1;
  }
  slice(&to_orig, to_start.min(to_end), to_end)
}

pub fn dirname(path: &str) -> String {
  let b = path.as_bytes();
  let len = b.len();
  if len == 0 {
    return ".".to_string();
  }
  let mut root_end: Option<usize> = None;
  let mut offset = 0;
  let code = b[0];
  if len == 1 {
    return if is_sep(code) { path.to_string() } else { ".".to_string() };
  }
  if is_sep(code) {
    root_end = Some(1);
    offset = 1;
    if is_sep(b[1]) {
      if let Some((_, share_start, j)) = unc(b) {
        if j == len {
          return path.to_string();
        }
        if j != share_start {
          root_end = Some(j + 1);
          offset = j + 1;
        }
      }
    }
  } else if has_drive(b) {
    let end = if len > 2 && is_sep(b[2]) { 3 } else { 2 };
    root_end = Some(end);
    offset = end;
  }
  let mut end: Option<usize> = None;
  let mut matched_slash = true;
  for i in (offset..len).rev() {
    if is_sep(b[i]) {
      if !matched_slash {
        end = Some(i);
        break;
      }
    } else {
      matched_slash = false;
    }
  }
  match end.or(root_end) {
    Some(end) => slice(path, 0, end),
    None => ".".to_string(),
  }
}

pub fn basename(path: &str, suffix: Option<&str>) -> String {
  let first = if has_drive(path.as_bytes()) { 2 } else { 0 };
  basename_from(path, suffix, first, is_sep)
}

pub fn extname(path: &str) -> String {
  let first = if has_drive(path.as_bytes()) { 2 } else { 0 };
  extname_from(path, first, is_sep)
}

pub fn parse(path: &str) -> ParsedPath {
  let mut ret = ParsedPath::default();
  let b = path.as_bytes();
  let len = b.len();
  if len == 0 {
    return ret;
  }
  let mut root_end = 0;
  let code = b[0];
  if len == 1 {
    if is_sep(code) {
      ret.root = path.to_string();
      ret.dir = path.to_string();
    } else {
      ret.base = path.to_string();
      ret.name = path.to_string();
    }
    return ret;
  }
  if is_sep(code) {
    root_end = 1;
    if is_sep(b[1]) {
      if let Some((_, share_start, j)) = unc(b) {
        if j == len {
          root_end = j;
        } else if j != share_start {
          root_end = j + 1;
        }
      }
    }
  } else if has_drive(b) {
    if len <= 2 {
      ret.root = path.to_string();
      ret.dir = path.to_string();
      return ret;
    }
    root_end = 2;
    if is_sep(b[2]) {
      if len == 3 {
        ret.root = path.to_string();
        ret.dir = path.to_string();
        return ret;
      }
      root_end = 3;
    }
  }
  if root_end > 0 {
    ret.root = slice(path, 0, root_end);
  }
  let start_part = parse_tail(path, root_end, root_end, is_sep, &mut ret);
  if start_part > 0 && start_part != root_end {
    ret.dir = slice(path, 0, start_part - 1);
  } else {
    ret.dir = ret.root.clone();
  }
  ret
}

pub fn format(object: &PathObject) -> String {
  format_with("\\", object)
}
