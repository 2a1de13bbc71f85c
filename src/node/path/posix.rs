use crate::node::types::{ParsedPath, PathObject};

use super::{basename_from, extname_from, format_with, normalize_string, parse_tail, slice, Flavor};

pub static FLAVOR: Flavor = Flavor {
  sep: "/",
  delimiter: ":",
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
  c == b'/'
}

#[cfg(not(windows))]
fn cwd() -> String {
  super::process_cwd()
}

#[cfg(windows)]
fn cwd() -> String {
  let cwd = super::process_cwd();
  match cwd.find('\\') {
    Some(i) => cwd[i..].replace('\\', "/"),
    None => cwd.replace('\\', "/"),
  }
}

pub fn resolve(paths: &[String]) -> String {
  resolve_from(&cwd(), paths)
}

/// `resolve` against an explicit working directory.
pub fn resolve_from(cwd: &str, paths: &[String]) -> String {
  let mut resolved = String::new();
  let mut absolute = false;
  for path in paths.iter().rev().map(String::as_str).chain(std::iter::once(cwd)) {
    if path.is_empty() {
      continue;
    }
    resolved = format!("{}/{}", path, resolved);
    absolute = path.starts_with('/');
    if absolute {
      break;
    }
  }
  let normalized = normalize_string(&resolved, !absolute, b'/', is_sep);
  if absolute {
    format!("/{}", normalized)
  } else if normalized.is_empty() {
    ".".to_string()
  } else {
    normalized
  }
}

pub fn normalize(path: &str) -> String {
  if path.is_empty() {
    return ".".to_string();
  }
  let absolute = path.starts_with('/');
  let trailing = path.ends_with('/');
  let mut normalized = normalize_string(path, !absolute, b'/', is_sep);
  if normalized.is_empty() {
    if absolute {
      return "/".to_string();
    }
    return if trailing { "./".to_string() } else { ".".to_string() };
  }
  if trailing {
    normalized.push('/');
  }
  if absolute {
    format!("/{}", normalized)
  } else {
    normalized
  }
}

pub fn is_absolute(path: &str) -> bool {
  path.starts_with('/')
}

pub fn join(paths: &[String]) -> String {
  let parts: Vec<&str> = paths.iter().map(String::as_str).filter(|p| !p.is_empty()).collect();
  if parts.is_empty() {
    return ".".to_string();
  }
  normalize(&parts.join("/"))
}

pub fn relative(from: &str, to: &str) -> String {
  relative_from(&cwd(), from, to)
}

pub fn relative_from(cwd: &str, from: &str, to: &str) -> String {
  if from == to {
    return String::new();
  }
  let from = resolve_from(cwd, &[from.to_string()]);
  let to = resolve_from(cwd, &[to.to_string()]);
  if from == to {
    return String::new();
  }
  let (f, t) = (from.as_bytes(), to.as_bytes());
  let from_start = 1;
  let from_end = f.len();
  let from_len = from_end - from_start;
  let to_start = 1;
  let to_len = t.len() - to_start;
  let length = from_len.min(to_len);
  let mut last_common_sep: isize = -1;
  let mut i = 0;
  while i < length {
    let code = f[from_start + i];
    if code != t[to_start + i] {
      break;
    } else if code == b'/' {
      last_common_sep = i as isize;
    }
    i += 1;
  }
  if i == length {
    if to_len > length {
      if t[to_start + i] == b'/' {
        return slice(&to, to_start + i + 1, t.len());
      }
      if i == 0 {
        return slice(&to, to_start + i, t.len());
      }
    } else if from_len > length {
      if f[from_start + i] == b'/' {
        last_common_sep = i as isize;
      } else if i == 0 {
        last_common_sep = 0;
      }
    }
  }
  let mut out = String::new();
  let mut j = (from_start as isize + last_common_sep + 1) as usize;
  while j <= from_end {
    if j == from_end || f[j] == b'/' {
      out.push_str(if out.is_empty() { ".." } else { "/.." });
    }
    j += 1;
  }
  let tail_start = (to_start as isize + last_common_sep) as usize;
  format!("{}{}", out, slice(&to, tail_start, t.len()))
}

pub fn dirname(path: &str) -> String {
  if path.is_empty() {
    return ".".to_string();
  }
  let bytes = path.as_bytes();
  let has_root = bytes[0] == b'/';
  let mut end: Option<usize> = None;
  let mut matched_slash = true;
  for i in (1..bytes.len()).rev() {
    if bytes[i] == b'/' {
      if !matched_slash {
        end = Some(i);
        break;
      }
    } else {
      matched_slash = false;
    }
  }
  match end {
    None => if has_root { "/".to_string() } else { ".".to_string() },
    Some(1) if has_root => "//".to_string(),
    Some(end) => slice(path, 0, end),
  }
}

pub fn basename(path: &str, suffix: Option<&str>) -> String {
  basename_from(path, suffix, 0, is_sep)
}

pub fn extname(path: &str) -> String {
  extname_from(path, 0, is_sep)
}

pub fn parse(path: &str) -> ParsedPath {
  let mut ret = ParsedPath::default();
  if path.is_empty() {
    return ret;
  }
  let absolute = path.starts_with('/');
  let start = if absolute {
    ret.root = "/".to_string();
    1
  } else {
    0
  };
  let start_part = parse_tail(path, start, 0, is_sep, &mut ret);
  if start_part > 0 {
    ret.dir = slice(path, 0, start_part - 1);
  } else if absolute {
    ret.dir = "/".to_string();
  }
  ret
}

pub fn format(object: &PathObject) -> String {
  format_with("/", object)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn joins() {
    assert_eq!(join(&v(&["/foo", "bar", "baz/asdf", "quux", ".."])), "/foo/bar/baz/asdf");
    assert_eq!(join(&v(&["", ""])), ".");
    assert_eq!(join(&v(&["foo/", ""])), "foo/");
    assert_eq!(join(&v(&["", "/foo"])), "/foo");
    assert_eq!(join(&v(&["./"])), "./");
    assert_eq!(join(&v(&[".", "./", "."])), ".");
  }

  #[test]
  fn normalizes() {
    assert_eq!(normalize("/foo/bar//baz/asdf/quux/.."), "/foo/bar/baz/asdf");
    assert_eq!(normalize("./fixtures///b/../b/c.js"), "fixtures/b/c.js");
    assert_eq!(normalize("/foo/../../../bar"), "/bar");
    assert_eq!(normalize("a//b//../b"), "a/b");
    assert_eq!(normalize("../../../foo/../../../bar"), "../../../../../bar");
    assert_eq!(normalize("bar/foo../.."), "bar");
    assert_eq!(normalize("bar/foo../../"), "bar/");
    assert_eq!(normalize(""), ".");
    assert_eq!(normalize("./"), "./");
  }

  #[test]
  fn resolves() {
    assert_eq!(resolve_from("/cwd", &v(&["/foo/bar", "./baz"])), "/foo/bar/baz");
    assert_eq!(resolve_from("/cwd", &v(&["/foo/bar", "/tmp/file/"])), "/tmp/file");
    assert_eq!(resolve_from("/home/u", &v(&["wwwroot", "static_files/png/", "../gif/image.gif"])), "/home/u/wwwroot/static_files/gif/image.gif");
    assert_eq!(resolve_from("/", &v(&[])), "/");
    assert_eq!(resolve_from("/a/b", &v(&["", ""])), "/a/b");
  }

  #[test]
  fn relatives() {
    let cwd = "/cwd";
    assert_eq!(relative_from(cwd, "/data/orandea/test/aaa", "/data/orandea/impl/bbb"), "../../impl/bbb");
    assert_eq!(relative_from(cwd, "/var/lib", "/var"), "..");
    assert_eq!(relative_from(cwd, "/var/lib", "/bin"), "../../bin");
    assert_eq!(relative_from(cwd, "/var/lib", "/var/lib"), "");
    assert_eq!(relative_from(cwd, "/var/lib", "/var/apache"), "../apache");
    assert_eq!(relative_from(cwd, "/var/", "/var/lib"), "lib");
    assert_eq!(relative_from(cwd, "/", "/var/lib"), "var/lib");
    assert_eq!(relative_from(cwd, "/foo/test", "/foo/test/bar/package.json"), "bar/package.json");
    assert_eq!(relative_from(cwd, "/foo/bar/baz-quux", "/foo/bar/baz"), "../baz");
    assert_eq!(relative_from(cwd, "/baz-quux", "/baz"), "../baz");
    assert_eq!(relative_from(cwd, "/page1/page2/foo", "/"), "../../..");
  }

  #[test]
  fn dirnames() {
    assert_eq!(dirname("/a/b/"), "/a");
    assert_eq!(dirname("/a/b"), "/a");
    assert_eq!(dirname("/a"), "/");
    assert_eq!(dirname(""), ".");
    assert_eq!(dirname("/"), "/");
    assert_eq!(dirname("////"), "/");
    assert_eq!(dirname("//a"), "//");
    assert_eq!(dirname("foo"), ".");
  }

  #[test]
  fn basenames() {
    assert_eq!(basename("/quux/quux.html", None), "quux.html");
    assert_eq!(basename("/foo/bar/baz/asdf/quux.html", Some(".html")), "quux");
    assert_eq!(basename("/dir/basename.ext/", None), "basename.ext");
    assert_eq!(basename("basename.ext//", None), "basename.ext");
    assert_eq!(basename("aaa/bbb", Some("bbb")), "bbb");
    assert_eq!(basename("aaa/bbb", Some("b")), "bb");
    assert_eq!(basename("/aaa/bbb", Some("a/bbb")), "bbb");
    assert_eq!(basename("a", Some("a")), "");
    assert_eq!(basename("", None), "");
  }

  #[test]
  fn extnames() {
    assert_eq!(extname("index.html"), ".html");
    assert_eq!(extname("index.coffee.md"), ".md");
    assert_eq!(extname("index."), ".");
    assert_eq!(extname("index"), "");
    assert_eq!(extname(".index"), "");
    assert_eq!(extname(".index.md"), ".md");
    assert_eq!(extname("file/"), "");
    assert_eq!(extname(".."), "");
  }

  #[test]
  fn parses_and_formats() {
    let p = parse("/home/user/dir/file.txt");
    assert_eq!(p, ParsedPath {root: "/".into(), dir: "/home/user/dir".into(), base: "file.txt".into(), ext: ".txt".into(), name: "file".into()});
    let p = parse("./file");
    assert_eq!((p.dir.as_str(), p.base.as_str(), p.root.as_str()), (".", "file", ""));
    let p = parse("/");
    assert_eq!((p.root.as_str(), p.dir.as_str(), p.base.as_str()), ("/", "/", ""));
    let p = parse(".bashrc");
    assert_eq!((p.name.as_str(), p.ext.as_str()), (".bashrc", ""));
    let o = PathObject {root: Some("/ignored".into()), dir: Some("/home/user/dir".into()), base: Some("file.txt".into()), ..PathObject::default()};
    assert_eq!(format(&o), "/home/user/dir/file.txt");
    let o = PathObject {root: Some("/".into()), name: Some("file".into()), ext: Some(".txt".into()), ..PathObject::default()};
    assert_eq!(format(&o), "/file.txt");
  }
}
