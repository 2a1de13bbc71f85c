use std::{collections::VecDeque, fs::Metadata, io, path::{Path, PathBuf}, time::{Duration, SystemTime, UNIX_EPOCH}};

use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, trace};
use serde_json::{Map, Value};
use tokio::{fs, io::AsyncWriteExt};

use crate::{common::{bytes_to_value, Encoding}, error::{BridgeError, BridgeResult}, host::HostError, rpc::Dispatcher, schema::{Lit, Operation, Param}};

use super::types::{FSCommand, FSData, FSDirent, FSEncodingOption, FSMkdirOption, FSOptions, FSStatus, FSTime};

const COPYFILE_EXCL: u32 = 1;
/// `fs.constants` access modes.
pub const F_OK: u32 = 0;
pub const R_OK: u32 = 4;
pub const W_OK: u32 = 2;
pub const X_OK: u32 = 1;

pub static OPERATIONS: &[Operation] = &[
  Operation::new("readFile", &[Param::string("path"), Param::any("options").optional()]),
  Operation::new("readlink", &[Param::string("path"), Param::any("options").optional()]),
  Operation::new("realpath", &[Param::string("path"), Param::any("options").optional()]),
  Operation::new("writeFile", &[Param::string("path"), Param::any("data"), Param::any("options").optional()]),
  Operation::new("appendFile", &[Param::string("path"), Param::any("data"), Param::any("options").optional()]),
  Operation::new("copyFile", &[Param::string("src"), Param::string("dest"), Param::integer("mode").optional()]),
  Operation::new("unlink", &[Param::string("path")]),
  Operation::new("rename", &[Param::string("oldPath"), Param::string("newPath")]),
  Operation::new("truncate", &[Param::string("path"), Param::integer("len").optional()]),
  Operation::new("stat", &[Param::string("path"), Param::object("options").optional()]),
  Operation::new("lstat", &[Param::string("path"), Param::object("options").optional()]),
  Operation::new("exists", &[Param::string("path")]),
  Operation::new("access", &[Param::string("path"), Param::integer("mode").or(Lit::Int(0))]),
  Operation::new("chmod", &[Param::string("path"), Param::any("mode")]),
  Operation::new("chown", &[Param::string("path"), Param::integer("uid"), Param::integer("gid")]),
  Operation::new("utimes", &[Param::string("path"), Param::any("atime"), Param::any("mtime")]),
  Operation::new("mkdir", &[Param::string("path"), Param::any("options").optional()]),
  Operation::new("readdir", &[Param::string("path"), Param::any("options").optional()]),
  Operation::new("rmdir", &[Param::string("path"), Param::object("options").optional()]),
  Operation::new("rm", &[Param::string("path"), Param::object("options").optional()]),
  Operation::new("cp", &[Param::string("src"), Param::string("dest"), Param::object("options").optional()]),
  Operation::new("link", &[Param::string("existingPath"), Param::string("newPath")]),
  Operation::new("symlink", &[Param::string("target"), Param::string("path"), Param::string("type").optional()]),
];

pub fn register(dispatcher: &Dispatcher) {
  for op in OPERATIONS {
    let method = format!("fs.{}", op.name);
    let name = method.clone();
    dispatcher.register(method, move |args| {
      let name = name.clone();
      async move {
        let args = op.prepare(&name, args)?;
        let command = fs_command(op, args)?;
        process_fs_command(command).await
      }
    });
  }
  debug!("fs: {} operations registered", OPERATIONS.len());
}

/// Names the positional arguments after the operation's parameters.
fn fs_command(op: &Operation, args: Vec<Value>) -> BridgeResult<FSCommand> {
  let mut m = Map::new();
  m.insert("action".to_string(), Value::String(op.name.to_string()));
  for (param, v) in op.params.iter().zip(args) {
    if !v.is_null() {
      m.insert(param.name.to_string(), v);
    }
  }
  serde_json::from_value(Value::Object(m))
    .map_err(|e| BridgeError::invalid_params(format!("fs.{}", op.name), e.to_string()))
}

fn io_err<'a>(syscall: &'a str, path: &'a str) -> impl FnOnce(io::Error) -> BridgeError + 'a {
  move |e| HostError::from_io(&e, syscall, path).into()
}

fn path_string(p: &Path) -> String {
  p.to_string_lossy().into_owned()
}

fn encoding_of(options: &FSOptions) -> BridgeResult<Option<Encoding>> {
  match options.encoding.as_deref() {
    None | Some("buffer") => Ok(None),
    Some(name) => Encoding::parse(name)
      .map(Some)
      .ok_or_else(|| HostError::with_code("ERR_INVALID_ARG_VALUE", format!("Unknown encoding: {}", name)).into()),
  }
}

fn data_bytes(data: FSData, options: &FSOptions) -> BridgeResult<Vec<u8>> {
  Ok(match data {
    FSData::Text(text) => encoding_of(options)?.unwrap_or(Encoding::Utf8).encode(&text),
    FSData::Bytes(bytes) | FSData::Buffer {data: bytes} => bytes,
  })
}

pub async fn process_fs_command(command: FSCommand) -> BridgeResult<Value> {
  trace!("fs {:?}", command);
  match command {
    FSCommand::ReadFile {path, options} => {
      let options = options.map(FSEncodingOption::options).unwrap_or_default();
      let contents = fs::read(&path).await.map_err(io_err("open", &path))?;
      Ok(match encoding_of(&options)? {
        Some(encoding) => Value::String(encoding.decode(&contents)),
        None => bytes_to_value(&contents),
      })
    },
    FSCommand::Readlink {path, ..} => {
      let target = fs::read_link(&path).await.map_err(io_err("readlink", &path))?;
      Ok(Value::String(path_string(&target)))
    },
    FSCommand::Realpath {path, ..} => {
      let real = fs::canonicalize(&path).await.map_err(io_err("realpath", &path))?;
      Ok(Value::String(path_string(&strip_verbatim(real))))
    },
    FSCommand::WriteFile {path, data, options} => {
      let options = options.map(FSEncodingOption::options).unwrap_or_default();
      let bytes = data_bytes(data, &options)?;
      let append = options.flag.as_deref().map(|f| f.starts_with('a')).unwrap_or(false);
      write_bytes(&path, &bytes, append).await?;
      Ok(Value::Null)
    },
    FSCommand::AppendFile {path, data, options} => {
      let options = options.map(FSEncodingOption::options).unwrap_or_default();
      let bytes = data_bytes(data, &options)?;
      write_bytes(&path, &bytes, true).await?;
      Ok(Value::Null)
    },
    FSCommand::CopyFile {src, dest, mode} => {
      let both = format!("{}' -> '{}", src, dest);
      if mode.unwrap_or(0) & COPYFILE_EXCL != 0 && fs::symlink_metadata(&dest).await.is_ok() {
        let e = io::Error::from(io::ErrorKind::AlreadyExists);
        return Err(io_err("copyfile", &both)(e));
      }
      fs::copy(&src, &dest).await.map_err(io_err("copyfile", &both))?;
      Ok(Value::Null)
    },
    FSCommand::Unlink {path} => {
      let meta = fs::symlink_metadata(&path).await.map_err(io_err("unlink", &path))?;
      if meta.file_type().is_symlink() {
        symlink::remove_symlink_file(&path).map_err(io_err("unlink", &path))?;
      } else if meta.is_dir() {
        return Err(HostError::with_code("EISDIR", format!("EISDIR: illegal operation on a directory, unlink '{}'", path)).into());
      } else {
        fs::remove_file(&path).await.map_err(io_err("unlink", &path))?;
      }
      Ok(Value::Null)
    },
    FSCommand::Rename {old_path, new_path} => {
      let both = format!("{}' -> '{}", old_path, new_path);
      fs::rename(&old_path, &new_path).await.map_err(io_err("rename", &both))?;
      Ok(Value::Null)
    },
    FSCommand::Truncate {path, len} => {
      let file = fs::OpenOptions::new().write(true).open(&path).await.map_err(io_err("open", &path))?;
      file.set_len(len.unwrap_or(0)).await.map_err(io_err("ftruncate", &path))?;
      Ok(Value::Null)
    },
    FSCommand::Stat {path} => {
      let meta = fs::metadata(&path).await.map_err(io_err("stat", &path))?;
      Ok(serde_json::to_value(shape_file_status(&meta))?)
    },
    FSCommand::Lstat {path} => {
      let meta = fs::symlink_metadata(&path).await.map_err(io_err("lstat", &path))?;
      Ok(serde_json::to_value(shape_file_status(&meta))?)
    },
    FSCommand::Exists {path} => {
      Ok(Value::Bool(fs::metadata(&path).await.is_ok()))
    },
    FSCommand::Access {path, mode} => {
      access(&path, mode.unwrap_or(F_OK)).await?;
      Ok(Value::Null)
    },
    FSCommand::Chmod {path, mode} => {
      let bits = mode.bits().ok_or_else(|| BridgeError::invalid_params("fs.chmod", "mode must be an octal string or integer"))?;
      let meta = fs::metadata(&path).await.map_err(io_err("chmod", &path))?;
      fs::set_permissions(&path, permissions_from_mode(meta.permissions(), bits)).await.map_err(io_err("chmod", &path))?;
      Ok(Value::Null)
    },
    FSCommand::Chown {path, uid, gid} => {
      chown(&path, uid, gid).await?;
      Ok(Value::Null)
    },
    FSCommand::Utimes {path, atime, mtime} => {
      let atime = system_time(&atime).ok_or_else(|| BridgeError::invalid_params("fs.utimes", "invalid atime"))?;
      let mtime = system_time(&mtime).ok_or_else(|| BridgeError::invalid_params("fs.utimes", "invalid mtime"))?;
      let p = path.clone();
      let res = tokio::task::spawn_blocking(move || {
        let file = std::fs::File::open(&p)?;
        file.set_times(std::fs::FileTimes::new().set_accessed(atime).set_modified(mtime))
      }).await.map_err(|e| HostError::new(e.to_string()))?;
      res.map_err(io_err("utime", &path))?;
      Ok(Value::Null)
    },
    FSCommand::Mkdir {path, options} => {
      let options = match options {
        Some(FSMkdirOption::Mode(mode)) => FSOptions {mode: Some(mode), ..FSOptions::default()},
        Some(FSMkdirOption::Options(options)) => options,
        None => FSOptions::default(),
      };
      mkdir(&path, &options).await
    },
    FSCommand::Readdir {path, options} => {
      let options = options.map(FSEncodingOption::options).unwrap_or_default();
      readdir(&path, &options).await
    },
    FSCommand::Rmdir {path, options} => {
      if options.and_then(|o| o.recursive).unwrap_or(false) {
        fs::remove_dir_all(&path).await.map_err(io_err("rmdir", &path))?;
      } else {
        fs::remove_dir(&path).await.map_err(io_err("rmdir", &path))?;
      }
      Ok(Value::Null)
    },
    FSCommand::Rm {path, options} => {
      let options = options.unwrap_or_default();
      rm(&path, &options).await?;
      Ok(Value::Null)
    },
    FSCommand::Cp {src, dest, options} => {
      let options = options.unwrap_or_default();
      let res = tokio::task::spawn_blocking(move || cp(Path::new(&src), Path::new(&dest), &options))
        .await.map_err(|e| HostError::new(e.to_string()))?;
      res?;
      Ok(Value::Null)
    },
    FSCommand::Link {existing_path, new_path} => {
      let both = format!("{}' -> '{}", existing_path, new_path);
      fs::hard_link(&existing_path, &new_path).await.map_err(io_err("link", &both))?;
      Ok(Value::Null)
    },
    FSCommand::Symlink {target, path, link_type} => {
      let both = format!("{}' -> '{}", target, path);
      let dir = match link_type.as_deref() {
        Some("dir") | Some("junction") => true,
        Some(_) => false,
        None => {
          let base = Path::new(&path).parent().map(Path::to_path_buf).unwrap_or_default();
          fs::metadata(base.join(&target)).await.map(|m| m.is_dir()).unwrap_or(false)
        }
      };
      let res = if dir {
        symlink::symlink_dir(&target, &path)
      } else {
        symlink::symlink_file(&target, &path)
      };
      res.map_err(io_err("symlink", &both))?;
      Ok(Value::Null)
    },
  }
}

async fn write_bytes(path: &str, bytes: &[u8], append: bool) -> BridgeResult<()> {
  let mut file = fs::OpenOptions::new()
    .write(true)
    .create(true)
    .append(append)
    .truncate(!append)
    .open(path).await.map_err(io_err("open", path))?;
  file.write_all(bytes).await.map_err(io_err("write", path))?;
  file.flush().await.map_err(io_err("write", path))?;
  Ok(())
}

/// Returns the first directory created when recursive, like Node.
async fn mkdir(path: &str, options: &FSOptions) -> BridgeResult<Value> {
  let recursive = options.recursive.unwrap_or(false);
  let mut first_created: Option<PathBuf> = None;
  if recursive {
    let mut probe = Some(Path::new(path));
    while let Some(p) = probe {
      if p.as_os_str().is_empty() || fs::metadata(p).await.is_ok() {
        break;
      }
      first_created = Some(p.to_path_buf());
      probe = p.parent();
    }
  }
  let mut builder = fs::DirBuilder::new();
  builder.recursive(recursive);
  #[cfg(unix)]
  builder.mode(options.mode.unwrap_or(0o777));
  builder.create(path).await.map_err(io_err("mkdir", path))?;
  Ok(match first_created {
    Some(p) => Value::String(path_string(&p)),
    None => Value::Null,
  })
}

async fn readdir(path: &str, options: &FSOptions) -> BridgeResult<Value> {
  let with_file_types = options.with_file_types.unwrap_or(false);
  let recursive = options.recursive.unwrap_or(false);
  let mut names: Vec<String> = Vec::new();
  let mut dirents: Vec<FSDirent> = Vec::new();
  let mut pending: VecDeque<PathBuf> = VecDeque::from([PathBuf::new()]);
  while let Some(rel) = pending.pop_front() {
    let dir = Path::new(path).join(&rel);
    let dir_s = path_string(&dir);
    let mut rd = fs::read_dir(&dir).await.map_err(io_err("scandir", &dir_s))?;
    let mut batch = Vec::new();
    while let Some(entry) = rd.next_entry().await.map_err(io_err("scandir", &dir_s))? {
      let file_type = entry.file_type().await.map_err(io_err("scandir", &dir_s))?;
      batch.push((entry.file_name().to_string_lossy().into_owned(), file_type));
    }
    batch.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, file_type) in batch {
      let rel_name = rel.join(&name);
      if recursive && file_type.is_dir() {
        pending.push_back(rel_name.clone());
      }
      if with_file_types {
        dirents.push(shape_dir_entry(name, &file_type));
      } else {
        names.push(path_string(&rel_name));
      }
    }
  }
  if with_file_types {
    Ok(serde_json::to_value(dirents)?)
  } else {
    Ok(serde_json::to_value(names)?)
  }
}

async fn rm(path: &str, options: &FSOptions) -> BridgeResult<()> {
  let force = options.force.unwrap_or(false);
  let meta = match fs::symlink_metadata(path).await {
    Ok(meta) => meta,
    Err(e) if force && e.kind() == io::ErrorKind::NotFound => return Ok(()),
    Err(e) => return Err(io_err("rm", path)(e)),
  };
  if meta.file_type().is_symlink() {
    symlink::remove_symlink_file(path).map_err(io_err("rm", path))?;
  } else if meta.is_dir() {
    if !options.recursive.unwrap_or(false) {
      return Err(HostError::with_code("ERR_FS_EISDIR", format!("Path is a directory: rm returned EISDIR (is a directory) {}", path)).into());
    }
    fs::remove_dir_all(path).await.map_err(io_err("rm", path))?;
  } else {
    fs::remove_file(path).await.map_err(io_err("rm", path))?;
  }
  Ok(())
}

fn cp(src: &Path, dest: &Path, options: &FSOptions) -> BridgeResult<()> {
  let src_s = path_string(src);
  let meta = std::fs::symlink_metadata(src).map_err(io_err("lstat", &src_s))?;
  if meta.is_dir() {
    if !options.recursive.unwrap_or(false) {
      return Err(HostError::with_code("ERR_FS_EISDIR", format!("Recursive option is required to copy a directory: cp returned EISDIR ({} is a directory (not copied))", src_s)).into());
    }
    std::fs::create_dir_all(dest).map_err(io_err("mkdir", &path_string(dest)))?;
    let mut entries: Vec<_> = std::fs::read_dir(src).map_err(io_err("opendir", &src_s))?
      .collect::<Result<_, _>>().map_err(io_err("opendir", &src_s))?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
      cp(&entry.path(), &dest.join(entry.file_name()), options)?;
    }
    return Ok(());
  }
  let dest_s = path_string(dest);
  if std::fs::symlink_metadata(dest).is_ok() {
    if !options.force.unwrap_or(true) {
      if options.error_on_exist.unwrap_or(false) {
        return Err(HostError::with_code("ERR_FS_CP_EEXIST", format!("Target already exists: cp returned EEXIST ({} already exists)", dest_s)).into());
      }
      return Ok(());
    }
    if std::fs::symlink_metadata(dest).map(|m| m.file_type().is_symlink()).unwrap_or(false) {
      symlink::remove_symlink_file(dest).map_err(io_err("unlink", &dest_s))?;
    }
  }
  if meta.file_type().is_symlink() {
    let target = std::fs::read_link(src).map_err(io_err("readlink", &src_s))?;
    let target_is_dir = src.parent().map(|p| p.join(&target).is_dir()).unwrap_or(false);
    let res = if target_is_dir { symlink::symlink_dir(&target, dest) } else { symlink::symlink_file(&target, dest) };
    res.map_err(io_err("symlink", &dest_s))?;
  } else {
    std::fs::copy(src, dest).map_err(io_err("copyfile", &format!("{}' -> '{}", src_s, dest_s)))?;
  }
  Ok(())
}

#[cfg(unix)]
async fn chown(path: &str, uid: u32, gid: u32) -> BridgeResult<()> {
  let p = path.to_string();
  let res = tokio::task::spawn_blocking(move || std::os::unix::fs::chown(&p, Some(uid), Some(gid)))
    .await.map_err(|e| HostError::new(e.to_string()))?;
  res.map_err(io_err("chown", path))
}

#[cfg(not(unix))]
async fn chown(path: &str, _uid: u32, _gid: u32) -> BridgeResult<()> {
  fs::metadata(path).await.map_err(io_err("chown", path))?;
  Ok(())
}

#[cfg(unix)]
fn permissions_from_mode(_current: std::fs::Permissions, bits: u32) -> std::fs::Permissions {
  use std::os::unix::fs::PermissionsExt;
  std::fs::Permissions::from_mode(bits)
}

#[cfg(not(unix))]
fn permissions_from_mode(mut current: std::fs::Permissions, bits: u32) -> std::fs::Permissions {
  current.set_readonly(bits & 0o200 == 0);
  current
}

/// Checked by the kernel against the caller's effective ids.
#[cfg(unix)]
async fn access(path: &str, mode: u32) -> BridgeResult<()> {
  use std::{ffi::CString, os::unix::ffi::OsStrExt};
  let c_path = CString::new(Path::new(path).as_os_str().as_bytes())
    .map_err(|_| BridgeError::invalid_params("fs.access", "path contains a nul byte"))?;
  let bits = (mode & (R_OK | W_OK | X_OK)) as libc::c_int;
  let res = tokio::task::spawn_blocking(move || {
    // SAFETY: c_path is nul terminated and outlives the call
    match unsafe { libc::access(c_path.as_ptr(), bits) } {
      0 => Ok(()),
      _ => Err(io::Error::last_os_error()),
    }
  }).await.map_err(|e| HostError::new(e.to_string()))?;
  res.map_err(io_err("access", path))
}

/// Only the read-only attribute is known here.
#[cfg(not(unix))]
async fn access(path: &str, mode: u32) -> BridgeResult<()> {
  let meta = fs::metadata(path).await.map_err(io_err("access", path))?;
  if mode & W_OK != 0 && meta.permissions().readonly() {
    return Err(io_err("access", path)(io::Error::from(io::ErrorKind::PermissionDenied)));
  }
  Ok(())
}

/// `\\?\C:\x` to `C:\x`
fn strip_verbatim(p: PathBuf) -> PathBuf {
  let s = path_string(&p);
  match s.strip_prefix(r"\\?\") {
    Some(rest) if !rest.starts_with("UNC\\") => PathBuf::from(rest),
    _ => p,
  }
}

fn system_time(t: &FSTime) -> Option<SystemTime> {
  let seconds = match t {
    FSTime::Seconds(s) => *s,
    FSTime::Text(s) => match s.trim().parse::<f64>() {
      Ok(s) => s,
      Err(_) => {
        let dt = DateTime::parse_from_rfc3339(s.trim()).ok()?;
        dt.timestamp_millis() as f64 / 1000.0
      }
    },
  };
  if !seconds.is_finite() {
    return None;
  }
  if seconds >= 0.0 {
    UNIX_EPOCH.checked_add(Duration::try_from_secs_f64(seconds).ok()?)
  } else {
    UNIX_EPOCH.checked_sub(Duration::try_from_secs_f64(-seconds).ok()?)
  }
}

fn millis(t: io::Result<SystemTime>) -> f64 {
  match t {
    Ok(t) => match t.duration_since(UNIX_EPOCH) {
      Ok(d) => d.as_secs_f64() * 1000.0,
      Err(e) => -(e.duration().as_secs_f64() * 1000.0),
    },
    Err(_) => 0.0,
  }
}

fn iso(ms: f64) -> String {
  DateTime::<Utc>::from_timestamp_millis(ms.floor() as i64)
    .unwrap_or_default()
    .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Plain stat record; wide integers become doubles.
pub fn shape_file_status(meta: &Metadata) -> FSStatus {
  let atime_ms = millis(meta.accessed());
  let mtime_ms = millis(meta.modified());
  let birthtime_ms = millis(meta.created());
  #[cfg(unix)]
  let status = {
    use std::os::unix::fs::MetadataExt;
    let ctime_ms = meta.ctime() as f64 * 1000.0 + meta.ctime_nsec() as f64 / 1_000_000.0;
    FSStatus {
      dev: meta.dev() as f64,
      ino: meta.ino() as f64,
      mode: meta.mode(),
      nlink: meta.nlink() as f64,
      uid: meta.uid(),
      gid: meta.gid(),
      rdev: meta.rdev() as f64,
      size: meta.size() as f64,
      blksize: meta.blksize() as f64,
      blocks: meta.blocks() as f64,
      atime_ms,
      mtime_ms,
      ctime_ms,
      birthtime_ms,
      atime: iso(atime_ms),
      mtime: iso(mtime_ms),
      ctime: iso(ctime_ms),
      birthtime: iso(birthtime_ms),
    }
  };
  #[cfg(not(unix))]
  let status = {
    let kind = if meta.is_dir() { 0o040000 } else if meta.file_type().is_symlink() { 0o120000 } else { 0o100000 };
    let perm = if meta.permissions().readonly() { 0o444 } else { 0o666 };
    FSStatus {
      dev: 0.0,
      ino: 0.0,
      mode: kind | perm,
      nlink: 1.0,
      uid: 0,
      gid: 0,
      rdev: 0.0,
      size: meta.len() as f64,
      blksize: 4096.0,
      blocks: (meta.len() as f64 / 512.0).ceil(),
      atime_ms,
      mtime_ms,
      ctime_ms: mtime_ms,
      birthtime_ms,
      atime: iso(atime_ms),
      mtime: iso(mtime_ms),
      ctime: iso(mtime_ms),
      birthtime: iso(birthtime_ms),
    }
  };
  status
}

/// Predicates are evaluated here, once.
pub fn shape_dir_entry(name: String, file_type: &std::fs::FileType) -> FSDirent {
  #[cfg(unix)]
  let (block, chr, fifo, socket) = {
    use std::os::unix::fs::FileTypeExt;
    (file_type.is_block_device(), file_type.is_char_device(), file_type.is_fifo(), file_type.is_socket())
  };
  #[cfg(not(unix))]
  let (block, chr, fifo, socket) = (false, false, false, false);
  FSDirent {
    name,
    is_file: file_type.is_file(),
    is_directory: file_type.is_dir(),
    is_block_device: block,
    is_character_device: chr,
    is_symbolic_link: file_type.is_symlink(),
    is_fifo: fifo,
    is_socket: socket,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn dispatcher() -> Dispatcher {
    let d = Dispatcher::new();
    register(&d);
    d
  }

  fn p(dir: &tempfile::TempDir, name: &str) -> String {
    path_string(&dir.path().join(name))
  }

  #[tokio::test]
  async fn write_then_read_with_encodings() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let f = p(&dir, "a.txt");
    d.call("fs.writeFile", vec![json!(f), json!("hello")]).await.unwrap();
    d.call("fs.appendFile", vec![json!(f), json!([33])]).await.unwrap();
    assert_eq!(d.call("fs.readFile", vec![json!(f), json!("utf8")]).await.unwrap(), json!("hello!"));
    assert_eq!(d.call("fs.readFile", vec![json!(f), json!({"encoding": "hex"})]).await.unwrap(), json!("68656c6c6f21"));
    assert_eq!(d.call("fs.readFile", vec![json!(f)]).await.unwrap(), json!([104, 101, 108, 108, 111, 33]));
    d.call("fs.writeFile", vec![json!(f), json!("aGk="), json!({"encoding": "base64"})]).await.unwrap();
    assert_eq!(d.call("fs.readFile", vec![json!(f), json!("utf-8")]).await.unwrap(), json!("hi"));
  }

  #[tokio::test]
  async fn missing_file_surfaces_enoent() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let f = p(&dir, "nope");
    match d.call("fs.stat", vec![json!(f)]).await {
      Err(BridgeError::Underlying(e)) => {
        assert_eq!(e.code.as_deref(), Some("ENOENT"));
        assert_eq!(e.message, format!("ENOENT: no such file or directory, stat '{}'", f));
      },
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn exists_turns_failure_into_false() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(d.call("fs.exists", vec![json!(p(&dir, "nope"))]).await.unwrap(), json!(false));
    assert_eq!(d.call("fs.exists", vec![json!(path_string(dir.path()))]).await.unwrap(), json!(true));
  }

  #[tokio::test]
  async fn stat_record_shape() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let f = p(&dir, "s.bin");
    std::fs::write(&f, [0u8; 10]).unwrap();
    let st = d.call("fs.stat", vec![json!(f)]).await.unwrap();
    for key in ["dev", "ino", "mode", "nlink", "uid", "gid", "rdev", "size", "blksize", "blocks",
      "atimeMs", "mtimeMs", "ctimeMs", "birthtimeMs", "atime", "mtime", "ctime", "birthtime"] {
      assert!(st.get(key).is_some(), "missing {}", key);
    }
    assert_eq!(st["size"], json!(10.0));
    assert!(st["mtime"].as_str().unwrap().ends_with('Z'));
  }

  #[tokio::test]
  async fn mkdir_readdir_rm() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let deep = p(&dir, "x/y/z");
    let created = d.call("fs.mkdir", vec![json!(deep), json!({"recursive": true})]).await.unwrap();
    assert_eq!(created, json!(p(&dir, "x")));
    assert_eq!(d.call("fs.mkdir", vec![json!(deep), json!({"recursive": true})]).await.unwrap(), Value::Null);
    std::fs::write(dir.path().join("x/b.txt"), "b").unwrap();

    let names = d.call("fs.readdir", vec![json!(p(&dir, "x"))]).await.unwrap();
    assert_eq!(names, json!(["b.txt", "y"]));
    let entries = d.call("fs.readdir", vec![json!(p(&dir, "x")), json!({"withFileTypes": true})]).await.unwrap();
    assert_eq!(entries[0], json!({"name": "b.txt", "isFile": true, "isDirectory": false, "isBlockDevice": false,
      "isCharacterDevice": false, "isSymbolicLink": false, "isFIFO": false, "isSocket": false}));
    assert_eq!(entries[1]["isDirectory"], json!(true));

    match d.call("fs.rm", vec![json!(p(&dir, "x"))]).await {
      Err(BridgeError::Underlying(e)) => assert_eq!(e.code.as_deref(), Some("ERR_FS_EISDIR")),
      other => panic!("unexpected {:?}", other),
    }
    d.call("fs.rm", vec![json!(p(&dir, "x")), json!({"recursive": true})]).await.unwrap();
    d.call("fs.rm", vec![json!(p(&dir, "x")), json!({"force": true})]).await.unwrap();
    assert!(!dir.path().join("x").exists());
  }

  #[tokio::test]
  async fn copy_file_exclusive() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = (p(&dir, "a"), p(&dir, "b"));
    std::fs::write(&a, "1").unwrap();
    d.call("fs.copyFile", vec![json!(a), json!(b)]).await.unwrap();
    match d.call("fs.copyFile", vec![json!(a), json!(b), json!(COPYFILE_EXCL)]).await {
      Err(BridgeError::Underlying(e)) => assert_eq!(e.code.as_deref(), Some("EEXIST")),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[tokio::test]
  async fn cp_recursive_tree() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src/sub")).unwrap();
    std::fs::write(dir.path().join("src/sub/f"), "data").unwrap();
    assert!(d.call("fs.cp", vec![json!(p(&dir, "src")), json!(p(&dir, "dst"))]).await.is_err());
    d.call("fs.cp", vec![json!(p(&dir, "src")), json!(p(&dir, "dst")), json!({"recursive": true})]).await.unwrap();
    assert_eq!(std::fs::read_to_string(dir.path().join("dst/sub/f")).unwrap(), "data");
  }

  #[tokio::test]
  async fn rename_truncate_unlink() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let (a, b) = (p(&dir, "a"), p(&dir, "b"));
    std::fs::write(&a, "123456").unwrap();
    d.call("fs.rename", vec![json!(a), json!(b)]).await.unwrap();
    d.call("fs.truncate", vec![json!(b), json!(2)]).await.unwrap();
    assert_eq!(std::fs::read_to_string(&b).unwrap(), "12");
    d.call("fs.unlink", vec![json!(b)]).await.unwrap();
    assert!(!Path::new(&b).exists());
  }

  #[tokio::test]
  async fn utimes_sets_seconds() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let f = p(&dir, "t");
    std::fs::write(&f, "").unwrap();
    d.call("fs.utimes", vec![json!(f), json!(1000), json!("1970-01-01T00:00:02Z")]).await.unwrap();
    let st = d.call("fs.stat", vec![json!(f)]).await.unwrap();
    assert_eq!(st["mtimeMs"], json!(2000.0));
    assert_eq!(st["mtime"], json!("1970-01-01T00:00:02.000Z"));
  }

  #[tokio::test]
  async fn utimes_rejects_out_of_range_times() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let f = p(&dir, "t");
    std::fs::write(&f, "").unwrap();
    for (atime, mtime) in [(json!(1e300), json!(0)), (json!(0), json!(-1e300))] {
      match d.call("fs.utimes", vec![json!(f), atime, mtime]).await {
        Err(BridgeError::InvalidParams {method, ..}) => assert_eq!(method, "fs.utimes"),
        other => panic!("unexpected {:?}", other),
      }
    }
  }

  #[cfg(unix)]
  fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions
    unsafe { libc::geteuid() == 0 }
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn access_checks_read_and_write() {
    if is_root() {
      return;
    }
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let f = p(&dir, "locked");
    std::fs::write(&f, "x").unwrap();
    d.call("fs.chmod", vec![json!(f), json!("200")]).await.unwrap();
    match d.call("fs.access", vec![json!(f), json!(R_OK)]).await {
      Err(BridgeError::Underlying(e)) => {
        assert_eq!(e.code.as_deref(), Some("EACCES"));
        assert_eq!(e.message, format!("EACCES: permission denied, access '{}'", f));
      },
      other => panic!("unexpected {:?}", other),
    }
    d.call("fs.access", vec![json!(f), json!(W_OK)]).await.unwrap();
    d.call("fs.chmod", vec![json!(f), json!("400")]).await.unwrap();
    d.call("fs.access", vec![json!(f), json!(R_OK)]).await.unwrap();
    assert!(d.call("fs.access", vec![json!(f), json!(W_OK)]).await.is_err());
    d.call("fs.access", vec![json!(f)]).await.unwrap();
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn stat_permission_error_passes_through() {
    if is_root() {
      return;
    }
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let sealed = p(&dir, "sealed");
    std::fs::create_dir(&sealed).unwrap();
    let inner = path_string(&Path::new(&sealed).join("f"));
    std::fs::write(&inner, "x").unwrap();
    d.call("fs.chmod", vec![json!(sealed), json!("000")]).await.unwrap();
    let res = d.call("fs.stat", vec![json!(inner)]).await;
    d.call("fs.chmod", vec![json!(sealed), json!("700")]).await.unwrap();
    match res {
      Err(BridgeError::Underlying(e)) => {
        assert_eq!(e.code.as_deref(), Some("EACCES"));
        assert_eq!(e.message, format!("EACCES: permission denied, stat '{}'", inner));
      },
      other => panic!("unexpected {:?}", other),
    }
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn symlink_readlink_lstat_chmod() {
    let d = dispatcher();
    let dir = tempfile::tempdir().unwrap();
    let (target, link) = (p(&dir, "target"), p(&dir, "link"));
    std::fs::write(&target, "x").unwrap();
    d.call("fs.symlink", vec![json!(target), json!(link)]).await.unwrap();
    assert_eq!(d.call("fs.readlink", vec![json!(link)]).await.unwrap(), json!(target));
    let st = d.call("fs.lstat", vec![json!(link)]).await.unwrap();
    assert_eq!(st["mode"].as_u64().unwrap() & 0o170000, 0o120000);
    d.call("fs.chmod", vec![json!(target), json!("600")]).await.unwrap();
    let st = d.call("fs.stat", vec![json!(target)]).await.unwrap();
    assert_eq!(st["mode"].as_u64().unwrap() & 0o777, 0o600);
    d.call("fs.access", vec![json!(target), json!(W_OK)]).await.unwrap();
    assert!(d.call("fs.access", vec![json!(target), json!(X_OK)]).await.is_err());
  }

  #[tokio::test]
  async fn wrong_argument_type_is_invalid_params() {
    let d = dispatcher();
    assert!(matches!(d.call("fs.unlink", vec![json!(5)]).await, Err(BridgeError::InvalidParams {..})));
    assert!(matches!(d.call("fs.readFile", vec![]).await, Err(BridgeError::InvalidParams {..})));
  }
}
