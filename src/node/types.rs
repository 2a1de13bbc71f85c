#[derive(serde::Serialize, serde::Deserialize, Debug)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum FSCommand {
  ReadFile {path:String, options:Option<FSEncodingOption>},
  Readlink {path:String, options:Option<FSEncodingOption>},
  Realpath {path:String, options:Option<FSEncodingOption>},
  WriteFile {path:String, data:FSData, options:Option<FSEncodingOption>},
  AppendFile {path:String, data:FSData, options:Option<FSEncodingOption>},
  CopyFile {src:String, dest:String, mode:Option<u32>},
  Unlink {path:String},
  Rename {#[serde(rename = "oldPath")] old_path:String, #[serde(rename = "newPath")] new_path:String},
  Truncate {path:String, len:Option<u64>},
  Stat {path:String},
  Lstat {path:String},
  Exists {path:String},
  Access {path:String, mode:Option<u32>},
  Chmod {path:String, mode:FSMode},
  Chown {path:String, uid:u32, gid:u32},
  Utimes {path:String, atime:FSTime, mtime:FSTime},
  Mkdir {path:String, options:Option<FSMkdirOption>},
  Readdir {path:String, options:Option<FSEncodingOption>},
  Rmdir {path:String, options:Option<FSOptions>},
  Rm {path:String, options:Option<FSOptions>},
  Cp {src:String, dest:String, options:Option<FSOptions>},
  Link {#[serde(rename = "existingPath")] existing_path:String, #[serde(rename = "newPath")] new_path:String},
  Symlink {target:String, path:String, #[serde(rename = "type")] link_type:Option<String>},
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Default, Clone)]
pub struct FSOptions {
  pub encoding: Option<String>,
  pub flag: Option<String>,
  pub mode: Option<u32>,
  pub recursive: Option<bool>,
  pub force: Option<bool>,
  #[serde(rename = "errorOnExist")]
  pub error_on_exist: Option<bool>,
  #[serde(rename = "withFileTypes")]
  pub with_file_types: Option<bool>,
}

/// `"utf8"` or `{encoding, ...}`
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum FSEncodingOption {
  Encoding(String),
  Options(FSOptions),
}

impl FSEncodingOption {
  pub fn options(self) -> FSOptions {
    match self {
      FSEncodingOption::Encoding(encoding) => FSOptions {encoding: Some(encoding), ..FSOptions::default()},
      FSEncodingOption::Options(options) => options,
    }
  }
}

/// Numeric mode or `{recursive, mode}`
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum FSMkdirOption {
  Mode(u32),
  Options(FSOptions),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum FSMode {
  Number(u32),
  Octal(String),
}

impl FSMode {
  pub fn bits(&self) -> Option<u32> {
    match self {
      FSMode::Number(n) => Some(*n),
      FSMode::Octal(s) => u32::from_str_radix(s.trim_start_matches("0o"), 8).ok(),
    }
  }
}

/// Seconds since the epoch, a numeric string or a date string.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum FSTime {
  Seconds(f64),
  Text(String),
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum FSData {
  Text(String),
  Bytes(Vec<u8>),
  Buffer {data: Vec<u8>},
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct FSStatus {
  pub dev: f64,
  pub ino: f64,
  pub mode: u32,
  pub nlink: f64,
  pub uid: u32,
  pub gid: u32,
  pub rdev: f64,
  pub size: f64,
  pub blksize: f64,
  pub blocks: f64,
  #[serde(rename = "atimeMs")]
  pub atime_ms: f64,
  #[serde(rename = "mtimeMs")]
  pub mtime_ms: f64,
  #[serde(rename = "ctimeMs")]
  pub ctime_ms: f64,
  #[serde(rename = "birthtimeMs")]
  pub birthtime_ms: f64,
  pub atime: String,
  pub mtime: String,
  pub ctime: String,
  pub birthtime: String,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq)]
pub struct FSDirent {
  pub name: String,
  #[serde(rename = "isFile")]
  pub is_file: bool,
  #[serde(rename = "isDirectory")]
  pub is_directory: bool,
  #[serde(rename = "isBlockDevice")]
  pub is_block_device: bool,
  #[serde(rename = "isCharacterDevice")]
  pub is_character_device: bool,
  #[serde(rename = "isSymbolicLink")]
  pub is_symbolic_link: bool,
  #[serde(rename = "isFIFO")]
  pub is_fifo: bool,
  #[serde(rename = "isSocket")]
  pub is_socket: bool,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ParsedPath {
  pub root: String,
  pub dir: String,
  pub base: String,
  pub ext: String,
  pub name: String,
}

/// Input of `path.format`; every field optional.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct PathObject {
  pub root: Option<String>,
  pub dir: Option<String>,
  pub base: Option<String>,
  pub ext: Option<String>,
  pub name: Option<String>,
}
