use base64::{engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD}, Engine};
use serde_json::Value;

/// Byte data travels as a JSON array of numbers.
pub fn bytes_to_value(bytes: &[u8]) -> Value {
  Value::Array(bytes.iter().map(|b| Value::from(*b)).collect())
}

/// Accepts a number array or a `{type: "Buffer", data: [...]}` object.
pub fn bytes_from_value(v: &Value) -> Option<Vec<u8>> {
  let arr = match v {
    Value::Array(a) => a,
    Value::Object(o) => o.get("data")?.as_array()?,
    _ => return None,
  };
  arr.iter().map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok())).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
  Utf8,
  Utf16le,
  Latin1,
  Ascii,
  Base64,
  Base64Url,
  Hex,
}

impl Encoding {
  pub fn parse(name: &str) -> Option<Encoding> {
    match name.to_ascii_lowercase().as_str() {
      "utf8" | "utf-8" => Some(Encoding::Utf8),
      "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Some(Encoding::Utf16le),
      "latin1" | "binary" => Some(Encoding::Latin1),
      "ascii" => Some(Encoding::Ascii),
      "base64" => Some(Encoding::Base64),
      "base64url" => Some(Encoding::Base64Url),
      "hex" => Some(Encoding::Hex),
      _ => None,
    }
  }

  pub fn decode(&self, bytes: &[u8]) -> String {
    match self {
      Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
      Encoding::Utf16le => {
        let units: Vec<u16> = bytes.chunks_exact(2).map(|c| u16::from_le_bytes([c[0], c[1]])).collect();
        String::from_utf16_lossy(&units)
      },
      Encoding::Latin1 => bytes.iter().map(|b| *b as char).collect(),
      Encoding::Ascii => bytes.iter().map(|b| (*b & 0x7f) as char).collect(),
      Encoding::Base64 => STANDARD.encode(bytes),
      Encoding::Base64Url => URL_SAFE_NO_PAD.encode(bytes),
      Encoding::Hex => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
    }
  }

  /// Invalid input is truncated at the first bad character.
  pub fn encode(&self, text: &str) -> Vec<u8> {
    match self {
      Encoding::Utf8 => text.as_bytes().to_vec(),
      Encoding::Utf16le => text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect(),
      Encoding::Latin1 | Encoding::Ascii => text.chars().map(|c| c as u32 as u8).collect(),
      Encoding::Base64 | Encoding::Base64Url => {
        let cleaned: String = text.chars()
          .filter(|c| !c.is_whitespace() && *c != '=')
          .map(|c| match c { '-' => '+', '_' => '/', c => c })
          .collect();
        base64::engine::general_purpose::STANDARD_NO_PAD.decode(cleaned).unwrap_or_default()
      },
      Encoding::Hex => {
        let digits: Vec<u8> = text.bytes().map_while(|c| (c as char).to_digit(16).map(|d| d as u8)).collect();
        digits.chunks_exact(2).map(|p| p[0] << 4 | p[1]).collect()
      },
    }
  }
}
