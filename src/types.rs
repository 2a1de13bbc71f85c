#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Rectangle {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}
