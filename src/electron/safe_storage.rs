use std::sync::Arc;

use crate::{host::HostObject, schema::{forward_operations, Kind, Operation, Param, Shape, Singleton}, Bridge};

/// Cipher text crosses the bridge as base64 and reaches the host as bytes.
pub static OPERATIONS: &[Operation] = &[
  Operation::new("isEncryptionAvailable", &[]),
  Operation::new("encryptString", &[Param::string("plainText")]).shaped(Shape::Base64),
  Operation::new("decryptString", &[Param::new("encrypted", Kind::Base64)]),
  Operation::new("setUsePlainTextEncryption", &[Param::bool("usePlainText")]).shaped(Shape::Unit),
  Operation::new("getSelectedStorageBackend", &[]),
];

pub fn register(bridge: &Bridge, safe_storage: Arc<dyn HostObject>) {
  forward_operations(bridge.dispatcher(), "safeStorage", Arc::new(Singleton(safe_storage)), OPERATIONS);
}
