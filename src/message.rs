//! JSON messages exchanged with the coordinating service.
//!
//! Every message is an object with a `type` tag and a `payload`.

use serde::{Deserialize, Serialize};

pub const DOWNLOAD_KEYS: &str = "download-keys";
pub const REMOVE_FILE: &str = "remove-file";

/// A file the service should issue a key for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRequest {
    pub name: String,
    pub size: u64,
}

/// Authorization issued by the service for one registered file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGrant {
    /// Server identifier of the file from now on.
    pub id: String,
    /// Name of the registered file this grant belongs to.
    pub name: String,
    /// Opaque to the registry.
    pub key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum OutboundMessage {
    DownloadKeys(Vec<KeyRequest>),
    RemoveFile(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum InboundMessage {
    DownloadKeys(Vec<KeyGrant>),
}

impl InboundMessage {
    /// Parse a text frame. `Ok(None)` means the frame carries a message type
    /// this crate does not handle.
    pub fn parse(text: &str) -> crate::Result<Option<Self>> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value.get("type").and_then(serde_json::Value::as_str) {
            Some(DOWNLOAD_KEYS) => Ok(Some(serde_json::from_value(value)?)),
            Some(other) => {
                log::debug!("[message] ignoring message of type {}", other);
                Ok(None)
            }
            None => Err(crate::RegistryError::Parse),
        }
    }
}
