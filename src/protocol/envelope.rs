// src/protocol/envelope.rs

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{PublisherError, Result};

/// Dynamically dispatched call: `type` selects the handler, `data` is its
/// encoded request message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: Vec<u8>,
}

impl Request {
    pub fn encode<T: Serialize>(kind: &str, message: &T) -> Result<Self> {
        Ok(Self {
            kind: kind.to_string(),
            data: serde_json::to_vec(message)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.data)?)
    }

    /// Error for a request nobody handles.
    pub fn unknown(&self) -> PublisherError {
        PublisherError::UnknownRequestType(self.kind.clone())
    }
}

impl Response {
    pub fn encode<T: Serialize>(kind: &str, message: &T) -> Result<Self> {
        Ok(Self {
            kind: kind.to_string(),
            data: serde_json::to_vec(message)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.data)?)
    }
}
