// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! Serde helpers for binary bodies and transport errors.
//!
//! Bodies are arbitrary bytes, so they are written as standard base64 strings.

use crate::error::TransportError;
use crate::record::ChunkedBody;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::ser::SerializeStruct;
use serde::Serializer;

pub fn serialize_body<S>(body: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match body {
        Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

pub fn serialize_chunked_body<S>(
    body: &Option<ChunkedBody>,
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match body {
        Some(chunks) => serializer.serialize_str(&STANDARD.encode(chunks.to_bytes())),
        None => serializer.serialize_none(),
    }
}

pub fn serialize_error<S>(error: &Option<TransportError>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match error {
        Some(err) => {
            let mut s = serializer.serialize_struct("TransportError", 2)?;
            s.serialize_field("kind", &err.kind())?;
            s.serialize_field("message", err.message())?;
            s.end()
        }
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Wrapper {
        #[serde(serialize_with = "serialize_body")]
        body: Option<Bytes>,
        #[serde(serialize_with = "serialize_error")]
        error: Option<TransportError>,
    }

    #[test]
    fn encodes_body_and_error() -> anyhow::Result<()> {
        let w = Wrapper {
            body: Some(Bytes::from_static(&[0xff, 0x00, 0x41])),
            error: Some(TransportError::new(ErrorKind::TimedOut, "slow")),
        };
        let v = serde_json::to_value(&w)?;
        assert_eq!(v["body"].as_str(), Some("/wBB"));
        assert_eq!(v["error"]["kind"].as_str(), Some("timed_out"));
        assert_eq!(v["error"]["message"].as_str(), Some("slow"));
        Ok(())
    }

    #[test]
    fn absent_values_are_null() -> anyhow::Result<()> {
        let v = serde_json::to_value(Wrapper { body: None, error: None })?;
        assert!(v["body"].is_null());
        assert!(v["error"].is_null());
        Ok(())
    }
}
