// SPDX-FileCopyrightText: 2025 Alexandre Gomes Gaigalas <alganet@gmail.com>
//
// SPDX-License-Identifier: ISC

//! JSON Lines dump of records, bodies as base64.

use crate::record::Record;
use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub fn to_json_line(record: &Record) -> anyhow::Result<String> {
    Ok(serde_json::to_string(record)?)
}

/// Write one JSON object per line, in the given order.
pub async fn write_json_lines<W>(writer: &mut W, records: &[Arc<Record>]) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    for record in records {
        let mut line = to_json_line(record)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}
