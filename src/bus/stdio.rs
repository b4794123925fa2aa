//! # Line-Delimited JSON Transport
//!
//! Reads [`BusMessage`]s one per line and writes events back the same way.
//! Lets the control layer run behind any broker bridge that speaks JSON lines.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{BusMessage, Event, TopicRouter};
use crate::error::Result;

/// Feed every line of `reader` through `router` until EOF
///
/// Blank lines are skipped; lines that are not UTF-8 or not a [`BusMessage`]
/// are logged and skipped. Only an I/O failure ends the loop early.
pub async fn read_messages<R>(mut reader: R, router: &TopicRouter) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                warn!("Skipping non UTF-8 bus line: {}", e);
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<BusMessage>(line) {
            Ok(message) => router.route(message),
            Err(e) => warn!("Skipping malformed bus line: {}", e),
        }
    }
    info!("Bus input closed");
    Ok(())
}

/// Write each event as a `{"topic", "payload"}` line until the channel closes
pub async fn write_events<W>(
    mut writer: W,
    mut events: mpsc::UnboundedReceiver<Event>,
    event_topic: &str,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(event) = events.recv().await {
        let message = BusMessage::new(event_topic, serde_json::to_value(&event)?);
        let mut line = serde_json::to_vec(&message)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        debug!("Wrote {} ({} bytes)", event.name, line.len());
    }
    Ok(())
}
