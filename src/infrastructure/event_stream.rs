//! Event sources for the monitor.
//!
//! The runtime's event API is consumed as JSON lines, one event per line,
//! exactly as `docker events --format '{{json .}}'` prints them.

use crate::application::ports::{EventSource, EventSourceError};
use crate::domain::event::ContainerEvent;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Split};
use tokio::sync::mpsc;

/// Reads newline-delimited JSON events from any buffered async reader.
///
/// Blank lines are skipped. A line that fails to decode, including one that
/// is not valid UTF-8, yields `EventSourceError::Decode` and the following
/// lines remain readable.
#[derive(Debug)]
pub struct JsonLinesSource<R> {
    lines: Split<R>,
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.split(b'\n'),
        }
    }
}

impl JsonLinesSource<tokio::io::BufReader<tokio::io::Stdin>> {
    /// Events piped into the process on stdin.
    pub fn stdin() -> Self {
        Self::new(tokio::io::BufReader::new(tokio::io::stdin()))
    }
}

#[async_trait]
impl<R> EventSource for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    async fn next_event(&mut self) -> Option<Result<ContainerEvent, EventSourceError>> {
        loop {
            // `next_segment` is cancel safe, so a dropped call never loses a line.
            let line = match self.lines.next_segment().await {
                Ok(Some(line)) => line,
                Ok(None) => return None,
                Err(e) => return Some(Err(e.into())),
            };
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            return Some(serde_json::from_slice(&line).map_err(EventSourceError::from));
        }
    }
}

#[async_trait]
impl EventSource for mpsc::Receiver<ContainerEvent> {
    async fn next_event(&mut self) -> Option<Result<ContainerEvent, EventSourceError>> {
        self.recv().await.map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIE_EVENT: &str = r#"{"status":"die","id":"abc","from":"nginx:1.27","Type":"container","Action":"die","Actor":{"ID":"abc","Attributes":{"exitCode":"137","image":"nginx:1.27","name":"web","execDuration":"42"}},"scope":"local","time":1734197676,"timeNano":1734197676123456789}"#;

    #[tokio::test]
    async fn test_reads_events_and_skips_blank_lines() {
        let input = format!("\n{DIE_EVENT}\n   \n{DIE_EVENT}\n");
        let mut source = JsonLinesSource::new(input.as_bytes());

        let first = source.next_event().await.unwrap().unwrap();
        assert_eq!(first.action, "die");
        assert_eq!(first.exit_code(), Some("137"));
        assert_eq!(first.labels().get("name").map(String::as_str), Some("web"));

        assert!(source.next_event().await.unwrap().is_ok());
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_decode_error_does_not_end_stream() {
        let input = format!("{{not json\n{DIE_EVENT}\n");
        let mut source = JsonLinesSource::new(input.as_bytes());

        assert!(matches!(
            source.next_event().await,
            Some(Err(EventSourceError::Decode(_)))
        ));
        assert!(source.next_event().await.unwrap().is_ok());
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_is_a_decode_error() {
        let mut input = Vec::new();
        input.extend_from_slice(DIE_EVENT.as_bytes());
        input.extend_from_slice(b"\n{\"Action\":\"\xff\"}\r\n");
        input.extend_from_slice(DIE_EVENT.as_bytes());
        input.extend_from_slice(b"\r\n");
        let mut source = JsonLinesSource::new(input.as_slice());

        assert!(source.next_event().await.unwrap().is_ok());
        assert!(matches!(
            source.next_event().await,
            Some(Err(EventSourceError::Decode(_)))
        ));
        assert_eq!(source.next_event().await.unwrap().unwrap().action, "die");
        assert!(source.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_channel_source() {
        let (tx, mut rx) = mpsc::channel(2);
        tx.send(ContainerEvent::default()).await.unwrap();
        drop(tx);

        assert!(rx.next_event().await.unwrap().is_ok());
        assert!(rx.next_event().await.is_none());
    }
}
