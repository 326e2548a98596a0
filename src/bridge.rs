//! Newline-delimited JSON bridge between a host process and the window.
//!
//! Each input line is either a host envelope `{"target": .., "data": ..}` or
//! a surface event `{"ui": "scrolled" | "closing"}`. Every outbound event is
//! written as one JSON line.
//!
//! Stdout is reserved for the protocol; diagnostics go to stderr.

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, oneshot};

use crate::dispatch::{DispatchError, Envelope};
use crate::error::{Result, WindowError};
use crate::runtime::{Inbound, window_channel};
use crate::store::StateStore;
use crate::window::{ClipboardSink, OutboundEvent, ResponseWindow, UiEvent};

#[derive(Deserialize)]
#[serde(untagged)]
enum InboundLine {
    Ui { ui: UiEvent },
    Host(Envelope),
}

/// Parse one input line. Blank lines yield `None`.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidEnvelope`] if the line is neither an
/// envelope nor a UI event.
pub fn parse_line(line: &str) -> std::result::Result<Option<Inbound>, DispatchError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let parsed: InboundLine = serde_json::from_str(trimmed)
        .map_err(|e| DispatchError::InvalidEnvelope(e.to_string()))?;
    Ok(Some(match parsed {
        InboundLine::Ui { ui } => Inbound::Ui(ui),
        InboundLine::Host(envelope) => Inbound::Host(envelope),
    }))
}

/// Write a single event as one JSON line and flush it.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &OutboundEvent) -> Result<()> {
    let json = serde_json::to_string(event)
        .map_err(|e| WindowError::Channel(format!("failed to serialize outbound event: {e}")))?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

/// Run the bridge over stdin/stdout until stdin closes.
///
/// # Errors
///
/// Returns an error if the runtime cannot be started or a task fails.
pub async fn run_stdio_bridge<S, C>(
    window: ResponseWindow<S, C>,
    capacity: usize,
) -> Result<ResponseWindow<S, C>>
where
    S: StateStore + Send + 'static,
    C: ClipboardSink + Send + 'static,
{
    let (window, _stdout) =
        run_bridge(window, capacity, tokio::io::stdin(), tokio::io::stdout()).await?;
    Ok(window)
}

/// Run the bridge over arbitrary streams until `input` reaches EOF.
///
/// Returns the window (after its runtime has drained) and the output stream.
///
/// # Errors
///
/// Returns an error if the runtime cannot be started, reading input fails,
/// or a task panics.
pub async fn run_bridge<R, W, S, C>(
    window: ResponseWindow<S, C>,
    capacity: usize,
    input: R,
    output: W,
) -> Result<(ResponseWindow<S, C>, W)>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: StateStore + Send + 'static,
    C: ClipboardSink + Send + 'static,
{
    let (handle, runtime) = window_channel(window, capacity)?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let forwarder = tokio::spawn(forward_events(handle.subscribe_events(), shutdown_rx, output));
    let runtime_task = tokio::spawn(runtime.run());

    let mut reader = BufReader::new(input);
    let mut line = String::new();
    let read_result = loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                tracing::info!("input closed; shutting down bridge");
                break Ok(());
            }
            Ok(_) => {}
            Err(e) => break Err(WindowError::Io(e)),
        }

        let item = match parse_line(&line) {
            Ok(Some(item)) => item,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(error = %e, raw_line = %line.trim(), "dropped unparseable input line");
                continue;
            }
        };
        if let Err(e) = handle.send(item).await {
            break Err(e);
        }
    };

    // Dropping the last handle closes the queue and lets the runtime finish.
    drop(handle);
    let window = runtime_task
        .await
        .map_err(|e| WindowError::Channel(format!("window runtime task failed: {e}")))?;

    let _ = shutdown_tx.send(());
    let output = forwarder
        .await
        .map_err(|e| WindowError::Channel(format!("event forwarder task failed: {e}")))?;

    read_result.map(|()| (window, output))
}

async fn forward_events<W>(
    mut events: broadcast::Receiver<OutboundEvent>,
    mut shutdown: oneshot::Receiver<()>,
    output: W,
) -> W
where
    W: AsyncWrite + Unpin,
{
    let mut writer = BufWriter::new(output);
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    if let Err(e) = write_event(&mut writer, &event).await {
                        tracing::warn!(error = %e, "failed to write outbound event; stopping forwarder");
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(lagged = n, "event forwarder lagged; some events were dropped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut shutdown => {
                loop {
                    match events.try_recv() {
                        Ok(event) => {
                            if write_event(&mut writer, &event).await.is_err() {
                                break;
                            }
                        }
                        Err(TryRecvError::Lagged(_)) => {}
                        Err(_) => break,
                    }
                }
                break;
            }
        }
    }
    let _ = writer.flush().await;
    writer.into_inner()
}
