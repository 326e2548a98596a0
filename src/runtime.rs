//! Single-consumer inbound queue driving a [`ResponseWindow`].
//!
//! Host envelopes, UI events and timer expiries all enter through one
//! `mpsc` queue and are processed strictly one at a time. After each item
//! the runtime publishes a [`SurfaceSnapshot`](crate::surface::SurfaceSnapshot)
//! on the window's broadcast channel if anything visible changed.

use tokio::sync::{broadcast, mpsc};

use crate::dispatch::{Dispatcher, Envelope};
use crate::error::{Result, WindowError};
use crate::store::StateStore;
use crate::window::{ClipboardSink, OutboundEvent, ResponseWindow, Timer, TimerEvent, UiEvent};

/// One unit of work for the window.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Host(Envelope),
    Ui(UiEvent),
    Timer(TimerEvent),
}

/// Cloneable sending side of the window queue.
#[derive(Clone)]
pub struct WindowHandle {
    request_tx: mpsc::Sender<Inbound>,
    event_tx: broadcast::Sender<OutboundEvent>,
}

impl WindowHandle {
    /// Enqueue an item.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Channel`] if the runtime has stopped.
    pub async fn send(&self, item: Inbound) -> Result<()> {
        self.request_tx
            .send(item)
            .await
            .map_err(|e| WindowError::Channel(format!("failed to enqueue window item: {e}")))
    }

    /// Enqueue a host envelope.
    ///
    /// # Errors
    ///
    /// Returns [`WindowError::Channel`] if the runtime has stopped.
    pub async fn post(&self, envelope: Envelope) -> Result<()> {
        self.send(Inbound::Host(envelope)).await
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<OutboundEvent> {
        self.event_tx.subscribe()
    }
}

/// Receiving side; owns the window while running.
pub struct WindowRuntime<S, C>
where
    S: StateStore + Send + 'static,
    C: ClipboardSink + Send + 'static,
{
    request_rx: mpsc::Receiver<Inbound>,
    timer_tx: mpsc::WeakSender<Inbound>,
    dispatcher: Dispatcher,
    window: ResponseWindow<S, C>,
}

/// Wrap `window` in a queue of `capacity` items.
///
/// # Errors
///
/// Returns an error if the dispatcher's allow-list fails validation.
pub fn window_channel<S, C>(
    window: ResponseWindow<S, C>,
    capacity: usize,
) -> Result<(WindowHandle, WindowRuntime<S, C>)>
where
    S: StateStore + Send + 'static,
    C: ClipboardSink + Send + 'static,
{
    let dispatcher = Dispatcher::new()?;
    let (request_tx, request_rx) = mpsc::channel(capacity.max(1));
    let timer_tx = request_tx.downgrade();
    let event_tx = window.event_sender();

    Ok((
        WindowHandle {
            request_tx,
            event_tx,
        },
        WindowRuntime {
            request_rx,
            timer_tx,
            dispatcher,
            window,
        },
    ))
}

impl<S, C> WindowRuntime<S, C>
where
    S: StateStore + Send + 'static,
    C: ClipboardSink + Send + 'static,
{
    /// Process items until every [`WindowHandle`] is dropped, then persist
    /// the label and hand the window back.
    pub async fn run(mut self) -> ResponseWindow<S, C> {
        let mut last = self.window.snapshot();
        self.window.publish_snapshot();

        while let Some(item) = self.request_rx.recv().await {
            self.process(item);

            for timer in self.window.take_timers() {
                self.schedule(timer);
            }

            let snapshot = self.window.snapshot();
            if snapshot != last {
                self.window.publish_snapshot();
                last = snapshot;
            }
        }

        tracing::debug!("window queue closed");
        self.window.persist_label();
        self.window
    }

    fn process(&mut self, item: Inbound) {
        match item {
            Inbound::Host(envelope) => {
                if let Err(e) = self.dispatcher.dispatch(&envelope, &mut self.window) {
                    tracing::warn!(operation = %envelope.target, error = %e, "dropped host envelope");
                }
            }
            Inbound::Ui(event) => self.window.on_ui(event),
            Inbound::Timer(event) => self.window.on_timer(event),
        }
    }

    fn schedule(&self, timer: Timer) {
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timer.after).await;
            // Shutdown drops the queue; a late timer has nowhere to go.
            if let Some(tx) = timer_tx.upgrade() {
                let _ = tx.send(Inbound::Timer(timer.event)).await;
            }
        });
    }
}
