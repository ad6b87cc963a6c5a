//! Topic to channel registry.

use super::types::{ChannelId, ChannelInfo, ChannelSink};
use crate::error::{RealtimeError, Result};
use crate::transport::{Transport, TransportHandle, TransportSubscription};
use crate::types::{InboundEvent, Topic};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Default name prefix for listener threads.
const DEFAULT_THREAD_PREFIX: &str = "realtime";

/// A live subscription and its listener.
struct Channel {
    id: ChannelId,
    topic: Topic,
    handle: TransportHandle,
    /// Dropping this wakes the listener and makes it exit.
    cancel: Option<Sender<()>>,
    /// Checked before each delivery so a cancelled listener delivers nothing
    /// even if an event was already waiting.
    cancelled: Arc<AtomicBool>,
    listener: JoinHandle<()>,
}

impl Channel {
    /// A listener that has exited on its own (stream ended) is dead.
    fn is_live(&self) -> bool {
        !self.listener.is_finished()
    }

    fn info(&self, created: bool) -> ChannelInfo {
        ChannelInfo {
            id: self.id,
            topic: self.topic.clone(),
            handle: self.handle,
            created,
        }
    }

    fn signal_cancel(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel.take();
    }
}

/// Owns every channel of one subsystem, at most one per topic.
///
/// All map mutations happen under one mutex, and `subscribe` holds it
/// across the transport call, so concurrent subscribes for a topic open
/// exactly one transport subscription.
pub struct SubscriptionRegistry {
    transport: Arc<dyn Transport>,
    sink: Arc<dyn ChannelSink>,
    channels: Mutex<HashMap<Topic, Channel>>,
    next_id: AtomicU64,
    thread_prefix: String,
}

impl SubscriptionRegistry {
    pub fn new(transport: Arc<dyn Transport>, sink: Arc<dyn ChannelSink>) -> Self {
        Self::with_thread_prefix(transport, sink, DEFAULT_THREAD_PREFIX)
    }

    pub fn with_thread_prefix(
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ChannelSink>,
        thread_prefix: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            sink,
            channels: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            thread_prefix: thread_prefix.into(),
        }
    }

    /// Open a channel for `topic`, or return the one already open.
    ///
    /// On transport failure nothing is recorded, so a later call retries.
    pub fn subscribe(&self, topic: Topic) -> Result<ChannelInfo> {
        let mut channels = self.channels.lock();

        if let Some(existing) = channels.get(&topic) {
            if existing.is_live() {
                return Ok(existing.info(false));
            }
            warn!(%topic, channel = ?existing.id, "replacing channel whose stream ended");
            if let Some(stale) = channels.remove(&topic) {
                // The server may already have forgotten the handle.
                if let Err(e) = self.teardown(stale) {
                    warn!(%topic, error = %e, "closing ended channel failed, opening a new one");
                }
            }
        }

        let filter = self.sink.filter_for(&topic);
        let subscription = self.transport.open_subscription(&topic, &filter)?;
        let channel = self.start_listener(topic.clone(), subscription)?;
        info!(%topic, %filter, channel = ?channel.id, "subscribed");

        let created = channel.info(true);
        channels.insert(topic, channel);
        Ok(created)
    }

    /// Close the channel for `topic`. Returns false if there was none.
    ///
    /// The entry is removed and the listener stopped even when the
    /// transport refuses to close; that failure is returned afterwards.
    pub fn unsubscribe(&self, topic: &Topic) -> Result<bool> {
        let channel = {
            let mut channels = self.channels.lock();
            match channels.remove(topic) {
                Some(mut channel) => {
                    channel.signal_cancel();
                    channel
                }
                None => return Ok(false),
            }
        };

        self.teardown(channel)?;
        info!(%topic, "unsubscribed");
        Ok(true)
    }

    /// Close every channel. Leaves the registry empty even on error; the
    /// first transport failure is returned after all channels are down.
    pub fn unsubscribe_all(&self) -> Result<usize> {
        let drained: Vec<Channel> = {
            let mut channels = self.channels.lock();
            channels
                .drain()
                .map(|(_, mut channel)| {
                    channel.signal_cancel();
                    channel
                })
                .collect()
        };

        let count = drained.len();
        let mut first_error = None;
        for channel in drained {
            if let Err(e) = self.teardown(channel) {
                warn!(error = %e, "transport close failed during unsubscribe_all");
                first_error.get_or_insert(e);
            }
        }

        if count > 0 {
            info!(count, "unsubscribed all topics");
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    pub fn contains(&self, topic: &Topic) -> bool {
        self.channels.lock().contains_key(topic)
    }

    pub fn channel_id(&self, topic: &Topic) -> Option<ChannelId> {
        self.channels.lock().get(topic).map(|c| c.id)
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.channels.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.channels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Internals ---

    fn start_listener(&self, topic: Topic, subscription: TransportSubscription) -> Result<Channel> {
        let id = ChannelId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (cancel_tx, cancel_rx) = bounded::<()>(0);
        let cancelled = Arc::new(AtomicBool::new(false));

        let spawned = {
            let topic = topic.clone();
            let events = subscription.events;
            let cancelled = Arc::clone(&cancelled);
            let sink = Arc::clone(&self.sink);
            thread::Builder::new()
                .name(format!("{}-{}", self.thread_prefix, topic))
                .spawn(move || listen(topic, events, cancel_rx, cancelled, sink))
        };

        let listener = match spawned {
            Ok(listener) => listener,
            Err(e) => {
                // Don't leave the transport side dangling.
                if let Err(close) = self.transport.close_subscription(subscription.handle) {
                    warn!(%topic, error = %close, "close after failed spawn also failed");
                }
                return Err(RealtimeError::Spawn(e));
            }
        };

        Ok(Channel {
            id,
            topic,
            handle: subscription.handle,
            cancel: Some(cancel_tx),
            cancelled,
            listener,
        })
    }

    /// Stop the listener, close the transport side, and wait for the
    /// listener to finish. A listener tearing down its own channel is not
    /// joined; it exits once its current delivery returns.
    fn teardown(&self, mut channel: Channel) -> Result<()> {
        channel.signal_cancel();
        let closed = self.transport.close_subscription(channel.handle);

        if channel.listener.thread().id() == thread::current().id() {
            debug!(topic = %channel.topic, "channel torn down from its own listener");
        } else if channel.listener.join().is_err() {
            warn!(topic = %channel.topic, "listener thread panicked");
        }

        closed
    }
}

impl Drop for SubscriptionRegistry {
    fn drop(&mut self) {
        if let Err(e) = self.unsubscribe_all() {
            warn!(error = %e, "failed to close channels on drop");
        }
    }
}

/// Listener loop: one per channel, events handled in receipt order.
fn listen(
    topic: Topic,
    events: Receiver<InboundEvent>,
    cancel: Receiver<()>,
    cancelled: Arc<AtomicBool>,
    sink: Arc<dyn ChannelSink>,
) {
    debug!(%topic, "listener started");
    loop {
        select! {
            recv(cancel) -> _ => break,
            recv(events) -> msg => match msg {
                Ok(event) => {
                    if cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    sink.deliver(&topic, event);
                }
                Err(_) => {
                    warn!(%topic, "transport stream ended");
                    break;
                }
            },
        }
    }
    debug!(%topic, "listener stopped");
}
