//! Typed publish/subscribe over the shared chat channel.
//!
//! Protocol code only ever sees [`Message`] values. The chat-specific framing
//! lives in the codec, so a dedicated transport can replace [`ChatChannel`]
//! without touching the router or the projector.

use std::future::Future;

use lootsync_proto::{Message, decode_lossy};
use tokio::sync::broadcast::{self, error::RecvError};

/// Broadcast-capable message channel.
pub trait MessageBus: Clone + Send + Sync + 'static {
    /// Receiving half handed out by [`MessageBus::subscribe`].
    type Subscriber: MessageSubscriber;

    /// Publish to every current subscriber, including the publisher's own.
    ///
    /// Best effort. Publishing with no subscribers is not an error.
    fn publish(&self, message: &Message);

    /// Start receiving messages published from now on.
    fn subscribe(&self) -> Self::Subscriber;
}

/// Receiving half of a [`MessageBus`].
pub trait MessageSubscriber: Send + 'static {
    /// Next protocol message. `None` once the channel is closed.
    fn recv(&mut self) -> impl Future<Output = Option<Message>> + Send;
}

/// In-process stand-in for a game chat channel.
///
/// Carries raw text lines, so protocol traffic shares it with ordinary chat
/// exactly as it would in a game session.
#[derive(Debug, Clone)]
pub struct ChatChannel {
    tx: broadcast::Sender<String>,
}

impl ChatChannel {
    /// Create a channel buffering up to `capacity` lines per slow subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an arbitrary chat line.
    pub fn publish_raw(&self, line: impl Into<String>) {
        // No receivers is fine; chat goes unheard.
        let _ = self.tx.send(line.into());
    }

    /// Subscribe to raw lines, protocol and chat alike.
    pub fn subscribe_raw(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl MessageBus for ChatChannel {
    type Subscriber = ChatSubscriber;

    fn publish(&self, message: &Message) {
        self.publish_raw(message.encode());
    }

    fn subscribe(&self) -> ChatSubscriber {
        ChatSubscriber { rx: self.tx.subscribe() }
    }
}

/// Decoding subscriber for [`ChatChannel`].
///
/// Skips unrelated chat silently and malformed protocol lines with a warning.
#[derive(Debug)]
pub struct ChatSubscriber {
    rx: broadcast::Receiver<String>,
}

impl MessageSubscriber for ChatSubscriber {
    async fn recv(&mut self) -> Option<Message> {
        loop {
            match self.rx.recv().await {
                Ok(line) => {
                    if let Some(message) = decode_lossy(&line) {
                        return Some(message);
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "chat subscriber lagged, lines lost");
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
