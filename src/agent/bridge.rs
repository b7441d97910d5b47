use tokio::sync::broadcast;

use super::fix::PositionUpdate;

const CHANNEL_CAPACITY: usize = 16;

/// Fan-out of accepted fixes to the foreground UI.
///
/// Publishing is fire-and-forget: with no subscriber attached the update is
/// discarded, and a subscriber that attaches later only sees updates
/// published after its `subscribe` call. Dropping the receiver detaches.
#[derive(Clone)]
pub struct EventBridge {
    tx: broadcast::Sender<PositionUpdate>,
}

impl EventBridge {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PositionUpdate> {
        self.tx.subscribe()
    }

    pub fn publish(&self, update: PositionUpdate) {
        // send only errors when nobody is listening
        let _ = self.tx.send(update);
    }
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new()
    }
}
