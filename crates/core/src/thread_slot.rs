//! Process-wide register of the thread key of the latest daily prompt.
//!
//! Last writer wins. Readers may observe a stale key while an update is in
//! flight, so anything that needs precision re-derives thread state from the
//! store instead of trusting this value.
//!
//! The daily prompt scheduler is the normal source of updates. Mood clicks
//! only seed an empty register (after a restart), so a click on an older
//! prompt never moves it backwards.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::info;

use crate::domain::mood::ThreadKey;

#[derive(Clone, Debug)]
pub struct CurrentThread {
    sender: watch::Sender<Option<ThreadKey>>,
}

impl Default for CurrentThread {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CurrentThread {
    pub fn new(initial: Option<ThreadKey>) -> Self {
        let (sender, _receiver) = watch::channel(initial);
        Self { sender }
    }

    pub fn get(&self) -> Option<ThreadKey> {
        self.sender.borrow().clone()
    }

    /// Replaces the current key and returns the previous one.
    pub fn set(&self, key: ThreadKey) -> Option<ThreadKey> {
        self.sender.send_replace(Some(key))
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<ThreadKey>> {
        self.sender.subscribe()
    }
}

/// Sending half of the notification queue feeding the register's single writer.
#[derive(Clone, Debug)]
pub struct ThreadNotifier {
    sender: mpsc::UnboundedSender<ThreadKey>,
}

impl ThreadNotifier {
    /// Returns false once the writer task has stopped.
    pub fn notify(&self, key: ThreadKey) -> bool {
        self.sender.send(key).is_ok()
    }
}

/// Spawns the only task allowed to write `register`. It runs until every
/// notifier is dropped.
pub fn spawn_writer(register: CurrentThread) -> (ThreadNotifier, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<ThreadKey>();
    let handle = tokio::spawn(async move {
        while let Some(key) = receiver.recv().await {
            let previous = register.set(key.clone());
            info!(
                event_name = "thread_slot.changed",
                previous = previous.as_ref().map(ThreadKey::as_str).unwrap_or(""),
                current = key.as_str(),
                "changed current thread from {} to {}",
                previous.as_ref().map(ThreadKey::as_str).unwrap_or("<none>"),
                key
            );
        }
    });

    (ThreadNotifier { sender }, handle)
}
