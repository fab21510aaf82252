//! Watch subscription dispatch.
//!
//! Each subscription owns one background task that drains the transport's
//! event stream and invokes the caller's handler one event at a time.
//! [`WatchSubscription::close`] signals the task and then joins it, which is
//! what guarantees that no handler invocation happens after `close` returns.

use futures::StreamExt;
use skiff_core::{EventStream, FsEvent};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// A standing filesystem watch. Obtained from
/// [`SandboxFs::watch`](crate::SandboxFs::watch).
pub struct WatchSubscription {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

pub(crate) fn spawn<F>(mut stream: EventStream, mut handler: F) -> WatchSubscription
where
    F: FnMut(FsEvent) + Send + 'static,
{
    let (shutdown, mut rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                // Shutdown wins over a ready event so close() stays prompt.
                biased;
                _ = &mut rx => break,
                event = stream.next() => match event {
                    Some(Ok(event)) => handler(event),
                    Some(Err(e)) => {
                        tracing::warn!("watch stream error: {}", e);
                        break;
                    }
                    None => break,
                },
            }
        }
    });
    WatchSubscription { shutdown, task }
}

impl WatchSubscription {
    /// Ends the subscription.
    ///
    /// Consumes the subscription, stops the dispatch task, and waits for it
    /// to finish. Once this returns, the handler will not be invoked again —
    /// no late-delivered event races with cleanup after close.
    pub async fn close(self) {
        // Send fails if the task already exited on its own; either way the
        // join below is what callers rely on.
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::warn!("watch handler panicked: {}", e);
            }
        }
    }

    /// True while the dispatch task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}
