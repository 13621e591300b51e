mod allocation;
pub use allocation::{AllocationHandler, ENV_CONTAINER_ID, ENV_MEMORY_MB};

mod launch;
pub use launch::LaunchHandler;

use std::sync::Arc;

use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Consumer of one collaborator's inbound events.
pub trait EventHandler<E>: Send + Sync + 'static {
    fn handle(&self, event: E);

    fn name(&self) -> &'static str;
}

/// Run `handler` over every event received on `rx` until the channel closes or `shutdown`
/// fires. Events are processed one at a time, in arrival order.
pub fn spawn_event_loop<E, H>(
    handler: Arc<H>,
    mut rx: mpsc::Receiver<E>,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    E: Send + 'static,
    H: EventHandler<E>,
{
    tokio::spawn(async move {
        debug!(handler = handler.name(), "event loop started");
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                event = rx.recv() => match event {
                    Some(event) => handler.handle(event),
                    None => {
                        trace!(handler = handler.name(), "event channel closed");
                        break;
                    }
                },
            }
        }
        debug!(handler = handler.name(), "event loop stopped");
    })
}
