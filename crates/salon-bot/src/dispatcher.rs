//! Per-chat serialized dispatch of chat events.
//!
//! Every chat gets its own queue and worker task, so events of one chat run
//! one at a time in arrival order while different chats run in parallel. A
//! global semaphore bounds how many handlers run at once. Queues that stay
//! empty for the idle period are dropped and their workers exit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dialog::{ChatEvent, ChatSender, Controller};
use futures::{Stream, StreamExt};
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::metrics::Metrics;

/// Something that handles one chat event.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: ChatEvent, cancel: &CancellationToken) -> dialog::Result<()>;
}

#[async_trait]
impl<S: ChatSender + 'static> EventHandler for Controller<S> {
    async fn handle(&self, event: ChatEvent, cancel: &CancellationToken) -> dialog::Result<()> {
        Controller::handle(self, event, cancel).await
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Handlers allowed to run at once.
    pub max_workers: usize,
    /// How long an idle chat keeps its worker.
    pub idle: Duration,
}

struct ChatQueue {
    tx: mpsc::UnboundedSender<ChatEvent>,
    /// Events queued or running. Only the dispatcher increments it.
    pending: Arc<AtomicUsize>,
    last_seen: Instant,
}

pub struct Dispatcher<H: EventHandler> {
    handler: Arc<H>,
    config: DispatcherConfig,
    chats: HashMap<i64, ChatQueue>,
    permits: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    metrics: Arc<Metrics>,
}

impl<H: EventHandler> Dispatcher<H> {
    pub fn new(
        handler: Arc<H>,
        config: DispatcherConfig,
        metrics: Arc<Metrics>,
        cancel: CancellationToken,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_workers.max(1)));
        Self {
            handler,
            config,
            chats: HashMap::new(),
            permits,
            tracker: TaskTracker::new(),
            cancel,
            metrics,
        }
    }

    /// Number of chats with a live queue.
    pub fn active_chats(&self) -> usize {
        self.chats.len()
    }

    /// Dispatch events until the stream ends or the token is cancelled,
    /// then wait for the workers to finish.
    pub async fn run<St>(mut self, events: St)
    where
        St: Stream<Item = ChatEvent> + Send,
    {
        info!(
            max_workers = self.config.max_workers,
            idle_secs = self.config.idle.as_secs(),
            "Starting dispatcher"
        );
        futures::pin_mut!(events);

        let period = (self.config.idle / 2).max(Duration::from_millis(10));
        let mut reap = tokio::time::interval(period);
        reap.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let cancel = self.cancel.clone();

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!("Shutdown signal received, stopping dispatcher");
                    break;
                }

                next = events.next() => match next {
                    Some(event) => self.dispatch(event),
                    None => {
                        warn!("Update stream ended");
                        break;
                    }
                },

                _ = reap.tick() => self.reap(),
            }
        }

        self.shutdown().await;
    }

    /// Queue an event on its chat, starting a worker when needed.
    pub fn dispatch(&mut self, event: ChatEvent) {
        let chat_id = event.chat_id;
        let event = match self.chats.get_mut(&chat_id) {
            Some(queue) => {
                queue.pending.fetch_add(1, Ordering::SeqCst);
                queue.last_seen = Instant::now();
                match queue.tx.send(event) {
                    Ok(()) => return,
                    // The worker is gone; start a new one below.
                    Err(mpsc::error::SendError(event)) => {
                        self.chats.remove(&chat_id);
                        event
                    }
                }
            }
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(1));
        // The receiver is alive until the worker starts, so this cannot fail.
        let _ = tx.send(event);
        self.spawn_worker(chat_id, rx, Arc::clone(&pending));
        self.chats.insert(
            chat_id,
            ChatQueue {
                tx,
                pending,
                last_seen: Instant::now(),
            },
        );
    }

    /// Drop queues that are empty, idle and have nothing running.
    pub fn reap(&mut self) {
        let idle = self.config.idle;
        let before = self.chats.len();
        self.chats.retain(|_, q| {
            q.pending.load(Ordering::SeqCst) > 0 || q.last_seen.elapsed() < idle
        });
        let reaped = before - self.chats.len();
        if reaped > 0 {
            debug!(reaped, active = self.chats.len(), "Reaped idle chat queues");
        }
    }

    fn spawn_worker(
        &self,
        chat_id: i64,
        mut rx: mpsc::UnboundedReceiver<ChatEvent>,
        pending: Arc<AtomicUsize>,
    ) {
        let handler = Arc::clone(&self.handler);
        let permits = Arc::clone(&self.permits);
        let metrics = Arc::clone(&self.metrics);
        let cancel = self.cancel.clone();

        metrics.worker_started();
        debug!(chat_id, "Chat worker started");

        self.tracker.spawn(async move {
            while let Some(event) = rx.recv().await {
                let permit = tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    permit = Arc::clone(&permits).acquire_owned() => permit.ok(),
                };
                let Some(_permit) = permit else {
                    break;
                };

                match handler.handle(event, &cancel).await {
                    Ok(()) => metrics.update_handled(),
                    Err(e) => {
                        metrics.handler_error();
                        debug!(chat_id, "Handler failed: {}", e);
                    }
                }
                pending.fetch_sub(1, Ordering::SeqCst);
            }

            metrics.worker_stopped();
            debug!(chat_id, "Chat worker stopped");
        });
    }

    async fn shutdown(mut self) {
        debug!(chats = self.active_chats(), "Closing chat queues");
        // Dropping the senders lets idle workers exit.
        self.chats.clear();
        self.tracker.close();
        info!(workers = self.tracker.len(), "Waiting for chat workers");
        self.tracker.wait().await;
        info!("Dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use tokio::sync::Mutex;

    use super::*;

    /// Records events and how many ran at once.
    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(i64, String)>>,
        running: AtomicUsize,
        peak: AtomicUsize,
        fail: AtomicBool,
        delay: Duration,
    }

    impl Recorder {
        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(
            &self,
            event: ChatEvent,
            _cancel: &CancellationToken,
        ) -> dialog::Result<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if let dialog::EventKind::Text(text) = &event.kind {
                self.seen.lock().await.push((event.chat_id, text.clone()));
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(dialog::DialogError::Transport("down".into()));
            }
            Ok(())
        }
    }

    fn config(max_workers: usize) -> DispatcherConfig {
        DispatcherConfig {
            max_workers,
            idle: Duration::from_secs(300),
        }
    }

    fn events(list: &[(i64, &str)]) -> impl Stream<Item = ChatEvent> + Send {
        let list: Vec<ChatEvent> = list
            .iter()
            .map(|(chat, text)| ChatEvent::text(*chat, *text))
            .collect();
        futures::stream::iter(list)
    }

    #[tokio::test]
    async fn test_per_chat_order() {
        let handler = Arc::new(Recorder::slow(Duration::from_millis(5)));
        let metrics = Arc::new(Metrics::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&handler),
            config(4),
            Arc::clone(&metrics),
            CancellationToken::new(),
        );

        dispatcher
            .run(events(&[(1, "a1"), (2, "b1"), (1, "a2"), (2, "b2"), (1, "a3")]))
            .await;

        let seen = handler.seen.lock().await.clone();
        let chat = |id: i64| -> Vec<String> {
            seen.iter()
                .filter(|(c, _)| *c == id)
                .map(|(_, t)| t.clone())
                .collect()
        };
        assert_eq!(chat(1), ["a1", "a2", "a3"]);
        assert_eq!(chat(2), ["b1", "b2"]);
        assert_eq!(metrics.updates_handled(), 5);
        assert_eq!(metrics.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_one_chat_runs_serially() {
        let handler = Arc::new(Recorder::slow(Duration::from_millis(5)));
        let dispatcher = Dispatcher::new(
            Arc::clone(&handler),
            config(8),
            Arc::new(Metrics::new()),
            CancellationToken::new(),
        );

        dispatcher
            .run(events(&[(1, "x"), (1, "y"), (1, "z")]))
            .await;

        assert_eq!(handler.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_semaphore_bounds_parallelism() {
        let handler = Arc::new(Recorder::slow(Duration::from_millis(20)));
        let dispatcher = Dispatcher::new(
            Arc::clone(&handler),
            config(2),
            Arc::new(Metrics::new()),
            CancellationToken::new(),
        );

        dispatcher
            .run(events(&[(1, "a"), (2, "b"), (3, "c"), (4, "d"), (5, "e")]))
            .await;

        assert!(handler.peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(handler.seen.lock().await.len(), 5);
    }

    #[tokio::test]
    async fn test_errors_are_counted() {
        let handler = Arc::new(Recorder::default());
        handler.fail.store(true, Ordering::SeqCst);
        let metrics = Arc::new(Metrics::new());
        let dispatcher = Dispatcher::new(
            handler,
            config(2),
            Arc::clone(&metrics),
            CancellationToken::new(),
        );

        dispatcher.run(events(&[(1, "a"), (2, "b")])).await;

        assert_eq!(metrics.handler_errors(), 2);
        assert_eq!(metrics.updates_handled(), 0);
    }

    #[tokio::test]
    async fn test_reap_keeps_busy_and_recent_queues() {
        let handler = Arc::new(Recorder::slow(Duration::from_millis(50)));
        let mut dispatcher = Dispatcher::new(
            handler,
            DispatcherConfig {
                max_workers: 4,
                idle: Duration::from_millis(0),
            },
            Arc::new(Metrics::new()),
            CancellationToken::new(),
        );

        dispatcher.dispatch(ChatEvent::text(1, "busy"));
        dispatcher.reap();
        assert_eq!(dispatcher.active_chats(), 1);

        tokio::time::sleep(Duration::from_millis(120)).await;
        dispatcher.reap();
        assert_eq!(dispatcher.active_chats(), 0);

        // A new event after reaping starts a fresh worker.
        dispatcher.dispatch(ChatEvent::text(1, "again"));
        assert_eq!(dispatcher.active_chats(), 1);
    }

    #[tokio::test]
    async fn test_cancel_stops_dispatch() {
        let handler = Arc::new(Recorder::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let dispatcher = Dispatcher::new(
            Arc::clone(&handler),
            config(2),
            Arc::new(Metrics::new()),
            cancel,
        );

        dispatcher.run(futures::stream::pending::<ChatEvent>()).await;

        assert!(handler.seen.lock().await.is_empty());
    }
}
