//! Message intake and dispatch orchestration.
//!
//! Transports push messages through an [`Inbound`] handle. [`HeraldRuntime`]
//! pulls them off a bounded queue and spawns one task per message that runs
//! every root route of the [`Router`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use herald_runtime::HeraldRuntime;
//!
//! let runtime = HeraldRuntime::builder()
//!     .config_file("herald.toml")
//!     .build(router)?;
//!
//! let inbound = runtime.inbound();
//! tokio::spawn(my_transport(inbound));
//!
//! // Until Ctrl+C, SIGTERM, or every Inbound handle is dropped.
//! let stats = runtime.run().await?;
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use herald_core::{BoxedMessage, BoxedSession};
use herald_framework::{Invocation, Router};
use tokio::signal;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ConfigLoader, ConfigResult, HeraldConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Owns the inbound queue and drives dispatch.
pub struct HeraldRuntime {
    config: HeraldConfig,
    router: Router,
    tx: mpsc::Sender<Invocation>,
    rx: mpsc::Receiver<Invocation>,
    shutdown: CancellationToken,
    limiter: Option<Arc<Semaphore>>,
}

impl HeraldRuntime {
    /// Creates a runtime, loading configuration from the current directory.
    ///
    /// Falls back to defaults if loading fails.
    pub fn new(router: Router) -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load_validated()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                HeraldConfig::default()
            });

        Self::from_config(&config, router)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from an already loaded configuration.
    ///
    /// Installs logging and adds `router.filters` to the router's filter.
    pub fn from_config(config: &HeraldConfig, router: Router) -> Self {
        logging::init_from_config(&config.logging);

        let router = router.filter(config.router.filters);
        let (tx, rx) = mpsc::channel(config.runtime.queue_capacity.max(1));
        let limiter = config
            .runtime
            .max_in_flight
            .filter(|&n| n > 0)
            .map(|n| Arc::new(Semaphore::new(n)));

        info!(
            routes = router.route_count(),
            filter = %router.get_filter(),
            queue_capacity = config.runtime.queue_capacity,
            max_in_flight = ?config.runtime.max_in_flight,
            "Runtime initialized"
        );

        Self {
            config: config.clone(),
            router,
            tx,
            rx,
            shutdown: CancellationToken::new(),
            limiter,
        }
    }

    pub fn config(&self) -> &HeraldConfig {
        &self.config
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Returns a handle for transports to deliver messages with.
    pub fn inbound(&self) -> Inbound {
        Inbound {
            tx: self.tx.clone(),
        }
    }

    /// Returns a token that stops [`run`](Self::run) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Runs until Ctrl+C, SIGTERM, cancellation, or every [`Inbound`] being
    /// dropped, then drains in-flight dispatches.
    pub async fn run(self) -> RuntimeResult<RuntimeStats> {
        info!("Herald runtime is now running. Press Ctrl+C to stop.");
        self.run_until(shutdown_signal()).await
    }

    /// Like [`run`](Self::run) but stops on `shutdown` instead of OS signals.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<RuntimeStats>
    where
        F: Future<Output = ()>,
    {
        let Self {
            config,
            router,
            tx,
            mut rx,
            shutdown: token,
            limiter,
        } = self;
        // Only external Inbound handles keep the queue open.
        drop(tx);

        let mut tasks = JoinSet::new();
        let mut stats = RuntimeStats::default();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                received = rx.recv() => match received {
                    Some(invocation) => {
                        stats.received += 1;
                        tasks.spawn(dispatch_one(router.clone(), invocation, limiter.clone()));
                    }
                    None => {
                        info!("All inbound handles dropped, shutting down");
                        break;
                    }
                },
                () = token.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                () = &mut shutdown => break,
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => stats.record(joined),
            }
        }

        rx.close();
        let mut discarded = 0;
        while rx.try_recv().is_ok() {
            discarded += 1;
        }
        if discarded > 0 {
            warn!(discarded, "Dropped queued messages on shutdown");
        }
        stats.discarded = discarded;

        if !tasks.is_empty() {
            let grace = config.runtime.shutdown_grace();
            info!(in_flight = tasks.len(), ?grace, "Waiting for in-flight dispatches");

            let drained = tokio::time::timeout(grace, async {
                while let Some(joined) = tasks.join_next().await {
                    stats.record(joined);
                }
            })
            .await;

            if drained.is_err() {
                warn!(remaining = tasks.len(), "Grace period elapsed, aborting dispatches");
                tasks.abort_all();
                while let Some(joined) = tasks.join_next().await {
                    stats.record(joined);
                }
            }
        }

        info!(
            received = stats.received,
            completed = stats.completed,
            panicked = stats.panicked,
            aborted = stats.aborted,
            "Runtime stopped"
        );

        Ok(stats)
    }
}

async fn dispatch_one(router: Router, invocation: Invocation, limiter: Option<Arc<Semaphore>>) {
    let _permit = match limiter {
        Some(limiter) => match limiter.acquire_owned().await {
            Ok(permit) => Some(permit),
            Err(_) => return,
        },
        None => None,
    };

    let results = router
        .dispatch(invocation.session, invocation.message)
        .await;

    let completed = results
        .iter()
        .filter(|r| matches!(r, Ok(outcome) if outcome.is_completed()))
        .count();
    let misconfigured = results.iter().filter(|r| r.is_err()).count();
    debug!(
        routes = results.len(),
        completed, misconfigured, "Message dispatched"
    );
}

/// Completes on Ctrl+C or SIGTERM. Never completes if no handler can be installed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

// =============================================================================
// Inbound
// =============================================================================

/// Cloneable sender transports use to hand messages to the runtime.
#[derive(Debug, Clone)]
pub struct Inbound {
    tx: mpsc::Sender<Invocation>,
}

impl Inbound {
    /// Queues a message, waiting for capacity.
    pub async fn deliver(&self, session: BoxedSession, message: BoxedMessage) -> RuntimeResult<()> {
        self.tx
            .send(Invocation::new(session, message))
            .await
            .map_err(|_| RuntimeError::InboundClosed)
    }

    /// Queues a message without waiting.
    pub fn try_deliver(&self, session: BoxedSession, message: BoxedMessage) -> RuntimeResult<()> {
        self.tx
            .try_send(Invocation::new(session, message))
            .map_err(|e| match e {
                TrySendError::Full(_) => RuntimeError::QueueFull,
                TrySendError::Closed(_) => RuntimeError::InboundClosed,
            })
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// =============================================================================
// RuntimeStats
// =============================================================================

/// Counters returned when the runtime stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    /// Messages taken off the queue.
    pub received: usize,
    /// Dispatch tasks that ran to completion.
    pub completed: usize,
    /// Dispatch tasks that panicked.
    pub panicked: usize,
    /// Dispatch tasks aborted after the grace period.
    pub aborted: usize,
    /// Messages still queued at shutdown.
    pub discarded: usize,
}

impl RuntimeStats {
    fn record(&mut self, joined: Result<(), JoinError>) {
        match joined {
            Ok(()) => self.completed += 1,
            Err(e) if e.is_panic() => {
                error!(error = %e, "Dispatch task panicked");
                self.panicked += 1;
            }
            Err(_) => self.aborted += 1,
        }
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for a [`HeraldRuntime`] with custom configuration sources.
///
/// ```rust,ignore
/// let runtime = HeraldRuntime::builder()
///     .config_file("deploy/herald.toml")
///     .profile("production")
///     .build(router)?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads and validates configuration, then builds the runtime.
    pub fn build(self, router: Router) -> ConfigResult<HeraldRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(HeraldRuntime::from_config(&config, router))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use herald_core::{Author, Filter, SendResult, Session, TextMessage};
    use herald_framework::{BoxError, Route, handler_fn};
    use parking_lot::Mutex;
    use tokio::sync::Notify;

    use super::*;

    #[derive(Default)]
    struct MockSession {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Session for MockSession {
        fn self_id(&self) -> Option<String> {
            Some("herald".into())
        }

        async fn send(&self, _channel_id: &str, content: &str) -> SendResult<()> {
            self.sent.lock().push(content.to_string());
            Ok(())
        }

        fn as_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    fn message(content: &str) -> BoxedMessage {
        TextMessage::new(content)
            .sent_by(Author::user("u1"))
            .channel("c1")
            .boxed()
    }

    fn counting_router(hits: &Arc<AtomicUsize>) -> Router {
        let hits = Arc::clone(hits);
        Router::new().route(Route::new().alias("ping").handler(handler_fn(move |ctx| {
            let hits = Arc::clone(&hits);
            Box::pin(async move {
                hits.fetch_add(1, Ordering::SeqCst);
                ctx.reply("pong").await?;
                Ok::<(), BoxError>(())
            })
        })))
    }

    fn test_config() -> HeraldConfig {
        let mut config = HeraldConfig::default();
        config.runtime.shutdown_grace_ms = 50;
        config
    }

    #[tokio::test]
    async fn test_run_stops_when_inbound_dropped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let runtime = HeraldRuntime::from_config(&test_config(), counting_router(&hits));
        let session = Arc::new(MockSession::default());

        let inbound = runtime.inbound();
        for content in ["ping", "ping now", "pong"] {
            inbound
                .deliver(session.clone(), message(content))
                .await
                .unwrap();
        }
        drop(inbound);

        let stats = runtime.run_until(std::future::pending()).await.unwrap();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.panicked, 0);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(*session.sent.lock(), ["pong", "pong"]);
    }

    #[tokio::test]
    async fn test_config_filter_applies_to_router() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut config = test_config();
        config.router.filters = Filter::BOT;
        let runtime = HeraldRuntime::from_config(&config, counting_router(&hits));
        assert_eq!(runtime.router().get_filter(), Filter::BOT);

        let inbound = runtime.inbound();
        let bot_message = TextMessage::new("ping")
            .sent_by(Author::bot("other"))
            .channel("c1")
            .boxed();
        inbound
            .deliver(Arc::new(MockSession::default()), bot_message)
            .await
            .unwrap();
        drop(inbound);

        let stats = runtime.run_until(std::future::pending()).await.unwrap();
        assert_eq!(stats.completed, 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_run() {
        let hits = Arc::new(AtomicUsize::new(0));
        let runtime = HeraldRuntime::from_config(&test_config(), counting_router(&hits));
        let _inbound = runtime.inbound();

        runtime.shutdown_token().cancel();
        let stats = runtime.run_until(std::future::pending()).await.unwrap();
        assert_eq!(stats, RuntimeStats::default());
    }

    #[tokio::test]
    async fn test_inbound_closed_after_run() {
        let runtime = HeraldRuntime::from_config(&test_config(), Router::new());
        let inbound = runtime.inbound();

        runtime.shutdown_token().cancel();
        runtime.run_until(std::future::pending()).await.unwrap();

        assert!(inbound.is_closed());
        let result = inbound
            .deliver(Arc::new(MockSession::default()), message("ping"))
            .await;
        assert!(matches!(result, Err(RuntimeError::InboundClosed)));
    }

    #[tokio::test]
    async fn test_try_deliver_reports_full_queue() {
        let mut config = test_config();
        config.runtime.queue_capacity = 1;
        let runtime = HeraldRuntime::from_config(&config, Router::new());
        let inbound = runtime.inbound();
        let session: BoxedSession = Arc::new(MockSession::default());

        inbound.try_deliver(session.clone(), message("a")).unwrap();
        assert!(matches!(
            inbound.try_deliver(session, message("b")),
            Err(RuntimeError::QueueFull)
        ));
    }

    #[tokio::test]
    async fn test_stuck_dispatch_is_aborted_after_grace() {
        let started = Arc::new(Notify::new());
        let started_clone = Arc::clone(&started);
        let router = Router::new().route(Route::new().alias("hang").handler(handler_fn(
            move |_ctx| {
                let started = Arc::clone(&started_clone);
                Box::pin(async move {
                    started.notify_one();
                    std::future::pending::<()>().await;
                    Ok::<(), BoxError>(())
                })
            },
        )));

        let runtime = HeraldRuntime::from_config(&test_config(), router);
        let token = runtime.shutdown_token();
        let inbound = runtime.inbound();
        inbound
            .deliver(Arc::new(MockSession::default()), message("hang"))
            .await
            .unwrap();

        let (stats, ()) = tokio::join!(runtime.run_until(std::future::pending()), async {
            started.notified().await;
            token.cancel();
        });

        let stats = stats.unwrap();
        assert_eq!(stats.received, 1);
        assert_eq!(stats.aborted, 1);
        assert_eq!(stats.completed, 0);
    }

    #[tokio::test]
    async fn test_panicking_handler_is_counted() {
        let router = Router::new().route(Route::new().alias("boom").handler(handler_fn(
            |_ctx| {
                Box::pin(async move {
                    if true {
                        panic!("handler exploded");
                    }
                    Ok::<(), BoxError>(())
                })
            },
        )));

        let runtime = HeraldRuntime::from_config(&test_config(), router);
        let inbound = runtime.inbound();
        inbound
            .deliver(Arc::new(MockSession::default()), message("boom"))
            .await
            .unwrap();
        drop(inbound);

        let stats = runtime.run_until(std::future::pending()).await.unwrap();
        assert_eq!(stats.panicked, 1);
        assert_eq!(stats.completed, 0);
    }

    #[tokio::test]
    async fn test_max_in_flight_bounds_concurrency() {
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (a, p) = (Arc::clone(&active), Arc::clone(&peak));
        let router = Router::new().route(Route::new().alias("work").handler(handler_fn(
            move |_ctx| {
                let (active, peak) = (Arc::clone(&a), Arc::clone(&p));
                Box::pin(async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), BoxError>(())
                })
            },
        )));

        let mut config = test_config();
        config.runtime.max_in_flight = Some(1);
        config.runtime.shutdown_grace_ms = 5_000;
        let runtime = HeraldRuntime::from_config(&config, router);
        let inbound = runtime.inbound();
        for _ in 0..4 {
            inbound
                .deliver(Arc::new(MockSession::default()), message("work"))
                .await
                .unwrap();
        }
        drop(inbound);

        let stats = runtime.run_until(std::future::pending()).await.unwrap();
        assert_eq!(stats.completed, 4);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_builder_rejects_invalid_config() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("herald.toml", "[runtime]\nmax_in_flight = 0\n")?;
            let result = HeraldRuntime::builder()
                .search_path(jail.directory())
                .without_env()
                .build(Router::new());
            assert!(result.is_err());
            Ok(())
        });
    }
}
