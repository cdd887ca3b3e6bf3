//! Client-side calendar sync.
//!
//! The [`SyncController`] watches the server session, keeps track of which
//! providers are connected, and pushes each freshly fetched event list to a
//! single callback. It owns no events itself: every successful fetch is
//! delivered as-is, with no merging across providers.
//!
//! Each session observation takes a new generation number. A fetch whose
//! generation is no longer current when it completes is dropped, so a slow
//! response for an old session can never overwrite a newer one.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dayfocus_core::{CalendarEvent, Provider};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::ClientResult;

/// A boxed future for async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Receives each delivered event list.
pub type EventsCallback = Box<dyn Fn(Vec<CalendarEvent>) + Send + Sync>;

/// What the server says about the current sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct SessionInfo {
    pub provider: Option<Provider>,
}

impl SessionInfo {
    pub fn signed_in(provider: Provider) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }
}

/// The server operations the controller depends on.
pub trait SyncBackend: Send + Sync {
    /// Reads the current session.
    fn session(&self) -> BoxFuture<'_, ClientResult<SessionInfo>>;

    /// Starts the external sign-in flow, returning to `callback_url`.
    fn sign_in<'a>(
        &'a self,
        provider: Provider,
        callback_url: &'a str,
    ) -> BoxFuture<'a, ClientResult<()>>;

    /// Ends the whole session, whichever provider it belongs to.
    fn sign_out(&self) -> BoxFuture<'_, ClientResult<()>>;

    /// Fetches today's events through the proxy endpoint for `provider`.
    fn fetch_events(&self, provider: Provider) -> BoxFuture<'_, ClientResult<Vec<CalendarEvent>>>;
}

/// Result of a session observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Events were handed to the callback.
    Delivered(usize),
    /// A newer observation superseded this fetch; its result was dropped.
    Stale,
    /// No one is signed in; nothing was fetched.
    SignedOut,
    /// The fetch failed and was logged.
    Failed,
}

/// Result of a connect or disconnect request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowOutcome {
    Completed,
    /// Another connect or disconnect is still running.
    Busy,
    /// The flow failed and was logged.
    Failed,
}

#[derive(Debug, Default)]
struct SyncState {
    connected: BTreeSet<Provider>,
    loading: bool,
    generation: u64,
}

/// Coordinates sign-in state and event fetching.
pub struct SyncController {
    backend: Arc<dyn SyncBackend>,
    callback_url: String,
    on_events: EventsCallback,
    state: Mutex<SyncState>,
}

impl std::fmt::Debug for SyncController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncController")
            .field("callback_url", &self.callback_url)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl SyncController {
    pub fn new(
        backend: Arc<dyn SyncBackend>,
        callback_url: impl Into<String>,
        on_events: EventsCallback,
    ) -> Self {
        Self {
            backend,
            callback_url: callback_url.into(),
            on_events,
            state: Mutex::new(SyncState::default()),
        }
    }

    // The lock is never held across an await, so a poisoned mutex only means
    // a callback panicked elsewhere; the state itself is still consistent.
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Providers seen signed in so far, in stable order.
    pub fn connected(&self) -> Vec<Provider> {
        self.state().connected.iter().copied().collect()
    }

    pub fn is_connected(&self, provider: Provider) -> bool {
        self.state().connected.contains(&provider)
    }

    /// True while a connect or disconnect is running.
    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Reads the session from the backend and observes it.
    pub async fn refresh(&self) -> ClientResult<SyncOutcome> {
        let session = self.backend.session().await?;
        Ok(self.observe_session(session).await)
    }

    /// Reacts to a session change.
    ///
    /// A signed-in session marks its provider connected and triggers exactly
    /// one fetch from that provider's proxy endpoint.
    pub async fn observe_session(&self, session: SessionInfo) -> SyncOutcome {
        let issued = {
            let mut state = self.state();
            state.generation += 1;
            if let Some(provider) = session.provider {
                state.connected.insert(provider);
            }
            state.generation
        };

        let Some(provider) = session.provider else {
            debug!(generation = issued, "no active session");
            return SyncOutcome::SignedOut;
        };

        debug!(%provider, generation = issued, "fetching events");
        let result = self.backend.fetch_events(provider).await;

        if self.state().generation != issued {
            debug!(%provider, generation = issued, "dropping stale response");
            return SyncOutcome::Stale;
        }

        match result {
            Ok(events) => {
                let count = events.len();
                debug!(%provider, count, "delivering events");
                (self.on_events)(events);
                SyncOutcome::Delivered(count)
            }
            Err(e) => {
                warn!(%provider, "failed to fetch calendar events: {}", e);
                SyncOutcome::Failed
            }
        }
    }

    /// Starts the sign-in flow for `provider`.
    pub async fn connect(&self, provider: Provider) -> FlowOutcome {
        let Some(_loading) = self.begin_flow() else {
            return FlowOutcome::Busy;
        };

        match self.backend.sign_in(provider, &self.callback_url).await {
            Ok(()) => {
                info!(%provider, "sign-in started");
                FlowOutcome::Completed
            }
            Err(e) => {
                warn!(%provider, "failed to connect calendar: {}", e);
                FlowOutcome::Failed
            }
        }
    }

    /// Signs out and forgets `provider`.
    ///
    /// Sign-out ends the whole session, so any other provider's events stop
    /// loading too; only `provider` leaves the connected set.
    pub async fn disconnect(&self, provider: Provider) -> FlowOutcome {
        let Some(_loading) = self.begin_flow() else {
            return FlowOutcome::Busy;
        };

        match self.backend.sign_out().await {
            Ok(()) => {
                let mut state = self.state();
                state.connected.remove(&provider);
                state.generation += 1;
                info!(%provider, "disconnected");
                FlowOutcome::Completed
            }
            Err(e) => {
                warn!(%provider, "failed to disconnect calendar: {}", e);
                FlowOutcome::Failed
            }
        }
    }

    fn begin_flow(&self) -> Option<LoadingGuard<'_>> {
        let mut state = self.state();
        if state.loading {
            return None;
        }
        state.loading = true;
        Some(LoadingGuard { controller: self })
    }
}

/// Clears `loading` when the flow ends, including on cancellation.
struct LoadingGuard<'a> {
    controller: &'a SyncController,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.controller.state().loading = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    type Delivered = Arc<Mutex<Vec<Vec<CalendarEvent>>>>;

    #[derive(Default)]
    struct FakeBackend {
        fetches: AtomicUsize,
        sign_ins: AtomicUsize,
        sign_outs: AtomicUsize,
        fail_auth: bool,
        fail_fetch: bool,
        // Pending fetch results, handed out in call order.
        gates: Mutex<VecDeque<oneshot::Receiver<Vec<CalendarEvent>>>>,
        sign_in_gate: Mutex<Option<oneshot::Receiver<()>>>,
    }

    impl SyncBackend for FakeBackend {
        fn session(&self) -> BoxFuture<'_, ClientResult<SessionInfo>> {
            Box::pin(async { Ok(SessionInfo::signed_in(Provider::Google)) })
        }

        fn sign_in<'a>(
            &'a self,
            _provider: Provider,
            _callback_url: &'a str,
        ) -> BoxFuture<'a, ClientResult<()>> {
            self.sign_ins.fetch_add(1, Ordering::SeqCst);
            let gate = self.sign_in_gate.lock().unwrap().take();
            Box::pin(async move {
                if let Some(gate) = gate {
                    let _ = gate.await;
                }
                if self.fail_auth {
                    return Err(ClientError::Connect("browser unavailable".into()));
                }
                Ok(())
            })
        }

        fn sign_out(&self) -> BoxFuture<'_, ClientResult<()>> {
            self.sign_outs.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if self.fail_auth {
                    return Err(ClientError::Connection("refused".into()));
                }
                Ok(())
            })
        }

        fn fetch_events(
            &self,
            provider: Provider,
        ) -> BoxFuture<'_, ClientResult<Vec<CalendarEvent>>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().unwrap().pop_front();
            Box::pin(async move {
                if self.fail_fetch {
                    return Err(ClientError::Status {
                        status: 500,
                        message: "Failed to fetch calendar events".into(),
                    });
                }
                match gate {
                    Some(gate) => gate
                        .await
                        .map_err(|_| ClientError::Connection("dropped".into())),
                    None => Ok(vec![event(provider.as_str())]),
                }
            })
        }
    }

    fn event(id: &str) -> CalendarEvent {
        CalendarEvent::new(id, "2024-03-15T09:00:00Z").with_title("Standup")
    }

    fn controller(backend: Arc<FakeBackend>) -> (SyncController, Delivered) {
        let delivered: Delivered = Arc::default();
        let sink = delivered.clone();
        let controller = SyncController::new(
            backend,
            "/",
            Box::new(move |events| sink.lock().unwrap().push(events)),
        );
        (controller, delivered)
    }

    #[tokio::test]
    async fn signed_in_session_connects_and_fetches_once() {
        let backend = Arc::new(FakeBackend::default());
        let (controller, delivered) = controller(backend.clone());

        let outcome = controller
            .observe_session(SessionInfo::signed_in(Provider::Google))
            .await;

        assert_eq!(outcome, SyncOutcome::Delivered(1));
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(controller.connected(), vec![Provider::Google]);
        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0][0].id, "google");
    }

    #[tokio::test]
    async fn repeated_sessions_do_not_duplicate_providers() {
        let backend = Arc::new(FakeBackend::default());
        let (controller, delivered) = controller(backend.clone());

        controller
            .observe_session(SessionInfo::signed_in(Provider::Google))
            .await;
        controller
            .observe_session(SessionInfo::signed_in(Provider::Google))
            .await;

        assert_eq!(controller.connected(), vec![Provider::Google]);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(delivered.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn signed_out_session_fetches_nothing() {
        let backend = Arc::new(FakeBackend::default());
        let (controller, delivered) = controller(backend.clone());

        let outcome = controller.observe_session(SessionInfo::signed_out()).await;

        assert_eq!(outcome, SyncOutcome::SignedOut);
        assert_eq!(backend.fetches.load(Ordering::SeqCst), 0);
        assert!(controller.connected().is_empty());
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_is_not_delivered() {
        let backend = Arc::new(FakeBackend {
            fail_fetch: true,
            ..Default::default()
        });
        let (controller, delivered) = controller(backend);

        let outcome = controller
            .observe_session(SessionInfo::signed_in(Provider::Microsoft))
            .await;

        assert_eq!(outcome, SyncOutcome::Failed);
        assert!(controller.is_connected(Provider::Microsoft));
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn late_response_for_old_session_is_dropped() {
        let (old_tx, old_rx) = oneshot::channel();
        let (new_tx, new_rx) = oneshot::channel();
        let backend = Arc::new(FakeBackend::default());
        backend.gates.lock().unwrap().extend([old_rx, new_rx]);
        let (controller, delivered) = controller(backend);

        let (old, new, ()) = tokio::join!(
            controller.observe_session(SessionInfo::signed_in(Provider::Google)),
            controller.observe_session(SessionInfo::signed_in(Provider::Microsoft)),
            async {
                new_tx.send(vec![event("new")]).unwrap();
                old_tx.send(vec![event("old")]).unwrap();
            }
        );

        assert_eq!(old, SyncOutcome::Stale);
        assert_eq!(new, SyncOutcome::Delivered(1));
        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0][0].id, "new");
    }

    #[tokio::test]
    async fn refresh_reads_session_from_backend() {
        let backend = Arc::new(FakeBackend::default());
        let (controller, _) = controller(backend.clone());

        let outcome = controller.refresh().await.unwrap();

        assert_eq!(outcome, SyncOutcome::Delivered(1));
        assert!(controller.is_connected(Provider::Google));
    }

    #[tokio::test]
    async fn connect_starts_sign_in() {
        let backend = Arc::new(FakeBackend::default());
        let (controller, _) = controller(backend.clone());

        assert_eq!(controller.connect(Provider::Google).await, FlowOutcome::Completed);
        assert_eq!(backend.sign_ins.load(Ordering::SeqCst), 1);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn connect_is_busy_while_loading() {
        let (gate_tx, gate_rx) = oneshot::channel();
        let backend = Arc::new(FakeBackend::default());
        *backend.sign_in_gate.lock().unwrap() = Some(gate_rx);
        let (controller, _) = controller(backend.clone());

        let (first, ()) = tokio::join!(controller.connect(Provider::Google), async {
            assert!(controller.is_loading());
            assert_eq!(
                controller.connect(Provider::Microsoft).await,
                FlowOutcome::Busy
            );
            gate_tx.send(()).unwrap();
        });

        assert_eq!(first, FlowOutcome::Completed);
        assert_eq!(backend.sign_ins.load(Ordering::SeqCst), 1);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn connect_failure_is_swallowed() {
        let backend = Arc::new(FakeBackend {
            fail_auth: true,
            ..Default::default()
        });
        let (controller, _) = controller(backend);

        assert_eq!(controller.connect(Provider::Google).await, FlowOutcome::Failed);
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn disconnect_signs_out_globally() {
        let backend = Arc::new(FakeBackend::default());
        let (controller, _) = controller(backend.clone());
        controller
            .observe_session(SessionInfo::signed_in(Provider::Google))
            .await;
        controller
            .observe_session(SessionInfo::signed_in(Provider::Microsoft))
            .await;
        let before = controller.generation();

        let outcome = controller.disconnect(Provider::Google).await;

        assert_eq!(outcome, FlowOutcome::Completed);
        assert_eq!(backend.sign_outs.load(Ordering::SeqCst), 1);
        assert_eq!(controller.connected(), vec![Provider::Microsoft]);
        assert!(controller.generation() > before);
    }

    #[tokio::test]
    async fn disconnect_discards_in_flight_fetch() {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::new(FakeBackend::default());
        backend.gates.lock().unwrap().push_back(rx);
        let (controller, delivered) = controller(backend);

        let (fetch, disconnect) = tokio::join!(
            controller.observe_session(SessionInfo::signed_in(Provider::Google)),
            async {
                let outcome = controller.disconnect(Provider::Google).await;
                tx.send(vec![event("late")]).unwrap();
                outcome
            }
        );

        assert_eq!(disconnect, FlowOutcome::Completed);
        assert_eq!(fetch, SyncOutcome::Stale);
        assert!(delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_disconnect_keeps_provider() {
        let backend = Arc::new(FakeBackend {
            fail_auth: true,
            ..Default::default()
        });
        let (controller, _) = controller(backend);
        controller
            .observe_session(SessionInfo::signed_in(Provider::Google))
            .await;

        assert_eq!(controller.disconnect(Provider::Google).await, FlowOutcome::Failed);
        assert!(controller.is_connected(Provider::Google));
        assert!(!controller.is_loading());
    }

    #[test]
    fn session_info_parses_server_body() {
        let info: SessionInfo = serde_json::from_str(r#"{"provider":"microsoft"}"#).unwrap();
        assert_eq!(info, SessionInfo::signed_in(Provider::Microsoft));

        let info: SessionInfo = serde_json::from_str(r#"{"provider":null}"#).unwrap();
        assert_eq!(info, SessionInfo::signed_out());
    }
}
