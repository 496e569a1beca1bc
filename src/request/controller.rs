//! Request controller — one outstanding call, observable lifecycle.
//!
//! `fetch_data` never hands back the result. It flips the state to `Loading`
//! before returning and runs the call on a spawned task; the outcome is
//! published once through a `watch` channel. Callers react to settlement via
//! a [`SettlementWatcher`], so a read right after dispatch can't be mistaken
//! for the new result.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::TransportError;

use super::transport::Transport;
use super::types::{ApiRequest, ApiResponse};

/// Failure message used when the transport call panics or is cancelled.
pub const UNEXPECTED_FAILURE_MESSAGE: &str = "Request failed unexpectedly";

/// Lifecycle of the controller's current request.
#[derive(Debug)]
pub enum RequestState<T> {
    Idle,
    Loading,
    Success(Arc<T>),
    Failure(String),
}

impl<T> RequestState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        match self {
            Self::Success(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure(message) => Some(message),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
        }
    }
}

impl<T> Clone for RequestState<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Idle => Self::Idle,
            Self::Loading => Self::Loading,
            Self::Success(data) => Self::Success(Arc::clone(data)),
            Self::Failure(message) => Self::Failure(message.clone()),
        }
    }
}

/// What the UI layer reads: state plus the settlement counter that identifies
/// each outcome.
#[derive(Debug)]
pub struct RequestSnapshot<T> {
    pub state: RequestState<T>,
    /// Number of settlements published so far.
    pub settlements: u64,
    pub settled_at: Option<DateTime<Utc>>,
    /// Set once the owning screen is gone.
    pub abandoned: bool,
}

impl<T> RequestSnapshot<T> {
    fn idle() -> Self {
        Self {
            state: RequestState::Idle,
            settlements: 0,
            settled_at: None,
            abandoned: false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn data(&self) -> Option<&Arc<T>> {
        self.state.data()
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error()
    }
}

impl<T> Clone for RequestSnapshot<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            settlements: self.settlements,
            settled_at: self.settled_at,
            abandoned: self.abandoned,
        }
    }
}

/// Why a `fetch_data` call was not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A request from this controller is still loading.
    InFlight,
    /// The controller was abandoned.
    Abandoned,
}

/// Result of calling `fetch_data`. Never carries the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Started { request_id: Uuid, generation: u64 },
    Rejected(RejectReason),
}

impl Dispatch {
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started { .. })
    }
}

/// A settled outcome, as delivered to watchers.
#[derive(Debug)]
pub enum Settlement<T> {
    Success(Arc<T>),
    Failure(String),
}

struct Inner<T> {
    tx: watch::Sender<RequestSnapshot<T>>,
    generation: AtomicU64,
    abandoned: AtomicBool,
}

impl<T> Inner<T> {
    /// Publish an outcome if `generation` is still the current call.
    fn settle(&self, generation: u64, request_id: Uuid, state: RequestState<T>) {
        let outcome = state.name();
        let published = self.tx.send_if_modified(|snap| {
            if self.abandoned.load(Ordering::SeqCst)
                || self.generation.load(Ordering::SeqCst) != generation
            {
                return false;
            }
            snap.state = state;
            snap.settlements += 1;
            snap.settled_at = Some(Utc::now());
            true
        });

        if published {
            info!(request_id = %request_id, outcome, "Request settled");
        } else {
            debug!(request_id = %request_id, generation, "Discarding stale settlement");
        }
    }
}

/// Owns one request lifecycle for one screen.
pub struct RequestController<T> {
    transport: Arc<dyn Transport>,
    inner: Arc<Inner<T>>,
}

impl<T> RequestController<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (tx, _rx) = watch::channel(RequestSnapshot::idle());
        Self {
            transport,
            inner: Arc::new(Inner {
                tx,
                generation: AtomicU64::new(0),
                abandoned: AtomicBool::new(false),
            }),
        }
    }

    /// Start a request. The state is `Loading` by the time this returns;
    /// overlapping calls are rejected while one is in flight.
    ///
    /// Must be called within a tokio runtime.
    pub fn fetch_data(&self, request: ApiRequest) -> Dispatch {
        let mut started = None;
        self.inner.tx.send_if_modified(|snap| {
            if self.inner.abandoned.load(Ordering::SeqCst) {
                started = Some(Err(RejectReason::Abandoned));
                return false;
            }
            if snap.state.is_loading() {
                started = Some(Err(RejectReason::InFlight));
                return false;
            }
            let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
            snap.state = RequestState::Loading;
            started = Some(Ok(generation));
            true
        });

        let generation = match started {
            Some(Ok(generation)) => generation,
            Some(Err(reason)) => {
                warn!(uri = %request.uri, ?reason, "Request rejected");
                return Dispatch::Rejected(reason);
            }
            None => return Dispatch::Rejected(RejectReason::Abandoned),
        };

        let request_id = Uuid::new_v4();
        info!(
            request_id = %request_id,
            method = %request.method,
            uri = %request.uri,
            "Request dispatched"
        );

        let transport = Arc::clone(&self.transport);
        let inner = Arc::clone(&self.inner);
        let uri = request.uri.clone();
        // The call runs on its own task so a panicking transport still settles.
        let call = tokio::spawn(async move { transport.send(request).await });
        tokio::spawn(async move {
            let state = match call.await {
                Ok(Ok(response)) => decode::<T>(&uri, response),
                Ok(Err(e)) => {
                    warn!(request_id = %request_id, uri = %uri, error = %e, "Request failed");
                    RequestState::Failure(e.to_string())
                }
                Err(e) => {
                    error!(request_id = %request_id, uri = %uri, error = %e, "Request task died");
                    RequestState::Failure(UNEXPECTED_FAILURE_MESSAGE.into())
                }
            };
            inner.settle(generation, request_id, state);
        });

        Dispatch::Started {
            request_id,
            generation,
        }
    }
}

impl<T> RequestController<T> {
    pub fn snapshot(&self) -> RequestSnapshot<T> {
        self.inner.tx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.tx.borrow().is_loading()
    }

    /// Payload of the current successful settlement, if any.
    pub fn data(&self) -> Option<Arc<T>> {
        self.inner.tx.borrow().data().cloned()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.tx.borrow().error().map(str::to_string)
    }

    /// Raw state channel, for projecting into a view.
    pub fn subscribe(&self) -> watch::Receiver<RequestSnapshot<T>> {
        self.inner.tx.subscribe()
    }

    /// Watch for settlements that happen after this call.
    pub fn watch(&self) -> SettlementWatcher<T> {
        let rx = self.inner.tx.subscribe();
        let seen = rx.borrow().settlements;
        SettlementWatcher { rx, seen }
    }

    /// Drop interest in any in-flight request. Its settlement is ignored,
    /// further `fetch_data` calls are rejected, and watchers finish.
    pub fn abandon(&self) {
        let was_abandoned = self.inner.abandoned.load(Ordering::SeqCst);
        self.inner.tx.send_if_modified(|snap| {
            self.inner.abandoned.store(true, Ordering::SeqCst);
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            let changed = !snap.abandoned;
            snap.abandoned = true;
            changed
        });
        if !was_abandoned {
            debug!("Request controller abandoned");
        }
    }

    pub fn is_abandoned(&self) -> bool {
        self.inner.abandoned.load(Ordering::SeqCst)
    }
}

impl<T> Drop for RequestController<T> {
    fn drop(&mut self) {
        self.abandon();
    }
}

fn decode<T: DeserializeOwned>(uri: &str, response: ApiResponse) -> RequestState<T> {
    if let Some(message) = response.error {
        return RequestState::Failure(message);
    }
    let Some(data) = response.data else {
        return RequestState::Failure(
            TransportError::InvalidResponse {
                uri: uri.to_string(),
                reason: "empty body".into(),
            }
            .to_string(),
        );
    };
    match serde_json::from_value::<T>(data) {
        Ok(payload) => RequestState::Success(Arc::new(payload)),
        Err(e) => RequestState::Failure(
            TransportError::InvalidResponse {
                uri: uri.to_string(),
                reason: e.to_string(),
            }
            .to_string(),
        ),
    }
}

/// Change-triggered observer of a controller's settlements.
///
/// Each settlement is delivered at most once, keyed on the controller's
/// settlement counter. Settlements from before the watcher was created are
/// never delivered.
pub struct SettlementWatcher<T> {
    rx: watch::Receiver<RequestSnapshot<T>>,
    seen: u64,
}

impl<T> SettlementWatcher<T> {
    /// Wait for the next settlement. `None` once the controller is abandoned.
    pub async fn next_settlement(&mut self) -> Option<Settlement<T>> {
        loop {
            if let Some(next) = self.take_settlement() {
                return next;
            }
            if self.rx.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Non-blocking check for an unseen settlement.
    pub fn poll_settlement(&mut self) -> Option<Settlement<T>> {
        self.take_settlement().flatten()
    }

    /// `Some(None)` means abandoned; `None` means nothing new.
    fn take_settlement(&mut self) -> Option<Option<Settlement<T>>> {
        let snap = self.rx.borrow_and_update();
        if snap.abandoned {
            return Some(None);
        }
        if snap.settlements <= self.seen {
            return None;
        }
        self.seen = snap.settlements;
        match &snap.state {
            RequestState::Success(data) => Some(Some(Settlement::Success(Arc::clone(data)))),
            RequestState::Failure(message) => Some(Some(Settlement::Failure(message.clone()))),
            // Superseded by a newer call before we looked.
            RequestState::Idle | RequestState::Loading => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use serde::Deserialize;
    use tokio::sync::{Mutex, oneshot};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        value: u32,
    }

    /// Transport whose responses are released by the test.
    struct GatedTransport {
        gates: Mutex<Vec<oneshot::Receiver<Result<ApiResponse, TransportError>>>>,
    }

    impl GatedTransport {
        fn new() -> (Arc<Self>, Vec<oneshot::Sender<Result<ApiResponse, TransportError>>>) {
            let mut senders = Vec::new();
            let mut receivers = Vec::new();
            for _ in 0..4 {
                let (tx, rx) = oneshot::channel();
                senders.push(tx);
                receivers.push(rx);
            }
            receivers.reverse();
            (
                Arc::new(Self {
                    gates: Mutex::new(receivers),
                }),
                senders,
            )
        }
    }

    #[async_trait]
    impl Transport for GatedTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            let gate = self.gates.lock().await.pop().expect("no gate left");
            gate.await.unwrap_or_else(|_| Ok(ApiResponse::failed("gate dropped")))
        }
    }

    struct PanickingTransport;

    #[async_trait]
    impl Transport for PanickingTransport {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, TransportError> {
            panic!("transport bug");
        }
    }

    fn request() -> ApiRequest {
        ApiRequest::post("/echo", serde_json::json!({}))
    }

    #[tokio::test]
    async fn starts_idle() {
        let (transport, _gates) = GatedTransport::new();
        let controller: RequestController<Echo> = RequestController::new(transport);
        let snap = controller.snapshot();
        assert!(matches!(snap.state, RequestState::Idle));
        assert!(!controller.is_loading());
        assert!(controller.data().is_none());
        assert!(controller.error().is_none());
        assert_eq!(snap.settlements, 0);
    }

    #[tokio::test]
    async fn loading_until_settled() {
        let (transport, mut gates) = GatedTransport::new();
        let controller: RequestController<Echo> = RequestController::new(transport);
        let mut watcher = controller.watch();

        assert!(controller.fetch_data(request()).is_started());
        assert!(controller.is_loading());
        assert!(controller.data().is_none());

        tokio::task::yield_now().await;
        assert!(controller.is_loading());

        gates
            .remove(0)
            .send(Ok(ApiResponse::ok(serde_json::json!({ "value": 7 }))))
            .unwrap();

        match watcher.next_settlement().await {
            Some(Settlement::Success(echo)) => assert_eq!(echo.value, 7),
            other => panic!("unexpected settlement: {other:?}"),
        }
        assert!(!controller.is_loading());
        assert_eq!(controller.data().unwrap().value, 7);
        assert_eq!(controller.snapshot().settlements, 1);
    }

    #[tokio::test]
    async fn overlapping_fetch_is_rejected() {
        let (transport, mut gates) = GatedTransport::new();
        let controller: RequestController<Echo> = RequestController::new(transport);
        let mut watcher = controller.watch();

        assert!(controller.fetch_data(request()).is_started());
        assert_eq!(
            controller.fetch_data(request()),
            Dispatch::Rejected(RejectReason::InFlight)
        );

        gates.remove(0).send(Ok(ApiResponse::failed("nope"))).unwrap();
        match watcher.next_settlement().await {
            Some(Settlement::Failure(message)) => assert_eq!(message, "nope"),
            other => panic!("unexpected settlement: {other:?}"),
        }
        assert_eq!(controller.error().as_deref(), Some("nope"));

        // Settled, so a new call is accepted again.
        assert!(controller.fetch_data(request()).is_started());
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_failure() {
        let (transport, mut gates) = GatedTransport::new();
        let controller: RequestController<Echo> = RequestController::new(transport);
        let mut watcher = controller.watch();

        controller.fetch_data(request());
        gates
            .remove(0)
            .send(Ok(ApiResponse::ok(serde_json::json!({ "value": "seven" }))))
            .unwrap();

        match watcher.next_settlement().await {
            Some(Settlement::Failure(message)) => {
                assert!(message.starts_with("Invalid response from /echo"), "{message}")
            }
            other => panic!("unexpected settlement: {other:?}"),
        }
    }

    #[tokio::test]
    async fn transport_error_message_is_surfaced() {
        let (transport, mut gates) = GatedTransport::new();
        let controller: RequestController<Echo> = RequestController::new(transport);
        let mut watcher = controller.watch();

        controller.fetch_data(request());
        gates
            .remove(0)
            .send(Err(TransportError::Status {
                status: 422,
                message: "The email has already been taken.".into(),
            }))
            .unwrap();

        assert!(matches!(
            watcher.next_settlement().await,
            Some(Settlement::Failure(ref m)) if m == "The email has already been taken."
        ));
        assert!(!controller.is_loading());
    }

    #[tokio::test]
    async fn abandoned_settlement_is_discarded() {
        let (transport, mut gates) = GatedTransport::new();
        let controller: RequestController<Echo> = RequestController::new(transport);
        let mut watcher = controller.watch();
        let mut raw = controller.subscribe();

        controller.fetch_data(request());
        controller.abandon();
        assert!(watcher.next_settlement().await.is_none());

        let gate = gates.remove(0);
        let _ = gate.send(Ok(ApiResponse::ok(serde_json::json!({ "value": 1 }))));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        let snap = raw.borrow_and_update().clone();
        assert_eq!(snap.settlements, 0);
        assert!(snap.abandoned);
        assert!(controller.data().is_none());
        assert_eq!(
            controller.fetch_data(request()),
            Dispatch::Rejected(RejectReason::Abandoned)
        );
    }

    #[tokio::test]
    async fn watcher_ignores_earlier_settlements() {
        let (transport, mut gates) = GatedTransport::new();
        let controller: RequestController<Echo> = RequestController::new(transport);
        let mut first = controller.watch();

        controller.fetch_data(request());
        gates
            .remove(0)
            .send(Ok(ApiResponse::ok(serde_json::json!({ "value": 1 }))))
            .unwrap();
        assert!(first.next_settlement().await.is_some());

        let mut late = controller.watch();
        assert!(late.poll_settlement().is_none());
        assert!(first.poll_settlement().is_none(), "delivered at most once");
    }

    #[tokio::test]
    async fn panicking_transport_still_settles() {
        let controller: RequestController<Echo> =
            RequestController::new(Arc::new(PanickingTransport));
        let mut watcher = controller.watch();

        assert!(controller.fetch_data(request()).is_started());
        let settled = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            watcher.next_settlement(),
        )
        .await
        .expect("settlement after panic");
        assert!(matches!(
            settled,
            Some(Settlement::Failure(ref m)) if m == UNEXPECTED_FAILURE_MESSAGE
        ));
        assert!(!controller.is_loading());
        assert_eq!(controller.snapshot().settlements, 1);

        // Not stuck in flight.
        assert!(controller.fetch_data(request()).is_started());
    }
}
