use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};
use tracing::instrument;

use crate::flags::flag_definitions::FlagSnapshot;
use crate::flags::flag_matching::FlagMatcher;
use crate::flags::flag_source::FlagSource;
use crate::flags::{EvaluationContext, FlagValue};
use crate::metrics_consts::{FLAG_CLIENT_INIT_COUNTER, FLAG_EVALUATION_COUNTER};

type SharedSource = Arc<dyn FlagSource + Send + Sync>;

/// What the background client has published so far.
#[derive(Debug, Clone)]
enum ClientState {
    Pending,
    Ready(Arc<FlagSnapshot>),
    Failed,
}

impl ClientState {
    fn is_settled(&self) -> bool {
        !matches!(self, ClientState::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagClientStatus {
    /// No sdk key configured, every flag serves its default.
    Disabled,
    /// No flag has been requested yet, so the client was never started.
    Idle,
    /// The client is fetching definitions and the deadline has not passed.
    Initializing,
    Ready,
    /// The deadline passed without definitions, flags serve defaults.
    Unavailable,
}

/// Resolves flag variations for visitors.
///
/// The client behind it is started lazily on the first call, at most once.
/// Callers arriving before the initialization deadline wait for it; once the
/// deadline has passed, or once the first fetch has failed, they get their
/// default immediately.
pub struct FlagResolver {
    source: Option<SharedSource>,
    init_timeout: Duration,
    poll_interval: Option<Duration>,
    state: Arc<watch::Sender<ClientState>>,
    init_deadline: OnceLock<Instant>,
}

impl FlagResolver {
    pub fn new(
        source: Option<SharedSource>,
        init_timeout: Duration,
        poll_interval: Option<Duration>,
    ) -> FlagResolver {
        let (state, _) = watch::channel(ClientState::Pending);
        FlagResolver {
            source,
            init_timeout,
            poll_interval,
            state: Arc::new(state),
            init_deadline: OnceLock::new(),
        }
    }

    /// A resolver that always serves defaults.
    pub fn disabled() -> FlagResolver {
        FlagResolver::new(None, Duration::ZERO, None)
    }

    pub fn status(&self) -> FlagClientStatus {
        if self.source.is_none() {
            return FlagClientStatus::Disabled;
        }
        match *self.state.borrow() {
            ClientState::Ready(_) => return FlagClientStatus::Ready,
            ClientState::Failed => return FlagClientStatus::Unavailable,
            ClientState::Pending => {}
        }
        match self.init_deadline.get() {
            None => FlagClientStatus::Idle,
            Some(deadline) if Instant::now() < *deadline => FlagClientStatus::Initializing,
            Some(_) => FlagClientStatus::Unavailable,
        }
    }

    #[instrument(skip(self, context, default))]
    pub async fn resolve(
        &self,
        flag_key: &str,
        context: &EvaluationContext,
        default: FlagValue,
    ) -> FlagValue {
        let Some(snapshot) = self.ready_snapshot().await else {
            metrics::counter!(FLAG_EVALUATION_COUNTER, "outcome" => "not_ready").increment(1);
            return default;
        };

        let matched = FlagMatcher::new(&snapshot, context).get_match(flag_key);
        let Some(value) = matched.and_then(|m| m.value) else {
            metrics::counter!(FLAG_EVALUATION_COUNTER, "outcome" => "default").increment(1);
            return default;
        };

        match FlagValue::from_json(&value) {
            Some(variation) => {
                metrics::counter!(FLAG_EVALUATION_COUNTER, "outcome" => "variation").increment(1);
                variation
            }
            None => {
                tracing::warn!(
                    flag = flag_key,
                    "flag served a variation that is neither a string nor a boolean"
                );
                metrics::counter!(FLAG_EVALUATION_COUNTER, "outcome" => "default").increment(1);
                default
            }
        }
    }

    /// Starts the client if needed, then waits for it no later than the
    /// initialization deadline.
    async fn ready_snapshot(&self) -> Option<Arc<FlagSnapshot>> {
        let source = self.source.as_ref()?;
        let deadline = *self
            .init_deadline
            .get_or_init(|| self.start_client(source.clone()));

        let mut receiver = self.state.subscribe();
        let waited = timeout_at(deadline, receiver.wait_for(ClientState::is_settled)).await;
        let snapshot = match waited {
            Ok(Ok(state)) => match &*state {
                ClientState::Ready(snapshot) => Some(snapshot.clone()),
                _ => None,
            },
            Ok(Err(_)) => None,
            Err(_) => {
                tracing::debug!("flag client not ready, serving default");
                None
            }
        };
        snapshot
    }

    fn start_client(&self, source: SharedSource) -> Instant {
        tracing::info!(
            timeout_secs = self.init_timeout.as_secs_f64(),
            "initializing flag client"
        );
        tokio::spawn(run_client(
            source,
            self.state.clone(),
            self.poll_interval,
        ));
        Instant::now() + self.init_timeout
    }
}

async fn run_client(
    source: SharedSource,
    state: Arc<watch::Sender<ClientState>>,
    poll_interval: Option<Duration>,
) {
    match source.fetch_snapshot().await {
        Ok(initial) => {
            tracing::info!(flags = initial.len(), "flag client initialized");
            metrics::counter!(FLAG_CLIENT_INIT_COUNTER, "outcome" => "success").increment(1);
            state.send_replace(ClientState::Ready(Arc::new(initial)));
        }
        Err(e) => {
            // A failed initialization is final, flags serve defaults from here on
            tracing::error!("flag client failed to initialize: {}", e);
            metrics::counter!(FLAG_CLIENT_INIT_COUNTER, "outcome" => "failure").increment(1);
            state.send_replace(ClientState::Failed);
            return;
        }
    }

    let Some(interval) = poll_interval else {
        return;
    };
    loop {
        tokio::time::sleep(interval).await;
        match source.fetch_snapshot().await {
            Ok(updated) => {
                state.send_replace(ClientState::Ready(Arc::new(updated)));
            }
            Err(e) => {
                tracing::warn!("failed to refresh flags, keeping previous definitions: {}", e);
            }
        }
    }
}
