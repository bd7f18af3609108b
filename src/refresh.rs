//! Single-flight credential refresh with request replay.
//!
//! When a call fails because the server rejected its credential, the [`RefreshCoordinator`]
//! decides whether that call starts a refresh episode, joins the one already in flight, or
//! surfaces the failure untouched. Exactly one refresh call is issued per episode; every call
//! that failed during it is parked in a FIFO queue and released once the refresh settles.
//!
//! The check of the episode state, the transition to `Refreshing`, and the enqueue of a waiter
//! all happen inside one critical section with no `.await` in between, so the coordinator stays
//! single-flight on multi-threaded runtimes. Draining the queue and returning to `Idle` form a
//! second critical section; a new episode can only begin after every waiter of the previous one
//! has been settled.

mod metrics;

pub use metrics::RefreshMetrics;

// crates.io
use futures::channel::oneshot;
// self
use crate::{
	_prelude::*,
	auth::Credential,
	decorate::{AUTHORIZATION, RequestDecorator},
	descriptor::ApiDescriptor,
	error::RefreshError,
	http::{
		ApiRequest, ApiResponse, ApiTransport, HeaderBag, Method, OutgoingRequest, RawFailure,
		TransportFailure,
	},
	normalize::ErrorNormalizer,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, RefreshEvent},
	session::{LogSessionHandler, SessionExpiredHandler},
	store::CredentialStore,
};

type EpisodeOutcome = Result<(), RawFailure>;

/// Episode state of a [`RefreshCoordinator`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RefreshState {
	/// No refresh call is in flight.
	#[default]
	Idle,
	/// A refresh call is in flight; failing calls are queued behind it.
	Refreshing,
}

/// A call parked behind the in-flight refresh.
///
/// Settled exactly once: resolved when the refresh succeeds, rejected with the refresh failure
/// otherwise. A waiter whose caller went away is dropped silently.
#[derive(Debug)]
pub struct PendingWaiter {
	settle: oneshot::Sender<EpisodeOutcome>,
}
impl PendingWaiter {
	fn new() -> (Self, oneshot::Receiver<EpisodeOutcome>) {
		let (settle, receiver) = oneshot::channel();

		(Self { settle }, receiver)
	}

	fn resolve(self) {
		let _ = self.settle.send(Ok(()));
	}

	fn reject(self, failure: RawFailure) {
		let _ = self.settle.send(Err(failure));
	}
}

#[derive(Debug, Default)]
struct Episode {
	state: RefreshState,
	queue: Vec<PendingWaiter>,
}
impl Episode {
	// Settles every waiter in FIFO order, then returns to `Idle`.
	fn drain(&mut self, outcome: &EpisodeOutcome) -> usize {
		let drained = self.queue.len();

		for waiter in self.queue.drain(..) {
			match outcome {
				Ok(()) => waiter.resolve(),
				Err(failure) => waiter.reject(failure.clone()),
			}
		}

		self.state = RefreshState::Idle;

		drained
	}
}

enum Role {
	Leader,
	Waiter(oneshot::Receiver<EpisodeOutcome>),
}

// Settles the episode if the future driving the refresh is dropped before it completes, so
// waiters never hang and the coordinator never stays stuck in `Refreshing`.
struct EpisodeGuard<'a> {
	episode: &'a Mutex<Episode>,
	settled: bool,
}
impl EpisodeGuard<'_> {
	fn settle(mut self, outcome: &EpisodeOutcome) -> usize {
		self.settled = true;

		self.episode.lock().drain(outcome)
	}
}
impl Drop for EpisodeGuard<'_> {
	fn drop(&mut self) {
		if self.settled {
			return;
		}

		let drained = self.episode.lock().drain(&Err(RawFailure::other(RefreshError::Abandoned)));

		obs::log_refresh_event(RefreshEvent::Abandoned { drained });
	}
}

/// Coordinates refresh episodes for one client instance.
///
/// The coordinator owns its episode state and waiter queue; nothing about it is process-global,
/// so independent clients never share episodes.
pub struct RefreshCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	decorator: RequestDecorator,
	descriptor: Arc<ApiDescriptor>,
	normalizer: ErrorNormalizer,
	default_headers: Arc<RwLock<HeaderBag>>,
	session: RwLock<Arc<dyn SessionExpiredHandler>>,
	episode: Mutex<Episode>,
	metrics: RefreshMetrics,
}
impl<T> RefreshCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates an idle coordinator sharing the client's transport, store, and decorator.
	pub fn new(
		transport: Arc<T>,
		store: Arc<dyn CredentialStore>,
		decorator: RequestDecorator,
		descriptor: Arc<ApiDescriptor>,
	) -> Self {
		let normalizer =
			ErrorNormalizer::new(descriptor.messages.clone(), descriptor.login_paths.clone());

		Self {
			transport,
			store,
			decorator,
			descriptor,
			normalizer,
			default_headers: Default::default(),
			session: RwLock::new(Arc::new(LogSessionHandler)),
			episode: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Replaces the handler notified when an episode fails.
	pub fn with_session_handler(self, handler: Arc<dyn SessionExpiredHandler>) -> Self {
		self.set_session_handler(handler);

		self
	}

	/// Replaces the handler notified when an episode fails, in place.
	pub fn set_session_handler(&self, handler: Arc<dyn SessionExpiredHandler>) {
		*self.session.write() = handler;
	}

	/// Current episode state.
	pub fn state(&self) -> RefreshState {
		self.episode.lock().state
	}

	/// Number of calls currently parked behind the in-flight refresh.
	pub fn pending_waiters(&self) -> usize {
		self.episode.lock().queue.len()
	}

	/// Episode counters.
	pub fn metrics(&self) -> &RefreshMetrics {
		&self.metrics
	}

	/// Default headers applied to every call; the coordinator keeps `authorization` in sync
	/// with the credential store.
	pub fn default_headers(&self) -> &Arc<RwLock<HeaderBag>> {
		&self.default_headers
	}

	/// Normalizer used for session-expired notifications.
	pub fn normalizer(&self) -> &ErrorNormalizer {
		&self.normalizer
	}

	/// Returns `true` if the failed call qualifies for refresh recovery.
	pub fn should_engage(&self, request: &ApiRequest, failure: &RawFailure) -> bool {
		failure.is_credential_expired()
			&& !request.already_retried
			&& !request.skip_auth_refresh
			&& !request.is_canceled()
			&& !self.descriptor.is_auth_endpoint(&request.path)
	}

	/// Recovers a failed call.
	///
	/// Calls that do not qualify get `failure` back unchanged. Otherwise the call either drives a
	/// new episode or waits for the in-flight one, and is replayed through `replay` once the
	/// credential has been refreshed. The request handed to `replay` is marked as already retried,
	/// so a second 401 is surfaced instead of starting another episode. When the refresh fails,
	/// every participant receives the refresh failure.
	pub async fn recover<F, Fut>(
		&self,
		mut request: ApiRequest,
		failure: RawFailure,
		replay: F,
	) -> Result<ApiResponse, RawFailure>
	where
		F: FnOnce(ApiRequest) -> Fut,
		Fut: Future<Output = Result<ApiResponse, RawFailure>>,
	{
		if !self.should_engage(&request, &failure) {
			return Err(failure);
		}

		request.already_retried = true;

		let role = {
			let mut episode = self.episode.lock();

			match episode.state {
				RefreshState::Refreshing => {
					let (waiter, receiver) = PendingWaiter::new();

					episode.queue.push(waiter);

					let queued = episode.queue.len();

					self.metrics.record_enqueued();
					obs::log_refresh_event(RefreshEvent::WaiterEnqueued { queued });

					Role::Waiter(receiver)
				},
				RefreshState::Idle => {
					episode.state = RefreshState::Refreshing;

					Role::Leader
				},
			}
		};

		match role {
			Role::Waiter(receiver) => match receiver.await {
				Ok(Ok(())) => self.replay(request, replay).await,
				Ok(Err(failure)) => Err(failure),
				Err(_) => Err(RawFailure::other(RefreshError::Abandoned)),
			},
			Role::Leader => {
				obs::log_refresh_event(RefreshEvent::EpisodeStarted);

				let guard = EpisodeGuard { episode: &self.episode, settled: false };

				match self.refresh().await {
					Ok(authorization) => {
						self.default_headers.write().insert(AUTHORIZATION, authorization.clone());
						request.headers.insert(AUTHORIZATION, authorization);

						let drained = guard.settle(&Ok(()));

						self.metrics.record_success();
						obs::log_refresh_event(RefreshEvent::Refreshed { drained });

						self.replay(request, replay).await
					},
					Err(failure) => {
						if let Err(_e) = self.store.clear() {
							#[cfg(feature = "tracing")]
							tracing::warn!(error = %_e, "failed to clear credential store");
						}

						self.default_headers.write().remove(AUTHORIZATION);

						let reason = self.normalizer.normalize(&failure);
						let drained = guard.settle(&Err(failure.clone()));

						self.metrics.record_failure();
						obs::log_refresh_event(RefreshEvent::RefreshFailed {
							drained,
							kind: reason.kind(),
						});
						let session = self.session.read().clone();

						session.session_expired(&reason);

						Err(failure)
					},
				}
			},
		}
	}

	async fn replay<F, Fut>(&self, request: ApiRequest, replay: F) -> Result<ApiResponse, RawFailure>
	where
		F: FnOnce(ApiRequest) -> Fut,
		Fut: Future<Output = Result<ApiResponse, RawFailure>>,
	{
		const KIND: FlowKind = FlowKind::Replay;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = FlowSpan::new(KIND, "replay").instrument(replay(request)).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(failure) =>
				obs::record_flow_failure(KIND, self.normalizer.normalize(failure).kind()),
		}

		result
	}

	// Issues the refresh call and persists the new credential; returns the new authorization
	// header value.
	async fn refresh(&self) -> Result<String, RawFailure> {
		const KIND: FlowKind = FlowKind::Refresh;

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);
		self.metrics.record_attempt();

		let result = FlowSpan::new(KIND, "refresh_credential")
			.instrument(async {
				let url = self.descriptor.refresh_url().map_err(RawFailure::other)?;
				let mut outgoing = OutgoingRequest {
					method: Method::Post,
					url,
					headers: HeaderBag::new(),
					body: None,
					timeout: Some(self.descriptor.request_timeout),
				};

				self.decorator.decorate_locale(&mut outgoing);

				let snapshot = outgoing.snapshot();
				let response = self.transport.send(outgoing).await?;

				if !response.is_success() {
					return Err(TransportFailure::status(snapshot, response).into());
				}

				let token = response
					.body
					.pointer(&self.descriptor.access_token_pointer)
					.and_then(Value::as_str)
					.filter(|token| !token.is_empty())
					.ok_or_else(|| RawFailure::other(RefreshError::MissingAccessToken))?;

				self.store
					.save(Credential::new(token, self.descriptor.credential_ttl))
					.map_err(RawFailure::other)?;

				Ok(self.decorator.authorization_for(token))
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(failure) =>
				obs::record_flow_failure(KIND, self.normalizer.normalize(failure).kind()),
		}

		result
	}
}
impl<T> Debug for RefreshCoordinator<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		let episode = self.episode.lock();

		f.debug_struct("RefreshCoordinator")
			.field("state", &episode.state)
			.field("pending_waiters", &episode.queue.len())
			.field("metrics", &self.metrics)
			.finish()
	}
}
