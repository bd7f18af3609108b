#![allow(dead_code)]

// std
use std::{
	collections::VecDeque,
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::{Mutex, RwLock};
use serde_json::{Value, json};
use time::Duration;
use tokio::sync::Semaphore;
use url::Url;
// self
use console_client::{
	auth::Credential,
	client::ApiClient,
	decorate::{AUTHORIZATION, LocaleState},
	descriptor::ApiDescriptor,
	error::ApiError,
	http::{
		ApiResponse, ApiTransport, OutgoingRequest, RequestSnapshot, TransportFailure,
		TransportFuture,
	},
	refresh::{RefreshCoordinator, RefreshState},
	store::MemoryCredentialStore,
};

pub const BASE_URL: &str = "https://console.example.com/api";

/// In-process stand-in for the console API.
///
/// Protected routes answer 401 unless the request carries a credential the server still accepts.
/// The refresh route hands out scripted credentials and can be held closed so tests can pile
/// up callers behind an in-flight refresh.
pub struct FakeApi {
	accepted: RwLock<Vec<String>>,
	issued: Mutex<VecDeque<RefreshReply>>,
	adopt_refreshed: bool,
	gate: Semaphore,
	refresh_calls: AtomicUsize,
	seen: Mutex<Vec<OutgoingRequest>>,
}
impl FakeApi {
	/// Accepts `accepted` and answers every refresh with `reply`.
	pub fn new(accepted: &str, reply: RefreshReply) -> Self {
		Self {
			accepted: RwLock::new(vec![accepted.into()]),
			issued: Mutex::new(VecDeque::from([reply])),
			adopt_refreshed: true,
			gate: Semaphore::new(Semaphore::MAX_PERMITS),
			refresh_calls: AtomicUsize::new(0),
			seen: Mutex::new(Vec::new()),
		}
	}

	/// Holds every refresh call until [`FakeApi::open_gate`] is called.
	pub fn gated(mut self) -> Self {
		self.gate = Semaphore::new(0);

		self
	}

	/// Keeps rejecting the old credential even after a successful refresh.
	pub fn never_adopt_refreshed(mut self) -> Self {
		self.adopt_refreshed = false;

		self
	}

	/// Queues further refresh replies; the last one is reused once the queue runs dry.
	pub fn then_reply(self, reply: RefreshReply) -> Self {
		self.issued.lock().push_back(reply);

		self
	}

	pub fn open_gate(&self) {
		self.gate.add_permits(Semaphore::MAX_PERMITS);
	}

	/// Simulates the server expiring every credential issued so far.
	pub fn expire(&self) {
		self.accepted.write().clear();
	}

	pub fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	pub fn seen(&self) -> Vec<OutgoingRequest> {
		self.seen.lock().clone()
	}

	async fn refresh(&self, request: &OutgoingRequest) -> Result<ApiResponse, TransportFailure> {
		assert!(
			!request.headers.contains(AUTHORIZATION),
			"Refresh calls must not carry a bearer credential."
		);

		self.refresh_calls.fetch_add(1, Ordering::SeqCst);

		let permit = self.gate.acquire().await.expect("Refresh gate should never close.");

		drop(permit);

		let reply = {
			let mut issued = self.issued.lock();

			if issued.len() > 1 { issued.pop_front() } else { issued.front().cloned() }
		};

		match reply.unwrap_or(RefreshReply::Status(500)) {
			RefreshReply::Token(token) => {
				if self.adopt_refreshed {
					self.accepted.write().push(token.clone());
				}

				Ok(ApiResponse::new(200, json!({ "accessToken": token })))
			},
			RefreshReply::Body(body) => Ok(ApiResponse::new(200, body)),
			RefreshReply::Status(status) =>
				Ok(ApiResponse::new(status, json!({ "message": "refresh rejected" }))),
		}
	}

	fn protected(&self, request: &OutgoingRequest) -> ApiResponse {
		let presented =
			request.headers.get(AUTHORIZATION).and_then(|value| value.strip_prefix("Bearer "));
		let accepted = presented
			.is_some_and(|token| self.accepted.read().iter().any(|valid| valid == token));

		if accepted {
			ApiResponse::new(200, json!({ "path": request.url.path() }))
		} else {
			ApiResponse::new(401, json!({ "message": "Token expired." }))
		}
	}
}
impl ApiTransport for FakeApi {
	fn send(&self, request: OutgoingRequest) -> TransportFuture<'_> {
		self.seen.lock().push(request.clone());

		Box::pin(async move {
			let path = request.url.path().to_owned();

			match path.as_str() {
				"/api/auth/refresh" => Ok(self.refresh(&request).await?),
				"/api/auth/login" => Ok(ApiResponse::new(401, Value::Null)),
				"/api/slow" => Err(TransportFailure::timeout(
					RequestSnapshot { method: request.method, url: request.url.to_string() },
					"timeout of 30000ms exceeded",
				)
				.into()),
				_ => Ok(self.protected(&request)),
			}
		})
	}
}

/// Scripted answer of the refresh route.
#[derive(Clone, Debug)]
pub enum RefreshReply {
	Token(String),
	Body(Value),
	Status(u16),
}
impl RefreshReply {
	pub fn token(token: &str) -> Self {
		Self::Token(token.into())
	}
}

pub struct Harness {
	pub api: Arc<FakeApi>,
	pub store: Arc<MemoryCredentialStore>,
	pub client: ApiClient<FakeApi>,
	pub expired_sessions: Arc<Mutex<Vec<ApiError>>>,
}
impl Harness {
	pub fn coordinator(&self) -> &RefreshCoordinator<FakeApi> {
		self.client.coordinator()
	}

	pub fn stored_token(&self) -> Option<String> {
		self.store.peek().map(|credential| credential.token.expose().to_owned())
	}

	/// Polls until the coordinator is refreshing with `waiters` callers parked behind it.
	pub async fn wait_for_waiters(&self, waiters: usize) {
		for _ in 0..400 {
			if self.coordinator().state() == RefreshState::Refreshing
				&& self.coordinator().pending_waiters() == waiters
			{
				return;
			}

			tokio::time::sleep(StdDuration::from_millis(5)).await;
		}

		panic!(
			"Coordinator never reached Refreshing with {waiters} waiters (state {:?}, {} queued).",
			self.coordinator().state(),
			self.coordinator().pending_waiters()
		);
	}
}

pub fn descriptor() -> ApiDescriptor {
	ApiDescriptor::builder(Url::parse(BASE_URL).expect("Base URL fixture should parse."))
		.build()
		.expect("Descriptor fixture should build.")
}

/// Builds a client whose store holds `stored` and whose API accepts the credential handed out
/// by the first refresh.
pub fn harness(api: FakeApi, stored: &str) -> Harness {
	harness_with(api, stored, descriptor())
}

/// Same as [`harness`], but against a caller-provided descriptor.
pub fn harness_with(api: FakeApi, stored: &str, descriptor: ApiDescriptor) -> Harness {
	let api = Arc::new(api);
	let store = Arc::new(MemoryCredentialStore::with_credential(Credential::new(
		stored,
		Duration::minutes(5),
	)));
	let expired_sessions = Arc::new(Mutex::new(Vec::new()));
	let sink = expired_sessions.clone();
	let client: ApiClient<FakeApi> = ApiClient::with_transport(
		descriptor,
		api.clone(),
		store.clone(),
		Arc::new(LocaleState::new("en")),
	)
	.with_session_handler(move |reason: &ApiError| sink.lock().push(reason.clone()));

	Harness { api, store, client, expired_sessions }
}
