//! The authenticated API client.
//!
//! [`ApiClient`] wires the pipeline together: every call is resolved against the descriptor,
//! merged with the default headers, decorated with the live credential and locale, dispatched
//! through the transport, and either returned, recovered by the [`RefreshCoordinator`], or
//! normalized into an [`ApiError`].

// self
use crate::{
	_prelude::*,
	auth::Credential,
	decorate::{AUTHORIZATION, LocaleSource, RequestDecorator},
	descriptor::ApiDescriptor,
	http::{
		self, ApiRequest, ApiResponse, ApiTransport, HeaderBag, OutgoingRequest, RawFailure,
		TransportFailure,
	},
	normalize::ErrorNormalizer,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	refresh::RefreshCoordinator,
	session::SessionExpiredHandler,
	store::CredentialStore,
	unwrap,
};
#[cfg(feature = "reqwest")]
use crate::{decorate::LocaleState, http::ReqwestTransport, store::MemoryCredentialStore};

#[cfg(feature = "reqwest")]
/// Client specialized for the crate's default reqwest transport.
pub type ReqwestApiClient = ApiClient<ReqwestTransport>;

/// Authenticated client for one API descriptor.
///
/// Cloning is cheap and clones share the transport, the credential store, the default headers,
/// and the refresh coordinator, so a refresh episode started through one clone is joined by
/// calls made through any other.
pub struct ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	transport: Arc<T>,
	store: Arc<dyn CredentialStore>,
	descriptor: Arc<ApiDescriptor>,
	decorator: RequestDecorator,
	coordinator: Arc<RefreshCoordinator<T>>,
}
impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Creates a client that reuses the caller-provided transport.
	///
	/// A credential already present in `store` is installed as the default authorization header.
	pub fn with_transport(
		descriptor: ApiDescriptor,
		transport: impl Into<Arc<T>>,
		store: Arc<dyn CredentialStore>,
		locale: Arc<dyn LocaleSource>,
	) -> Self {
		let transport = transport.into();
		let descriptor = Arc::new(descriptor);
		let decorator = RequestDecorator::new(
			store.clone(),
			locale,
			descriptor.token_type.clone(),
			descriptor.locale_header.clone(),
		);
		let coordinator = RefreshCoordinator::new(
			transport.clone(),
			store.clone(),
			decorator.clone(),
			descriptor.clone(),
		);

		if let Some(credential) = store.load() {
			coordinator
				.default_headers()
				.write()
				.insert(AUTHORIZATION, decorator.authorization_for(credential.token.expose()));
		}

		Self { transport, store, descriptor, decorator, coordinator: Arc::new(coordinator) }
	}

	/// Installs the handler notified when the session cannot be recovered.
	pub fn with_session_handler(self, handler: impl 'static + SessionExpiredHandler) -> Self {
		self.coordinator.set_session_handler(Arc::new(handler));

		self
	}

	/// Descriptor the client was built from.
	pub fn descriptor(&self) -> &ApiDescriptor {
		&self.descriptor
	}

	/// Refresh coordinator shared by every clone of this client.
	pub fn coordinator(&self) -> &RefreshCoordinator<T> {
		&self.coordinator
	}

	/// Credential store backing the client.
	pub fn store(&self) -> &Arc<dyn CredentialStore> {
		&self.store
	}

	/// Snapshot of the default headers applied to every call.
	pub fn default_headers(&self) -> HeaderBag {
		self.coordinator.default_headers().read().clone()
	}

	/// Sets a default header for every subsequent call.
	pub fn set_default_header(
		&self,
		name: impl AsRef<str>,
		value: impl Into<String>,
	) -> Result<()> {
		let value = value.into();

		http::validate_header(name.as_ref(), &value)?;
		self.coordinator.default_headers().write().insert(name, value);

		Ok(())
	}

	/// Normalizer used for every surfaced error.
	pub fn normalizer(&self) -> &ErrorNormalizer {
		self.coordinator.normalizer()
	}

	/// Stores a credential obtained by signing in and installs it as the default authorization.
	pub fn sign_in(&self, token: impl Into<String>) -> Result<()> {
		let token = token.into();
		let authorization = self.decorator.authorization_for(&token);

		http::validate_header(AUTHORIZATION, &authorization)?;
		self.store.save(Credential::new(token, self.descriptor.credential_ttl))?;
		self.coordinator.default_headers().write().insert(AUTHORIZATION, authorization);

		#[cfg(feature = "tracing")]
		tracing::debug!("access credential installed");

		Ok(())
	}

	/// Forgets the live credential.
	pub fn sign_out(&self) -> Result<()> {
		self.store.clear()?;
		self.coordinator.default_headers().write().remove(AUTHORIZATION);

		Ok(())
	}

	/// Executes a call and returns the full response.
	///
	/// An expired credential is refreshed at most once per episode and the call is replayed
	/// transparently. Every other failure, including a failed refresh, is returned as a
	/// normalized [`ApiError`].
	pub async fn request(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
		const KIND: FlowKind = FlowKind::Request;

		let span = FlowSpan::new(KIND, "request");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				match self.dispatch(&request).await {
					Ok(response) => Ok(response),
					Err(failure) =>
						self.coordinator
							.recover(request, failure, |replayed| async move {
								self.dispatch(&replayed).await
							})
							.await,
				}
			})
			.await;

		match result {
			Ok(response) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				Ok(response)
			},
			Err(failure) => {
				let err = self.surface(&failure);

				obs::record_flow_failure(KIND, err.kind());

				Err(err)
			},
		}
	}

	/// Executes a call and returns only the unwrapped payload.
	pub async fn send(&self, request: ApiRequest) -> Result<Value, ApiError> {
		self.request(request).await.map(unwrap::unwrap_payload)
	}

	/// Executes a call and decodes the unwrapped payload into `R`.
	pub async fn send_json<R>(&self, request: ApiRequest) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		let payload = self.send(request).await?;

		unwrap::decode_payload(payload).map_err(|err| self.surface(&RawFailure::other(err)))
	}

	/// `GET` helper decoding the payload into `R`.
	pub async fn get<R>(&self, path: &str) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::get(path)).await
	}

	/// `POST` helper serializing `body` and decoding the payload into `R`.
	pub async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let body = self.encode(body)?;

		self.send_json(ApiRequest::post(path).with_body(body)).await
	}

	/// `PUT` helper serializing `body` and decoding the payload into `R`.
	pub async fn put<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let body = self.encode(body)?;

		self.send_json(ApiRequest::put(path).with_body(body)).await
	}

	/// `PATCH` helper serializing `body` and decoding the payload into `R`.
	pub async fn patch<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
	where
		B: ?Sized + Serialize,
		R: DeserializeOwned,
	{
		let body = self.encode(body)?;

		self.send_json(ApiRequest::patch(path).with_body(body)).await
	}

	/// `DELETE` helper decoding the payload into `R`.
	pub async fn delete<R>(&self, path: &str) -> Result<R, ApiError>
	where
		R: DeserializeOwned,
	{
		self.send_json(ApiRequest::delete(path)).await
	}

	async fn dispatch(&self, request: &ApiRequest) -> Result<ApiResponse, RawFailure> {
		if request.is_canceled() {
			return Err(RawFailure::Canceled(request.snapshot()));
		}

		let url =
			self.descriptor.resolve(&request.path, &request.query).map_err(RawFailure::other)?;
		let mut headers = request.headers.clone();

		headers.merge_missing(&self.coordinator.default_headers().read());

		let mut outgoing = OutgoingRequest {
			method: request.method,
			url,
			headers,
			body: request.body.clone(),
			timeout: Some(request.timeout.unwrap_or(self.descriptor.request_timeout)),
		};

		self.decorator.decorate(&mut outgoing);

		let snapshot = outgoing.snapshot();
		let response = match &request.cancel {
			Some(token) => token
				.guard(self.transport.send(outgoing))
				.await
				.map_err(|_| RawFailure::Canceled(snapshot.clone()))??,
			None => self.transport.send(outgoing).await?,
		};

		if !response.is_success() {
			return Err(TransportFailure::status(snapshot, response).into());
		}

		Ok(response)
	}

	fn encode<B>(&self, body: &B) -> Result<Value, ApiError>
	where
		B: ?Sized + Serialize,
	{
		serde_json::to_value(body).map_err(|err| self.surface(&RawFailure::other(err)))
	}

	fn surface(&self, failure: &RawFailure) -> ApiError {
		let err = self.normalizer().normalize(failure);

		obs::log_request_failure(&err);

		err
	}
}
#[cfg(feature = "reqwest")]
impl ApiClient<ReqwestTransport> {
	/// Creates a client with its own reqwest transport, an in-memory credential store, and the
	/// default locale.
	pub fn new(descriptor: ApiDescriptor) -> Result<Self> {
		Self::with_store(
			descriptor,
			Arc::new(MemoryCredentialStore::default()),
			Arc::new(LocaleState::default()),
		)
	}

	/// Creates a client with its own reqwest transport over the provided store and locale.
	pub fn with_store(
		descriptor: ApiDescriptor,
		store: Arc<dyn CredentialStore>,
		locale: Arc<dyn LocaleSource>,
	) -> Result<Self> {
		descriptor.validate()?;

		let transport = ReqwestTransport::new()?;

		Ok(Self::with_transport(descriptor, transport, store, locale))
	}
}
impl<T> Clone for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn clone(&self) -> Self {
		Self {
			transport: self.transport.clone(),
			store: self.store.clone(),
			descriptor: self.descriptor.clone(),
			decorator: self.decorator.clone(),
			coordinator: self.coordinator.clone(),
		}
	}
}
impl<T> Debug for ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ApiClient")
			.field("base_url", &self.descriptor.base_url.as_str())
			.field("coordinator", &self.coordinator)
			.finish()
	}
}
