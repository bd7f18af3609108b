//! Session-expired signal raised when a refresh episode fails.
//!
//! The hosting application decides what "go back to sign-in" means (a full reload of the
//! sign-in page in a browser shell, a route reset in a desktop shell, a process exit in a CLI).

// self
use crate::_prelude::*;

/// Receives the unrecoverable-session signal.
///
/// Invoked once per failed refresh episode, after the credential store has been cleared and
/// every queued caller has been rejected.
pub trait SessionExpiredHandler
where
	Self: Send + Sync,
{
	/// Reacts to the session ending; `reason` is the normalized refresh failure.
	fn session_expired(&self, reason: &ApiError);
}
impl<F> SessionExpiredHandler for F
where
	F: Fn(&ApiError) + Send + Sync,
{
	fn session_expired(&self, reason: &ApiError) {
		self(reason)
	}
}

/// Default handler that only records the event in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSessionHandler;
impl SessionExpiredHandler for LogSessionHandler {
	fn session_expired(&self, reason: &ApiError) {
		#[cfg(feature = "tracing")]
		tracing::warn!(
			kind = reason.kind().as_str(),
			status = reason.status,
			"session expired; sign-in required"
		);

		#[cfg(not(feature = "tracing"))]
		let _ = reason;
	}
}

/// Handler that asks the host to perform a hard navigation to the sign-in surface.
pub struct SignInRedirect {
	target: Url,
	navigate: Box<dyn Fn(&Url) + Send + Sync>,
}
impl SignInRedirect {
	/// Creates a redirect handler for the provided sign-in URL.
	pub fn new(target: Url, navigate: impl Fn(&Url) + 'static + Send + Sync) -> Self {
		Self { target, navigate: Box::new(navigate) }
	}

	/// Sign-in URL the handler navigates to.
	pub fn target(&self) -> &Url {
		&self.target
	}
}
impl SessionExpiredHandler for SignInRedirect {
	fn session_expired(&self, reason: &ApiError) {
		LogSessionHandler.session_expired(reason);

		(self.navigate)(&self.target);
	}
}
impl Debug for SignInRedirect {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("SignInRedirect").field("target", &self.target.as_str()).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::error::ErrorKind;

	#[test]
	fn closures_act_as_handlers() {
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		let handler = move |reason: &ApiError| sink.lock().push(reason.message.clone());

		handler.session_expired(&ApiError::new(ErrorKind::CredentialExpired, "expired"));

		assert_eq!(*seen.lock(), vec!["expired".to_string()]);
	}

	#[test]
	fn redirect_navigates_to_sign_in() {
		let visited = Arc::new(Mutex::new(None));
		let sink = visited.clone();
		let target =
			Url::parse("https://console.example.com/sign-in").expect("Sign-in URL should parse.");
		let handler = SignInRedirect::new(target, move |url| *sink.lock() = Some(url.to_string()));

		handler.session_expired(&ApiError::new(ErrorKind::CredentialExpired, "expired"));

		assert_eq!(visited.lock().as_deref(), Some("https://console.example.com/sign-in"));
	}
}
