//! Caller-owned cancellation handles.

// std
use std::sync::atomic::{AtomicBool, Ordering};
// crates.io
use futures::future::{AbortHandle, Abortable};
// self
use crate::_prelude::*;

/// Cloneable cancellation handle attached to an [`ApiRequest`](crate::http::ApiRequest).
///
/// Cancelling aborts every in-flight dispatch of the call and makes any later dispatch (such as
/// a replay after a refresh) fail immediately.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<CancelState>);
impl CancelToken {
	/// Creates a token that has not been canceled.
	pub fn new() -> Self {
		Self::default()
	}

	/// Cancels the call. Idempotent.
	pub fn cancel(&self) {
		self.0.canceled.store(true, Ordering::SeqCst);

		for handle in self.0.handles.lock().drain(..) {
			handle.abort();
		}
	}

	/// Returns `true` once [`cancel`](Self::cancel) has been called.
	pub fn is_canceled(&self) -> bool {
		self.0.canceled.load(Ordering::SeqCst)
	}

	/// Wraps a dispatch so cancelling this token aborts it.
	pub(crate) fn guard<F>(&self, fut: F) -> Abortable<F>
	where
		F: Future,
	{
		let (handle, registration) = AbortHandle::new_pair();
		let mut handles = self.0.handles.lock();

		if self.is_canceled() {
			handle.abort();
		} else {
			handles.retain(|existing| !existing.is_aborted());
			handles.push(handle);
		}

		Abortable::new(fut, registration)
	}
}

#[derive(Debug, Default)]
struct CancelState {
	canceled: AtomicBool,
	handles: Mutex<Vec<AbortHandle>>,
}
