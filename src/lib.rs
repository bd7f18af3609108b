//! Authenticated HTTP client core for admin consoles: bearer injection, single-flight token
//! refresh with request replay, and one canonical error shape for every failure.
//!
//! Every call flows through the same pipeline: the [`decorate::RequestDecorator`] stamps the
//! live credential and locale, the [`http::ApiTransport`] dispatches it, the
//! [`refresh::RefreshCoordinator`] recovers expired-credential failures with at most one refresh
//! per episode, and whatever is left is normalized into an [`error::ApiError`] by the
//! [`normalize::ErrorNormalizer`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod decorate;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod normalize;
pub mod obs;
pub mod refresh;
pub mod session;
pub mod store;
pub mod unwrap;

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{ApiError, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
