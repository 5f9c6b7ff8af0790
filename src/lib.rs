//! A non-blocking OAuth 2.0 Device Authorization Grant (RFC 8628) engine, built to be embedded
//! inside a database client library's own connection state machine.
//!
//! The engine never blocks the calling thread: [`flow::FlowContext::poll`] performs bounded work
//! and returns, leaving the host to wait on a single aggregated descriptor
//! ([`flow::FlowContext::descriptor`]) between calls.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod flow;
pub mod init;
pub mod json;
pub mod multiplexer;
pub mod obs;
pub mod provider;
pub mod requests;
pub mod sigpipe;
pub mod transport;

mod _prelude {
	pub use std::{
		collections::HashSet,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		str::FromStr,
		time::{Duration, Instant},
	};

	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use url;
