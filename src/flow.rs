//! The five(+terminal)-state flow engine: `Init → Discovery → DeviceAuthz → TokenRequest ↔
//! WaitInterval → Done`/`Failed` (§3 `FlowContext`, §4.5).

// self
use crate::{
	_prelude::*,
	config::FlowConfig,
	device::DeviceAuthorization,
	error::Error,
	multiplexer::Multiplexer,
	obs::{Step, StepOutcome, StepSpan, record_step_outcome, trace_transport},
	provider::ProviderMetadata,
	requests::{device_authz, discovery, token},
	sigpipe::SigpipeGuard,
	transport::{ClientAuth, Method, PumpResult, Transport},
};

/// Payload handed to the host's auth-data callback after the device-authorization step
/// succeeds (§4.4.5, §6).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptOAuthDevice {
	/// URI the user should visit to approve the grant.
	pub verification_uri: String,
	/// Short code the user enters there.
	pub user_code: String,
}

/// Result of invoking the host's auth-data callback (§6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptDecision {
	/// The host handled the prompt itself (positive return); no fallback is printed.
	Handled,
	/// The host declined or has no callback installed (zero return); fall back to stderr.
	Declined,
	/// The host cancelled the flow (negative return).
	Cancelled,
}

/// Host-supplied auth-data callback (§6).
pub type AuthDataCallback = dyn FnMut(&PromptOAuthDevice) -> PromptDecision + Send;

/// Outcome of one [`FlowContext::poll`] call (§6 Engine API).
#[derive(Debug)]
pub enum PollOutcome {
	/// The host must wait on [`FlowContext::descriptor`] and call `poll` again.
	Reading,
	/// The flow completed; the access token is attached.
	Ok(token::AccessToken),
	/// The flow failed fatally; the assembled error is attached.
	Failed(Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StepState {
	Init,
	Discovery,
	DeviceAuthz,
	TokenRequest,
	WaitInterval,
	Done,
	Failed,
}
impl From<StepState> for Step {
	fn from(value: StepState) -> Self {
		match value {
			StepState::Init => Step::Init,
			StepState::Discovery => Step::Discovery,
			StepState::DeviceAuthz => Step::DeviceAuthz,
			StepState::TokenRequest => Step::TokenRequest,
			StepState::WaitInterval => Step::WaitInterval,
			StepState::Done => Step::Done,
			StepState::Failed => Step::Failed,
		}
	}
}

/// Per-connection engine state (§3 `FlowContext`).
///
/// Exclusively owned by the host's connection state for the lifetime of one authentication
/// attempt; constructed on first [`FlowContext::poll`], torn down via [`FlowContext::cleanup`]
/// or `Drop`.
pub struct FlowContext {
	config: FlowConfig,
	mux: Multiplexer,
	transport: Transport,
	step: StepState,
	provider: Option<ProviderMetadata>,
	device: Option<DeviceAuthorization>,
	token: Option<token::AccessToken>,
	used_basic_auth: bool,
	user_prompted: bool,
	prompt_callback: Option<Box<AuthDataCallback>>,
	terminal_message: Option<String>,
}
impl FlowContext {
	/// Constructs a new flow context. No request is issued until the first `poll()` (§4.5 Init).
	pub fn new(config: FlowConfig) -> Result<Self, Error> {
		let mux = Multiplexer::new()?;
		let transport = Transport::new()?;

		Ok(Self {
			config,
			mux,
			transport,
			step: StepState::Init,
			provider: None,
			device: None,
			token: None,
			used_basic_auth: false,
			user_prompted: false,
			prompt_callback: None,
			terminal_message: None,
		})
	}

	/// Installs the host's auth-data callback (§4.4.5, §6).
	pub fn with_prompt_callback(mut self, callback: Box<AuthDataCallback>) -> Self {
		self.prompt_callback = Some(callback);

		self
	}

	/// Returns the descriptor the host's event loop should wait on between `poll()` calls
	/// (§4.1, §6 `conn.altsock`).
	pub fn descriptor(&self) -> std::os::fd::RawFd {
		use std::os::fd::AsRawFd;

		self.mux.as_raw_fd()
	}

	/// Drives the flow forward by one bounded unit of work (§5 "the sole scheduling surface").
	pub fn poll(&mut self) -> PollOutcome {
		let _sigpipe = SigpipeGuard::block();
		let _span = StepSpan::new(self.step.into()).entered();

		// Non-blocking drain: refreshes the multiplexer's view of which sources are ready
		// (notably the interval timer) without itself blocking the calling thread.
		let _ = self.mux.wait(Some(Duration::ZERO));

		match self.step {
			StepState::Init => self.enter_discovery(),
			StepState::Discovery => self.advance_discovery(),
			StepState::DeviceAuthz => self.advance_device_authz(),
			StepState::TokenRequest => self.advance_token_request(),
			StepState::WaitInterval => self.advance_wait_interval(),
			StepState::Done => PollOutcome::Ok(
				self.token.clone().expect("Done is only reached after a token is stored"),
			),
			StepState::Failed => PollOutcome::Failed(Error::Terminal(
				self.terminal_message.clone().unwrap_or_default(),
			)),
		}
	}

	/// Idempotent teardown: releases transport handles and the multiplexer descriptor (§5
	/// "Cancellation and timeout").
	pub fn cleanup(self) {
		// Dropping `self` releases `Transport` and `Multiplexer`, whose own `Drop` impls tear
		// down the in-flight request and background timer thread respectively.
	}

	fn drive(
		&mut self,
		context: crate::error::Context,
	) -> Result<Option<(u32, String, Vec<u8>)>, Error> {
		match self.transport.pump(&mut self.mux, context)? {
			PumpResult::Pending => Ok(None),
			PumpResult::Done => Ok(Some(self.transport.finish(context)?)),
		}
	}

	fn fail(&mut self, error: Error) -> PollOutcome {
		self.step = StepState::Failed;
		self.terminal_message = Some(error.to_string());

		trace_transport(self.config.debug.enabled, &format!("flow failed: {error}"));
		record_step_outcome(Step::Failed, StepOutcome::Failure);

		PollOutcome::Failed(error)
	}

	fn enter_discovery(&mut self) -> PollOutcome {
		let url = self.config.discovery_uri.clone();

		trace_transport(self.config.debug.enabled, &format!("dispatching discovery request to {url}"));

		if let Err(e) =
			self.transport.begin(&url, Method::Get, None, ClientAuth::None, &self.config.debug)
		{
			return self.fail(e);
		}

		self.step = StepState::Discovery;

		self.advance_discovery()
	}

	fn advance_discovery(&mut self) -> PollOutcome {
		match self.drive(crate::error::Context::Discovery) {
			Ok(None) => PollOutcome::Reading,
			Ok(Some((status, content_type, body))) => {
				match discovery::finalize(status, &content_type, &body, &self.config.issuer_id) {
					Ok(metadata) => {
						self.provider = Some(metadata);

						self.enter_device_authz()
					},
					Err(e) => self.fail(e),
				}
			},
			Err(e) => self.fail(e),
		}
	}

	fn enter_device_authz(&mut self) -> PollOutcome {
		let endpoint = self
			.provider
			.as_ref()
			.and_then(|p| p.device_authorization_endpoint.clone())
			.expect("Discovery::validate guarantees this endpoint is present");
		let url = match Url::parse(&endpoint) {
			Ok(url) => url,
			Err(_) => {
				return self.fail(Error::UnsupportedProvider {
					issuer: self.provider.as_ref().map(|p| p.issuer.clone()).unwrap_or_default(),
				});
			},
		};
		let (body, client_auth, used_basic_auth) = device_authz::build_body(&self.config);

		self.used_basic_auth = used_basic_auth;

		trace_transport(
			self.config.debug.enabled,
			&format!("dispatching device authorization request to {url}"),
		);

		if let Err(e) = self.transport.begin(
			&url,
			Method::Post,
			Some(body),
			client_auth,
			&self.config.debug,
		) {
			return self.fail(e);
		}

		self.step = StepState::DeviceAuthz;

		self.advance_device_authz()
	}

	fn advance_device_authz(&mut self) -> PollOutcome {
		match self.drive(crate::error::Context::DeviceAuthz) {
			Ok(None) => PollOutcome::Reading,
			Ok(Some((status, content_type, body))) => {
				match device_authz::finalize(status, &content_type, &body, self.config.debug.min_interval()) {
					Ok(device) => {
						self.device = Some(device);

						self.enter_token_request()
					},
					Err(e) => self.fail(e),
				}
			},
			Err(e) => self.fail(e),
		}
	}

	fn enter_token_request(&mut self) -> PollOutcome {
		let device_code = self
			.device
			.as_ref()
			.expect("enter_token_request is only reached after DeviceAuthz succeeds")
			.device_code
			.clone();
		let token_endpoint = self
			.provider
			.as_ref()
			.expect("enter_token_request is only reached after Discovery succeeds")
			.token_endpoint
			.clone();
		let url = match Url::parse(&token_endpoint) {
			Ok(url) => url,
			Err(_) => return self.fail(Error::UnsupportedProvider { issuer: String::new() }),
		};
		let (body, client_auth, used_basic_auth) = token::build_body(&device_code, &self.config);

		self.used_basic_auth = used_basic_auth;

		trace_transport(self.config.debug.enabled, &format!("dispatching token request to {url}"));

		if let Err(e) =
			self.transport.begin(&url, Method::Post, Some(body), client_auth, &self.config.debug)
		{
			return self.fail(e);
		}

		self.step = StepState::TokenRequest;

		self.advance_token_request()
	}

	fn advance_token_request(&mut self) -> PollOutcome {
		match self.drive(crate::error::Context::Token) {
			Ok(None) => PollOutcome::Reading,
			Ok(Some((status, content_type, body))) => {
				// The first token request to complete at the transport level, regardless of its
				// outcome, is the prompt trigger (§4.4.5): the device/user codes are only useful
				// once the provider has accepted the device-authorization request they came from.
				if let PromptDecision::Cancelled = self.maybe_prompt_user() {
					return self.fail(Error::HostCancelled);
				}

				match token::finalize(status, &content_type, &body, self.used_basic_auth) {
					Ok(token::TokenOutcome::Success(access_token)) => {
						self.token = Some(access_token.clone());
						self.step = StepState::Done;

						record_step_outcome(Step::Done, StepOutcome::Advance);

						PollOutcome::Ok(access_token)
					},
					Ok(token::TokenOutcome::AuthorizationPending) => {
						trace_transport(self.config.debug.enabled, "authorization_pending, will retry after the polling interval");
						record_step_outcome(Step::TokenRequest, StepOutcome::Retry);

						self.enter_wait_interval()
					},
					Ok(token::TokenOutcome::SlowDown) => {
						trace_transport(self.config.debug.enabled, "slow_down, widening the polling interval by 5s");
						record_step_outcome(Step::TokenRequest, StepOutcome::Retry);

						match self
							.device
							.as_mut()
							.expect("TokenRequest is only reached with a device authorization")
							.slow_down()
						{
							Ok(()) => self.enter_wait_interval(),
							Err(e) => self.fail(e),
						}
					},
					Err(e) => self.fail(e),
				}
			},
			Err(e) => self.fail(e),
		}
	}

	fn enter_wait_interval(&mut self) -> PollOutcome {
		let interval = self
			.device
			.as_ref()
			.expect("WaitInterval is only reached with a device authorization")
			.interval;

		self.mux.set_timer(Some(Duration::from_secs(u64::from(interval))));
		self.step = StepState::WaitInterval;

		PollOutcome::Reading
	}

	fn advance_wait_interval(&mut self) -> PollOutcome {
		if self.mux.timer_fired() {
			self.mux.set_timer(None);

			self.enter_token_request()
		} else {
			PollOutcome::Reading
		}
	}

	fn maybe_prompt_user(&mut self) -> PromptDecision {
		if self.user_prompted {
			return PromptDecision::Handled;
		}

		self.user_prompted = true;

		let prompt = PromptOAuthDevice {
			verification_uri: self
				.device
				.as_ref()
				.expect("maybe_prompt_user is only called after DeviceAuthz succeeds")
				.verification_uri
				.clone(),
			user_code: self.device.as_ref().unwrap().user_code.clone(),
		};

		let decision = match &mut self.prompt_callback {
			Some(callback) => callback(&prompt),
			None => PromptDecision::Declined,
		};

		if let PromptDecision::Declined = decision {
			eprintln!(
				"Visit {} and enter the code: {}",
				prompt.verification_uri, prompt.user_code
			);
		}

		decision
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::config::{ClientId, DebugOptions};

	fn config() -> FlowConfig {
		FlowConfig {
			discovery_uri: "https://idp.example/.well-known".parse().unwrap(),
			issuer_id: "https://idp.example/".to_owned(),
			client_id: ClientId::new("client").unwrap(),
			client_secret: None,
			scope: None,
			debug: DebugOptions::default(),
		}
	}

	#[test]
	fn new_flow_context_starts_at_init() {
		let ctx = FlowContext::new(config()).expect("mio::Poll + curl::multi should be available");

		assert_eq!(ctx.step, StepState::Init);
	}
}
