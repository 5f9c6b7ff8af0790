//! Drives one OAuth 2.0 device-authorization flow to completion against a real issuer,
//! printing the prompt and the final access token.
//!
//! ```text
//! cargo run --example device_flow -- https://idp.example/.well-known/openid-configuration \
//!     https://idp.example/ my-client-id
//! ```

// std
use std::{thread, time::Duration};
// crates.io
use oauth_device_engine::{
	config::{DebugOptions, FlowConfig},
	flow::{FlowContext, PollOutcome, PromptDecision},
};

fn main() {
	let mut args = std::env::args().skip(1);
	let discovery_uri = args.next().expect("usage: device_flow <discovery_uri> <issuer> <client_id>");
	let issuer = args.next().expect("usage: device_flow <discovery_uri> <issuer> <client_id>");
	let client_id = args.next().expect("usage: device_flow <discovery_uri> <issuer> <client_id>");

	let config = FlowConfig::new(&discovery_uri, issuer, client_id, None, None, DebugOptions::from_env())
		.expect("host-supplied configuration should be valid");
	let mut ctx = FlowContext::new(config)
		.expect("transport and multiplexer should initialize")
		.with_prompt_callback(Box::new(|prompt| {
			println!("Visit {} and enter the code: {}", prompt.verification_uri, prompt.user_code);

			PromptDecision::Handled
		}));

	loop {
		match ctx.poll() {
			PollOutcome::Reading => thread::sleep(Duration::from_millis(50)),
			PollOutcome::Ok(token) => {
				println!("obtained {} token: {}", token.token_type, token.access_token);

				break;
			},
			PollOutcome::Failed(error) => {
				eprintln!("device authorization failed: {error}");

				std::process::exit(1);
			},
		}
	}
}
