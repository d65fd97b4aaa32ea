use std::{sync::LazyLock, time::Duration};

use regex::RegexSet;
use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

/// Phrases upstream providers use when a prompt does not fit the model's context window.
const CONTEXT_OVERFLOW_PATTERNS: &[&str] = &[
	r"(?i)context[_ ]length[_ ]exceeded",
	r"(?i)maximum context length",
	r"(?i)shorten (the )?prompt( history)?",
	r"(?i)token len",
	r"(?i)too many tokens",
	r"(?i)prompt is too long",
	r"(?i)exceeds? the context window",
];

static CONTEXT_OVERFLOW: LazyLock<Result<RegexSet, regex::Error>> =
	LazyLock::new(|| RegexSet::new(CONTEXT_OVERFLOW_PATTERNS));

pub async fn generate(
	cfg: &concierge_config::LlmProviderConfig,
	system: &str,
	prompt: &str,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_output_tokens,
		"messages": [
			{ "role": "system", "content": system },
			{ "role": "user", "content": prompt },
		],
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let status = res.status();

	if !status.is_success() {
		let message = res.text().await.unwrap_or_default();

		tracing::warn!(
			status = status.as_u16(),
			provider_id = %cfg.provider_id,
			"Generation request failed."
		);

		return Err(classify_failure(status.as_u16(), message));
	}

	let json: Value = res.json().await?;

	parse_completion(json)
}

/// The single place where an upstream failure message is mapped to a typed error.
pub fn classify_failure(status: u16, message: String) -> Error {
	if is_context_overflow(&message) {
		Error::ContextTooLong { message }
	} else {
		Error::Status { status, message }
	}
}

pub fn is_context_overflow(message: &str) -> bool {
	match &*CONTEXT_OVERFLOW {
		Ok(set) => set.is_match(message),
		Err(err) => {
			tracing::error!(error = %err, "Context overflow patterns failed to compile.");

			false
		},
	}
}

fn parse_completion(json: Value) -> Result<String> {
	if let Some(message) = json.get("error").and_then(|err| {
		err.get("message").and_then(Value::as_str).or_else(|| err.as_str())
	}) {
		return Err(classify_failure(200, message.to_string()));
	}

	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::trim)
		.filter(|c| !c.is_empty())
		.ok_or_else(|| Error::InvalidResponse {
			message: "Generation response is missing message content.".to_string(),
		})?;

	Ok(content.to_string())
}
