use eyre::{Result, bail, eyre};
use reqwest::{
	Client,
	header::{CONTENT_TYPE, HeaderMap, HeaderValue},
};
use serde::{Deserialize, Serialize};

use crate::{Model, ModelService};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
/// ref: https://docs.claude.com/en/docs/about-claude/models/all-models
enum ClaudeModel {
	Haiku45,
	Sonnet45,
	Opus41,
}
impl ClaudeModel {
	fn to_str(self) -> &'static str {
		match self {
			ClaudeModel::Haiku45 => "claude-haiku-4-5",
			ClaudeModel::Sonnet45 => "claude-sonnet-4-5",
			ClaudeModel::Opus41 => "claude-opus-4-1",
		}
	}

	pub fn max_tokens(self) -> usize {
		match self {
			Self::Haiku45 => 64_000,
			Self::Sonnet45 => 64_000,
			Self::Opus41 => 32_000,
		}
	}
}
impl std::str::FromStr for ClaudeModel {
	type Err = eyre::Report;

	fn from_str(s: &str) -> Result<Self> {
		Ok(match s {
			_ if s.to_lowercase().contains("haiku") => Self::Haiku45,
			_ if s.to_lowercase().contains("sonnet") => Self::Sonnet45,
			_ if s.to_lowercase().contains("opus") => Self::Opus41,
			_ => bail!("Unknown model: {s}"),
		})
	}
}
impl From<Model> for ClaudeModel {
	fn from(model: Model) -> Self {
		match model {
			Model::Fast => Self::Haiku45,
			Model::Medium => Self::Sonnet45,
			Model::Slow => Self::Opus41,
		}
	}
}

#[derive(Debug, Serialize)]
struct ClaudeMessage<'a> {
	role: &'static str,
	content: &'a str,
}
#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
	model: &'static str,
	max_tokens: usize,
	messages: [ClaudeMessage<'a>; 1],
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
	#[serde(rename = "type")]
	content_type: String,
	#[serde(default)]
	text: String,
}
#[derive(Debug, Deserialize)]
struct ClaudeResponse {
	content: Vec<ClaudeContent>,
	#[serde(default)]
	stop_reason: Option<String>,
}
impl ClaudeResponse {
	fn text(&self) -> String {
		let contents = self.content.iter().filter(|c| c.content_type == "text").map(|c| c.text.as_str()).collect::<Vec<&str>>();
		contents.join("\n")
	}
}
#[derive(Debug, Deserialize)]
struct ClaudeErrorBody {
	error: ClaudeErrorDetail,
}
#[derive(Debug, Deserialize)]
struct ClaudeErrorDetail {
	message: String,
}

/// Anthropic Messages API, one user message per call, no streaming.
///
/// The credential is captured at construction; nothing is re-read per request.
#[derive(Clone, Debug)]
pub struct ClaudeService {
	client: Client,
	api_key: String,
	base_url: String,
	model: Model,
	max_tokens: Option<usize>,
}
impl ClaudeService {
	pub fn new(api_key: impl Into<String>) -> Self {
		Self {
			client: Client::new(),
			api_key: api_key.into(),
			base_url: DEFAULT_BASE_URL.to_owned(),
			model: Model::Medium,
			max_tokens: None,
		}
	}

	/// Key and model come from [crate::config]; errors out if no key is configured anywhere.
	pub fn from_config() -> Result<Self> {
		let config = crate::config::get();
		let api_key = config.api_key().ok_or_else(|| eyre!("no Anthropic API key configured (set `anthropic_api_key` or ANTHROPIC_API_KEY)"))?;
		let mut service = Self::new(api_key);
		if let Some(model) = config.model {
			service = service.model(model.parse().map_err(|_| eyre!("Unknown model in config: {model}"))?);
		}
		Ok(service)
	}

	pub fn model(mut self, model: Model) -> Self {
		self.model = model;
		self
	}

	/// Clamped to what the chosen model allows.
	pub fn max_tokens(mut self, max_tokens: usize) -> Self {
		self.max_tokens = Some(max_tokens);
		self
	}

	pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
		self.base_url = base_url.into().trim_end_matches('/').to_owned();
		self
	}

	fn headers(&self) -> Result<HeaderMap> {
		let mut headers = HeaderMap::new();
		headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
		headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01")); // API standard edition, does not influence model versions
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
		Ok(headers)
	}

	fn payload<'a>(&self, message: &'a str) -> ClaudeRequest<'a> {
		let claude_model = ClaudeModel::from(self.model);
		let max_tokens = match self.max_tokens {
			Some(max_tokens) => max_tokens.min(claude_model.max_tokens()),
			_ => claude_model.max_tokens(),
		};
		ClaudeRequest {
			model: claude_model.to_str(),
			max_tokens,
			messages: [ClaudeMessage { role: "user", content: message }],
		}
	}
}

impl ModelService for ClaudeService {
	///docs: https://docs.claude.com/claude/reference/messages_post
	async fn ask(&self, message: String) -> Result<String> {
		let payload = self.payload(&message);
		let url = format!("{}/v1/messages", self.base_url);
		tracing::info!(model = payload.model, max_tokens = payload.max_tokens, "sending request");

		let response = self.client.post(url).headers(self.headers()?).json(&payload).send().await?;
		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			tracing::warn!(%status, "model service returned an error status");
			return Err(match serde_json::from_str::<ClaudeErrorBody>(&body) {
				Ok(parsed) => eyre!(parsed.error.message),
				Err(_) => eyre!("Claude API error {status}: {body}"),
			});
		}

		let response = serde_json::from_str::<ClaudeResponse>(&body).map_err(|e| eyre!("Failed to parse Claude response: {e}"))?;
		tracing::debug!(?response);
		if response.stop_reason.as_deref() == Some("refusal") {
			bail!("Claude refused to process the request. This may be due to content policy restrictions.");
		}
		Ok(response.text())
	}
}
