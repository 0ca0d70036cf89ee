//! Prompt-plus-image submission widget: pick an optional image, type a prompt, get the model's answer back as markup.
//!
//! [Widget] is the whole public surface of a component instance. Front ends feed it selection changes and submit events,
//! and watch its preview and output.
use std::future::Future;

use eyre::Result;

pub mod attachment;
mod claude;
pub mod config;
pub mod preview;
pub mod render;
mod shortcuts;
mod widget;

pub use attachment::{AllowList, EncodedAttachment, SelectedFile};
pub use claude::ClaudeService;
pub use preview::{Preview, PreviewItem};
pub use render::{CmarkRenderer, MarkdownRenderer};
pub use shortcuts::{submit_once, submit_once_blocking};
pub use widget::{CANCELLED_MESSAGE, SubmissionState, SubmitPolicy, Widget, WidgetConfig};

#[derive(Clone, Copy, Debug, Default, derive_more::FromStr)]
pub enum Model {
	Fast,
	#[default]
	Medium,
	Slow,
}

/// Opaque text-in, text-out completion provider.
pub trait ModelService {
	fn ask(&self, message: String) -> impl Future<Output = Result<String>> + Send;
}
impl<S: ModelService> ModelService for std::sync::Arc<S> {
	fn ask(&self, message: String) -> impl Future<Output = Result<String>> + Send {
		(**self).ask(message)
	}
}

/// Everything that goes out in one submission.
#[derive(Clone, Debug, derive_new::new)]
pub struct Request {
	pub prompt: String,
	pub attachment: Option<EncodedAttachment>,
}
impl Request {
	/// Prompt and attachment travel together as one text body.
	pub fn to_message(&self) -> String {
		match &self.attachment {
			Some(encoded) => format!("Human: {}\nImage: {}", self.prompt, encoded),
			None => format!("Human: {}", self.prompt),
		}
	}
}

/// Contents of the single visible output region.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RenderedOutput {
	#[default]
	Empty,
	InProgress,
	Markup(String),
	/// Bare message; the "Error: " prefix is added on display.
	Error(String),
}
impl RenderedOutput {
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Error(_))
	}
}
impl std::fmt::Display for RenderedOutput {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Empty => Ok(()),
			Self::InProgress => write!(f, "Generating..."),
			Self::Markup(markup) => write!(f, "{markup}"),
			Self::Error(message) => write!(f, "Error: {message}"),
		}
	}
}

/// Anything that can sink a submission. Rendering can't fail, so it has no variant.
#[derive(Debug, derive_more::Display, derive_more::From)]
pub enum SubmissionError {
	#[display("{_0}")]
	Read(std::io::Error),
	#[display("{_0}")]
	Service(eyre::Report),
}
impl std::error::Error for SubmissionError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn message_without_attachment() {
		assert_eq!(Request::new("".into(), None).to_message(), "Human: ");
		assert_eq!(Request::new("describe".into(), None).to_message(), "Human: describe");
	}

	#[test]
	fn message_inlines_attachment() {
		let request = Request::new("what is this?".into(), Some(EncodedAttachment::from_bytes(b"hi")));
		assert_eq!(request.to_message(), "Human: what is this?\nImage: aGk=");
	}

	#[test]
	fn output_display() {
		assert_eq!(RenderedOutput::InProgress.to_string(), "Generating...");
		assert_eq!(RenderedOutput::Error("rate limited".into()).to_string(), "Error: rate limited");
		assert_eq!(RenderedOutput::Markup("<p>x</p>\n".into()).to_string(), "<p>x</p>\n");
		assert_eq!(RenderedOutput::Empty.to_string(), "");
	}

	#[test]
	fn submission_error_shows_only_the_cause() {
		let err = SubmissionError::from(eyre::eyre!("rate limited"));
		assert_eq!(err.to_string(), "rate limited");
		let err = SubmissionError::from(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"));
		assert_eq!(err.to_string(), "denied");
	}

	#[test]
	fn model_from_str() {
		assert!(matches!("fast".parse::<Model>(), Ok(Model::Fast)));
		assert!(matches!("Slow".parse::<Model>(), Ok(Model::Slow)));
	}
}
