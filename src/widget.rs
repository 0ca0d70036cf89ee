use std::sync::atomic::{AtomicUsize, Ordering};

use eyre::{Result, eyre};
use tokio::sync::{Semaphore, watch};

use crate::{
	ModelService, RenderedOutput, Request, SubmissionError,
	attachment::{self, AllowList, SelectedFile},
	preview::Preview,
	render::{CmarkRenderer, MarkdownRenderer},
};

/// `Succeeded` and `Failed` are idle states that remember how the last submission ended; both accept the next submit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmissionState {
	#[default]
	Idle,
	Submitting,
	Succeeded,
	Failed,
}
impl SubmissionState {
	pub fn is_idle(self) -> bool {
		self != Self::Submitting
	}
}

pub const CANCELLED_MESSAGE: &str = "submission was dropped before it finished";

/// Counts a submission as pending for as long as it lives. Whatever way it goes away, the count drops back, and
/// the last one out writes a terminal state.
struct PendingGuard<'a> {
	pending: &'a AtomicUsize,
	state: &'a watch::Sender<SubmissionState>,
	output: &'a watch::Sender<RenderedOutput>,
	outcome: Option<RenderedOutput>,
}
impl<'a> PendingGuard<'a> {
	fn enter(pending: &'a AtomicUsize, state: &'a watch::Sender<SubmissionState>, output: &'a watch::Sender<RenderedOutput>) -> Self {
		pending.fetch_add(1, Ordering::SeqCst);
		state.send_replace(SubmissionState::Submitting);
		output.send_replace(RenderedOutput::InProgress);
		Self {
			pending,
			state,
			output,
			outcome: None,
		}
	}

	fn finish(mut self, output: RenderedOutput) {
		self.outcome = Some(output);
	}
}
impl Drop for PendingGuard<'_> {
	fn drop(&mut self) {
		let last = self.pending.fetch_sub(1, Ordering::SeqCst) == 1;
		match self.outcome.take() {
			Some(output) => {
				if last {
					self.state.send_replace(match output.is_error() {
						true => SubmissionState::Failed,
						false => SubmissionState::Succeeded,
					});
				}
				self.output.send_replace(output);
			}
			None => {
				tracing::warn!("submission dropped while in flight");
				if last {
					self.state.send_replace(SubmissionState::Failed);
					self.output.send_if_modified(|output| match output {
						RenderedOutput::InProgress => {
							*output = RenderedOutput::Error(CANCELLED_MESSAGE.to_owned());
							true
						}
						_ => false,
					});
				}
			}
		}
	}
}

/// What happens when submit fires while another submission is still running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubmitPolicy {
	/// At most one in flight; later submits are rejected and leave the output alone.
	#[default]
	SingleFlight,
	/// No guard. Every submission runs to completion and the last one to finish owns the output.
	Overlapping,
}

#[derive(Clone, Debug, Default)]
pub struct WidgetConfig {
	pub allow_list: AllowList,
	pub policy: SubmitPolicy,
}

/// One prompt form: its own file selection, preview list and output region.
///
/// Only two events go in, [on_selection_changed](Self::on_selection_changed) and [submit](Self::submit).
/// Everything else is read-only observation.
pub struct Widget<S, R = CmarkRenderer> {
	service: S,
	renderer: R,
	config: WidgetConfig,
	selection: watch::Sender<Vec<SelectedFile>>,
	preview: watch::Sender<Preview>,
	output: watch::Sender<RenderedOutput>,
	state: watch::Sender<SubmissionState>,
	in_flight: Semaphore,
	pending: AtomicUsize,
}
impl<S: ModelService> Widget<S> {
	pub fn new(service: S) -> Self {
		Self::with_renderer(service, CmarkRenderer, WidgetConfig::default())
	}
}
impl<S: ModelService, R: MarkdownRenderer> Widget<S, R> {
	pub fn with_renderer(service: S, renderer: R, config: WidgetConfig) -> Self {
		Self {
			service,
			renderer,
			config,
			selection: watch::channel(Vec::new()).0,
			preview: watch::channel(Preview::NoFiles).0,
			output: watch::channel(RenderedOutput::Empty).0,
			state: watch::channel(SubmissionState::Idle).0,
			in_flight: Semaphore::new(1),
			pending: AtomicUsize::new(0),
		}
	}

	/// Replaces the selection wholesale and rebuilds the preview from it.
	pub fn on_selection_changed(&self, files: Vec<SelectedFile>) -> Preview {
		let preview = Preview::build(&files, &self.config.allow_list);
		tracing::debug!(files = files.len(), "selection changed");
		self.selection.send_replace(files);
		self.preview.send_replace(preview.clone());
		preview
	}

	/// Runs one submission to completion and returns what ended up in the output slot for it.
	///
	/// `Err` only when [SubmitPolicy::SingleFlight] turns the event away. Failures of the submission itself are
	/// reported through the output, as [RenderedOutput::Error].
	pub async fn submit(&self, prompt: impl Into<String>) -> Result<RenderedOutput> {
		let _permit = match self.config.policy {
			SubmitPolicy::SingleFlight => Some(self.in_flight.try_acquire().map_err(|_| eyre!("a submission is already in progress"))?),
			SubmitPolicy::Overlapping => None,
		};

		// Before the first await: the placeholder shows up right away, and later selection changes can't reach this submission.
		let prompt = prompt.into();
		let attachment = self.selection.borrow().first().cloned();
		let guard = PendingGuard::enter(&self.pending, &self.state, &self.output);
		tracing::info!(prompt_len = prompt.len(), attachment = attachment.as_ref().map(|f| f.name.as_str()), "submitting");

		let output = match self.run(prompt, attachment).await {
			Ok(markup) => RenderedOutput::Markup(markup),
			Err(e) => {
				tracing::warn!(error = %e, "submission failed");
				RenderedOutput::Error(e.to_string())
			}
		};
		guard.finish(output.clone());
		Ok(output)
	}

	async fn run(&self, prompt: String, attachment: Option<SelectedFile>) -> Result<String, SubmissionError> {
		let encoded = match &attachment {
			Some(file) => Some(attachment::encode(file).await?),
			None => None,
		};
		let request = Request::new(prompt, encoded);
		let text = self.service.ask(request.to_message()).await?;
		Ok(self.renderer.render(&text))
	}

	pub fn preview(&self) -> Preview {
		self.preview.borrow().clone()
	}

	pub fn output(&self) -> RenderedOutput {
		self.output.borrow().clone()
	}

	pub fn subscribe(&self) -> watch::Receiver<RenderedOutput> {
		self.output.subscribe()
	}

	pub fn state(&self) -> SubmissionState {
		*self.state.borrow()
	}
}
