use eyre::Result;

use crate::{ModelService, RenderedOutput, SelectedFile, Widget};

/// Fresh widget, optional single file, one submit.
pub async fn submit_once<S: ModelService>(service: S, prompt: impl Into<String>, file: Option<SelectedFile>) -> Result<RenderedOutput> {
	let widget = Widget::new(service);
	widget.on_selection_changed(file.into_iter().collect());
	widget.submit(prompt).await
}

pub fn submit_once_blocking<S: ModelService>(service: S, prompt: impl Into<String>, file: Option<SelectedFile>) -> Result<RenderedOutput> {
	let runtime = tokio::runtime::Runtime::new()?;
	runtime.block_on(submit_once(service, prompt, file))
}
