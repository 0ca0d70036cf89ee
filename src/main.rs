use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::Result;
use prompt_widget::{ClaudeService, CmarkRenderer, MarkdownRenderer as _, RenderedOutput, SelectedFile, Widget, attachment, config};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
	prompt: String,
	/// Files to select. Only the first one is sent; the rest only show up in the preview.
	#[clap(short, long)]
	image: Vec<PathBuf>,
	#[clap(short, long)]
	model: Option<prompt_widget::Model>,
	#[clap(long)]
	max_tokens: Option<usize>,
	/// Print the rendered HTML instead of the plain answer
	#[clap(long)]
	html: bool,
	#[command(flatten)]
	settings: config::SettingsFlags,
}

#[tokio::main]
async fn main() -> Result<()> {
	v_utils::clientside!();
	let cli = Cli::parse();

	let _ = config::init(cli.settings);

	let mut service = ClaudeService::from_config()?;
	if let Some(model) = cli.model {
		service = service.model(model);
	}
	if let Some(max_tokens) = cli.max_tokens {
		service = service.max_tokens(max_tokens);
	}

	let files = cli.image.iter().map(SelectedFile::from_path).collect::<eyre::Result<Vec<_>>>()?;
	for file in &files {
		if !attachment::picker_accepts(&file.mime_type, &file.name) {
			tracing::warn!(name = %file.name, mime = %file.mime_type, "picker would not offer this file (accepts {})", attachment::PICKER_ACCEPT);
		}
	}

	let renderer: Box<dyn Fn(&str) -> String> = match cli.html {
		true => Box::new(|text: &str| CmarkRenderer.render(text)),
		false => Box::new(|text: &str| text.to_owned()),
	};
	let widget = Widget::with_renderer(service, renderer, Default::default());
	eprintln!("{}\n", widget.on_selection_changed(files));
	eprintln!("{}", RenderedOutput::InProgress);

	let output = widget.submit(cli.prompt).await?;
	match output {
		RenderedOutput::Error(_) => {
			eprintln!("{output}");
			std::process::exit(1);
		}
		_ => println!("{output}"),
	}
	Ok(())
}
