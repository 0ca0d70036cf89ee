use std::sync::OnceLock;

use v_utils::macros::{MyConfigPrimitives, Settings};

pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Clone, Debug, Default, MyConfigPrimitives, Settings)]
pub struct AppConfig {
	pub anthropic_api_key: Option<String>,
	/// `fast`, `medium` or `slow`
	pub model: Option<String>,
}
impl AppConfig {
	/// Configured key, else the process environment.
	pub fn api_key(&self) -> Option<String> {
		self.anthropic_api_key.clone().or_else(|| std::env::var(API_KEY_ENV).ok()).filter(|k| !k.is_empty())
	}
}

static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Initialize config with CLI flags. Call this once at startup.
/// If not called, `get` will load with default flags.
pub fn init(flags: SettingsFlags) -> eyre::Result<()> {
	let config = AppConfig::try_build(flags)?;
	CONFIG.set(config).map_err(|_| eyre::eyre!("Config already initialized"))?;
	Ok(())
}

/// Get the initialized config, or load with default flags if not initialized.
pub fn get() -> AppConfig {
	CONFIG.get_or_init(|| AppConfig::try_build(SettingsFlags::default()).unwrap_or_default()).clone()
}
