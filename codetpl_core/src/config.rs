use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::TemplateError;
use crate::TemplateResult;
use crate::loader::DEFAULT_TEMPLATE_EXTENSION;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["codetpl.toml", ".codetpl.toml", ".config/codetpl.toml"];

/// Configuration loaded from a `codetpl.toml` file.
///
/// ```toml
/// [templates]
/// dir = "templates"
/// extension = "template"
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct CodetplConfig {
	/// Where templates are loaded from and how names are resolved.
	#[serde(default)]
	pub templates: TemplatesConfig,
}

/// The `[templates]` section of the config file.
#[derive(Debug, Deserialize)]
pub struct TemplatesConfig {
	/// Directory templates are loaded from, relative to the config file's
	/// directory. Defaults to the config file's directory itself.
	#[serde(default = "default_template_dir")]
	pub dir: PathBuf,
	/// Default file extension appended to extensionless template names.
	#[serde(default = "default_extension")]
	pub extension: String,
}

impl Default for TemplatesConfig {
	fn default() -> Self {
		Self {
			dir: default_template_dir(),
			extension: default_extension(),
		}
	}
}

fn default_template_dir() -> PathBuf {
	PathBuf::from(".")
}

fn default_extension() -> String {
	DEFAULT_TEMPLATE_EXTENSION.to_string()
}

/// Load a config file from an explicit path.
pub fn load_config(path: &Path) -> TemplateResult<CodetplConfig> {
	let contents = std::fs::read_to_string(path)?;
	toml::from_str(&contents).map_err(|error| TemplateError::ConfigParse(error.to_string()))
}

/// Discover a config file under `root`, trying each candidate in order.
/// Returns the path it was found at together with the parsed config, or
/// `None` when no candidate exists.
pub fn discover_config(root: &Path) -> TemplateResult<Option<(PathBuf, CodetplConfig)>> {
	for candidate in CONFIG_FILE_CANDIDATES {
		let path = root.join(candidate);
		if path.is_file() {
			let config = load_config(&path)?;
			return Ok(Some((path, config)));
		}
	}

	Ok(None)
}
