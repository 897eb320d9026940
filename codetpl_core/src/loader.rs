use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;

use crate::TemplateError;
use crate::TemplateResult;
use crate::parser::CodeTemplateParser;
use crate::template::CodeTemplate;
use crate::value::ValueMap;

/// The extension appended to template names that don't carry one.
pub const DEFAULT_TEMPLATE_EXTENSION: &str = "template";

/// Loads template files from a base directory and memoizes the parse.
///
/// A template is read and parsed once per loader instance; every later
/// [`load`](TemplateLoader::load) of the same name reuses the cached
/// [`CodeTemplate`] and only performs substitution. The cache is guarded
/// by a mutex, so a loader can be shared across threads; two threads
/// racing on an uncached name may both parse, and the first insert wins.
#[derive(Debug)]
pub struct TemplateLoader {
	base_dir: PathBuf,
	extension: String,
	loaded: Mutex<HashMap<String, Arc<CodeTemplate>>>,
}

impl TemplateLoader {
	/// Create a loader for templates under the given directory, using the
	/// default `.template` extension.
	pub fn new(base_dir: impl Into<PathBuf>) -> Self {
		Self::with_extension(base_dir, DEFAULT_TEMPLATE_EXTENSION)
	}

	/// Create a loader with a custom default extension (without the dot).
	pub fn with_extension(base_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
		Self {
			base_dir: base_dir.into(),
			extension: extension.into(),
			loaded: Mutex::new(HashMap::new()),
		}
	}

	/// The directory template names are resolved against.
	pub fn base_dir(&self) -> &Path {
		&self.base_dir
	}

	/// Load the named template and substitute the given values into it.
	pub fn load(&self, name: &str, values: &ValueMap) -> TemplateResult<String> {
		let template = self.template(name)?;
		template.for_values(values)
	}

	/// Get the parsed template for the given name, reading and parsing the
	/// file on first use.
	pub fn template(&self, name: &str) -> TemplateResult<Arc<CodeTemplate>> {
		{
			let cache = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
			if let Some(template) = cache.get(name) {
				tracing::debug!(name, "template cache hit");
				return Ok(Arc::clone(template));
			}
		}

		// Parse outside the lock. Racing loads may parse twice; the results
		// are value-equivalent and the first insert wins.
		let template = Arc::new(self.read_and_parse(name)?);

		let mut cache = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
		let entry = cache.entry(name.to_string()).or_insert(template);
		Ok(Arc::clone(entry))
	}

	fn read_and_parse(&self, name: &str) -> TemplateResult<CodeTemplate> {
		let file_name = if name.contains('.') {
			name.to_string()
		} else {
			format!("{name}.{}", self.extension)
		};
		let path = self.base_dir.join(file_name);

		if !path.exists() {
			return Err(TemplateError::TemplateNotFound {
				path: path.display().to_string(),
			});
		}

		tracing::debug!(name, path = %path.display(), "parsing template");
		let contents = std::fs::read_to_string(&path)?;
		CodeTemplateParser::parse(&contents)
	}
}

/// An injectable cache of loaders keyed by base directory.
///
/// Call sites that load templates from the same directory share one
/// loader (and therefore its template cache) by going through a registry
/// instance instead of constructing loaders ad hoc. Keying by directory
/// bounds cache growth and keeps template names from colliding across
/// directories.
#[derive(Debug, Default)]
pub struct LoaderRegistry {
	loaders: Mutex<HashMap<PathBuf, Arc<TemplateLoader>>>,
}

impl LoaderRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Get the loader for a directory, creating and caching it on first
	/// use.
	pub fn get(&self, dir: impl AsRef<Path>) -> Arc<TemplateLoader> {
		let dir = dir.as_ref();
		let mut loaders = self.loaders.lock().unwrap_or_else(PoisonError::into_inner);
		Arc::clone(
			loaders
				.entry(dir.to_path_buf())
				.or_insert_with(|| Arc::new(TemplateLoader::new(dir))),
		)
	}
}
