use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum TemplateError {
	#[error(transparent)]
	#[diagnostic(code(codetpl::io_error))]
	Io(#[from] std::io::Error),

	#[error("unable to load template: `{path}` does not exist")]
	#[diagnostic(
		code(codetpl::template_not_found),
		help("names without an extension get the loader's default extension appended before lookup")
	)]
	TemplateNotFound { path: String },

	#[error("each block expression must be in the form `name as alias`, got `{0}`")]
	#[diagnostic(
		code(codetpl::malformed_block_expression),
		help("write `${{each:<value-name> as <alias>}}`")
	)]
	MalformedBlockExpression(String),

	#[error("no substitution value for `{0}`")]
	#[diagnostic(
		code(codetpl::missing_substitution_value),
		help("add `{0}` to the value mapping, or set it to null for an empty expansion")
	)]
	MissingSubstitutionValue(String),

	#[error("missing `{close}` for `{open}` block")]
	#[diagnostic(
		code(codetpl::unclosed_block),
		help("close the block before the end of the template")
	)]
	UnclosedBlock { open: String, close: String },

	#[error("error parsing line {line}: `{text}`")]
	#[diagnostic(code(codetpl::parse_line))]
	ParseLine {
		line: usize,
		text: String,
		#[source]
		source: Box<TemplateError>,
	},

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(codetpl::config_parse),
		help("check that codetpl.toml is valid TOML with a [templates] section")
	)]
	ConfigParse(String),
}

pub type TemplateResult<T> = Result<T, TemplateError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
