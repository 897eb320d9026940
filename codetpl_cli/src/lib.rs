use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;

#[derive(Parser)]
#[command(
	author,
	version,
	about = "Render code-generation templates from the command line.",
	long_about = "codetpl loads `.template` files written in a small line-oriented macro \
	              language and substitutes values into them.\n\nTemplates support plain \
	              `${name}` tags, `${join:name:glue}` and `${json:name}` substitutions, \
	              `${if:expr}`/`${elseif:expr}`/`${else}`/`${fi}` conditionals and \
	              `${each:name as alias}`/`${done}` iteration.\n\nQuick start:\n  codetpl \
	              init            Create a sample template file\n  codetpl render <name>   \
	              Render a template with values\n  codetpl inspect <name>  Show what the \
	              parser found"
)]
pub struct CodetplCli {
	#[command(subcommand)]
	pub command: Option<Commands>,

	/// Directory templates are loaded from. Overrides the config file.
	#[arg(long, short, global = true)]
	pub dir: Option<PathBuf>,

	/// Path to an explicit codetpl.toml config file. By default the
	/// current directory is searched for one.
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// Enable verbose output.
	#[arg(long, short, global = true, default_value_t = false)]
	pub verbose: bool,

	/// Disable colored output.
	#[arg(long, global = true, default_value_t = false)]
	pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
	/// Render a template with the given substitution values.
	///
	/// The template name is resolved under the template directory; names
	/// without an extension get the configured default extension appended.
	/// Values come from a JSON object file (`--values`) and/or repeated
	/// `--set key=value` pairs, with `--set` taking precedence. The
	/// resolved text is printed to stdout.
	Render {
		/// Name of the template to render.
		name: String,

		/// JSON file whose top-level object supplies substitution values.
		#[arg(long)]
		values: Option<PathBuf>,

		/// Extra `key=value` pair. The value is parsed as JSON when
		/// possible (so `--set flag=true` is a boolean), otherwise taken
		/// as a plain string. May be repeated.
		#[arg(long = "set", value_name = "KEY=VALUE")]
		set: Vec<String>,
	},
	/// Show what the parser found in a template.
	///
	/// Prints the plain tags, join and json specs, and block counts of the
	/// parsed template without substituting anything. Useful for checking
	/// which values a template expects.
	Inspect {
		/// Name of the template to inspect.
		name: String,

		/// Output format. Use `text` for human-readable output or `json`
		/// for programmatic consumption.
		#[arg(long, value_enum, default_value_t = InspectOutputFormat::Text)]
		format: InspectOutputFormat,
	},
	/// Create a sample template file in the template directory.
	///
	/// Writes `sample.template` demonstrating the tag and block syntax. If
	/// the file already exists, this command is a no-op and exits
	/// successfully.
	Init,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InspectOutputFormat {
	/// Human-readable text output.
	Text,
	/// JSON output for programmatic consumption.
	Json,
}
