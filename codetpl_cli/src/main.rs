use std::path::Path;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use codetpl_cli::CodetplCli;
use codetpl_cli::Commands;
use codetpl_cli::InspectOutputFormat;
use codetpl_core::AnyEmptyResult;
use codetpl_core::AnyError;
use codetpl_core::DEFAULT_TEMPLATE_EXTENSION;
use codetpl_core::TemplateLoader;
use codetpl_core::Value;
use codetpl_core::ValueMap;
use codetpl_core::config::discover_config;
use codetpl_core::config::load_config;
use owo_colors::OwoColorize;

static USE_COLOR: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(true);

fn color_enabled() -> bool {
	USE_COLOR.load(std::sync::atomic::Ordering::Relaxed)
}

/// Apply ANSI color codes only when color is enabled.
macro_rules! colored {
	($text:expr,red) => {
		if color_enabled() {
			format!("{}", $text.red())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,green) => {
		if color_enabled() {
			format!("{}", $text.green())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,yellow) => {
		if color_enabled() {
			format!("{}", $text.yellow())
		} else {
			format!("{}", $text)
		}
	};
	($text:expr,bold) => {
		if color_enabled() {
			format!("{}", $text.bold())
		} else {
			format!("{}", $text)
		}
	};
}

fn main() {
	let args = CodetplCli::parse();

	// Respect NO_COLOR env var and --no-color flag.
	let use_color = !args.no_color && std::env::var_os("NO_COLOR").is_none();
	if !use_color {
		USE_COLOR.store(false, std::sync::atomic::Ordering::Relaxed);
	}

	if args.verbose {
		let filter = tracing_subscriber::EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("codetpl_core=debug"));
		tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_writer(std::io::stderr)
			.with_ansi(use_color)
			.init();
	}

	// Install miette's fancy handler for rich error diagnostics.
	miette::set_hook(Box::new(move |_| {
		Box::new(
			miette::MietteHandlerOpts::new()
				.color(use_color)
				.unicode(use_color)
				.build(),
		)
	}))
	.ok();

	let result = match args.command {
		Some(Commands::Render {
			ref name,
			ref values,
			ref set,
		}) => run_render(&args, name, values.as_deref(), set),
		Some(Commands::Inspect { ref name, format }) => run_inspect(&args, name, format),
		Some(Commands::Init) => run_init(&args),
		None => {
			eprintln!("No subcommand specified. Run `codetpl --help` for usage.");
			process::exit(1);
		}
	};

	if let Err(e) = result {
		// Try to render through miette for rich diagnostics with help text
		// and error codes.
		match e.downcast::<codetpl_core::TemplateError>() {
			Ok(template_err) => {
				let report: miette::Report = (*template_err).into();
				eprintln!("{report:?}");
			}
			Err(e) => {
				eprintln!("{} {e}", colored!("error:", red));
			}
		}
		process::exit(2);
	}
}

/// Resolve the template directory and default extension from the command
/// line and config file. An explicit `--dir` wins over the config's
/// template directory; config paths are taken relative to the config
/// file's own directory.
fn resolve_loader(args: &CodetplCli) -> Result<TemplateLoader, AnyError> {
	let config = match &args.config {
		Some(path) => {
			let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
			Some((base, load_config(path)?))
		}
		None => {
			discover_config(Path::new("."))?.map(|(path, config)| {
				let base = path.parent().unwrap_or(Path::new(".")).to_path_buf();
				(base, config)
			})
		}
	};

	if let Some(dir) = &args.dir {
		let extension = config.as_ref().map_or_else(
			|| DEFAULT_TEMPLATE_EXTENSION.to_string(),
			|(_, config)| config.templates.extension.clone(),
		);
		return Ok(TemplateLoader::with_extension(dir, extension));
	}

	match config {
		Some((base, config)) => {
			Ok(TemplateLoader::with_extension(
				base.join(&config.templates.dir),
				config.templates.extension,
			))
		}
		None => Ok(TemplateLoader::new(".")),
	}
}

fn run_render(
	args: &CodetplCli,
	name: &str,
	values_file: Option<&Path>,
	sets: &[String],
) -> AnyEmptyResult {
	let loader = resolve_loader(args)?;
	let mut values = ValueMap::new();

	if let Some(path) = values_file {
		let contents = std::fs::read_to_string(path)?;
		let parsed: serde_json::Value = serde_json::from_str(&contents)?;
		let serde_json::Value::Object(fields) = parsed else {
			return Err(
				format!("values file `{}` must contain a JSON object", path.display()).into(),
			);
		};
		values = ValueMap::from(fields);
	}

	for pair in sets {
		let Some((key, raw)) = pair.split_once('=') else {
			return Err(format!("invalid --set `{pair}`, expected KEY=VALUE").into());
		};
		let value = serde_json::from_str::<serde_json::Value>(raw)
			.map(Value::from)
			.unwrap_or_else(|_| Value::from(raw));
		values.insert(key, value);
	}

	let resolved = loader.load(name, &values)?;
	print!("{resolved}");

	Ok(())
}

fn run_inspect(args: &CodetplCli, name: &str, format: InspectOutputFormat) -> AnyEmptyResult {
	let loader = resolve_loader(args)?;
	let template = loader.template(name)?;

	match format {
		InspectOutputFormat::Json => {
			let joins: Vec<serde_json::Value> = template
				.joins()
				.iter()
				.map(|join| serde_json::json!({ "name": join.name, "glue": join.glue }))
				.collect();
			let payload = serde_json::json!({
				"name": name,
				"tags": template.tags(),
				"joins": joins,
				"jsons": template.jsons(),
				"ifBlocks": template.ifs().len(),
				"eachBlocks": template.eaches().len(),
			});
			println!("{}", serde_json::to_string_pretty(&payload)?);
		}
		InspectOutputFormat::Text => {
			println!("{}", colored!(format!("template: {name}"), bold));
			print_list("tags", template.tags());
			if template.joins().is_empty() {
				println!("joins: (none)");
			} else {
				println!("joins:");
				for join in template.joins() {
					println!("  {} (glue {:?})", join.name, join.glue);
				}
			}
			print_list("jsons", template.jsons());
			println!("if blocks: {}", template.ifs().len());
			println!("each blocks: {}", template.eaches().len());
		}
	}

	Ok(())
}

fn print_list(label: &str, items: &[String]) {
	if items.is_empty() {
		println!("{label}: (none)");
	} else {
		println!("{label}: {}", items.join(", "));
	}
}

const SAMPLE_TEMPLATE_NAME: &str = "sample.template";

const SAMPLE_TEMPLATE: &str = "Welcome, ${name}!\n\n${if:greeted}\n  You have been greeted \
                               before.\n${else}\n  This is your first greeting.\n${fi}\n\nYour \
                               items:\n${each:items as item}\n  - ${item}\n${done}\n\nAll \
                               together: ${join:items:, }\nAs JSON: ${json:items}\n";

fn run_init(args: &CodetplCli) -> AnyEmptyResult {
	let loader = resolve_loader(args)?;
	let dir = loader.base_dir().to_path_buf();
	std::fs::create_dir_all(&dir)?;

	let path = dir.join(SAMPLE_TEMPLATE_NAME);
	if path.exists() {
		println!(
			"{} {} already exists, leaving it untouched",
			colored!("ok:", yellow),
			path.display()
		);
		return Ok(());
	}

	std::fs::write(&path, SAMPLE_TEMPLATE)?;
	println!("{} created {}", colored!("ok:", green), path.display());

	Ok(())
}
