//! # deployspec
//!
//! Command dispatcher around the validation core: loads the settings and the
//! spec file, merges defaults files, validates one spec invocation and prints
//! the assembled configuration.
//!
//! ```sh
//! deployspec run example --req-arg-a=yes --req-arg-b=yes -e key=value
//! deployspec run --defaults base.yml --get db.host example --db.host=db1
//! deployspec run example -- --help
//! deployspec specs
//! deployspec settings template
//! DEPLOYSPEC__LOG_LEVEL=debug deployspec settings get log_level
//! ```
//!
//! Options of `run` itself go before the spec name; everything after it is
//! handed to the spec. Use `--` when a spec flag clashes with one of `run`'s.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use deployspec::settings::{self, CoreSettings};
use deployspec::{Layer, OutputFormat, SpecError, SpecManager, Specification, Strategy, loader, ops};

/// Validate deployment options against a declarative spec and print the
/// merged configuration.
#[derive(Parser, Debug)]
#[command(name = "deployspec", version)]
struct Cli {
    /// Enable debug logging (overrides RUST_LOG and the log_level setting).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra settings file, applied on top of the discovered ones.
    #[arg(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate a spec invocation and print the assembled configuration.
    Run(RunArgs),
    /// List the specs defined in the spec file.
    Specs {
        /// Spec file (default: the spec_file setting).
        #[arg(long, value_name = "FILE")]
        spec: Option<String>,
    },
    /// Inspect the tool's own settings.
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Spec file (default: the spec_file setting).
    #[arg(short, long, value_name = "FILE")]
    spec: Option<String>,

    /// Defaults file merged below the options (repeatable, first = lowest priority).
    #[arg(short, long = "defaults", value_name = "FILE")]
    defaults: Vec<String>,

    /// Strategy for merging defaults files (default: the merge.defaults_strategy setting).
    #[arg(long, value_enum)]
    defaults_strategy: Option<Strategy>,

    /// Turn undeclared flags into extra vars instead of rejecting them.
    #[arg(long)]
    pass_through: bool,

    /// Print only this dotted key of the assembled configuration.
    #[arg(long, value_name = "KEY", conflicts_with = "list")]
    get: Option<String>,

    /// Print the assembled configuration as dotted key-value pairs.
    #[arg(long)]
    list: bool,

    /// Output format of the assembled configuration.
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    format: OutputFormat,

    /// Name of the spec to validate against.
    spec_name: String,

    /// Options for the spec.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print a commented settings file template.
    Template,
    /// Print one resolved setting.
    Get { key: String },
}

fn main() {
    let cli = Cli::parse();
    let code = match dispatch(cli) {
        Ok(()) => 0,
        Err(SpecError::Cli(e)) => {
            let _ = e.print();
            e.exit_code()
        }
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn dispatch(cli: Cli) -> Result<(), SpecError> {
    let settings = settings::load_settings(cli.settings.as_deref())?;
    init_tracing(cli.verbose, &settings.log_level);

    match cli.command {
        Commands::Run(args) => run(&settings, args),
        Commands::Specs { spec } => {
            let spec = load_spec(&settings, spec.as_deref())?;
            for name in spec.names() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Settings(SettingsCommand::Template) => {
            println!("{}", ops::settings_template());
            Ok(())
        }
        Commands::Settings(SettingsCommand::Get { key }) => {
            println!("{}", ops::get_setting(&settings, &key)?);
            Ok(())
        }
    }
}

fn run(settings: &CoreSettings, args: RunArgs) -> Result<(), SpecError> {
    let spec = load_spec(settings, args.spec.as_deref())?;
    let dirs = settings.search_dirs();
    let strategy = args
        .defaults_strategy
        .unwrap_or(settings.merge.defaults_strategy);

    let mut builder = SpecManager::builder()
        .spec(spec)
        .pass_through_unknown(args.pass_through || settings.pass_through_unknown);
    for file in &args.defaults {
        let (path, values) = loader::load_yaml(file, &dirs)?;
        builder = builder.layer(Layer::new(path.display().to_string(), values, strategy));
    }
    let manager = builder.build();

    let mut argv = Vec::with_capacity(args.args.len() + 1);
    argv.push(args.spec_name);
    argv.extend(args.args);
    let resolved = manager.resolve(&argv)?;

    let report = match &args.get {
        Some(key) => ops::get_value(&resolved.config, key)?,
        None if args.list => ops::list_values(&resolved.config),
        None => ops::render(&resolved.config, args.format)?,
    };
    println!("{report}");
    Ok(())
}

fn load_spec(settings: &CoreSettings, file: Option<&str>) -> Result<Specification, SpecError> {
    let file = file.unwrap_or(&settings.spec_file);
    let (path, raw) = loader::load_yaml(file, &settings.search_dirs())?;
    debug!(path = %path.display(), "loaded spec file");
    Specification::from_value(Value::Object(raw))
}

fn init_tracing(verbose: bool, log_level: &str) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
