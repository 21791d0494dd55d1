//! Envstack CLI
//!
//! Builds an environment stack from the configuration sources on disk and
//! inspects it:
//! - `show`: the merged settings, or one subtree
//! - `layers`: every layer with its local settings and registry
//! - `get`: one value, coerced to a type
//! - `check`: every registered schema against the merged settings

use clap::{Args, Parser, Subcommand, ValueEnum};
use envstack_config::{resolve_sources, LayerSource, ResolveOptions, ValueType};
use envstack_core::exit_codes::ExitCode;
use envstack_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogFormat, LogLevel, LogSettings,
};
use envstack_core::{Environment, EnvironmentStack, StackError};
use serde_json::Value;
use std::path::PathBuf;
use std::rc::Rc;

/// Envstack - layered configuration inspector
#[derive(Parser)]
#[command(name = "envstack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Additional configuration directory (repeatable, later wins)
    #[arg(long = "config-dir", global = true)]
    config_dirs: Vec<PathBuf>,

    /// Additional configuration file (repeatable, above all directories)
    #[arg(long = "file", global = true)]
    files: Vec<PathBuf>,

    /// Skip the system, user and ENVSTACK_CONFIG_DIR locations
    #[arg(long, global = true)]
    no_default_dirs: bool,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format (human or jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the merged settings
    Show(ShowArgs),

    /// Print every layer, base first
    Layers,

    /// Print one merged value
    Get(GetArgs),

    /// Validate the merged settings against every registered schema
    Check,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Show(_) => "show",
            Commands::Layers => "layers",
            Commands::Get(_) => "get",
            Commands::Check => "check",
        }
    }
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Dotted key of the subtree to print
    #[arg(long)]
    key: Option<String>,

    /// Output format
    #[arg(long, short = 'f', value_enum, default_value_t = RenderFormat::Json)]
    format: RenderFormat,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Dotted key of the value
    key: String,

    /// Type to coerce the value to
    #[arg(long = "type", value_enum, default_value_t = TypeArg::Any)]
    value_type: TypeArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RenderFormat {
    Json,
    Yaml,
    Toml,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TypeArg {
    String,
    Bool,
    Integer,
    Float,
    Path,
    Any,
}

impl From<TypeArg> for ValueType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::String => ValueType::String,
            TypeArg::Bool => ValueType::Bool,
            TypeArg::Integer => ValueType::Integer,
            TypeArg::Float => ValueType::Float,
            TypeArg::Path => ValueType::Path,
            TypeArg::Any => ValueType::Any,
        }
    }
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = Cli::parse();

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };

    let options = ResolveOptions {
        dirs: cli.global.config_dirs.clone(),
        files: cli.global.files.clone(),
        default_dirs: !cli.global.no_default_dirs,
    };
    let sources = resolve_sources(&options);

    // Log settings live on the base layer so every source can refine them.
    let mut stack = EnvironmentStack::new();
    let log_settings = stack.register_instance(Rc::new(LogSettings::new()));
    let mut load_failure = None;
    for source in &sources {
        match Environment::from_source(source) {
            Ok(environment) => {
                stack.push(environment);
            }
            Err(err) => {
                load_failure = Some((source, err));
                break;
            }
        }
    }

    let (base_config, settings_error) = match log_settings.apply(&mut stack, LogConfig::default()) {
        Ok(config) => (config, None),
        Err(err) => (LogConfig::default(), Some(err)),
    };
    init_logging(&base_config.with_overrides(cli_level, cli.global.log_format));

    let run_id = generate_run_id();
    let span = tracing::info_span!("run", run_id = %run_id, command = cli.command.name());
    let _enter = span.enter();

    if let Some(err) = settings_error {
        tracing::warn!(
            event = event_names::CONFIG_INVALID,
            error = %err,
            "ignoring invalid logging settings"
        );
    }
    for layer in stack.layers().iter().skip(1) {
        tracing::debug!(
            event = event_names::CONFIG_LOADED,
            layer = layer.name(),
            category = layer.category().unwrap_or_default(),
            "loaded configuration layer"
        );
    }

    let exit_code = match load_failure {
        Some((source, err)) => report_load_failure(source, &err),
        None => {
            tracing::info!(
                event = event_names::RUN_STARTED,
                layers = stack.len(),
                "starting {}",
                cli.command.name()
            );
            match &cli.command {
                Commands::Show(args) => run_show(&mut stack, args),
                Commands::Layers => run_layers(&stack),
                Commands::Get(args) => run_get(&mut stack, args),
                Commands::Check => run_check(&mut stack),
            }
        }
    };

    tracing::info!(
        event = event_names::RUN_FINISHED,
        exit_code = exit_code.as_i32(),
        "finished: {}",
        exit_code
    );
    drop(_enter);
    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Command implementations
// ============================================================================

fn report_load_failure(source: &LayerSource, err: &StackError) -> ExitCode {
    tracing::error!(
        event = event_names::CONFIG_ERROR,
        source = %source.path.display(),
        kind = %source.kind,
        code = err.code(),
        "failed to load configuration"
    );
    fail(err)
}

fn fail(err: &StackError) -> ExitCode {
    eprintln!("envstack: {}", err);
    ExitCode::from(err)
}

fn run_show(stack: &mut EnvironmentStack, args: &ShowArgs) -> ExitCode {
    let value = match &args.key {
        Some(key) => match stack.value(key) {
            Some(value) => value.clone(),
            None => {
                eprintln!("envstack: no value at '{}'", key);
                return ExitCode::LookupError;
            }
        },
        None => Value::Object(stack.settings().clone()),
    };

    match render(&value, args.format) {
        Ok(text) => {
            print!("{}", text);
            ExitCode::Clean
        }
        Err(message) => {
            eprintln!("envstack: cannot render as {:?}: {}", args.format, message);
            ExitCode::ArgsError
        }
    }
}

fn render(value: &Value, format: RenderFormat) -> Result<String, String> {
    match format {
        RenderFormat::Json => serde_json::to_string_pretty(value)
            .map(|text| text + "\n")
            .map_err(|e| e.to_string()),
        RenderFormat::Yaml => serde_yaml::to_string(value).map_err(|e| e.to_string()),
        RenderFormat::Toml => toml::to_string(value).map_err(|e| e.to_string()),
    }
}

fn run_layers(stack: &EnvironmentStack) -> ExitCode {
    match serde_json::to_string_pretty(&stack.report()) {
        Ok(text) => {
            println!("{}", text);
            ExitCode::Clean
        }
        Err(e) => {
            eprintln!("envstack: {}", e);
            ExitCode::InternalError
        }
    }
}

fn run_get(stack: &mut EnvironmentStack, args: &GetArgs) -> ExitCode {
    let Some(raw) = stack.value(&args.key) else {
        eprintln!("envstack: no value at '{}'", args.key);
        return ExitCode::LookupError;
    };

    let value_type = ValueType::from(args.value_type);
    match value_type.coerce(&args.key, raw) {
        Ok(typed) => {
            match typed.to_value() {
                Value::String(s) => println!("{}", s),
                other => println!("{}", other),
            }
            ExitCode::Clean
        }
        Err(err) => fail(&err.into()),
    }
}

fn run_check(stack: &mut EnvironmentStack) -> ExitCode {
    let validator = match stack.schema_validator() {
        Ok(validator) => validator,
        Err(err) => return fail(&err),
    };
    let report = validator.validate(stack.settings());
    let conflicts = validator.conflicts();

    for issue in &report.issues {
        tracing::warn!(
            event = event_names::CONFIG_INVALID,
            schema = %issue.schema,
            path = %issue.path,
            "{}",
            issue.message
        );
    }

    let ok = report.is_valid() && conflicts.is_empty();
    let output = serde_json::json!({
        "status": if ok { "ok" } else { "invalid" },
        "schemas_checked": report.schemas_checked,
        "issues": report.issues,
        "conflicts": conflicts,
    });
    match serde_json::to_string_pretty(&output) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("envstack: {}", e);
            return ExitCode::InternalError;
        }
    }

    if ok {
        ExitCode::Clean
    } else {
        ExitCode::Invalid
    }
}
