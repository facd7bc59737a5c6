use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{info, warn};

use markdown_format_converter::charset::decode_text;
use markdown_format_converter::config::Config;
use markdown_format_converter::converter::{ConversionResult, FormatConverter, OutputFormat};
use markdown_format_converter::error::ConversionError;
use markdown_format_converter::logging::init_logging;
use markdown_format_converter::security::{check_content, check_file};

#[derive(Parser)]
#[command(name = "mdconv")]
#[command(version, about = "Convert Markdown files to sanitized HTML, a JSON document tree, or plain text")]
struct Cli {
    /// Input Markdown file
    input: PathBuf,

    /// Output format; repeat for several (defaults to html, json and txt)
    #[arg(short, long = "format", value_name = "FORMAT")]
    formats: Vec<OutputFormat>,

    /// Directory for output files (defaults to the input's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Write converted content to stdout instead of files
    #[arg(long)]
    stdout: bool,

    /// Prettify HTML and indent JSON
    #[arg(short, long)]
    pretty: bool,

    /// Include metadata in the output
    #[arg(short, long)]
    metadata: bool,

    /// Character set of the input file (detected when omitted)
    #[arg(long)]
    charset: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.logging.level);
    init_logging(level, cli.json_logs || config.logging.json);

    match run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Convert the input to every requested format; `Err` carries the exit status
fn run(cli: &Cli, config: &Config) -> Result<(), u8> {
    let bytes = fs::read(&cli.input).map_err(|e| {
        eprintln!("Error reading {}: {}", cli.input.display(), e);
        1
    })?;

    let name = cli
        .input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let text = check_file(bytes.len() as u64, &name, &config.validation_options())
        .map_err(ConversionError::from)
        .and_then(|()| decode_text(&bytes, cli.charset.as_deref()))
        .and_then(|decoded| {
            check_content(&decoded.text, config.limits.max_content_length)?;
            Ok(decoded.text)
        })
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.code()
        })?;

    let mut options = config.conversion_options(Some(name));
    options.prettify |= cli.pretty;
    options.include_metadata |= cli.metadata;

    let mut formats = if cli.formats.is_empty() {
        OutputFormat::ALL.to_vec()
    } else {
        cli.formats.clone()
    };
    let mut seen = HashSet::new();
    formats.retain(|format| seen.insert(*format));

    let converter = FormatConverter::new();
    let mut limiter = config.rate_limiter();
    let mut first_failure = None;

    for format in formats {
        let result = if limiter.can_make_request() {
            converter.convert(&text, format, &options)
        } else {
            ConversionResult::failure(&ConversionError::RateLimitExceeded)
        };

        let outcome = if result.success {
            emit(cli, &result)
        } else {
            Err(result.error.clone().unwrap_or_default())
        };

        match outcome {
            Ok(()) => info!(format = %format, filename = %result.filename, "written"),
            Err(message) => {
                warn!(format = %format, "{}", message);
                eprintln!("{}: {}", format, message);
                first_failure.get_or_insert(result.error_code.unwrap_or(1));
            }
        }
    }

    match first_failure {
        Some(code) => Err(code),
        None => Ok(()),
    }
}

fn emit(cli: &Cli, result: &ConversionResult) -> Result<(), String> {
    if cli.stdout {
        let mut stdout = io::stdout().lock();
        return writeln!(stdout, "{}", result.content).map_err(|e| e.to_string());
    }

    let dir = cli
        .output_dir
        .clone()
        .or_else(|| cli.input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    fs::create_dir_all(&dir).map_err(|e| format!("creating {}: {}", dir.display(), e))?;

    let path = dir.join(&result.filename);
    fs::write(&path, &result.content).map_err(|e| format!("writing {}: {}", path.display(), e))?;
    println!("Created {}", path.display());
    Ok(())
}
