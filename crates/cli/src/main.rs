mod config;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use molt_core::{parse, Category, TokenKind, TranslateOptions, TranslationResult, Translator};
use molt_validate::Validator;
use tracing_subscriber::EnvFilter;

use crate::config::MoltConfig;

/// Environment variable holding the log filter (e.g. `debug`, `molt_core=trace`).
const LOG_ENV: &str = "MOLT_LOG";

/// Sentences translated by `molt demo`.
const DEMO_SENTENCES: [&str; 4] = [
    "Fetch data from API and return JSON",
    "Try to fetch from the API, retry on failure, otherwise log the error",
    "Asynchronously fetch data from multiple APIs in parallel and aggregate the results",
    "Parse the csv file, filter rows and return as a dictionary",
];

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Molt: translate English instructions to compact token notation and back.
#[derive(Parser)]
#[command(
    name = "molt",
    version,
    about = "Translate English instructions to Molt token notation and back"
)]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML config file (defaults to $MOLT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate text; direction is detected from a leading '[' unless forced
    Translate {
        /// English text or Molt notation
        text: String,
        /// Force English -> Molt
        #[arg(long, conflicts_with = "from_molt")]
        to_molt: bool,
        /// Force Molt -> English
        #[arg(long)]
        from_molt: bool,
        /// Show token counts, efficiency and confidence
        #[arg(short, long)]
        verbose: bool,
    },

    /// Score a translation; exits 1 when it is invalid
    Validate {
        /// Original English text
        original: String,
        /// Translated Molt notation
        translated: String,
    },

    /// List the token vocabulary
    Tokens {
        /// Only list one category (op, src, param, ret, ctl, type, err, mod)
        #[arg(long)]
        category: Option<String>,
    },

    /// Translate forward and back, and score the round trip
    Roundtrip {
        /// English text
        text: String,
    },

    /// Translate a few sample sentences
    Demo,

    /// Start the Molt HTTP API server
    Serve {
        /// Port to listen on (defaults to the config file, then 8080)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match MoltConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("config error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    let options = config.translate_options();
    let validator = Validator::new(config.thresholds());

    match cli.command {
        Commands::Translate {
            text,
            to_molt,
            from_molt,
            verbose,
        } => {
            let forward = to_molt || (!from_molt && !text.trim_start().starts_with('['));
            cmd_translate(&text, forward, verbose, &options, cli.output, cli.quiet);
        }
        Commands::Validate {
            original,
            translated,
        } => {
            cmd_validate(&original, &translated, &validator, cli.output, cli.quiet);
        }
        Commands::Tokens { category } => {
            cmd_tokens(category.as_deref(), cli.output, cli.quiet);
        }
        Commands::Roundtrip { text } => {
            cmd_roundtrip(&text, &validator, &options, cli.output, cli.quiet);
        }
        Commands::Demo => {
            cmd_demo(&options, cli.output);
        }
        Commands::Serve { port } => {
            let port = port.unwrap_or(config.serve.port);
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    report_error(
                        &format!("failed to create tokio runtime: {}", e),
                        cli.output,
                        cli.quiet,
                    );
                    process::exit(1);
                }
            };
            let server = serve::start_server(port, config.translator(), validator, options);
            if let Err(e) = rt.block_on(server) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
    }
}

/// Log to stderr, filtered by `$MOLT_LOG` (default: warnings only).
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json(value: &impl serde::Serialize) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {}\"}}", e));
    println!("{}", json);
}

fn cmd_translate(
    text: &str,
    forward: bool,
    verbose: bool,
    options: &TranslateOptions,
    output: OutputFormat,
    quiet: bool,
) {
    let translator = Translator::new();
    let result = if forward {
        translator.translate_forward(text, options)
    } else {
        translator.translate_reverse(text, options)
    };

    let direction = if forward { "to_molt" } else { "from_molt" };
    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "direction": direction,
            "input": text,
            "result": result,
        })),
        OutputFormat::Text => {
            println!("{}", result.text());
            if verbose && !quiet {
                print_translation_details(&result, forward);
            }
        }
    }
}

fn print_translation_details(result: &TranslationResult, forward: bool) {
    println!();
    println!("  Tokens:      {}", result.token_count());
    if forward {
        println!("  Words:       {}", result.original_token_count());
        println!("  Efficiency:  {:.2}%", result.token_efficiency() * 100.0);
    }
    println!("  Confidence:  {:.2}", result.confidence());
}

fn cmd_validate(
    original: &str,
    translated: &str,
    validator: &Validator,
    output: OutputFormat,
    quiet: bool,
) {
    let tokens = parse(translated);
    let quality = validator.validate_translation(original, translated, Some(&tokens));

    if !quiet {
        match output {
            OutputFormat::Json => print_json(&quality),
            OutputFormat::Text => {
                println!("{}", quality);
                for issue in &quality.issues {
                    let severity = match issue.severity {
                        molt_validate::Severity::Error => "error",
                        molt_validate::Severity::Warning => "warning",
                    };
                    println!("  {}: {}", severity, issue.message);
                }
            }
        }
    }

    if !quality.is_valid {
        process::exit(1);
    }
}

fn cmd_tokens(category: Option<&str>, output: OutputFormat, quiet: bool) {
    let category = match category.map(str::parse::<Category>) {
        None => None,
        Some(Ok(c)) => Some(c),
        Some(Err(e)) => {
            let valid: Vec<&str> = Category::ALL.iter().map(|c| c.as_str()).collect();
            report_error(
                &format!("{}. Valid: {}", e, valid.join(", ")),
                output,
                quiet,
            );
            process::exit(1);
        }
    };

    let names: Vec<String> = TokenKind::ALL
        .iter()
        .filter(|kind| category.map_or(true, |c| kind.category() == c))
        .map(|kind| kind.to_string())
        .collect();

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "tokens": names,
            "count": names.len(),
            "category": category,
        })),
        OutputFormat::Text => {
            for name in &names {
                println!("{}", name);
            }
            if !quiet {
                println!();
                println!("{} tokens", names.len());
            }
        }
    }
}

fn cmd_roundtrip(
    text: &str,
    validator: &Validator,
    options: &TranslateOptions,
    output: OutputFormat,
    quiet: bool,
) {
    let translator = Translator::new();
    let forward = translator.translate_forward(text, options);
    let back = translator.translate_reverse(forward.text(), options);
    let quality = validator.validate_roundtrip(text, &translator);

    match output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "original": text,
            "molt": forward.text(),
            "roundtrip": back.text(),
            "quality": quality,
        })),
        OutputFormat::Text => {
            println!("Original:   {}", text);
            println!("Molt:       {}", forward.text());
            println!("Roundtrip:  {}", back.text());
            if !quiet {
                println!("Quality:    {}", quality);
            }
        }
    }
}

fn cmd_demo(options: &TranslateOptions, output: OutputFormat) {
    let translator = Translator::new();
    let results: Vec<(&str, TranslationResult)> = DEMO_SENTENCES
        .iter()
        .map(|s| (*s, translator.translate_forward(s, options)))
        .collect();

    match output {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = results
                .iter()
                .map(|(english, result)| {
                    serde_json::json!({
                        "english": english,
                        "molt": result.text(),
                        "efficiency": result.token_efficiency(),
                    })
                })
                .collect();
            print_json(&entries);
        }
        OutputFormat::Text => {
            for (english, result) in &results {
                println!("English:     {}", english);
                println!("Molt:        {}", result.text());
                println!("Efficiency:  {:.2}%", result.token_efficiency() * 100.0);
                println!();
            }
        }
    }
}

/// Report an error in the requested output format.
pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{{\"error\": \"{}\"}}", msg.replace('"', "\\\""));
        }
    }
}
