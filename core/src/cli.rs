use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::engine::Engine;
use crate::interpreter::{self, HostContext, ScriptLogger, Value};

#[derive(Parser)]
#[command(name = "nf")]
#[command(about = "NF - run, check and inspect NF pipeline scripts", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a script and print its exported value as JSON
    Run {
        /// Script file
        file: PathBuf,

        /// Host `preValue` (JSON)
        #[arg(long = "pre-value")]
        pre_value: Option<String>,

        /// Host `params` entry as key=value (value parsed as JSON, else a string)
        #[arg(short = 'p', long = "param")]
        params: Vec<String>,

        /// Thread pool for task blocks
        #[arg(long)]
        pool: Option<String>,

        /// Print per-statement timings after the run
        #[arg(long)]
        profile: bool,
    },

    /// Lex, parse and validate a script without running it
    Check {
        /// Script file
        file: PathBuf,
    },

    /// Print the token stream of a script
    Tokens {
        /// Script file
        file: PathBuf,
    },

    /// Print the validated AST of a script as JSON
    Ast {
        /// Script file
        file: PathBuf,
    },

    /// Run a script repeatedly through the cache and report timings
    Bench {
        /// Script file
        file: PathBuf,

        /// Number of runs
        #[arg(short = 'n', long, default_value = "100")]
        iterations: usize,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// Run the CLI by parsing process arguments
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli)
}

/// Run the CLI with provided arguments
pub fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli)
}

fn run_cli_with_args(cli: Cli) -> Result<()> {
    let profile = matches!(cli.command, Commands::Run { profile: true, .. } | Commands::Bench { .. });

    // Load config before any command output
    let config = Config::builder()
        .config_path(cli.config.clone())
        .monitor(profile.then_some(true))
        .build()?;

    match cli.command {
        Commands::Run {
            file,
            pre_value,
            params,
            pool,
            profile,
        } => {
            let text = read_script(&file)?;
            let host = host_context(pre_value.as_deref(), &params, pool)?;
            let engine = Engine::new(config)?;

            let logger: Arc<dyn ScriptLogger> = Arc::new(StdoutLogger);
            let export = engine.run(&text, Some(logger), &host)?;
            match export {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value.to_json())?),
                None => eprintln!("(no export)"),
            }

            if profile {
                if let Some(monitor) = engine.monitor() {
                    eprint!("{}", monitor);
                }
            }
        }

        Commands::Check { file } => {
            let text = read_script(&file)?;
            let script = interpreter::compile(&text)?;
            println!(
                "✓ {} is valid: {} statement(s), sha256 {}",
                file.display(),
                script.nodes.len(),
                script.hash
            );
        }

        Commands::Tokens { file } => {
            let text = read_script(&file)?;
            for token in interpreter::lexer::tokenize(&text)? {
                println!(
                    "{:>4}  {:<12} {}",
                    token.line,
                    format!("{:?}", token.kind),
                    token.display_text()
                );
            }
        }

        Commands::Ast { file } => {
            let text = read_script(&file)?;
            let script = interpreter::compile(&text)?;
            println!("{}", serde_json::to_string_pretty(&script.nodes)?);
        }

        Commands::Bench { file, iterations } => {
            let text = read_script(&file)?;
            let engine = Engine::new(config)?;
            let host = HostContext::new();
            let logger: Arc<dyn ScriptLogger> = Arc::new(DiscardLogger);

            let started = Instant::now();
            for _ in 0..iterations {
                engine.run(&text, Some(Arc::clone(&logger)), &host)?;
            }
            let elapsed = started.elapsed();

            println!("Runs: {}", iterations);
            println!("Total: {:.3} ms", elapsed.as_secs_f64() * 1000.0);
            if iterations > 0 {
                println!(
                    "Average: {:.3} us/run",
                    elapsed.as_secs_f64() * 1_000_000.0 / iterations as f64
                );
            }
            println!(
                "Cache: {} hit(s), {} miss(es)",
                engine.cache().hits(),
                engine.cache().misses()
            );
            if let Some(monitor) = engine.monitor() {
                println!("\n{}", monitor);
            }
        }

        Commands::Config => {
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// `echo` straight to stdout
struct StdoutLogger;

impl ScriptLogger for StdoutLogger {
    fn echo(&self, _run_id: &str, _line: usize, message: &str) {
        println!("{}", message);
    }
}

/// Swallows `echo` output during benchmarks
struct DiscardLogger;

impl ScriptLogger for DiscardLogger {
    fn echo(&self, _run_id: &str, _line: usize, _message: &str) {}
}

fn read_script(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read script: {:?}", path))
}

fn host_context(pre_value: Option<&str>, params: &[String], pool: Option<String>) -> Result<HostContext> {
    let mut host = HostContext::new();

    if let Some(raw) = pre_value {
        let json: serde_json::Value =
            serde_json::from_str(raw).context("--pre-value must be valid JSON")?;
        host.insert("preValue", Value::from(json));
    }

    if !params.is_empty() {
        let mut map = BTreeMap::new();
        for raw in params {
            let (key, value) = parse_param(raw)?;
            map.insert(key, value);
        }
        host.insert("params", Value::Map(map));
    }

    if let Some(pool) = pool {
        host.insert("threadFactoryName", pool);
    }

    Ok(host)
}

/// `key=value`; the value is JSON when it parses as JSON, otherwise a string
fn parse_param(raw: &str) -> Result<(String, Value)> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Invalid --param '{}', expected key=value", raw))?;
    if key.is_empty() {
        return Err(anyhow!("Invalid --param '{}', key is empty", raw));
    }
    let value = serde_json::from_str::<serde_json::Value>(value)
        .map(Value::from)
        .unwrap_or_else(|_| Value::str(value));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(
            parse_param("n=3").expect("Should parse"),
            ("n".to_string(), Value::Int(3))
        );
        assert_eq!(
            parse_param("name=ada").expect("Should parse"),
            ("name".to_string(), Value::str("ada"))
        );
        assert!(parse_param("novalue").is_err());
        assert!(parse_param("=1").is_err());
    }

    #[test]
    fn test_host_context_from_flags() {
        let host = host_context(Some("[1, 2]"), &["a=true".to_string()], Some("io".to_string()))
            .expect("Should build host context");
        assert_eq!(
            host.get("preValue"),
            Some(&Value::List(vec![Value::Int(1), Value::Int(2)]))
        );
        assert_eq!(host.get("threadFactoryName"), Some(&Value::str("io")));
        match host.get("params") {
            Some(Value::Map(map)) => assert_eq!(map.get("a"), Some(&Value::Bool(true))),
            other => panic!("Expected params map, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["nf", "--config", "x.toml", "run", "s.nf", "-p", "a=1", "--profile"])
            .expect("Should parse");
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Commands::Run { file, params, profile, .. } => {
                assert_eq!(file, PathBuf::from("s.nf"));
                assert_eq!(params, vec!["a=1"]);
                assert!(profile);
            }
            _ => panic!("Expected run command"),
        }
    }
}
