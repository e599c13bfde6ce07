use crate::config::settings::ExecutorConfig;
use crate::core::Executor;
use crate::verdict::ExecutionResult;
use anyhow::{Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "codebox", author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long, global = true, env = "CODEBOX_CONFIG")]
    config: Option<PathBuf>,
    /// Compile step timeout in seconds
    #[arg(long, global = true)]
    compile_timeout: Option<u64>,
    /// Run step timeout in seconds
    #[arg(long, global = true)]
    run_timeout: Option<u64>,
    /// Directory under which per-run workspaces are created
    #[arg(long, global = true)]
    workspace_root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile (if needed) and run a program
    #[command(group(ArgGroup::new("source").required(true).args(["code", "file"])))]
    Execute {
        /// Language identifier (python, javascript, c, cpp, java)
        #[arg(short, long)]
        language: String,
        /// Source code as string
        #[arg(long)]
        code: Option<String>,
        /// Read source code from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Input data to pass to stdin
        #[arg(long, conflicts_with = "stdin_file")]
        stdin: Option<String>,
        /// Read stdin data from a file
        #[arg(long)]
        stdin_file: Option<PathBuf>,
        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
        /// Print Prometheus metrics to stderr afterwards
        #[arg(long)]
        metrics: bool,
    },
    /// List supported languages
    Languages,
    /// Check if all language toolchains are installed
    CheckDeps {
        /// Show resolved paths and version information
        #[arg(long)]
        verbose: bool,
    },
    /// Remove workspaces left behind by interrupted runs
    Sweep {
        /// Minimum age in seconds of a workspace to remove
        #[arg(long, default_value_t = 3600)]
        max_age_secs: u64,
    },
}

pub fn run() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let executor = Executor::new(config).context("failed to initialize executor")?;

    match cli.command {
        Commands::Execute {
            language,
            code,
            file,
            stdin,
            stdin_file,
            json,
            metrics,
        } => {
            let code = match (code, file) {
                (Some(code), _) => code,
                (None, Some(path)) => read_text(&path, "source file")?,
                (None, None) => anyhow::bail!("either --code or --file is required"),
            };
            let stdin = match (stdin, stdin_file) {
                (Some(data), _) => Some(data),
                (None, Some(path)) => Some(read_text(&path, "stdin file")?),
                (None, None) => None,
            };

            let result = executor.execute(&language, &code, stdin.as_deref())?;
            emit_result(&result, json)?;

            if metrics {
                eprint!("{}", executor.metrics().export_prometheus());
            }
            if !result.is_success() {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Languages => {
            for plan in executor.registry().plans() {
                let steps = if plan.compile_command().is_some() {
                    "compile + run"
                } else {
                    "run"
                };
                println!("{:<12} .{:<5} {}", plan.id(), plan.extension(), steps);
            }
            Ok(())
        }
        Commands::CheckDeps { verbose } => check_language_dependencies(&executor, verbose),
        Commands::Sweep { max_age_secs } => {
            let removed = executor.sweep_stale(Duration::from_secs(max_age_secs))?;
            println!("Removed {} stale workspace(s)", removed);
            Ok(())
        }
    }
}

fn build_config(cli: &Cli) -> Result<ExecutorConfig> {
    // clap already falls back to CODEBOX_CONFIG for --config.
    let mut config = ExecutorConfig::load(cli.config.as_deref())?;

    if let Some(secs) = cli.compile_timeout {
        config.compile_timeout_secs = secs;
    }
    if let Some(secs) = cli.run_timeout {
        config.run_timeout_secs = secs;
    }
    if let Some(root) = &cli.workspace_root {
        config.workspace_root = Some(root.clone());
    }
    config.validate()?;
    Ok(config)
}

fn read_text(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {} {}", what, path.display()))
}

fn emit_result(result: &ExecutionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", result.render());
    }
    Ok(())
}

fn check_language_dependencies(executor: &Executor, verbose: bool) -> Result<()> {
    println!("🔍 Checking language toolchains...");
    println!();

    let statuses = executor.check_toolchains();
    let mut missing = Vec::new();

    for status in &statuses {
        if status.available {
            println!("✅ {} - OK", status.language);
        } else {
            println!("❌ {} - MISSING", status.language);
            missing.push(status.language.as_str());
        }

        if verbose {
            for tool in &status.tools {
                match (&tool.path, &tool.version) {
                    (Some(path), Some(version)) => {
                        println!("  {} -> {} ({})", tool.program, version, path.display())
                    }
                    (Some(path), None) => {
                        println!("  {} -> {} (version unknown)", tool.program, path.display())
                    }
                    (None, _) => println!("  {} -> NOT FOUND", tool.program),
                }
            }
            println!();
        }
    }

    println!();
    if missing.is_empty() {
        println!("🎉 All language toolchains are installed!");
        if verbose {
            println!();
            println!("💡 Usage example:");
            println!("  codebox execute --language=python --code='print(\"Hello World\")'");
        }
        return Ok(());
    }

    println!("❌ Missing language toolchains: {}", missing.join(", "));
    println!();
    println!("Install the missing tools and make sure they are on PATH:");
    for language in &missing {
        match *language {
            "python" => println!("  • python: sudo apt install python3"),
            "javascript" => println!("  • javascript: sudo apt install nodejs"),
            "c" => println!("  • c: sudo apt install gcc"),
            "cpp" => println!("  • cpp: sudo apt install g++"),
            "java" => println!("  • java: sudo apt install openjdk-17-jdk"),
            _ => {}
        }
    }
    std::process::exit(1);
}
