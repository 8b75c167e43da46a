//! CLI for the generate-compile-repair loop.
//!
//! # Usage
//!
//! ```bash
//! # Generate a C program against a local completion service
//! evolve --objective "print the first 10 primes, one per line"
//!
//! # Objective from a file, custom compiler, tighter budget
//! evolve -f objective.txt --compiler tcc --max-attempts 3
//!
//! # Keep artifacts in a chosen directory and run the binary on success
//! evolve --objective "..." --workdir ./out --run
//! ```
//!
//! On `Exhausted`/`Aborted` the full attempt history (every prompt, raw
//! response, candidate and diagnostic) is written as JSON next to the
//! attempt files so the failure trail can be audited.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use evo_client::{CompletionClient, CompletionConfig};
use evo_core::{CancelToken, FinalOutcome, LoopResult, Objective};
use evo_loop::{LoopConfig, LoopController};
use evo_verifier::{BuildVerifier, CompilerConfig};

#[derive(Debug, Parser)]
#[command(
    name = "evolve",
    about = "Generate-compile-repair loop driven by a local completion service"
)]
struct Args {
    /// Objective: what the generated program must do
    #[arg(short, long, conflicts_with = "objective_file")]
    objective: Option<String>,

    /// Read the objective from a file
    #[arg(short = 'f', long)]
    objective_file: Option<PathBuf>,

    /// Completion service endpoint
    #[arg(long, default_value = "http://localhost:11434/api/generate")]
    endpoint: String,

    /// Model name passed to the completion service
    #[arg(short, long, default_value = "codellama")]
    model: String,

    /// Target language tag (also used as the source file extension)
    #[arg(short, long, default_value = "c")]
    language: String,

    /// Compiler executable
    #[arg(long, default_value = "cc")]
    compiler: String,

    /// Extra compiler arguments (repeatable)
    #[arg(long = "compiler-arg")]
    compiler_args: Vec<String>,

    /// Maximum number of generate-verify attempts
    #[arg(short = 'n', long, default_value_t = 5)]
    max_attempts: u32,

    /// Sampling temperature for the first attempt
    #[arg(long, default_value_t = 0.8)]
    temperature: f32,

    /// Sampling temperature for repair attempts
    #[arg(long, default_value_t = 0.4)]
    repair_temperature: f32,

    /// Completion request timeout in seconds
    #[arg(long, default_value_t = 120)]
    request_timeout: u64,

    /// Compiler timeout in seconds
    #[arg(long, default_value_t = 60)]
    compile_timeout: u64,

    /// Working directory for attempt files (default: fresh temp directory,
    /// kept on disk). Must be exclusive to this run.
    #[arg(short, long)]
    workdir: Option<PathBuf>,

    /// On success, also execute the compiled binary and print its output.
    /// Runtime behavior never gates the loop's outcome.
    #[arg(long)]
    run: bool,

    /// Where to write the attempt history JSON on failure
    /// (default: <workdir>/history.json)
    #[arg(long)]
    history: Option<PathBuf>,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let description = match read_objective(&args) {
        Ok(text) => text,
        Err(message) => {
            eprintln!("Error: {}", message);
            return ExitCode::FAILURE;
        }
    };
    let objective = Objective::new(description, args.language.clone());

    let workdir = match resolve_workdir(args.workdir.clone()) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Error creating working directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let client = match CompletionClient::new(CompletionConfig {
        endpoint: args.endpoint.clone(),
        model: args.model.clone(),
    }) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error creating completion client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let verifier = BuildVerifier::new(
        CompilerConfig {
            command: args.compiler.clone(),
            args: args.compiler_args.clone(),
            source_extension: args.language.clone(),
            timeout: Duration::from_secs(args.compile_timeout),
        },
        workdir.clone(),
    );

    let config = LoopConfig {
        max_attempts: args.max_attempts,
        initial_temperature: args.temperature,
        repair_temperature: args.repair_temperature,
        request_timeout: Duration::from_secs(args.request_timeout),
        verbose: !args.quiet,
    };

    let controller = match LoopController::new(client, verifier, config) {
        Ok(controller) => controller,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Ctrl-C stops the loop at the next iteration boundary; the in-flight
    // request or compile is allowed to finish.
    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupt received, finishing current attempt...");
                cancel.cancel();
            }
        });
    }

    if !args.quiet {
        println!("Generate-Compile-Repair Loop");
        println!("============================");
        println!("Endpoint: {}", args.endpoint);
        println!("Model: {}", args.model);
        println!("Compiler: {}", args.compiler);
        println!("Workdir: {}", workdir.display());
        println!();
    }

    let result = controller.run(&objective, &cancel).await;

    println!();
    println!("{}", result.format_summary());

    match &result.final_outcome {
        FinalOutcome::Success { binary_path, .. } => {
            if args.run {
                run_binary(binary_path, Duration::from_secs(args.compile_timeout)).await;
            }
            ExitCode::SUCCESS
        }
        _ => {
            let history_path = args
                .history
                .clone()
                .unwrap_or_else(|| workdir.join("history.json"));
            write_history(&result, &history_path);
            ExitCode::FAILURE
        }
    }
}

fn read_objective(args: &Args) -> Result<String, String> {
    if let Some(ref text) = args.objective {
        return Ok(text.clone());
    }
    if let Some(ref path) = args.objective_file {
        return std::fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .map_err(|e| format!("failed to read {}: {}", path.display(), e));
    }
    Err("--objective or --objective-file is required".to_string())
}

/// Use the caller's directory, or create a fresh temp directory that is
/// kept on disk so attempt files survive for inspection.
fn resolve_workdir(requested: Option<PathBuf>) -> std::io::Result<PathBuf> {
    match requested {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            Ok(dir)
        }
        None => {
            let dir = tempfile::Builder::new().prefix("evolve-").tempdir()?;
            Ok(dir.into_path())
        }
    }
}

/// Execute the freshly built binary and report its output. Strictly a
/// side action: failures here do not change the loop's outcome.
async fn run_binary(binary_path: &std::path::Path, timeout: Duration) {
    println!("Running {}", binary_path.display());
    let result = tokio::time::timeout(
        timeout,
        tokio::process::Command::new(binary_path).output(),
    )
    .await;

    match result {
        Ok(Ok(output)) => {
            print!("{}", String::from_utf8_lossy(&output.stdout));
            let stderr = String::from_utf8_lossy(&output.stderr);
            if !stderr.trim().is_empty() {
                eprint!("{}", stderr);
            }
            println!("Exit status: {}", output.status);
        }
        Ok(Err(e)) => eprintln!("Failed to run binary: {}", e),
        Err(_) => eprintln!("Binary did not finish within {:?}", timeout),
    }
}

fn write_history(result: &LoopResult, path: &std::path::Path) {
    match serde_json::to_vec_pretty(result) {
        Ok(json) => match std::fs::write(path, json) {
            Ok(()) => println!("Attempt history written to {}", path.display()),
            Err(e) => eprintln!("Failed to write history: {}", e),
        },
        Err(e) => eprintln!("Failed to serialize history: {}", e),
    }
}
