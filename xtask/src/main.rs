use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const LAMBDA_PACKAGE: &str = "invalidation_lambda";
const LAMBDA_BINARY: &str = "create_invalidation";
const DIST_DIR: &str = "infra/dist";
const DEFAULT_TARGET: &str = "x86_64-unknown-linux-gnu";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the CDN invalidation workspace",
    long_about = "A unified CLI for running CI checks and packaging the\n\
                  create_invalidation Lambda for deployment."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build and zip the create_invalidation Lambda as a `bootstrap` artifact
    LambdaPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = DEFAULT_TARGET)]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Tests only
    Test,
    /// Check followed by a release Lambda package
    All,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn section(label: &str) {
    eprintln!("\n--- {label} ---");
}

fn run_cargo(args: &[&str]) -> Result<(), String> {
    eprintln!("$ cargo {}", args.join(" "));
    let status = Command::new("cargo")
        .args(args)
        .status()
        .map_err(|error| format!("could not spawn cargo: {error}"))?;
    exit_status_ok("cargo", args, status)
}

fn exit_status_ok(program: &str, args: &[&str], status: ExitStatus) -> Result<(), String> {
    if status.success() {
        return Ok(());
    }
    Err(format!(
        "`{program} {}` exited with {}",
        args.join(" "),
        status
            .code()
            .map_or_else(|| "a signal".to_string(), |code| format!("code {code}"))
    ))
}

fn package_lambda(target: &str, profile: BuildProfile) -> Result<(), String> {
    check_target_installed(target)?;

    section(&format!("Build {LAMBDA_BINARY} for {target}"));
    let mut build_args = vec![
        "build",
        "-p",
        LAMBDA_PACKAGE,
        "--bin",
        LAMBDA_BINARY,
        "--target",
        target,
    ];
    build_args.extend(profile.as_cargo_flag());
    run_cargo(&build_args)?;

    section("Zip bootstrap artifact");
    let binary_path = Path::new("target")
        .join(target)
        .join(profile.dir_name())
        .join(LAMBDA_BINARY);
    let dist_dir = Path::new(DIST_DIR);
    fs::create_dir_all(dist_dir)
        .map_err(|error| format!("could not create {}: {error}", dist_dir.display()))?;

    let zip_path = dist_dir.join(format!("{LAMBDA_BINARY}.zip"));
    write_bootstrap_zip(&binary_path, &zip_path)?;

    eprintln!("\nLambda artifact written to {}", zip_path.display());
    Ok(())
}

/// Lambda `provided.al2023` runtimes only run Linux binaries.
fn check_target_installed(target: &str) -> Result<(), String> {
    if !target.contains("linux") {
        return Err(format!(
            "target `{target}` cannot run on Lambda; use a *-unknown-linux-* triple"
        ));
    }

    let output = match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        Ok(_) | Err(_) => {
            eprintln!("warning: could not query rustup; assuming `{target}` is installed");
            return Ok(());
        }
    };

    let installed = String::from_utf8_lossy(&output.stdout);
    if installed.lines().map(str::trim).any(|line| line == target) {
        Ok(())
    } else {
        Err(format!(
            "rust target `{target}` is missing; run `rustup target add {target}` first"
        ))
    }
}

fn write_bootstrap_zip(binary_path: &Path, zip_path: &Path) -> Result<(), String> {
    let binary = fs::read(binary_path)
        .map_err(|error| format!("could not read {}: {error}", binary_path.display()))?;
    let file = fs::File::create(zip_path)
        .map_err(|error| format!("could not create {}: {error}", zip_path.display()))?;

    let mut archive = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    archive
        .start_file("bootstrap", options)
        .map_err(|error| format!("could not add bootstrap entry: {error}"))?;
    archive
        .write_all(&binary)
        .map_err(|error| format!("could not write bootstrap entry: {error}"))?;
    archive
        .finish()
        .map_err(|error| format!("could not finish {}: {error}", zip_path.display()))?;
    Ok(())
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() -> Result<(), String> {
    section("rustfmt");
    run_cargo(&["fmt", "--all", "--", "--check"])?;

    section("clippy");
    run_cargo(&[
        "clippy",
        "--workspace",
        "--all-targets",
        "--",
        "-D",
        "warnings",
    ])?;

    ci_test()
}

fn ci_test() -> Result<(), String> {
    for package in ["invalidation_core", LAMBDA_PACKAGE] {
        section(&format!("tests: {package}"));
        run_cargo(&["test", "-p", package])?;
    }
    Ok(())
}

fn run(command: Commands) -> Result<(), String> {
    match command {
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check()?,
                CiJob::Test => ci_test()?,
                CiJob::All => {
                    ci_check()?;
                    package_lambda(DEFAULT_TARGET, BuildProfile::Release)?;
                }
            }
            eprintln!("\nCI job passed.");
            Ok(())
        }
        Commands::LambdaPackage { target, profile } => package_lambda(&target, profile),
    }
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    if let Err(message) = run(Cli::parse().command) {
        eprintln!("error: {message}");
        exit(1);
    }
}
