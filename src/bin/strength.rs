//! Strength CLI - Command-line interface for Habit Strength
//!
//! Commands:
//! - recalculate: Recalculate one habit after an edit or a new day
//! - history: Print a habit's day-by-day strength trace
//! - rollover: Apply a new-day event to a list of habits
//! - validate: Check habit records against the storage contract
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use habit_strength::types::parse_day;
use habit_strength::{
    HabitRecord, StrengthConfig, StrengthEngine, StrengthPoint, TracingObserver, ENGINE_VERSION,
    PRODUCER_NAME,
};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter
const LOG_ENV: &str = "STRENGTH_LOG";

/// Strength - Habit strength scores from daily completion records
#[derive(Parser)]
#[command(name = "strength")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Compute habit strength scores and history", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every computing command
#[derive(clap::Args)]
struct EngineArgs {
    /// Calendar day to treat as today (YYYY-MM-DD, defaults to the local date)
    #[arg(long)]
    today: Option<String>,

    /// Smoothing period in days (overrides --config)
    #[arg(long)]
    period: Option<f64>,

    /// Load engine configuration from a JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log every replayed day (set STRENGTH_LOG=habit_strength=trace to see them)
    #[arg(long)]
    trace: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recalculate one habit after an edit or a new day
    Recalculate {
        /// Habit JSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Day that was edited (omit for a new-day event)
        #[arg(long)]
        changed_date: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Print a habit's day-by-day strength trace
    History {
        /// Habit JSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Apply a new-day event to a JSON array of habits
    Rollover {
        /// Habits JSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Check habit records against the storage contract
    Validate {
        /// Habit or habits JSON file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Calendar day to treat as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<String>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// Check a configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one point per line)
    Ndjson,
    /// JSON array of points
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new("habit_strength=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .init();
}

fn run(cli: Cli) -> Result<(), StrengthCliError> {
    match cli.command {
        Commands::Recalculate {
            input,
            output,
            changed_date,
            engine,
        } => cmd_recalculate(&input, &output, changed_date.as_deref(), &engine),

        Commands::History {
            input,
            output,
            output_format,
            engine,
        } => cmd_history(&input, &output, output_format, &engine),

        Commands::Rollover {
            input,
            output,
            engine,
        } => cmd_rollover(&input, &output, &engine),

        Commands::Validate { input, today, json } => cmd_validate(&input, today.as_deref(), json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn cmd_recalculate(
    input: &Path,
    output: &Path,
    changed_date: Option<&str>,
    args: &EngineArgs,
) -> Result<(), StrengthCliError> {
    let engine = build_engine(args)?;
    let today = resolve_today(args.today.as_deref())?;
    let changed = changed_date.map(parse_day).transpose()?;

    let habit = HabitRecord::from_json(&read_input(input)?)?;
    let updated = engine.recalculate(&habit, changed, today);

    tracing::info!(
        habit_id = %updated.id,
        habit_type = updated.habit_type.as_str(),
        before = habit.strength,
        after = updated.strength,
        "habit recalculated"
    );

    write_output(output, &(serde_json::to_string_pretty(&updated)? + "\n"))
}

fn cmd_history(
    input: &Path,
    output: &Path,
    output_format: OutputFormat,
    args: &EngineArgs,
) -> Result<(), StrengthCliError> {
    let engine = build_engine(args)?;
    let today = resolve_today(args.today.as_deref())?;

    let habit = HabitRecord::from_json(&read_input(input)?)?;
    let points = engine.history(&habit, today);

    tracing::info!(habit_id = %habit.id, days = points.len(), "history reconstructed");

    write_output(output, &format_points(&points, &output_format)?)
}

fn cmd_rollover(input: &Path, output: &Path, args: &EngineArgs) -> Result<(), StrengthCliError> {
    let engine = build_engine(args)?;
    let today = resolve_today(args.today.as_deref())?;

    let habits = read_habits(&read_input(input)?)?;
    if habits.is_empty() {
        return Err(StrengthCliError::NoHabits);
    }
    let rolled = engine.rollover(&habits, today);

    tracing::info!(habits = rolled.len(), %today, "rollover applied");

    write_output(output, &(serde_json::to_string_pretty(&rolled)? + "\n"))
}

fn cmd_validate(input: &Path, today: Option<&str>, json: bool) -> Result<(), StrengthCliError> {
    let today = resolve_today(today)?;
    let habits = read_habits(&read_input(input)?)?;

    let errors: Vec<ValidationErrorDetail> = habits
        .iter()
        .enumerate()
        .filter_map(|(index, habit)| {
            habit.validate(today).err().map(|e| ValidationErrorDetail {
                index,
                habit_id: habit.id.clone(),
                habit_type: habit.habit_type.as_str(),
                error: e.to_string(),
            })
        })
        .collect();

    let report = ValidationReport {
        total_habits: habits.len(),
        valid_habits: habits.len() - errors.len(),
        invalid_habits: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total habits:   {}", report.total_habits);
        println!("Valid habits:   {}", report.valid_habits);
        println!("Invalid habits: {}", report.invalid_habits);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - {} habit {} (index {}): {}",
                    err.habit_type, err.habit_id, err.index, err.error
                );
            }
        }
    }

    if report.invalid_habits > 0 {
        Err(StrengthCliError::ValidationFailed(report.invalid_habits))
    } else {
        Ok(())
    }
}

fn cmd_doctor(config: Option<&Path>, json: bool) -> Result<(), StrengthCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Habit strength engine {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "today".to_string(),
        status: CheckStatus::Ok,
        message: format!("Local calendar day is {}", StrengthEngine::today()),
    });

    if let Some(config_path) = config {
        let check = if config_path.exists() {
            match fs::read_to_string(config_path) {
                Ok(content) => match StrengthConfig::from_json(&content) {
                    Ok(config) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Ok,
                        message: format!(
                            "Config valid (period {} days, alpha {:.4})",
                            config.period,
                            config.alpha()
                        ),
                    },
                    Err(e) => DoctorCheck {
                        name: "config".to_string(),
                        status: CheckStatus::Error,
                        message: format!("Invalid config: {}", e),
                    },
                },
                Err(e) => DoctorCheck {
                    name: "config".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Cannot read config file: {}", e),
                },
            }
        } else {
            DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Warning,
                message: "Config file does not exist, defaults apply".to_string(),
            }
        };
        checks.push(check);
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass files with -i)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (-i - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Strength Doctor Report");
        println!("======================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(StrengthCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Helper functions

fn build_engine(args: &EngineArgs) -> Result<StrengthEngine, StrengthCliError> {
    let mut config = match &args.config {
        Some(path) => StrengthConfig::from_json(&fs::read_to_string(path)?)?,
        None => StrengthConfig::default(),
    };
    if let Some(period) = args.period {
        config.period = period;
    }

    let engine = StrengthEngine::with_config(config)?;
    Ok(if args.trace {
        engine.with_observer(TracingObserver)
    } else {
        engine
    })
}

fn resolve_today(today: Option<&str>) -> Result<NaiveDate, StrengthCliError> {
    match today {
        Some(raw) => Ok(parse_day(raw)?),
        None => Ok(StrengthEngine::today()),
    }
}

fn read_input(input: &Path) -> Result<String, StrengthCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), StrengthCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

/// Accept either a single habit object or an array of habits
fn read_habits(data: &str) -> Result<Vec<HabitRecord>, StrengthCliError> {
    let value: serde_json::Value = serde_json::from_str(data)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

fn format_points(points: &[StrengthPoint], format: &OutputFormat) -> Result<String, StrengthCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for point in points {
                lines.push(serde_json::to_string(point)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(points)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(points)?),
    }
}

// Error types

#[derive(Debug)]
enum StrengthCliError {
    Io(io::Error),
    Engine(habit_strength::StrengthError),
    Json(serde_json::Error),
    NoHabits,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for StrengthCliError {
    fn from(e: io::Error) -> Self {
        StrengthCliError::Io(e)
    }
}

impl From<habit_strength::StrengthError> for StrengthCliError {
    fn from(e: habit_strength::StrengthError) -> Self {
        StrengthCliError::Engine(e)
    }
}

impl From<serde_json::Error> for StrengthCliError {
    fn from(e: serde_json::Error) -> Self {
        StrengthCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StrengthCliError> for CliError {
    fn from(e: StrengthCliError) -> Self {
        match e {
            StrengthCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StrengthCliError::Engine(e) => CliError {
                code: "ENGINE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Dates are YYYY-MM-DD and the period must be positive".to_string()),
            },
            StrengthCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input matches the habit record schema".to_string()),
            },
            StrengthCliError::NoHabits => CliError {
                code: "NO_HABITS".to_string(),
                message: "No habits found in input".to_string(),
                hint: Some("Pass a JSON array with at least one habit".to_string()),
            },
            StrengthCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} habits failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            StrengthCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_habits: usize,
    valid_habits: usize,
    invalid_habits: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    habit_id: String,
    habit_type: &'static str,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
