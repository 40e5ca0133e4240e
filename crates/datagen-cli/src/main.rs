mod registry;
mod workspace;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use datagen_definition::{
    IssueSeverity, ValidationIssue, ValidationReport, model_json_schema, validate_model,
};
use datagen_generate::{GenerationError, Model, write_rows_csv, write_rows_json};
use registry::{
    RunContext, RunOptions, RunReport, init_console_logging, init_run_logging, start_run,
    write_report,
};
use thiserror::Error;
use uuid::Uuid;
use workspace::{DatagenSettings, OutputFormat, load_or_create_settings, write_bytes_atomic};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("settings error: {0}")]
    Workspace(#[from] workspace::WorkspaceError),
    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("model rejected: {0}")]
    Rejected(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "datagen", version, about = "Synthetic data generator")]
struct Cli {
    /// Settings file, created with defaults when missing.
    #[arg(long, global = true, default_value = "datagen.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate rows from a model into a new run directory.
    Generate(GenerateArgs),
    /// Check a model document and list its issues.
    Validate(ValidateArgs),
    /// Print the JSON Schema of model documents.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Model document (JSON).
    #[arg(long)]
    model: PathBuf,
    /// Number of rows; defaults to the configured batch size.
    #[arg(long)]
    rows: Option<usize>,
    /// Worker threads; defaults to the configured thread count.
    #[arg(long)]
    threads: Option<usize>,
    /// Output format.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Seed overriding the model and settings seeds.
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Optional output path for the rows, instead of the run directory.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Model document (JSON).
    #[arg(long)]
    model: PathBuf,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Optional output path; stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let settings = load_or_create_settings(&cli.config)?;

    match cli.command {
        Command::Generate(args) => run_generate(args, &settings),
        Command::Validate(args) => {
            init_console_logging(&settings.log_level)?;
            run_validate(args)
        }
        Command::Schema(args) => {
            init_console_logging(&settings.log_level)?;
            run_schema(args)
        }
    }
}

fn run_generate(args: GenerateArgs, settings: &DatagenSettings) -> Result<(), CliError> {
    let rows = args.rows.unwrap_or(settings.batch_size);
    let threads = args.threads.unwrap_or(settings.threads);
    if threads == 0 {
        return Err(CliError::InvalidConfig(
            "thread count must be at least 1".to_string(),
        ));
    }
    let format = args.format.unwrap_or(settings.format);

    let mut definition = load_model(&args.model)?;
    definition.seed = args.seed.or(definition.seed).or(settings.seed);

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        model_path: args.model.clone(),
        run_dir: args.run_dir.unwrap_or_else(|| settings.runs_dir.clone()),
        options: RunOptions {
            rows,
            threads,
            format: format.to_string(),
            seed: definition.seed,
        },
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path, &settings.log_level)?;
    tracing::info!(event = "run_started", run_id = %run_id, model = %args.model.display());

    let timer = Instant::now();
    let model = Model::build(&definition)?;
    let generated = model.generate_random_rows(rows, threads)?;

    let out_path = output_path(&run_paths.root, args.out.as_deref(), format);
    let sink = match format {
        OutputFormat::Csv => write_rows_csv(&out_path, &model, &generated)?,
        OutputFormat::Json => write_rows_json(&out_path, &model, &generated)?,
    };
    tracing::info!(
        event = "rows_written",
        path = %out_path.display(),
        rows = sink.rows,
        bytes = sink.bytes_written
    );

    let duration_ms = timer.elapsed().as_millis() as u64;
    write_report(
        &run_paths,
        &RunReport {
            run_id,
            seed: model.seed(),
            duration_ms,
            sink,
        },
    )?;
    tracing::info!(event = "run_finished", status = "success", duration_ms);

    println!("{}", run_paths.root.display());
    Ok(())
}

fn run_validate(args: ValidateArgs) -> Result<(), CliError> {
    let document = read_document(&args.model)?;
    match validate_model(&document) {
        Ok(validated) => {
            for issue in &validated.warnings {
                println!("{}", describe_issue(issue));
            }
            println!(
                "{}: ok ({} fields, {} warnings)",
                args.model.display(),
                validated.definition.fields.len(),
                validated.warnings.len()
            );
            Ok(())
        }
        Err(report) => {
            for issue in report.errors.iter().chain(&report.warnings) {
                println!("{}", describe_issue(issue));
            }
            Err(CliError::Rejected(report.summary()))
        }
    }
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(&model_json_schema())?;
    match args.out {
        Some(path) => {
            write_bytes_atomic(&path, encoded.as_bytes())?;
            tracing::info!(path = %path.display(), "schema written");
        }
        None => println!("{encoded}"),
    }
    Ok(())
}

fn read_document(path: &Path) -> Result<serde_json::Value, CliError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Structural and semantic checks; `Model::build` logs the warnings.
fn load_model(path: &Path) -> Result<datagen_definition::ModelDefinition, CliError> {
    let document = read_document(path)?;
    validate_model(&document)
        .map(|validated| validated.definition)
        .map_err(|report: ValidationReport| CliError::Rejected(report.summary()))
}

fn output_path(run_root: &Path, out: Option<&Path>, format: OutputFormat) -> PathBuf {
    match out {
        Some(path) => path.to_path_buf(),
        None => run_root.join(format!("rows.{}", format.extension())),
    }
}

fn describe_issue(issue: &ValidationIssue) -> String {
    let level = match issue.severity {
        IssueSeverity::Error => "error",
        IssueSeverity::Warning => "warning",
    };
    let mut line = format!("{level} {} at {}: {}", issue.code, issue.path, issue.message);
    if let Some(hint) = &issue.hint {
        line.push_str(&format!(" (hint: {hint})"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_flags_are_optional_except_the_model() {
        let cli = Cli::try_parse_from(["datagen", "generate", "--model", "m.json"]).expect("parse");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.model, PathBuf::from("m.json"));
        assert!(args.rows.is_none());
        assert!(args.format.is_none());
        assert_eq!(cli.config, PathBuf::from("datagen.toml"));
    }

    #[test]
    fn format_accepts_csv_and_json_only() {
        let cli = Cli::try_parse_from([
            "datagen", "generate", "--model", "m.json", "--format", "json", "--rows", "5",
        ])
        .expect("parse");
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert_eq!(args.rows, Some(5));
        assert!(
            Cli::try_parse_from(["datagen", "generate", "--model", "m", "--format", "xml"])
                .is_err()
        );
    }

    #[test]
    fn rows_land_in_the_run_directory_unless_redirected() {
        let root = Path::new("runs/r1");
        assert_eq!(
            output_path(root, None, OutputFormat::Csv),
            PathBuf::from("runs/r1/rows.csv")
        );
        assert_eq!(
            output_path(root, None, OutputFormat::Json),
            PathBuf::from("runs/r1/rows.ndjson")
        );
        assert_eq!(
            output_path(root, Some(Path::new("out.csv")), OutputFormat::Csv),
            PathBuf::from("out.csv")
        );
    }

    #[test]
    fn issues_render_with_hints() {
        let issue = ValidationIssue::new(
            IssueSeverity::Error,
            "unknown_field",
            "/fields/0",
            "nope",
            Some("check the name".to_string()),
        );
        assert_eq!(
            describe_issue(&issue),
            "error unknown_field at /fields/0: nope (hint: check the name)"
        );
    }
}
