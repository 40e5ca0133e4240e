use std::fs::{File, OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use chrono::{DateTime, Utc};
use serde::Serialize;

use datagen_generate::SinkReport;

use super::RegistryResult;

/// Generation parameters recorded with each run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub rows: usize,
    pub threads: usize,
    pub format: String,
    pub seed: Option<u64>,
}

/// What a generate run was asked to do, known before any row exists.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub model_path: PathBuf,
    pub run_dir: PathBuf,
    pub options: RunOptions,
}

#[derive(Debug, Serialize)]
struct RunConfig<'a> {
    run_id: &'a str,
    started_at: String,
    model_path: String,
    options: &'a RunOptions,
    git: GitInfo,
}

#[derive(Debug, Serialize)]
struct GitInfo {
    commit: Option<String>,
    dirty: Option<bool>,
}

/// Directory holding one run's config, log, report and default output.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub logs_path: PathBuf,
    pub report_path: PathBuf,
}

/// Outcome of a finished run, written as `report.json`.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub seed: u64,
    pub duration_ms: u64,
    pub sink: SinkReport,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with `config.json` and an empty
/// `logs.ndjson`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let stamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ");
    let root = ctx.run_dir.join(format!("{stamp}__run_{}", ctx.run_id));
    create_dir_all(&root)?;

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        model_path: ctx.model_path.display().to_string(),
        options: &ctx.options,
        git: GitInfo {
            commit: git(&["rev-parse", "HEAD"])
                .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
                .filter(|commit| !commit.is_empty()),
            dirty: git(&["status", "--porcelain"]).map(|output| !output.stdout.is_empty()),
        },
    };
    write_json(&root.join("config.json"), &config)?;

    let logs_path = root.join("logs.ndjson");
    OpenOptions::new().create(true).append(true).open(&logs_path)?;

    Ok(RunPaths {
        report_path: root.join("report.json"),
        logs_path,
        root,
    })
}

pub fn write_report(paths: &RunPaths, report: &RunReport) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

/// Output of a successful git command; `None` outside a repository.
fn git(args: &[&str]) -> Option<Output> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_directory_holds_config_and_log() {
        let run_dir = std::env::temp_dir().join(format!("datagen-runs-{}", std::process::id()));
        let started_at = DateTime::parse_from_rfc3339("2024-05-01T10:20:30Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        let ctx = RunContext {
            run_id: "abc".to_string(),
            started_at,
            model_path: PathBuf::from("models/m.json"),
            run_dir: run_dir.clone(),
            options: RunOptions {
                rows: 10,
                threads: 2,
                format: "csv".to_string(),
                seed: Some(4),
            },
        };

        let paths = start_run(&ctx).expect("start run");
        assert!(paths.root.ends_with("2024-05-01T10-20-30Z__run_abc"));
        assert!(paths.logs_path.exists());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(paths.root.join("config.json")).expect("read config"),
        )
        .expect("parse config");
        assert_eq!(config["options"]["rows"], 10);
        assert_eq!(config["options"]["seed"], 4);
        assert_eq!(config["model_path"], "models/m.json");

        std::fs::remove_dir_all(&run_dir).ok();
    }
}
