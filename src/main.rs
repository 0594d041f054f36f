use std::path::Path;
use std::process::ExitCode;

use pdfpress::config::job::JobFile;
use pdfpress::config::{self};
use pdfpress::pipeline::job_runner::JobConfig;
use pdfpress::pipeline::orchestrator::run_all_jobs;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!("Usage: pdfpress <jobs.yaml>...");
        eprintln!("  Merge, split and compress PDF and image files according to job specifications.");
        return if args.is_empty() {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        };
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        eprintln!("pdfpress {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }

    let mut job_configs: Vec<JobConfig> = Vec::new();

    for job_file_arg in &args {
        let job_file_path = Path::new(job_file_arg);

        // Load settings from the same directory as the job file.
        let settings = match config::load_settings_for_job(job_file_path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("ERROR: Failed to load settings for {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let yaml_content = match std::fs::read_to_string(job_file_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("ERROR: Failed to read job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        let job_file: JobFile = match serde_yml::from_str(&yaml_content) {
            Ok(jf) => jf,
            Err(e) => {
                eprintln!("ERROR: Failed to parse job file {job_file_arg}: {e}");
                return ExitCode::FAILURE;
            }
        };

        // Relative paths are resolved against the job file directory.
        let job_dir = job_file_path.parent().unwrap_or_else(|| Path::new("."));

        for job in &job_file.jobs {
            match JobConfig::from_job(job, &settings, job_dir) {
                Ok(c) => job_configs.push(c),
                Err(e) => {
                    eprintln!("ERROR: {job_file_arg}: {e}");
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    let results = run_all_jobs(&job_configs);

    let mut has_error = false;
    for (config, result) in job_configs.iter().zip(&results) {
        match result {
            Ok(job_result) => {
                let estimate = job_result.estimate;
                match job_result.output_len {
                    Some(len) => eprintln!(
                        "OK: {} ({} pages, {} bytes; estimated {} -> {} bytes)",
                        job_result.output_path.display(),
                        job_result.pages_written,
                        len,
                        estimate.before,
                        estimate.after
                    ),
                    None => eprintln!(
                        "ESTIMATE: {}: {} -> {} bytes ({:.0}%)",
                        job_result.output_path.display(),
                        estimate.before,
                        estimate.after,
                        estimate.ratio() * 100.0
                    ),
                }
                for note in &job_result.skipped {
                    eprintln!(
                        "WARN: {}: skipped unit #{}: {}",
                        job_result.output_path.display(),
                        note.position + 1,
                        note.reason
                    );
                }
            }
            Err(e) => {
                eprintln!("ERROR: {}: {e}", config.output_path.display());
                has_error = true;
            }
        }
    }

    if has_error {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
