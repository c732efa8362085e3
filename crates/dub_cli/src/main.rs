//! `dub` - drive the dubbing pipeline from the command line.

use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context as _};
use clap::{Parser, Subcommand};

use dub_core::config::ConfigManager;
use dub_core::delivery::{accept_upload, prepare_download, UploadRequest};
use dub_core::logging::init_tracing_with_file;
use dub_core::orchestrator::{
    abort_job, DubbingProcessor, JobRunner, ProgressCallback, Services,
};
use dub_core::store::JobStore;

#[derive(Debug, Parser)]
#[command(name = "dub", version, about = "Dub videos into another language")]
struct Cli {
    /// Settings file; created with defaults if missing.
    #[arg(long, global = true, default_value = ".config/settings.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Register a video as a new job.
    Upload {
        file: PathBuf,
        #[arg(long = "source-lang")]
        source_lang: Option<String>,
        #[arg(long = "target-lang")]
        target_lang: Option<String>,
        /// Name to record instead of the file's own.
        #[arg(long)]
        name: Option<String>,
    },
    /// Run the pipeline for one or more jobs.
    Process {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Print the final job records as JSON.
        #[arg(long)]
        json: bool,
        /// Restart jobs left mid-phase by a run that is no longer alive.
        #[arg(long)]
        force: bool,
    },
    /// Print a job record as JSON.
    Status { id: String },
    /// Mark a job as failed.
    Abort {
        id: String,
        #[arg(long, default_value = "aborted by user")]
        reason: String,
    },
    /// List all jobs.
    List,
    /// Copy a completed job's video out of the workspace.
    Fetch {
        id: String,
        #[arg(long, short)]
        out: PathBuf,
        /// Byte range, e.g. `bytes=0-1023`.
        #[arg(long)]
        range: Option<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("loading {}", cli.config.display()))?;
    config
        .ensure_dirs_exist()
        .context("creating workspace directories")?;
    let _guard = init_tracing_with_file(config.settings().logging.level, &config.logs_folder());

    let settings = config.settings().clone();
    let store = Arc::new(
        JobStore::open(settings.paths.jobs_folder()).context("opening job store")?,
    );

    match cli.command {
        Command::Upload {
            file,
            source_lang,
            target_lang,
            name,
        } => {
            let mut request = UploadRequest::new(file).with_languages(source_lang, target_lang);
            request.original_name = name;
            let job = accept_upload(
                &store,
                &settings.paths.workspace_root(),
                &settings.defaults,
                request,
            )?;
            println!("{}", job.id);
        }
        Command::Process { ids, json, force } => {
            tracing::info!("Processing {} job(s)", ids.len());
            let services =
                Arc::new(Services::from_settings(&settings).context("configuring backends")?);
            let processor = Arc::new(
                DubbingProcessor::new(settings, Arc::clone(&store), services).with_force(force),
            );

            let results = if ids.len() == 1 {
                let progress: ProgressCallback = Box::new(|phase, percent, message| {
                    eprintln!("[{phase:>10}] {percent:>3}% {message}");
                });
                vec![processor.process_job(&ids[0], None, Some(progress))]
            } else {
                JobRunner::new(processor).run_all(&ids)
            };

            let mut failed = 0;
            for result in &results {
                if json {
                    let job = store.load(&result.job_id)?;
                    println!("{}", serde_json::to_string_pretty(&job)?);
                } else if result.success {
                    let output = result
                        .output_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    println!("{}: completed {}", result.job_id, output);
                } else {
                    println!(
                        "{}: failed: {}",
                        result.job_id,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
                if !result.success {
                    failed += 1;
                }
            }
            if failed > 0 {
                bail!("{failed} of {} job(s) failed", results.len());
            }
        }
        Command::Status { id } => {
            let job = store.load(&id)?;
            println!("{}", serde_json::to_string_pretty(&job)?);
        }
        Command::Abort { id, reason } => {
            let job = abort_job(&store, &id, &reason)?;
            println!("{}: {}", job.id, job.status);
        }
        Command::List => {
            for job in store.list()? {
                println!(
                    "{}\t{}\t{}->{}\t{}",
                    job.id,
                    job.status,
                    job.source_language,
                    job.target_language,
                    job.original_name.as_deref().unwrap_or("-")
                );
            }
        }
        Command::Fetch { id, out, range } => {
            let download = prepare_download(&store, &id, range.as_deref())?;
            let mut reader = download
                .open()
                .with_context(|| format!("opening {}", download.path.display()))?;
            let mut writer =
                File::create(&out).with_context(|| format!("creating {}", out.display()))?;
            let copied = io::copy(&mut reader, &mut writer)?;
            if copied != download.content_length() {
                bail!(
                    "short read: expected {} bytes, copied {}",
                    download.content_length(),
                    copied
                );
            }
            match download.content_range() {
                Some(content_range) => eprintln!("{} ({})", out.display(), content_range),
                None => eprintln!("{} ({} bytes)", out.display(), copied),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_upload_with_languages() {
        let cli = Cli::try_parse_from([
            "dub",
            "upload",
            "clip.mp4",
            "--source-lang",
            "fr",
            "--target-lang",
            "de",
        ])
        .unwrap();
        match cli.command {
            Command::Upload {
                file,
                source_lang,
                target_lang,
                name,
            } => {
                assert_eq!(file, PathBuf::from("clip.mp4"));
                assert_eq!(source_lang.as_deref(), Some("fr"));
                assert_eq!(target_lang.as_deref(), Some("de"));
                assert!(name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.config, PathBuf::from(".config/settings.toml"));
    }

    #[test]
    fn process_requires_an_id() {
        assert!(Cli::try_parse_from(["dub", "process"]).is_err());
        let cli = Cli::try_parse_from(["dub", "--config", "x.toml", "process", "a", "b", "--json"])
            .unwrap();
        assert_eq!(cli.config, PathBuf::from("x.toml"));
        assert!(matches!(
            cli.command,
            Command::Process { ref ids, json: true, force: false } if ids.len() == 2
        ));

        let cli = Cli::try_parse_from(["dub", "process", "a", "--force"]).unwrap();
        assert!(matches!(cli.command, Command::Process { force: true, .. }));
    }
}
