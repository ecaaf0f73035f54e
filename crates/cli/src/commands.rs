//! Subcommand implementations.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use storyreel_client::api::{BatchApi, EngineApi};
use storyreel_client::config::ClientConfig;
use storyreel_client::poller::JobPoller;
use storyreel_client::session::GenerationSession;
use storyreel_client::watch::{BatchWatcher, WatchOutcome};
use storyreel_core::batch::{BatchItemInput, CreateBatchRequest};
use storyreel_core::job::CreateJobRequest;
use storyreel_core::logs::recent_lines;
use storyreel_core::progress::derive_step_views;
use storyreel_core::session::{GenerationState, SessionPhase};
use tokio_util::sync::CancellationToken;

use crate::cli::{BatchCommand, BatchInput, GenerateArgs};
use crate::error::{CliError, Result};
use crate::render;

pub struct CommandExecutor {
    config: ClientConfig,
    json: bool,
}

impl CommandExecutor {
    pub fn new(config: ClientConfig, json: bool) -> Self {
        Self { config, json }
    }

    fn engine(&self) -> Result<Arc<EngineApi>> {
        Ok(Arc::new(EngineApi::new(
            &self.config.engine_url,
            self.config.request_timeout,
        )?))
    }

    fn batch_api(&self) -> Result<Arc<BatchApi>> {
        Ok(Arc::new(BatchApi::new(
            &self.config.batch_service_url,
            self.config.request_timeout,
        )?))
    }

    fn print_json<T: Serialize>(&self, value: &T) -> Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }

    // ---- jobs ----

    /// Create a job and follow it until it finishes. Ctrl-C cancels it.
    pub async fn generate(&self, args: GenerateArgs) -> Result<()> {
        let text = read_text(args.text, args.file.as_deref())?;
        let engine = self.engine()?;
        let poller = JobPoller::new(engine.clone(), self.config.retry_policy());
        let session = GenerationSession::new(poller, engine);
        let mut updates = session.subscribe();

        let job_id = session
            .start(CreateJobRequest {
                text,
                title: args.title,
                channel_id: args.channel,
                config_override: None,
            })
            .await?;
        if !self.json {
            println!("Job {job_id} created");
        }

        let mut printer = ProgressPrinter::default();
        let state = loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break session.state();
                    }
                    let state = updates.borrow_and_update().clone();
                    if !self.json {
                        printer.print(&state);
                    }
                    if state.phase.is_finished() {
                        break state;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("Cancelling job {job_id}...");
                    session.cancel().await;
                }
            }
        };

        if self.json {
            self.print_json(&state)?;
        }

        match state.phase {
            SessionPhase::Completed => {
                if let (Some(result), false) = (&state.result, self.json) {
                    println!("{}", render::render_result(result));
                }
                Ok(())
            }
            SessionPhase::Cancelled => {
                if !self.json {
                    println!("Job {job_id} cancelled");
                }
                Ok(())
            }
            _ => Err(CliError::JobFailed(
                state.error.unwrap_or_else(|| "unknown error".to_string()),
            )),
        }
    }

    pub async fn status(&self, job_id: &str, log_lines: usize) -> Result<()> {
        let job = self.engine()?.get_job(job_id).await?;
        if self.json {
            return self.print_json(&job);
        }

        println!(
            "Job {} {} {}",
            job.id,
            job.status.as_str(),
            render::progress_bar(job.progress)
        );
        println!("{}", render::render_steps(&derive_step_views(&job, None)));
        if let Some(error) = &job.error {
            println!("error: {error}");
        }
        for line in recent_lines(&job.logs, log_lines) {
            println!("{}", render::render_log_line(line));
        }
        Ok(())
    }

    pub async fn cancel_job(&self, job_id: &str) -> Result<()> {
        self.engine()?.cancel_job(job_id).await?;
        println!("Cancellation requested for job {job_id}");
        Ok(())
    }

    pub async fn delete_job(&self, job_id: &str) -> Result<()> {
        self.engine()?.delete_job(job_id).await?;
        println!("Job {job_id} deleted");
        Ok(())
    }

    // ---- batches ----

    pub async fn batch(&self, command: BatchCommand) -> Result<()> {
        let api = self.batch_api()?;

        match command {
            BatchCommand::Analyze(input) => {
                let analysis = api.analyze(&read_batch_input(&input)?).await?;
                if self.json {
                    return self.print_json(&analysis);
                }
                println!("{}", render::render_analysis(&analysis));
            }
            BatchCommand::Create { input, watch } => {
                let created = api.create(&read_batch_input(&input)?).await?;
                if self.json {
                    self.print_json(&created)?;
                } else {
                    println!(
                        "{} ({}, ~{} of video)",
                        created.message,
                        created.batch_id,
                        render::format_duration(created.estimated_total_duration_seconds)
                    );
                }
                if watch {
                    self.watch_batch(api, &created.batch_id).await?;
                }
            }
            BatchCommand::List { status, limit } => {
                let list = api.list(status, Some(limit)).await?;
                if self.json {
                    return self.print_json(&list);
                }
                println!("{}", render::render_batch_list(&list));
            }
            BatchCommand::Watch { batch_id } => self.watch_batch(api, &batch_id).await?,
            BatchCommand::Pause { batch_id } => {
                api.pause(&batch_id).await?;
                println!("Pause requested; batch {batch_id} stops after the current item");
            }
            BatchCommand::Resume { batch_id } => {
                api.resume(&batch_id).await?;
                println!("Batch {batch_id} resumed");
            }
            BatchCommand::Cancel { batch_id } => {
                api.cancel(&batch_id).await?;
                println!("Cancellation requested for batch {batch_id}");
            }
            BatchCommand::Delete { batch_id } => {
                api.delete(&batch_id).await?;
                println!("Batch {batch_id} deleted");
            }
        }
        Ok(())
    }

    /// Redraw the batch on every change until it finishes. Ctrl-C stops
    /// watching; the batch keeps running.
    async fn watch_batch(&self, api: Arc<BatchApi>, batch_id: &str) -> Result<()> {
        let watcher = BatchWatcher::new(api, self.config.poll_interval);
        let stop = CancellationToken::new();
        let ctrl_c = {
            let stop = stop.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    stop.cancel();
                }
            })
        };

        let json = self.json;
        let mut last = String::new();
        let outcome = watcher
            .run(batch_id, &stop, |batch| {
                if json {
                    return;
                }
                let view = render::render_batch(batch);
                if view != last {
                    println!("{view}\n");
                    last = view;
                }
            })
            .await;
        ctrl_c.abort();

        match outcome {
            WatchOutcome::Finished(batch) if json => self.print_json(&batch),
            WatchOutcome::Finished(_) | WatchOutcome::Stopped => Ok(()),
            WatchOutcome::Gone => Err(CliError::BatchGone(batch_id.to_string())),
        }
    }
}

/// Prints progress and new log lines as a generation advances.
#[derive(Default)]
struct ProgressPrinter {
    last_line: String,
    logs_printed: usize,
}

impl ProgressPrinter {
    fn print(&mut self, state: &GenerationState) {
        let line = format!(
            "{} {}",
            render::progress_bar(state.progress),
            state.current_step
        );
        if line != self.last_line {
            println!("{line}");
            self.last_line = line;
        }

        // Logs are append-only within a run; a shorter log means a new run.
        if state.logs.len() < self.logs_printed {
            self.logs_printed = 0;
        }
        for log in &state.logs[self.logs_printed..] {
            println!("  {}", render::render_log_line(log));
        }
        self.logs_printed = state.logs.len();

        if state.phase == SessionPhase::Failed {
            println!("{}", render::render_steps(&state.step_views()));
        }
    }
}

/// Script text from `--text`, a file, or stdin (`-` or no file).
fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    let text = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) if path != Path::new("-") => std::fs::read_to_string(path)?,
        (None, _) => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    if text.trim().is_empty() {
        return Err(CliError::Input("Script text is empty".into()));
    }
    Ok(text)
}

fn read_batch_input(input: &BatchInput) -> Result<CreateBatchRequest> {
    let items = input
        .files
        .iter()
        .map(|path| -> Result<BatchItemInput> {
            Ok(BatchItemInput {
                title: title_from_path(path),
                text: std::fs::read_to_string(path)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CreateBatchRequest {
        name: input.name.clone(),
        items,
        channel_id: input.channel.clone(),
        config_override: None,
    })
}

fn title_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
}
