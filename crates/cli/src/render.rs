//! Plain-text rendering for terminal output.

use storyreel_core::batch::{Batch, BatchItemStatus, BatchListResponse};
use storyreel_core::estimation::BatchAnalysis;
use storyreel_core::job::JobResult;
use storyreel_core::logs::LogLine;
use storyreel_core::progress::{StepState, StepView};

const BAR_WIDTH: usize = 30;

pub fn step_marker(state: StepState) -> &'static str {
    match state {
        StepState::Pending => "[ ]",
        StepState::Active => "[>]",
        StepState::Completed => "[x]",
        StepState::Failed => "[!]",
    }
}

/// One line per pipeline step, e.g. `[>] Images (3/10)`.
pub fn render_steps(views: &[StepView]) -> String {
    views
        .iter()
        .map(|view| match &view.detail {
            Some(detail) => format!("{} {} ({detail})", step_marker(view.state), view.label),
            None => format!("{} {}", step_marker(view.state), view.label),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `[ERR] message`, tagged by severity.
pub fn render_log_line(line: &LogLine) -> String {
    format!("[{}] {}", line.severity().tag(), line.message())
}

/// `[#########---------------]  30%` for a progress in `[0, 1]`.
pub fn progress_bar(progress: f64) -> String {
    let progress = progress.clamp(0.0, 1.0);
    let filled = (progress * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        progress * 100.0
    )
}

/// `1h 02m 03s`, `4m 05s` or `12s`.
pub fn format_duration(seconds: f64) -> String {
    let total = seconds.max(0.0).round() as u64;
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}

pub fn render_result(result: &JobResult) -> String {
    let mut lines = vec![format!("Job {} completed", result.job_id)];
    if let Some(path) = &result.video_path {
        lines.push(format!("  video:     {path}"));
    }
    if let Some(url) = &result.video_url {
        lines.push(format!("  url:       {url}"));
    }
    if let Some(duration) = result.duration_seconds {
        lines.push(format!("  duration:  {}", format_duration(duration)));
    }
    if let Some(scenes) = result.scenes_count {
        lines.push(format!("  scenes:    {scenes}"));
    }
    if let Some(took) = result.processing_time_seconds {
        lines.push(format!("  took:      {}", format_duration(took)));
    }
    lines.join("\n")
}

fn item_marker(status: BatchItemStatus) -> &'static str {
    match status {
        BatchItemStatus::Pending => " ",
        BatchItemStatus::Processing => ">",
        BatchItemStatus::Completed => "x",
        BatchItemStatus::Failed => "!",
        BatchItemStatus::Skipped => "-",
    }
}

/// Batch header followed by one row per item.
pub fn render_batch(batch: &Batch) -> String {
    let mut lines = vec![
        format!("{} ({})", batch.name, batch.id),
        format!(
            "{} {}  {}/{} done, {} failed",
            progress_bar(batch.progress),
            batch.status,
            batch.completed_items,
            batch.total_items(),
            batch.failed_items
        ),
    ];
    if let Some(error) = &batch.error {
        lines.push(format!("error: {error}"));
    }

    for (i, item) in batch.items.iter().enumerate() {
        let mut row = format!("  [{}] {:>2}. {}", item_marker(item.status), i + 1, item.title);
        match item.status {
            BatchItemStatus::Processing => {
                row.push_str(&format!(" - {} {:.0}%", item.current_step, item.progress * 100.0));
            }
            BatchItemStatus::Failed => {
                if let Some(error) = &item.error {
                    row.push_str(&format!(" - {error}"));
                }
            }
            BatchItemStatus::Completed => {
                if let Some(path) = &item.video_path {
                    row.push_str(&format!(" -> {path}"));
                }
            }
            _ => {}
        }
        lines.push(row);
    }
    lines.join("\n")
}

pub fn render_batch_list(list: &BatchListResponse) -> String {
    if list.batches.is_empty() {
        return "No batches".to_string();
    }

    let mut lines: Vec<String> = list
        .batches
        .iter()
        .map(|b| {
            format!(
                "{:<36}  {:<10}  {:>3}/{:<3}  {}",
                b.batch_id, b.status.as_str(), b.completed_items, b.total_items, b.name
            )
        })
        .collect();
    lines.push(format!("{} of {} batches", list.batches.len(), list.total));
    lines.join("\n")
}

pub fn render_analysis(analysis: &BatchAnalysis) -> String {
    let mut lines = vec![format!(
        "{} scripts, {} words, ~{} of video, ~{:.0} min processing",
        analysis.total_items,
        analysis.total_words,
        format_duration(analysis.estimated_total_duration_seconds),
        analysis.estimated_processing_time_minutes
    )];

    for item in &analysis.items_analysis {
        let title = item.title.as_deref().unwrap_or("untitled");
        let row = match (&item.analysis, &item.error) {
            (_, Some(error)) => format!("  {:>2}. {title} - {error}", item.index + 1),
            (Some(a), None) => format!(
                "  {:>2}. {title} - {} words, ~{}, {} chunk(s)",
                item.index + 1,
                a.word_count,
                format_duration(a.estimated_duration_seconds),
                a.estimated_chunks
            ),
            (None, None) => format!("  {:>2}. {title}", item.index + 1),
        };
        lines.push(row);
    }
    lines.join("\n")
}
