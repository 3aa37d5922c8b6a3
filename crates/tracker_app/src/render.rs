use chrono::{DateTime, TimeZone};
use tracker_core::{ConnectionView, JobRowView, MonitorViewModel};

pub fn render<Tz>(view: &MonitorViewModel, now: &DateTime<Tz>) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut lines = Vec::new();
    lines.push(format!(
        "[{}] {}",
        now.format("%H:%M:%S"),
        connection_label(&view.connection)
    ));

    match (&view.batch_id, &view.batch) {
        (None, _) => lines.push("no batch open".to_string()),
        (Some(batch_id), None) => {
            let state = if view.loading { "loading" } else { "unavailable" };
            lines.push(format!("batch {batch_id}: {state}"));
        }
        (Some(_), Some(batch)) => {
            let title = match &batch.name {
                Some(name) => format!("{} ({})", name, batch.id),
                None => batch.id.clone(),
            };
            let refreshing = if view.loading { " [refreshing]" } else { "" };
            lines.push(format!(
                "batch {title}: {} {:.1}% | {}/{} done, {} failed | cost {}{}{refreshing}",
                batch.status,
                batch.progress_percent,
                batch.completed,
                batch.total,
                batch.failed,
                format_cents(batch.actual_cost_cents),
                batch
                    .estimated_cost_cents
                    .map(|cents| format!(" of ~{}", format_cents(cents)))
                    .unwrap_or_default(),
            ));
            for job in &view.jobs {
                lines.push(job_line(job, view.watched_jobs.contains(&job.job_id)));
            }
        }
    }

    if view.decode_failures > 0 {
        lines.push(format!("{} malformed frame(s) dropped", view.decode_failures));
    }
    if let Some(error) = &view.last_error {
        lines.push(format!("error: {error}"));
    }
    lines
}

fn connection_label(connection: &ConnectionView) -> String {
    if connection.connected {
        return "live".to_string();
    }
    if connection.gave_up {
        return format!(
            "offline after {} attempt(s), type `reconnect`",
            connection.reconnect_attempts
        );
    }
    if connection.reconnect_attempts > 0 {
        return format!("reconnecting (attempt {})", connection.reconnect_attempts);
    }
    "connecting".to_string()
}

fn job_line(job: &JobRowView, watched: bool) -> String {
    let marker = if watched { '*' } else { ' ' };
    let mut line = format!(
        "{marker} {:<12} {:<24} {:<12} {:>3}%",
        job.job_id,
        job.label,
        job.status.as_str(),
        job.progress
    );
    if let Some(step) = job.current_step.as_ref().filter(|_| job.status.is_in_progress()) {
        line.push_str(&format!("  {step}"));
    }
    if let Some(error) = &job.error_message {
        line.push_str(&format!("  ({error})"));
    }
    line
}

fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}${}.{:02}", cents / 100, cents % 100)
}
