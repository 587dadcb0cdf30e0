use std::fs;
use std::path::Path;

/// One job parsed out of a `--cron-file`: `id;description;expression`.
/// This little job-list format is a CLI convenience on top of the cron
/// core, not part of the cron expression grammar itself.
pub struct JobSpec {
    pub id: String,
    pub description: String,
    pub expression: String,
}

pub fn load_jobs(path: impl AsRef<Path>) -> anyhow::Result<Vec<JobSpec>> {
    let text = fs::read_to_string(path.as_ref())?;
    let mut jobs = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(3, ';');
        let (Some(id), Some(description), Some(expression)) =
            (parts.next(), parts.next(), parts.next())
        else {
            log::warn!("ignoring malformed cron-file line: {line}");
            continue;
        };
        jobs.push(JobSpec {
            id: id.trim().to_string(),
            description: description.trim().to_string(),
            expression: expression.trim().to_string(),
        });
    }
    Ok(jobs)
}
