//! Parsers for `squeue` and `sbatch` text output.

use portal_types::QueueEntry;

/// `squeue -o` format: id, partition, name, compact state, time used, node count, nodelist/reason.
pub const QUEUE_FORMAT: &str = "%i,%P,%j,%t,%M,%D,%R";

/// Parse headerless `squeue` output produced with [`QUEUE_FORMAT`].
///
/// Lines with fewer than seven fields are skipped. The last field keeps any commas it
/// contains (pending reasons such as `(Resources,Priority)`).
pub fn parse_queue(output: &str) -> Vec<QueueEntry> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.splitn(QueueEntry::FIELD_COUNT, ',').collect();
            if fields.len() < QueueEntry::FIELD_COUNT {
                return None;
            }
            Some(QueueEntry {
                job_id: fields[0].to_string(),
                partition: fields[1].to_string(),
                name: fields[2].to_string(),
                state: fields[3].to_string(),
                time_used: fields[4].to_string(),
                nodes: fields[5].to_string(),
                nodelist: fields[6].to_string(),
            })
        })
        .collect()
}

/// Extract the job id from `sbatch` output.
///
/// Takes the last whitespace-separated token (`Submitted batch job 123`), then strips a
/// `;cluster` suffix as printed with `--parsable`.
pub fn parse_job_id(output: &str) -> Option<String> {
    let token = output.split_whitespace().last()?;
    let id = token.split(';').next().unwrap_or(token);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
