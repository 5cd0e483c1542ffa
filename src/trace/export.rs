use std::path::Path;

use tokio::io::{AsyncWriteExt, BufWriter};

use super::TraceEvent;

/// Writes one JSON object per line.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub async fn write_jsonl(path: &Path, events: &[TraceEvent]) -> Result<(), std::io::Error> {
    let file = tokio::fs::File::create(path).await?;
    let mut writer = BufWriter::new(file);
    for event in events {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        writer.write_all(line.as_bytes()).await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Reads events back from JSONL text; blank lines are skipped.
///
/// # Errors
///
/// Returns an error for the first line that is not a valid event.
pub fn parse_jsonl(text: &str) -> Result<Vec<TraceEvent>, serde_json::Error> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str)
        .collect()
}
