//! Assertions on produced archives and emitted events

use sales_export::Event;
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast;

/// Entry names of the ZIP archive at `path`, in archive order
pub fn archive_entries(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).unwrap();
    let mut zip = zip::ZipArchive::new(file).unwrap();
    (0..zip.len())
        .map(|i| zip.by_index(i).unwrap().name().to_string())
        .collect()
}

/// Collect events until a terminal `Completed`/`Failed` event or the timeout
pub async fn collect_until_terminal(
    events: &mut broadcast::Receiver<Event>,
    timeout: Duration,
) -> Vec<Event> {
    let mut seen = Vec::new();
    let _ = tokio::time::timeout(timeout, async {
        while let Ok(event) = events.recv().await {
            let terminal = matches!(event, Event::Completed { .. } | Event::Failed { .. });
            seen.push(event);
            if terminal {
                break;
            }
        }
    })
    .await;
    seen
}
