//! Geotagging worker pool
//!
//! A bounded set of workers drains a shared queue of pending records and
//! attaches geolocation from each listing's detail page. Workers use plain
//! HTTP only; the browser session is never involved. Completion order is
//! not guaranteed, but results are applied back to the input collection so
//! the returned ordering always matches the input.

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

use crate::details;
use crate::fetch::HttpFetcher;
use crate::listing::{Geotag, Listing};

/// Attach a geotag to every record, using `workers` concurrent fetchers
///
/// Blocks until the queue is drained and all workers have exited. Records
/// whose detail page cannot be fetched, or carries no coordinates, keep
/// their geotag unset, exactly as a sequential single-worker run would
/// leave them.
pub async fn geotag_all(
    fetcher: &HttpFetcher,
    mut records: Vec<Listing>,
    workers: usize,
) -> Vec<Listing> {
    if records.is_empty() {
        return records;
    }

    let queue: Arc<Mutex<VecDeque<(usize, String)>>> = Arc::new(Mutex::new(
        records
            .iter()
            .enumerate()
            .map(|(index, record)| (index, record.url.clone()))
            .collect(),
    ));

    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, Option<Geotag>)>();

    let mut handles = Vec::with_capacity(workers.max(1));
    for _ in 0..workers.max(1) {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        let fetcher = fetcher.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let item = queue.lock().await.pop_front();
                let Some((index, url)) = item else {
                    break;
                };
                debug!("{} results left to geotag", queue.lock().await.len());
                let geotag = match fetcher.plain_fetch(&url, &[]).await {
                    Some(html) => details::parse_geotag(&html),
                    None => None,
                };
                if tx.send((index, geotag)).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    for handle in handles {
        if let Err(e) = handle.await {
            warn!("geotag worker panicked: {e}");
        }
    }

    while let Ok((index, geotag)) = rx.try_recv() {
        if let Some(geotag) = geotag {
            records[index].geotag = Some(geotag);
        }
    }

    records
}
