//! Cache Warm-up Task
//!
//! Producer/consumer pipeline that preloads keys: a producer streams keys
//! over a bounded channel and a consumer resolves each one through the cache.

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::backing::BackingStore;
use crate::cache::Cache;
use crate::error::Result;

/// Summary of a finished warm-up run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmupReport {
    /// Keys sent by the producer
    pub produced: usize,
    /// Keys resolved successfully
    pub loaded: usize,
    /// Keys whose load failed
    pub failed: usize,
}

/// Spawns the warm-up pipeline.
///
/// At most `concurrency` cache lookups are outstanding at once. The returned
/// handle resolves after both the producer and the consumer have finished.
///
/// # Example
/// ```ignore
/// let handle = spawn_warmup(cache.clone(), vec!["a".into(), "b".into()], 4);
/// let report = handle.await?;
/// ```
pub fn spawn_warmup<S: BackingStore>(
    cache: Cache<S>,
    keys: Vec<String>,
    concurrency: usize,
) -> JoinHandle<WarmupReport> {
    let concurrency = concurrency.max(1);

    tokio::spawn(async move {
        info!(
            "Starting cache warm-up for {} keys with concurrency {}",
            keys.len(),
            concurrency
        );

        let (tx, rx) = mpsc::channel(concurrency);
        let producer = tokio::spawn(produce(keys, tx));
        let consumer = tokio::spawn(consume(cache, rx, concurrency));

        let (produced, consumed) = tokio::join!(producer, consumer);

        let produced = produced.unwrap_or_else(|err| {
            warn!("Warm-up producer panicked: {}", err);
            0
        });
        let (loaded, failed) = consumed.unwrap_or_else(|err| {
            warn!("Warm-up consumer panicked: {}", err);
            (0, 0)
        });

        let report = WarmupReport {
            produced,
            loaded,
            failed,
        };
        info!(
            "Cache warm-up finished: {} loaded, {} failed",
            report.loaded, report.failed
        );
        report
    })
}

/// Sends every key, then closes the channel by dropping the sender.
async fn produce(keys: Vec<String>, tx: mpsc::Sender<String>) -> usize {
    let mut sent = 0;
    for key in keys {
        if tx.send(key).await.is_err() {
            warn!("Warm-up consumer stopped early after {} keys", sent);
            break;
        }
        sent += 1;
    }
    sent
}

/// Drains the channel, keeping up to `concurrency` lookups in flight.
async fn consume<S: BackingStore>(
    cache: Cache<S>,
    mut rx: mpsc::Receiver<String>,
    concurrency: usize,
) -> (usize, usize) {
    let mut lookups: JoinSet<Result<String>> = JoinSet::new();
    let mut loaded = 0;
    let mut failed = 0;

    let mut tally = |outcome: std::result::Result<Result<String>, JoinError>| match outcome {
        Ok(Ok(_)) => loaded += 1,
        Ok(Err(err)) => {
            debug!("Warm-up load failed: {}", err);
            failed += 1;
        }
        Err(err) => {
            warn!("Warm-up lookup task failed: {}", err);
            failed += 1;
        }
    };

    while let Some(key) = rx.recv().await {
        if lookups.len() >= concurrency {
            if let Some(outcome) = lookups.join_next().await {
                tally(outcome);
            }
        }
        let cache = cache.clone();
        lookups.spawn(async move { cache.get(&key).await });
    }

    while let Some(outcome) = lookups.join_next().await {
        tally(outcome);
    }

    (loaded, failed)
}
