use crate::shard::Shard;
use crossbeam_channel::Receiver;
use rayon::prelude::*;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// A `(key, value)` pair copied out of a shard. The value is shared with the
/// map through its `Arc`; the key is owned by the consumer.
pub type Tuple<V> = (String, Arc<V>);

/// Fully materialized snapshot of the map.
///
/// Every shard is copied in parallel, each under its own read lock, into a
/// buffer sized to that shard. The buffers are then concatenated, so the
/// total length is known before the first item is yielded and no work is
/// left running once this value exists. Each shard's slice is consistent;
/// there is no ordering or atomicity across shards.
pub struct Snapshot<V> {
    entries: std::vec::IntoIter<Tuple<V>>,
}

impl<V> Snapshot<V>
where
    V: Send + Sync,
{
    pub(crate) fn capture(shards: &[Shard<V>], pattern: Option<&str>) -> Self {
        let per_shard: Vec<Vec<Tuple<V>>> = shards
            .par_iter()
            .map(|shard| shard.copy_entries(pattern))
            .collect();

        let total = per_shard.iter().map(Vec::len).sum();
        let mut entries = Vec::with_capacity(total);
        for part in per_shard {
            entries.extend(part);
        }
        debug!(entries = total, filtered = pattern.is_some(), "snapshot taken");

        Self {
            entries: entries.into_iter(),
        }
    }
}

impl<V> Iterator for Snapshot<V> {
    type Item = Tuple<V>;

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl<V> ExactSizeIterator for Snapshot<V> {}

/// Lazily merged iterator fed by a small pool of producer threads.
///
/// There are at most `rayon::current_num_threads()` producers, each owning
/// every n-th shard. A producer copies each of its shards under that shard's
/// read lock, reports the size, and only after releasing every lock hands
/// entries over one at a time through a rendezvous channel. Construction
/// returns once every shard has reported its size, so [`Iter::capacity`] is
/// known up front. Dropping the iterator before it is exhausted disconnects
/// the channel; the producers stop and are joined, so abandoning an
/// iteration never leaves threads or locks behind.
pub struct Iter<V> {
    receiver: Option<Receiver<Tuple<V>>>,
    producers: Vec<JoinHandle<()>>,
    // Entries for producers that could not be started; yielded after the channel.
    inline: std::vec::IntoIter<Tuple<V>>,
    capacity: usize,
}

/// Copy shards `worker, worker + workers, ...` one lock at a time, reporting
/// each shard's size as soon as it is copied.
fn copy_assigned<V, F>(
    shards: &[Shard<V>],
    worker: usize,
    workers: usize,
    mut report: F,
) -> Vec<Tuple<V>>
where
    V: Send + Sync,
    F: FnMut(usize),
{
    let mut entries = Vec::new();
    for shard in shards.iter().skip(worker).step_by(workers) {
        let copied = shard.copy_entries(None);
        report(copied.len());
        entries.extend(copied);
    }
    entries
}

impl<V> Iter<V>
where
    V: Send + Sync + 'static,
{
    pub(crate) fn spawn(shards: &Arc<[Shard<V>]>) -> Self {
        let workers = shards.len().min(rayon::current_num_threads()).max(1);
        let (tx, rx) = crossbeam_channel::bounded(0);
        let (size_tx, size_rx) = crossbeam_channel::bounded(shards.len());

        let mut producers = Vec::with_capacity(workers);
        let mut inline = Vec::new();
        let mut inline_capacity = 0;

        for worker in 0..workers {
            let worker_shards = Arc::clone(shards);
            let worker_tx = tx.clone();
            let worker_size_tx = size_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("cmap-iter-{}", worker))
                .spawn(move || {
                    let entries = copy_assigned(&worker_shards, worker, workers, |len| {
                        let _ = worker_size_tx.send(len);
                    });
                    drop(worker_size_tx);
                    for entry in entries {
                        if worker_tx.send(entry).is_err() {
                            trace!(worker, "iterator dropped, producer stopping");
                            return;
                        }
                    }
                });

            match spawned {
                Ok(handle) => producers.push(handle),
                Err(err) => {
                    warn!(
                        worker,
                        error = %err,
                        "could not start iterator producer, copying inline"
                    );
                    inline.extend(copy_assigned(shards, worker, workers, |len| {
                        inline_capacity += len;
                    }));
                }
            }
        }
        drop(tx);
        drop(size_tx);

        // Barrier: every shard has been copied and sized.
        let capacity = size_rx.iter().sum::<usize>() + inline_capacity;

        Self {
            receiver: Some(rx),
            producers,
            inline: inline.into_iter(),
            capacity,
        }
    }
}

impl<V> Iter<V> {
    /// Total number of entries captured across all shards.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<V> Iterator for Iter<V> {
    type Item = Tuple<V>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(receiver) = &self.receiver {
            if let Ok(entry) = receiver.recv() {
                return Some(entry);
            }
        }
        self.inline.next()
    }
}

impl<V> Drop for Iter<V> {
    fn drop(&mut self) {
        // Disconnect first so producers blocked on send wake up and exit.
        self.receiver.take();
        for producer in self.producers.drain(..) {
            if producer.join().is_err() {
                warn!("iterator producer panicked; iteration may have been cut short");
            }
        }
    }
}
