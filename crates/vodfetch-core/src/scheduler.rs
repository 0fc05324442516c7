//! Bounded worker pool driving fragment fetches.
//!
//! Workers pull from a shared queue; completion order is unconstrained and
//! only the manifest index order matters downstream. Failure policy is
//! fail-fast but drain: the first failed fragment stops new dispatch, while
//! fetches already in flight are allowed to finish so their network I/O is
//! not wasted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;

use crate::fetch::FragmentResult;
use crate::manifest::{FragmentRef, Manifest};

/// Runs `fetch_fn` for every fragment in `manifest` with up to `concurrency`
/// fetches in parallel. Returns one `FragmentResult` per fragment that was
/// started, sorted by fragment index; fragments whose dispatch was suppressed
/// by an earlier failure are absent (never started, never in limbo).
pub fn run<F>(manifest: &Manifest, concurrency: usize, fetch_fn: F) -> Vec<FragmentResult>
where
    F: Fn(&FragmentRef) -> FragmentResult + Send + Sync,
{
    let total = manifest.len();
    if total == 0 {
        return Vec::new();
    }

    let queue: Mutex<VecDeque<FragmentRef>> =
        Mutex::new(manifest.fragments().iter().cloned().collect());
    let stop = AtomicBool::new(false);
    let done = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel::<FragmentResult>();
    let num_workers = concurrency.max(1).min(total);

    thread::scope(|s| {
        for _ in 0..num_workers {
            let tx = tx.clone();
            let queue = &queue;
            let stop = &stop;
            let done = &done;
            let fetch_fn = &fetch_fn;
            s.spawn(move || loop {
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                let fragment = match queue.lock().unwrap().pop_front() {
                    Some(f) => f,
                    None => break,
                };
                let result = fetch_fn(&fragment);
                match &result.outcome {
                    Ok(_) => {
                        let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                        tracing::debug!(
                            fragment = result.fragment.index,
                            finished,
                            total,
                            "fragment complete"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            fragment = result.fragment.index,
                            attempts = result.attempts,
                            error = %e,
                            "fragment failed, stopping new dispatch"
                        );
                        stop.store(true, Ordering::SeqCst);
                    }
                }
                if tx.send(result).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        let mut results: Vec<FragmentResult> = rx.iter().collect();
        results.sort_by_key(|r| r.fragment.index);
        results
    })
}
