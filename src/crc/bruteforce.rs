//! Parallel exhaustive search for a self-consistent checksum.
//!
//! The candidate space is split into contiguous sub-ranges, one per worker.
//! Workers share a `found` flag that they poll each iteration and a result
//! cell written at most once; the first hit wins and the rest stop early.
//! With several valid checksums in the space, which one is returned depends
//! on scheduling.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::table::crc32_update;
use crate::bits::u32_le;
use crate::error::{Error, Result};

/// How often worker 0 reports progress
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Iterations between clock samples
const CLOCK_SAMPLE_MASK: u64 = (1 << 16) - 1;

/// Precomputed layout of a file with checksum slots
struct Layout<'a> {
    /// CRC register after the bytes before the first slot
    prefix_state: u32,
    /// Bytes following each slot, up to the next slot or the end
    gaps: Vec<&'a [u8]>,
}

impl<'a> Layout<'a> {
    fn new(data: &'a [u8], offsets: &[usize]) -> Self {
        let mut offsets = offsets.to_vec();
        offsets.sort_unstable();
        offsets.dedup();

        let prefix_state = crc32_update(0xFFFF_FFFF, &data[..offsets[0]]);
        let gaps = offsets
            .iter()
            .enumerate()
            .map(|(i, &off)| {
                let end = offsets.get(i + 1).copied().unwrap_or(data.len());
                &data[off + 4..end]
            })
            .collect();
        Self { prefix_state, gaps }
    }

    /// Whether writing `candidate` into every slot makes it the file's CRC
    #[inline]
    fn matches(&self, candidate: u32) -> bool {
        let bytes = u32_le(candidate);
        let mut state = self.prefix_state;
        for gap in &self.gaps {
            state = crc32_update(state, &bytes);
            state = crc32_update(state, gap);
        }
        !state == candidate
    }
}

/// Search the whole 32-bit space
pub fn bruteforce(data: &[u8], offsets: &[usize], num_threads: usize) -> Result<Option<u32>> {
    bruteforce_range(data, offsets, num_threads, 0..=u32::MAX)
}

/// Search `range` for a checksum that matches the file once written at
/// every offset. `Ok(None)` means the range holds no such value.
pub fn bruteforce_range(
    data: &[u8],
    offsets: &[usize],
    num_threads: usize,
    range: RangeInclusive<u32>,
) -> Result<Option<u32>> {
    if offsets.is_empty() {
        return Ok(Some(super::crc32(data)));
    }
    if range.is_empty() {
        return Ok(None);
    }

    let layout = Layout::new(data, offsets);
    let num_threads = num_threads.max(1);
    let (start, end) = (*range.start() as u64, *range.end() as u64);
    let total = end - start + 1;
    let chunk = total.div_euclid(num_threads as u64) + 1;

    debug!(threads = num_threads, candidates = total, slots = offsets.len(), "CRC brute force");

    let found = AtomicBool::new(false);
    let result = OnceLock::new();
    let started = Instant::now();

    crossbeam::scope(|scope| {
        for worker in 0..num_threads as u64 {
            let lo = start + worker * chunk;
            if lo > end {
                break;
            }
            let hi = (lo + chunk - 1).min(end);
            let (layout, found, result) = (&layout, &found, &result);

            scope.spawn(move |_| {
                let mut last_report = started;
                for (i, candidate) in (lo..=hi).enumerate() {
                    if found.load(Ordering::Relaxed) {
                        return;
                    }
                    let candidate = candidate as u32;
                    if layout.matches(candidate) {
                        let _ = result.set(candidate);
                        found.store(true, Ordering::Relaxed);
                        return;
                    }
                    if worker == 0 && (i as u64 & CLOCK_SAMPLE_MASK) == 0 {
                        let now = Instant::now();
                        if now.duration_since(last_report) >= PROGRESS_INTERVAL {
                            last_report = now;
                            let done = 100.0 * i as f64 / (hi - lo + 1) as f64;
                            info!(
                                "Brute-forcing CRC: {:.1}% of each range searched ({:.0?} elapsed)",
                                done,
                                now.duration_since(started)
                            );
                        }
                    }
                }
            });
        }
    })
    .map_err(|_| Error::Internal("CRC worker thread panicked".to_string()))?;

    Ok(result.get().copied())
}
