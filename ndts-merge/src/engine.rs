//! N-way time-ordered merge of per-symbol tick streams into a replayable
//! tick and snapshot timeline.

use crate::error::{MergeError, Result};

/// Default threshold, as a multiple of the tick count, past which counting
/// sort's bucket array would be wasteful; above it a general stable sort is
/// used instead.
pub const DEFAULT_COUNTING_SORT_RANGE_FACTOR: u64 = 16;

/// One symbol's raw tick columns, already decoded from storage.
#[derive(Debug, Clone)]
pub struct SymbolInput {
    pub ts: Vec<i64>,
    pub price: Vec<f64>,
    pub volume: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    time_range: Option<(f64, f64)>,
    counting_sort_range_factor: u64,
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions { time_range: None, counting_sort_range_factor: DEFAULT_COUNTING_SORT_RANGE_FACTOR }
    }
}

impl MergeOptions {
    /// Keep only ticks with `start <= ts <= end` after the timeline is sorted.
    pub fn with_time_range(mut self, start: f64, end: f64) -> Self {
        self.time_range = Some((start, end));
        self
    }

    pub fn with_counting_sort_range_factor(mut self, factor: u64) -> Self {
        self.counting_sort_range_factor = factor;
        self
    }
}

/// One flattened, timeline-ordered tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub ts: f64,
    pub symbol: u32,
    pub price: f64,
    pub volume: f64,
}

/// A borrowed view into one replayed snapshot. Aliases `MergeEngine`'s
/// internal state vectors: valid only until the cursor that produced it is
/// advanced again.
#[derive(Debug)]
pub struct SnapshotView<'a> {
    pub ts: f64,
    pub changed_count: usize,
    pub changed_symbols: &'a [u32],
    pub prices: &'a [f64],
    pub volumes: &'a [f64],
}

/// Sorted per-symbol tick arrays plus the reusable state vectors replay
/// walks over. Not an `Iterator`: `replay_snapshots` and friends return
/// explicit cursors whose `next()` yields a view aliasing this struct's
/// buffers, because the replay contract in spec.md §4.8 requires a single
/// reused buffer rather than a fresh allocation per step.
pub struct MergeEngine {
    symbol_count: usize,
    sorted_ts: Vec<f64>,
    sorted_sym: Vec<u32>,
    sorted_price: Vec<f64>,
    sorted_volume: Vec<f64>,
    snapshot_starts: Vec<usize>,
    price_pool: Vec<f64>,
    volume_pool: Vec<f64>,
    changed_buffer: Vec<u32>,
}

impl MergeEngine {
    /// Flattens `symbols` into one non-decreasing timeline: converts int64
    /// timestamps to float64, concatenates, argsorts (counting sort, or a
    /// general stable sort above `options`'s range factor), optionally
    /// truncates to a time range, then computes snapshot boundaries.
    pub fn build(symbols: &[SymbolInput], options: MergeOptions) -> Result<MergeEngine> {
        let symbol_count = symbols.len();
        let total: usize = symbols.iter().map(|s| s.ts.len()).sum();

        let mut tick_ts = Vec::with_capacity(total);
        let mut tick_sym = Vec::with_capacity(total);
        let mut tick_price = Vec::with_capacity(total);
        let mut tick_volume = Vec::with_capacity(total);

        for (sym_idx, s) in symbols.iter().enumerate() {
            if s.price.len() != s.ts.len() || s.volume.len() != s.ts.len() {
                return Err(MergeError::MismatchedColumnLengths);
            }
            for i in 0..s.ts.len() {
                let ts_f64 = s.ts[i] as f64;
                if ts_f64 as i64 != s.ts[i] {
                    return Err(MergeError::TimestampPrecisionLoss(s.ts[i]));
                }
                tick_ts.push(ts_f64);
                tick_sym.push(sym_idx as u32);
                tick_price.push(s.price[i]);
                tick_volume.push(s.volume[i]);
            }
        }

        let order = argsort_by_ts(&tick_ts, options.counting_sort_range_factor)?;

        let mut sorted_ts: Vec<f64> = order.iter().map(|&i| tick_ts[i]).collect();
        let mut sorted_sym: Vec<u32> = order.iter().map(|&i| tick_sym[i]).collect();
        let mut sorted_price: Vec<f64> = order.iter().map(|&i| tick_price[i]).collect();
        let mut sorted_volume: Vec<f64> = order.iter().map(|&i| tick_volume[i]).collect();

        if let Some((start, end)) = options.time_range {
            let lo = sorted_ts.partition_point(|&t| t < start);
            let hi = sorted_ts.partition_point(|&t| t <= end);
            sorted_ts = sorted_ts[lo..hi].to_vec();
            sorted_sym = sorted_sym[lo..hi].to_vec();
            sorted_price = sorted_price[lo..hi].to_vec();
            sorted_volume = sorted_volume[lo..hi].to_vec();
        }

        let snapshot_starts = compute_snapshot_starts(&sorted_ts);

        Ok(MergeEngine {
            symbol_count,
            sorted_ts,
            sorted_sym,
            sorted_price,
            sorted_volume,
            snapshot_starts,
            price_pool: vec![f64::NAN; symbol_count],
            volume_pool: vec![f64::NAN; symbol_count],
            changed_buffer: Vec::with_capacity(symbol_count),
        })
    }

    pub fn tick_count(&self) -> usize {
        self.sorted_ts.len()
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshot_starts.len() - 1
    }

    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// Every tick in timeline order. Plain values, not aliases: ticks carry
    /// no mutable shared state the way snapshots do.
    pub fn replay_ticks(&self) -> impl Iterator<Item = Tick> + '_ {
        (0..self.sorted_ts.len()).map(move |i| Tick {
            ts: self.sorted_ts[i],
            symbol: self.sorted_sym[i],
            price: self.sorted_price[i],
            volume: self.sorted_volume[i],
        })
    }

    /// A cursor over every snapshot boundary, starting from a cold state
    /// (`price_pool`/`volume_pool` read back as `NAN` for any symbol that
    /// hasn't ticked yet).
    pub fn replay_snapshots(&mut self) -> SnapshotCursor<'_> {
        self.price_pool.iter_mut().for_each(|p| *p = f64::NAN);
        self.volume_pool.iter_mut().for_each(|v| *v = f64::NAN);
        SnapshotCursor { engine: self, next_snapshot: 0 }
    }

    /// A cursor starting at the first snapshot with `ts >= target_ts`.
    /// Ticks before that boundary are pre-applied to warm the state
    /// vectors without being reported as a "changed" snapshot.
    pub fn replay_snapshots_from(&mut self, target_ts: f64) -> SnapshotCursor<'_> {
        let snap_count = self.snapshot_count();
        let s = partition_point_range(snap_count, |s| self.sorted_ts[self.snapshot_starts[s]] < target_ts);
        let warm_end = if s < snap_count { self.snapshot_starts[s] } else { self.sorted_ts.len() };

        self.price_pool.iter_mut().for_each(|p| *p = f64::NAN);
        self.volume_pool.iter_mut().for_each(|v| *v = f64::NAN);
        for i in 0..warm_end {
            let sym = self.sorted_sym[i] as usize;
            self.price_pool[sym] = self.sorted_price[i];
            self.volume_pool[sym] = self.sorted_volume[i];
        }
        self.changed_buffer.clear();
        SnapshotCursor { engine: self, next_snapshot: s }
    }

    /// The last snapshot with `ts <= target_ts`, applied fresh from the
    /// start of the timeline. Returns owned copies of the state vectors
    /// (not aliases) since the caller may hold onto the result after the
    /// engine itself moves on. `None` if no snapshot qualifies.
    pub fn asof_snapshot(&mut self, target_ts: f64) -> Option<(Vec<f64>, Vec<f64>)> {
        let snap_count = self.snapshot_count();
        if snap_count == 0 {
            return None;
        }
        let upper = partition_point_range(snap_count, |s| self.sorted_ts[self.snapshot_starts[s]] <= target_ts);
        if upper == 0 {
            return None;
        }
        let s = upper - 1;
        let apply_end = self.snapshot_starts[s + 1];

        self.price_pool.iter_mut().for_each(|p| *p = f64::NAN);
        self.volume_pool.iter_mut().for_each(|v| *v = f64::NAN);
        for i in 0..apply_end {
            let sym = self.sorted_sym[i] as usize;
            self.price_pool[sym] = self.sorted_price[i];
            self.volume_pool[sym] = self.sorted_volume[i];
        }
        Some((self.price_pool.clone(), self.volume_pool.clone()))
    }
}

/// Cursor produced by [`MergeEngine::replay_snapshots`] and
/// [`MergeEngine::replay_snapshots_from`]. Not a standard [`Iterator`]:
/// each `SnapshotView` it yields borrows the engine's own state vectors, so
/// a view from one `next()` call is invalidated by the next.
pub struct SnapshotCursor<'a> {
    engine: &'a mut MergeEngine,
    next_snapshot: usize,
}

impl<'a> SnapshotCursor<'a> {
    pub fn next(&mut self) -> Option<SnapshotView<'_>> {
        if self.next_snapshot + 1 >= self.engine.snapshot_starts.len() {
            return None;
        }
        let s = self.next_snapshot;
        let start = self.engine.snapshot_starts[s];
        let end = self.engine.snapshot_starts[s + 1];

        self.engine.changed_buffer.clear();
        let ts = self.engine.sorted_ts[start];
        for i in start..end {
            let sym = self.engine.sorted_sym[i] as usize;
            self.engine.price_pool[sym] = self.engine.sorted_price[i];
            self.engine.volume_pool[sym] = self.engine.sorted_volume[i];
            self.engine.changed_buffer.push(self.engine.sorted_sym[i]);
        }
        self.next_snapshot += 1;

        Some(SnapshotView {
            ts,
            changed_count: self.engine.changed_buffer.len(),
            changed_symbols: &self.engine.changed_buffer,
            prices: &self.engine.price_pool,
            volumes: &self.engine.volume_pool,
        })
    }
}

/// Binary search over `0..n` for the first index where `pred` turns false,
/// the same contract as slice `partition_point` but for an index range with
/// no backing slice to call it on directly.
fn partition_point_range(n: usize, pred: impl Fn(usize) -> bool) -> usize {
    let mut lo = 0;
    let mut hi = n;
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if pred(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

fn compute_snapshot_starts(sorted_ts: &[f64]) -> Vec<usize> {
    if sorted_ts.is_empty() {
        return vec![0];
    }
    let mut starts = vec![0];
    for i in 1..sorted_ts.len() {
        if sorted_ts[i] != sorted_ts[i - 1] {
            starts.push(i);
        }
    }
    starts.push(sorted_ts.len());
    starts
}

/// Stable argsort of `ts` by value. Uses counting sort over
/// `[min(ts), max(ts)]` when that span is within `range_factor * ts.len()`
/// buckets; otherwise falls back to a general stable comparison sort.
fn argsort_by_ts(ts: &[f64], range_factor: u64) -> Result<Vec<usize>> {
    let n = ts.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut min_ts = ts[0];
    let mut max_ts = ts[0];
    for &t in ts {
        min_ts = min_ts.min(t);
        max_ts = max_ts.max(t);
    }
    let span = max_ts - min_ts;
    if span.fract() != 0.0 {
        return Err(MergeError::NonIntegerTimestampDomain);
    }

    let bucket_count_i128 = span as i128 + 1;
    if bucket_count_i128 > (n as i128).saturating_mul(range_factor as i128) {
        return Ok(general_stable_argsort(ts));
    }
    if bucket_count_i128 > i32::MAX as i128 {
        return Err(MergeError::BucketIndexOverflow);
    }
    let bucket_count = bucket_count_i128 as usize;

    let mut bucket_of = Vec::with_capacity(n);
    let mut counts = vec![0usize; bucket_count];
    for &t in ts {
        let bucket = (t - min_ts) as usize;
        counts[bucket] += 1;
        bucket_of.push(bucket);
    }

    let mut offsets = vec![0usize; bucket_count];
    let mut running = 0usize;
    for (i, count) in counts.into_iter().enumerate() {
        offsets[i] = running;
        running += count;
    }

    // Stable: original index order within a bucket is preserved because
    // ticks are visited 0..n and each written to its bucket's next free slot.
    let mut order = vec![0usize; n];
    for (i, &bucket) in bucket_of.iter().enumerate() {
        order[offsets[bucket]] = i;
        offsets[bucket] += 1;
    }
    Ok(order)
}

fn general_stable_argsort(ts: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ts.len()).collect();
    order.sort_by(|&a, &b| ts[a].partial_cmp(&ts[b]).expect("timestamps are never NaN"));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(ts: Vec<i64>, price: Vec<f64>, volume: Vec<f64>) -> SymbolInput {
        SymbolInput { ts, price, volume }
    }

    #[test]
    fn two_symbol_merge_yields_non_decreasing_timeline() {
        let a = sym(vec![1, 3, 5], vec![10.0, 11.0, 12.0], vec![1.0, 1.0, 1.0]);
        let b = sym(vec![2, 4, 5], vec![20.0, 21.0, 22.0], vec![2.0, 2.0, 2.0]);
        let engine = MergeEngine::build(&[a, b], MergeOptions::default()).unwrap();

        let ticks: Vec<Tick> = engine.replay_ticks().collect();
        assert_eq!(ticks.len(), 6);
        for w in ticks.windows(2) {
            assert!(w[0].ts <= w[1].ts);
        }
        // both ts=5 ticks retain per-symbol source order: symbol 0 (a) then symbol 1 (b)
        assert_eq!(ticks[4].symbol, 0);
        assert_eq!(ticks[5].symbol, 1);
    }

    #[test]
    fn snapshot_count_matches_distinct_timestamps() {
        let a = sym(vec![1, 2, 2, 3], vec![1.0, 2.0, 3.0, 4.0], vec![1.0, 1.0, 1.0, 1.0]);
        let engine = MergeEngine::build(&[a], MergeOptions::default()).unwrap();
        assert_eq!(engine.snapshot_count(), 3);
    }

    #[test]
    fn replay_snapshots_accumulates_state_across_symbols() {
        let a = sym(vec![1, 2], vec![100.0, 101.0], vec![1.0, 1.0]);
        let b = sym(vec![1, 3], vec![200.0, 201.0], vec![2.0, 2.0]);
        let mut engine = MergeEngine::build(&[a, b], MergeOptions::default()).unwrap();

        let mut cursor = engine.replay_snapshots();

        let snap1 = cursor.next().unwrap();
        assert_eq!(snap1.ts, 1.0);
        assert_eq!(snap1.changed_count, 2);
        assert_eq!(snap1.prices, &[100.0, 200.0]);

        let snap2 = cursor.next().unwrap();
        assert_eq!(snap2.ts, 2.0);
        assert_eq!(snap2.changed_count, 1);
        assert_eq!(snap2.prices, &[101.0, 200.0]);

        let snap3 = cursor.next().unwrap();
        assert_eq!(snap3.ts, 3.0);
        assert_eq!(snap3.prices, &[101.0, 201.0]);

        assert!(cursor.next().is_none());
    }

    #[test]
    fn asof_snapshot_returns_state_as_of_target_and_is_owned() {
        let a = sym(vec![1, 2, 3, 4, 5], vec![1.0, 2.0, 3.0, 4.0, 5.0], vec![1.0; 5]);
        let b = sym(vec![1, 2, 3, 4, 5], vec![10.0, 20.0, 30.0, 40.0, 50.0], vec![1.0; 5]);
        let mut engine = MergeEngine::build(&[a, b], MergeOptions::default()).unwrap();

        let (prices, _volumes) = engine.asof_snapshot(3.0).unwrap();
        assert_eq!(prices, vec![3.0, 30.0]);

        assert!(engine.asof_snapshot(0.5).is_none());
    }

    #[test]
    fn replay_snapshots_from_warms_state_without_reporting_prior_snapshots() {
        let a = sym(vec![1, 2, 3], vec![1.0, 2.0, 3.0], vec![1.0, 1.0, 1.0]);
        let mut engine = MergeEngine::build(&[a], MergeOptions::default()).unwrap();

        let mut cursor = engine.replay_snapshots_from(2.0);
        let snap = cursor.next().unwrap();
        assert_eq!(snap.ts, 2.0);
        assert_eq!(snap.prices, &[2.0]);
        assert!(cursor.next().unwrap().ts == 3.0);
        assert!(cursor.next().is_none());
    }

    #[test]
    fn time_range_filter_truncates_after_sort() {
        let a = sym(vec![1, 2, 3, 4, 5], vec![1.0; 5], vec![1.0; 5]);
        let engine =
            MergeEngine::build(&[a], MergeOptions::default().with_time_range(2.0, 4.0)).unwrap();
        assert_eq!(engine.tick_count(), 3);
        let ticks: Vec<Tick> = engine.replay_ticks().collect();
        assert_eq!(ticks.first().unwrap().ts, 2.0);
        assert_eq!(ticks.last().unwrap().ts, 4.0);
    }

    #[test]
    fn mismatched_column_lengths_error() {
        let a = sym(vec![1, 2], vec![1.0], vec![1.0, 1.0]);
        assert!(MergeEngine::build(&[a], MergeOptions::default()).is_err());
    }

    #[test]
    fn sparse_timestamp_domain_falls_back_to_general_sort() {
        // span is huge relative to n, forcing the >16x fallback path.
        let a = sym(vec![0, 1_000_000, 2_000_000], vec![1.0, 2.0, 3.0], vec![1.0; 3]);
        let engine = MergeEngine::build(&[a], MergeOptions::default()).unwrap();
        let ticks: Vec<Tick> = engine.replay_ticks().collect();
        assert_eq!(ticks.iter().map(|t| t.ts).collect::<Vec<_>>(), vec![0.0, 1_000_000.0, 2_000_000.0]);
    }

    #[test]
    fn empty_input_has_no_ticks_or_snapshots() {
        let engine = MergeEngine::build(&[], MergeOptions::default()).unwrap();
        assert_eq!(engine.tick_count(), 0);
        assert_eq!(engine.snapshot_count(), 0);
    }
}
