use chrono::{DateTime, Utc};

use std::sync::atomic::{AtomicI64, Ordering};

static LAST_STAMP_NANOS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Returns the current time, strictly later than any stamp handed out before
/// in this process.
///
/// Wall clocks can report the same instant for two calls made back to back.
/// Timestamps feed into content hashes, so equal stamps on otherwise equal
/// transactions would collide; bumping by one nanosecond keeps them apart.
pub fn next_timestamp() -> DateTime<Utc> {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or(i64::MAX - 1);

    let mut last = LAST_STAMP_NANOS.load(Ordering::Relaxed);
    loop {
        let next = if now > last { now } else { last + 1 };
        match LAST_STAMP_NANOS.compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
        {
            Ok(_) => return DateTime::from_timestamp_nanos(next),
            Err(current) => last = current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamps_strictly_increase() {
        let stamps: Vec<_> = (0..10_000).map(|_| next_timestamp()).collect();
        assert!(stamps.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_stamps_unique_across_threads() {
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| (0..1_000).map(|_| next_timestamp()).collect::<Vec<_>>()))
            .collect();

        let mut all: Vec<_> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        let total = all.len();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), total);
    }

    #[test]
    fn test_stamp_tracks_wall_clock() {
        let before = Utc::now();
        let stamp = next_timestamp();
        assert!(stamp >= before - chrono::Duration::seconds(1));
    }
}
