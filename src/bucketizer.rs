use slog::{warn, Logger};

use crate::Observation;

/// One mission's observations falling into a single fixed-width time window.
pub struct Segment {
    /// Nominal bucket start, epoch seconds, aligned to the bucket grid.
    pub start: i64,
    pub observations: Vec<Observation>,
}

/// Partitions one mission's observations into contiguous fixed-width time
/// buckets. The grid is aligned to epoch-zero multiples of `bucket_seconds`
/// and anchored at the earliest observation, not at the requested start
/// time: data availability rarely coincides with the request, and anchoring
/// on the data avoids emitting a leading file with nothing near its nominal
/// start.
///
/// Empty buckets inside a gap produce no segment. The trailing partial
/// bucket is always emitted.
pub fn bucketize(
    mut observations: Vec<Observation>,
    bucket_seconds: i64,
    starttime: i64,
    logger: &Logger,
) -> Vec<Segment> {
    if observations.is_empty() {
        return Vec::new();
    }
    observations.sort_by_key(|o| o.timestamp);

    let earliest = observations[0].timestamp;
    if earliest < starttime {
        warn!(
            logger,
            "earliest observation {} predates the requested start {}", earliest, starttime
        );
    }
    let mut curtime = earliest - earliest.rem_euclid(bucket_seconds);

    let mut segments = Vec::new();
    let mut current: Vec<Observation> = Vec::new();
    for observation in observations {
        // A gap can span several buckets; advance one bucket at a time and
        // emit nothing for the empty ones.
        while observation.timestamp - curtime >= bucket_seconds {
            if !current.is_empty() {
                segments.push(Segment {
                    start: curtime,
                    observations: std::mem::take(&mut current),
                });
            }
            curtime += bucket_seconds;
        }
        current.push(observation);
    }
    segments.push(Segment {
        start: curtime,
        observations: current,
    });
    segments
}
