//! Append-only triple-log of raw protocol lines (spec.md §4.2).

use std::sync::Mutex;

use bytes::Bytes;

use crate::protocol::types::Side;

#[derive(Debug, Default)]
struct Streams {
    omniscient: Vec<Bytes>,
    p1: Vec<Bytes>,
    p2: Vec<Bytes>,
}

/// Which sub-stream a line was recorded on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Omniscient,
    Side(Side),
}

/// Exclusive writer is the match's stream pump; the only reader is the
/// replay path inside `MatchRunner::bind`.
#[derive(Debug, Default)]
pub struct ProtocolCache {
    streams: Mutex<Streams>,
}

impl ProtocolCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, stream: Stream, line: Bytes) {
        let mut streams = self.streams.lock().expect("protocol cache lock poisoned");
        match stream {
            Stream::Omniscient => streams.omniscient.push(line),
            Stream::Side(Side::P1) => streams.p1.push(line),
            Stream::Side(Side::P2) => streams.p2.push(line),
        }
    }

    /// All `omniscient[]` lines in insertion order, followed by all
    /// `viewpoint`-private lines in insertion order (spec.md §4.2). Takes
    /// the lock once, copies both slices, then releases it — callers never
    /// observe a torn snapshot.
    pub fn replay(&self, viewpoint: Side) -> Vec<Bytes> {
        let streams = self.streams.lock().expect("protocol cache lock poisoned");
        let private = match viewpoint {
            Side::P1 => &streams.p1,
            Side::P2 => &streams.p2,
        };
        let mut out = Vec::with_capacity(streams.omniscient.len() + private.len());
        out.extend(streams.omniscient.iter().cloned());
        out.extend(private.iter().cloned());
        out
    }

    pub fn is_empty(&self) -> bool {
        let streams = self.streams.lock().expect("protocol cache lock poisoned");
        streams.omniscient.is_empty() && streams.p1.is_empty() && streams.p2.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_returns_omniscient_then_private_in_order() {
        let cache = ProtocolCache::new();
        cache.record(Stream::Omniscient, Bytes::from_static(b"|turn|1|"));
        cache.record(Stream::Side(Side::P1), Bytes::from_static(b"|request|p1-a|"));
        cache.record(Stream::Omniscient, Bytes::from_static(b"|turn|2|"));
        cache.record(Stream::Side(Side::P1), Bytes::from_static(b"|request|p1-b|"));
        cache.record(Stream::Side(Side::P2), Bytes::from_static(b"|request|p2-a|"));

        let replayed = cache.replay(Side::P1);
        assert_eq!(
            replayed,
            vec![
                Bytes::from_static(b"|turn|1|"),
                Bytes::from_static(b"|turn|2|"),
                Bytes::from_static(b"|request|p1-a|"),
                Bytes::from_static(b"|request|p1-b|"),
            ]
        );
    }

    #[test]
    fn empty_cache_reports_empty() {
        let cache = ProtocolCache::new();
        assert!(cache.is_empty());
        cache.record(Stream::Omniscient, Bytes::from_static(b"|teampreview|"));
        assert!(!cache.is_empty());
    }
}
