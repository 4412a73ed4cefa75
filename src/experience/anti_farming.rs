//! Per-chunk kill limits.
//!
//! Anti-farming is applied by the caller after a calculation has produced
//! its number; nothing here runs during evaluation.

use crate::accumulate::Accumulator;
use crate::config::ConfigContext;
use crate::error::{Failure, FailureKind, ParseResult};
use crate::json::{JsonElement, JsonObject};
use crate::world::Position;
use std::collections::{HashMap, VecDeque};
use tracing::{trace, warn};

/// Side length of a chunk, in blocks.
pub const CHUNK_SIZE: f64 = 16.0;

/// Kill limit policy: at most `limit_per_chunk` rewarded kills in one chunk
/// within any `reset_after_seconds` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiFarming {
    pub limit_per_chunk: u32,
    pub reset_after_seconds: u32,
}

impl AntiFarming {
    pub fn new(limit_per_chunk: u32, reset_after_seconds: u32) -> Self {
        Self {
            limit_per_chunk,
            reset_after_seconds,
        }
    }

    /// Parse an `anti_farming` object.
    ///
    /// Both limits are required. The deprecated `enabled` member defaults to
    /// true; when it is false the object is still validated but the policy
    /// is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use serde_json::json;
    /// use xpcalc::experience::AntiFarming;
    /// use xpcalc::{ConfigContext, JsonElement};
    ///
    /// let doc = json!({ "limit_per_chunk": 5, "reset_after_seconds": 300 });
    /// let policy = AntiFarming::parse(JsonElement::root(&doc), &ConfigContext::default()).unwrap();
    /// assert_eq!(policy, Some(AntiFarming::new(5, 300)));
    /// ```
    pub fn parse(element: JsonElement<'_>, config: &ConfigContext) -> ParseResult<Option<Self>> {
        let object = element.as_object()?;
        let mut failures = Accumulator::new(object.path());
        if config.deny_unknown_fields {
            failures.record_all(object.unknown_fields(&["enabled", "limit_per_chunk", "reset_after_seconds"]));
        }

        let enabled = failures.take(object.get_or("enabled", true, |e| e.as_bool()));
        let limit_per_chunk = failures.take(non_negative(&object, "limit_per_chunk"));
        let reset_after_seconds = failures.take(non_negative(&object, "reset_after_seconds"));

        if object.contains("enabled") {
            warn!(path = %object.path(), "`enabled` is deprecated; remove `anti_farming` to disable it");
        }

        let policy = limit_per_chunk
            .zip(reset_after_seconds)
            .map(|(limit, reset)| Self::new(limit, reset));
        failures.finish(enabled.zip(policy).map(|(enabled, policy)| enabled.then_some(policy)))
    }
}

fn non_negative(object: &JsonObject<'_>, key: &str) -> Result<u32, Failure> {
    let element = object.get(key)?;
    let value = element.as_i32()?;
    u32::try_from(value).map_err(|_| {
        element
            .path()
            .failure(FailureKind::InvalidValue(format!("expected a non-negative integer, found {}", value)))
    })
}

/// Chunk coordinates of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    /// The chunk containing `position`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use xpcalc::experience::ChunkPos;
    /// use xpcalc::world::Position;
    ///
    /// assert_eq!(ChunkPos::containing(&Position::new(15.9, 64.0, -0.5)), ChunkPos { x: 0, z: -1 });
    /// ```
    pub fn containing(position: &Position) -> Self {
        Self {
            x: (position.x / CHUNK_SIZE).floor() as i32,
            z: (position.z / CHUNK_SIZE).floor() as i32,
        }
    }
}

/// Caller-owned kill counter enforcing an [`AntiFarming`] policy.
///
/// Timestamps are seconds on any monotonic clock the caller chooses.
///
/// # Examples
///
/// ```rust
/// use xpcalc::experience::{AntiFarming, ChunkKillCounter, ChunkPos};
///
/// let mut counter = ChunkKillCounter::new(AntiFarming::new(2, 60));
/// let chunk = ChunkPos { x: 0, z: 0 };
///
/// assert!(counter.record_kill(chunk, 0));
/// assert!(counter.record_kill(chunk, 10));
/// assert!(!counter.record_kill(chunk, 20));
/// assert!(counter.record_kill(chunk, 60));
/// ```
#[derive(Debug, Clone)]
pub struct ChunkKillCounter {
    policy: AntiFarming,
    kills: HashMap<ChunkPos, VecDeque<u64>>,
    sweep_at: usize,
}

/// Chunk count below which [`ChunkKillCounter`] never sweeps.
const MIN_SWEEP_AT: usize = 64;

fn expire(kills: &mut VecDeque<u64>, now: u64, window: u64) {
    while let Some(&oldest) = kills.front() {
        if now.saturating_sub(oldest) >= window {
            kills.pop_front();
        } else {
            break;
        }
    }
}

impl ChunkKillCounter {
    pub fn new(policy: AntiFarming) -> Self {
        Self {
            policy,
            kills: HashMap::new(),
            sweep_at: MIN_SWEEP_AT,
        }
    }

    pub fn policy(&self) -> &AntiFarming {
        &self.policy
    }

    /// Record a kill in `chunk` at time `now`.
    ///
    /// Returns whether the kill still earns experience. Kills over the limit
    /// are not counted, so they do not extend the window. Chunks whose kills
    /// have all expired are dropped once the number of tracked chunks
    /// doubles.
    pub fn record_kill(&mut self, chunk: ChunkPos, now: u64) -> bool {
        let window = u64::from(self.policy.reset_after_seconds);
        let limit = self.policy.limit_per_chunk as usize;
        if limit == 0 {
            trace!(x = chunk.x, z = chunk.z, "chunk limit is zero");
            return false;
        }

        let rewarded = match self.kills.get_mut(&chunk) {
            Some(kills) => {
                expire(kills, now, window);
                if kills.len() >= limit {
                    trace!(x = chunk.x, z = chunk.z, kills = kills.len(), "kill over chunk limit");
                    false
                } else {
                    kills.push_back(now);
                    true
                }
            }
            None => {
                self.kills.insert(chunk, VecDeque::from([now]));
                true
            }
        };

        if self.kills.len() > self.sweep_at {
            self.prune(now);
            self.sweep_at = (self.kills.len() * 2).max(MIN_SWEEP_AT);
        }
        rewarded
    }

    /// Drop every kill older than the reset window, and every chunk left
    /// without kills.
    pub fn prune(&mut self, now: u64) {
        let window = u64::from(self.policy.reset_after_seconds);
        let before = self.kills.len();
        self.kills.retain(|_, kills| {
            expire(kills, now, window);
            !kills.is_empty()
        });
        trace!(dropped = before - self.kills.len(), chunks = self.kills.len(), "pruned kill counter");
    }

    /// Kills currently counted in `chunk`.
    pub fn kills_in(&self, chunk: ChunkPos) -> usize {
        self.kills.get(&chunk).map_or(0, VecDeque::len)
    }

    /// Chunks with at least one recorded kill, expired or not.
    pub fn tracked_chunks(&self) -> usize {
        self.kills.len()
    }

    /// Forget every recorded kill.
    pub fn clear(&mut self) {
        self.kills.clear();
        self.sweep_at = MIN_SWEEP_AT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn parse(doc: serde_json::Value) -> ParseResult<Option<AntiFarming>> {
        AntiFarming::parse(JsonElement::root(&doc), &ConfigContext::default())
    }

    #[test]
    fn test_both_limits_required() {
        let err = parse(json!({})).unwrap_err();
        let paths: Vec<String> = err.iter().map(|f| f.path().to_string()).collect();
        assert_eq!(paths, vec!["limit_per_chunk", "reset_after_seconds"]);
    }

    #[test]
    fn test_negative_limit() {
        let err = parse(json!({ "limit_per_chunk": -1, "reset_after_seconds": 10 })).unwrap_err();
        assert_eq!(err.len(), 1);
        assert_matches!(err.first().kind(), FailureKind::InvalidValue(_));
    }

    #[test]
    fn test_disabled_policy_is_validated_then_dropped() {
        assert_eq!(
            parse(json!({ "enabled": false, "limit_per_chunk": 5, "reset_after_seconds": 10 })).unwrap(),
            None
        );
        assert!(parse(json!({ "enabled": false, "limit_per_chunk": "5", "reset_after_seconds": 10 })).is_err());
    }

    #[test]
    fn test_enabled_true_keeps_policy() {
        assert_eq!(
            parse(json!({ "enabled": true, "limit_per_chunk": 5, "reset_after_seconds": 10 })).unwrap(),
            Some(AntiFarming::new(5, 10))
        );
    }

    #[test]
    fn test_chunks_are_counted_separately() {
        let mut counter = ChunkKillCounter::new(AntiFarming::new(1, 100));
        let a = ChunkPos { x: 0, z: 0 };
        let b = ChunkPos { x: 1, z: 0 };
        assert!(counter.record_kill(a, 0));
        assert!(counter.record_kill(b, 0));
        assert!(!counter.record_kill(a, 50));
        assert_eq!(counter.kills_in(a), 1);

        counter.clear();
        assert_eq!(counter.kills_in(a), 0);
    }

    #[test]
    fn test_zero_limit_never_rewards() {
        let mut counter = ChunkKillCounter::new(AntiFarming::new(0, 10));
        for x in 0..100 {
            assert!(!counter.record_kill(ChunkPos { x, z: 0 }, 0));
        }
        assert_eq!(counter.tracked_chunks(), 0);
    }

    #[test]
    fn test_expired_chunks_are_dropped() {
        let mut counter = ChunkKillCounter::new(AntiFarming::new(3, 60));
        for x in 0..1000 {
            assert!(counter.record_kill(ChunkPos { x, z: 0 }, 0));
        }
        for z in 1..=100 {
            assert!(counter.record_kill(ChunkPos { x: 0, z }, 1_000));
        }
        assert!(counter.tracked_chunks() <= 200);
        assert_eq!(counter.kills_in(ChunkPos { x: 0, z: 100 }), 1);
        assert_eq!(counter.kills_in(ChunkPos { x: 999, z: 0 }), 0);
    }

    #[test]
    fn test_prune_keeps_live_kills() {
        let mut counter = ChunkKillCounter::new(AntiFarming::new(2, 60));
        let old = ChunkPos { x: 0, z: 0 };
        let live = ChunkPos { x: 1, z: 0 };
        counter.record_kill(old, 0);
        counter.record_kill(live, 30);
        counter.record_kill(live, 70);

        counter.prune(80);
        assert_eq!(counter.tracked_chunks(), 1);
        assert_eq!(counter.kills_in(old), 0);
        assert_eq!(counter.kills_in(live), 2);
    }
}
