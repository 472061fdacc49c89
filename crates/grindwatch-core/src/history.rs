//! Rolling day history: a fixed-capacity circular store of snapshots.
//!
//! The buffer holds at most `capacity` snapshots (1440 at one poll per
//! minute covers a day); once full, the oldest entry is silently
//! overwritten. [`HistoryBuffer::add`] doubles as the change detector:
//! it compares the incoming snapshot against the previously written one
//! and reports whether any skill gained or lost XP. That flag drives the
//! session state machine in [`courier`].
//!
//! # Design Principles
//!
//! - Capacity is fixed at construction and can never be zero.
//! - `add` and `get_all` never fail and share one mutex; `get_all`
//!   returns a point-in-time copy, not a live view.
//! - Skills are matched by *name* across snapshots. The positional
//!   comparison is fragile when the hiscore table changes shape, so the
//!   index is never trusted.
//!
//! [`courier`]: crate::courier

use std::sync::{Mutex, MutexGuard, PoisonError};

use grindwatch_types::Snapshot;

/// Errors that can occur when constructing a history buffer.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The requested capacity was zero.
    #[error("history buffer capacity must be at least 1")]
    ZeroCapacity,
}

/// Interior state guarded by the buffer's mutex.
#[derive(Debug)]
struct BufferState {
    /// Stored snapshots. Grows up to `capacity`, then entries are
    /// overwritten in place.
    slots: Vec<Snapshot>,
    /// Next write position.
    cursor: usize,
    /// Set once the cursor has wrapped back to zero at least once.
    wrapped: bool,
}

impl BufferState {
    /// The snapshot written immediately before the current cursor
    /// position, if any snapshot has been written at all.
    fn previous(&self) -> Option<&Snapshot> {
        if self.slots.is_empty() {
            return None;
        }
        let index = self
            .cursor
            .checked_sub(1)
            .unwrap_or_else(|| self.slots.len().saturating_sub(1));
        self.slots.get(index)
    }
}

/// Fixed-capacity circular store of [`Snapshot`]s with change detection.
///
/// Created once at process start and shared between the poll loop and
/// the session courier's finalize path. All access goes through one
/// internal mutex, held only for the duration of a single call.
#[derive(Debug)]
pub struct HistoryBuffer {
    capacity: usize,
    inner: Mutex<BufferState>,
}

impl HistoryBuffer {
    /// Create a buffer that retains at most `capacity` snapshots.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ZeroCapacity`] if `capacity` is 0.
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }
        Ok(Self {
            capacity,
            inner: Mutex::new(BufferState {
                slots: Vec::with_capacity(capacity),
                cursor: 0,
                wrapped: false,
            }),
        })
    }

    /// Insert a snapshot at the write cursor and report whether it
    /// differs from the previous one.
    ///
    /// Returns `false` for the first-ever insert (there is nothing to
    /// compare against). Otherwise returns `true` iff any skill present
    /// in both the previous and the new snapshot, matched by name, has
    /// a different XP value.
    ///
    /// Once the buffer is full the oldest snapshot is overwritten; the
    /// caller is never told about eviction.
    pub fn add(&self, snapshot: Snapshot) -> bool {
        let mut state = self.lock();

        let changed = state
            .previous()
            .is_some_and(|previous| xp_changed(previous, &snapshot));
        if changed {
            tracing::debug!(timestamp = %snapshot.timestamp, "XP change detected");
        }

        let cursor = state.cursor;
        if let Some(slot) = state.slots.get_mut(cursor) {
            *slot = snapshot;
        } else {
            state.slots.push(snapshot);
        }

        state.cursor = cursor
            .checked_add(1)
            .and_then(|next| next.checked_rem(self.capacity))
            .unwrap_or(0);
        if state.cursor == 0 {
            state.wrapped = true;
        }

        changed
    }

    /// Copy out all retained snapshots in chronological order (oldest
    /// first).
    ///
    /// Before the buffer wraps this is simply the written prefix; after
    /// wrapping, the tail from the cursor onward precedes the head. Does
    /// not mutate buffer state and is safe to call concurrently with
    /// [`add`].
    ///
    /// [`add`]: HistoryBuffer::add
    pub fn get_all(&self) -> Vec<Snapshot> {
        let state = self.lock();

        if !state.wrapped {
            return state.slots.clone();
        }

        let mut ordered = Vec::with_capacity(self.capacity);
        ordered.extend(state.slots.iter().skip(state.cursor).cloned());
        ordered.extend(state.slots.iter().take(state.cursor).cloned());
        ordered
    }

    /// Copy of the most recently added snapshot, if any.
    pub fn latest(&self) -> Option<Snapshot> {
        self.lock().previous().cloned()
    }

    /// Number of snapshots currently retained.
    pub fn len(&self) -> usize {
        self.lock().slots.len()
    }

    /// Whether the buffer holds no snapshots yet.
    pub fn is_empty(&self) -> bool {
        self.lock().slots.is_empty()
    }

    /// The fixed capacity chosen at construction.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Acquire the interior lock, recovering from poisoning.
    ///
    /// A poisoned mutex here means another thread panicked mid-`add`;
    /// the buffer contents remain structurally valid (slot writes are
    /// single assignments), so recovery is safe.
    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Whether any skill present in both snapshots, matched by name, has a
/// differing XP value.
///
/// Skills that exist in only one of the two snapshots are ignored -- a
/// hiscore table reshape alone never starts a session.
fn xp_changed(previous: &Snapshot, current: &Snapshot) -> bool {
    current.skills.iter().any(|skill| {
        previous
            .skill(&skill.name)
            .is_some_and(|before| before.xp != skill.xp)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use chrono::{Duration, Utc};
    use grindwatch_types::Skill;

    use super::*;

    /// Snapshot with a single `Attack` skill at the given XP, offset in
    /// time so insertion order is visible in timestamps.
    fn snap(xp: i64, minute: i64) -> Snapshot {
        Snapshot {
            timestamp: Utc::now() + Duration::minutes(minute),
            skills: vec![Skill {
                id: 1,
                name: "Attack".to_owned(),
                rank: 100,
                level: 60,
                xp,
            }],
            activities: Vec::new(),
        }
    }

    fn attack_xp(snapshot: &Snapshot) -> i64 {
        snapshot.skill("Attack").unwrap().xp
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            HistoryBuffer::new(0),
            Err(HistoryError::ZeroCapacity)
        ));
    }

    #[test]
    fn first_insert_reports_no_change() {
        let buffer = HistoryBuffer::new(3).unwrap();
        assert!(!buffer.add(snap(100, 0)));
    }

    #[test]
    fn equal_xp_reports_no_change() {
        let buffer = HistoryBuffer::new(3).unwrap();
        buffer.add(snap(100, 0));
        assert!(!buffer.add(snap(100, 1)));
    }

    #[test]
    fn xp_gain_reports_change() {
        let buffer = HistoryBuffer::new(3).unwrap();
        buffer.add(snap(100, 0));
        assert!(buffer.add(snap(150, 1)));
    }

    #[test]
    fn change_in_any_matched_skill_counts() {
        let make = |attack_xp: i64, mining_xp: i64| Snapshot {
            timestamp: Utc::now(),
            skills: vec![
                Skill {
                    id: 1,
                    name: "Attack".to_owned(),
                    rank: 100,
                    level: 60,
                    xp: attack_xp,
                },
                Skill {
                    id: 15,
                    name: "Mining".to_owned(),
                    rank: 2000,
                    level: 70,
                    xp: mining_xp,
                },
            ],
            activities: Vec::new(),
        };
        let buffer = HistoryBuffer::new(4).unwrap();
        buffer.add(make(100, 500));
        // Only the second skill moved.
        assert!(buffer.add(make(100, 510)));
        // Neither moved.
        assert!(!buffer.add(make(100, 510)));
    }

    #[test]
    fn skills_are_matched_by_name_not_position() {
        let forward = Snapshot {
            timestamp: Utc::now(),
            skills: vec![
                Skill {
                    id: 1,
                    name: "Attack".to_owned(),
                    rank: 100,
                    level: 60,
                    xp: 100,
                },
                Skill {
                    id: 15,
                    name: "Mining".to_owned(),
                    rank: 2000,
                    level: 70,
                    xp: 500,
                },
            ],
            activities: Vec::new(),
        };
        let mut reversed = forward.clone();
        reversed.skills.reverse();

        let buffer = HistoryBuffer::new(4).unwrap();
        buffer.add(forward);
        // Same XP values, different row order: no change.
        assert!(!buffer.add(reversed));
    }

    #[test]
    fn unmatched_skills_are_ignored() {
        let buffer = HistoryBuffer::new(4).unwrap();
        buffer.add(snap(100, 0));

        let mut with_new_skill = snap(100, 1);
        with_new_skill.skills.push(Skill {
            id: 23,
            name: "Sailing".to_owned(),
            rank: 1,
            level: 1,
            xp: 0,
        });
        // A brand-new hiscore row is not progress.
        assert!(!buffer.add(with_new_skill));
    }

    #[test]
    fn capacity_invariant_holds_after_wrapping() {
        let buffer = HistoryBuffer::new(3).unwrap();
        for i in 0..7_i64 {
            buffer.add(snap(100 + i, i));
        }
        let all = buffer.get_all();
        assert_eq!(all.len(), 3);
        // Oldest surviving entry is the 5th inserted (k = 4 overwritten).
        let xps: Vec<i64> = all.iter().map(attack_xp).collect();
        assert_eq!(xps, vec![104, 105, 106]);
    }

    #[test]
    fn get_all_is_chronological_before_wrap() {
        let buffer = HistoryBuffer::new(5).unwrap();
        buffer.add(snap(1, 0));
        buffer.add(snap(2, 1));
        let xps: Vec<i64> = buffer.get_all().iter().map(attack_xp).collect();
        assert_eq!(xps, vec![1, 2]);
        assert_eq!(buffer.len(), 2);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn latest_tracks_the_write_cursor() {
        let buffer = HistoryBuffer::new(2).unwrap();
        assert!(buffer.latest().is_none());
        buffer.add(snap(1, 0));
        buffer.add(snap(2, 1));
        buffer.add(snap(3, 2));
        assert_eq!(attack_xp(&buffer.latest().unwrap()), 3);
    }

    #[test]
    fn day_scenario_capacity_three() {
        // Spec scenario: XP [100, 100, 150, 150, 200] into capacity 3.
        let buffer = HistoryBuffer::new(3).unwrap();
        let flags: Vec<bool> = [100, 100, 150, 150, 200]
            .iter()
            .enumerate()
            .map(|(i, &xp)| buffer.add(snap(xp, i64::try_from(i).unwrap())))
            .collect();
        assert_eq!(flags, vec![false, false, true, false, true]);

        let xps: Vec<i64> = buffer.get_all().iter().map(attack_xp).collect();
        assert_eq!(xps, vec![150, 150, 200]);
    }
}
