//! Shared type definitions for the grindwatch poller.
//!
//! One [`Snapshot`] is produced per poll cycle: the player's full hiscore
//! table (skills and activities) stamped with the fetch time. Snapshots
//! are immutable once constructed and move by value from the hiscore
//! client through the history buffer into the session courier -- nothing
//! downstream ever mutates one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One skill row from the hiscore table.
///
/// Field shapes mirror the hiscore `index_lite.json` payload. Skills are
/// matched across snapshots by `name`, never by position -- the API has
/// reordered the table before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Hiscore skill identifier.
    pub id: i16,
    /// Skill name (e.g. `Attack`, `Overall`).
    pub name: String,
    /// Global rank for this skill. `-1` from the API means unranked.
    pub rank: i32,
    /// Current level.
    pub level: i32,
    /// Total experience points in this skill.
    pub xp: i64,
}

/// One activity (minigame / boss) row from the hiscore table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Hiscore activity identifier.
    pub id: i16,
    /// Activity name.
    pub name: String,
    /// Global rank for this activity. `-1` from the API means unranked.
    pub rank: i32,
    /// Kill count, points, or completions depending on the activity.
    pub score: i32,
}

/// A point-in-time measurement of one player's hiscore state.
///
/// The timestamp is assigned at fetch time and is assumed (not enforced)
/// to be monotonically non-decreasing across consecutive inserts into the
/// history buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When this measurement was fetched (UTC).
    pub timestamp: DateTime<Utc>,
    /// Ordered skill rows. The set of names is assumed stable across
    /// snapshots of the same player.
    pub skills: Vec<Skill>,
    /// Ordered activity rows.
    pub activities: Vec<Activity>,
}

impl Snapshot {
    /// Sum of XP across all skills, saturating at `i64::MAX`.
    ///
    /// Includes the `Overall` pseudo-skill when present, so this is a
    /// logging/diagnostic figure, not a gameplay total.
    pub fn total_xp(&self) -> i64 {
        self.skills
            .iter()
            .fold(0_i64, |acc, skill| acc.saturating_add(skill.xp))
    }

    /// Look up a skill row by name.
    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.name == name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snapshot_with(skills: Vec<Skill>) -> Snapshot {
        Snapshot {
            timestamp: Utc::now(),
            skills,
            activities: Vec::new(),
        }
    }

    fn skill(name: &str, xp: i64) -> Skill {
        Skill {
            id: 0,
            name: name.to_owned(),
            rank: 1,
            level: 50,
            xp,
        }
    }

    #[test]
    fn total_xp_sums_all_skills() {
        let snap = snapshot_with(vec![skill("Attack", 100), skill("Mining", 250)]);
        assert_eq!(snap.total_xp(), 350);
    }

    #[test]
    fn total_xp_saturates() {
        let snap = snapshot_with(vec![skill("Attack", i64::MAX), skill("Mining", 1)]);
        assert_eq!(snap.total_xp(), i64::MAX);
    }

    #[test]
    fn skill_lookup_by_name() {
        let snap = snapshot_with(vec![skill("Attack", 100), skill("Mining", 250)]);
        assert_eq!(snap.skill("Mining").unwrap().xp, 250);
        assert!(snap.skill("Herblore").is_none());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let snap = snapshot_with(vec![skill("Attack", 100)]);
        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
