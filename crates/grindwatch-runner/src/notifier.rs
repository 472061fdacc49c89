//! Discord webhook notifier.
//!
//! Builds one "XP Overview" embed per completed grind session: each
//! skill that gained XP between the session's first and last snapshots
//! gets a row with its XP delta and rank movement. The `Overall`
//! pseudo-skill and zero-gain skills are skipped. Sessions too short to
//! diff (a single snapshot) still produce a report, just without the
//! per-skill table.
//!
//! Delivery is fire-and-forget from the courier's point of view: any
//! failure here is logged upstream and the session data is gone.

use grindwatch_core::{Notifier, NotifyError};
use grindwatch_types::Snapshot;
use serde::Serialize;

/// Embed accent color (the original deployment's orange).
const EMBED_COLOR: u32 = 14_500_675;

/// Thumbnail shown on every session report.
const EMBED_THUMBNAIL_URL: &str = "https://i.imgur.com/1NqptGr.png";

/// Webhook display name.
const WEBHOOK_USERNAME: &str = "Grind Bot";

/// Top-level Discord webhook payload.
#[derive(Debug, Serialize)]
struct WebhookPayload {
    content: String,
    username: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    embeds: Vec<Embed>,
}

/// One embed in the webhook payload.
#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<Thumbnail>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<EmbedField>,
    timestamp: String,
}

/// Embed thumbnail reference.
#[derive(Debug, Serialize)]
struct Thumbnail {
    url: String,
}

/// One field in an embed.
#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

/// Per-skill movement across one session.
#[derive(Debug, PartialEq, Eq)]
struct SkillGain {
    name: String,
    xp_gain: i64,
    /// Positive when the player climbed the leaderboard.
    rank_gain: i64,
    /// Rank at session end.
    final_rank: i32,
}

/// Delivers session reports to a Discord webhook.
#[derive(Debug, Clone)]
pub struct DiscordNotifier {
    client: reqwest::Client,
    webhook_url: String,
}

impl DiscordNotifier {
    /// Create a notifier posting to the given webhook URL.
    pub fn new(client: reqwest::Client, webhook_url: &str) -> Self {
        Self {
            client,
            webhook_url: webhook_url.to_owned(),
        }
    }
}

impl Notifier for DiscordNotifier {
    async fn report(&self, day: &[Snapshot], session: &[Snapshot]) -> Result<(), NotifyError> {
        let payload = build_payload(day, session);

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Delivery(format!(
                "webhook returned {status}"
            )));
        }

        Ok(())
    }
}

/// Assemble the webhook payload for one finalized session.
fn build_payload(day: &[Snapshot], session: &[Snapshot]) -> WebhookPayload {
    let embed = match (session.first(), session.last()) {
        (Some(first), Some(last)) if session.len() >= 2 => overview_embed(first, last),
        (Some(only), _) => short_session_embed(only),
        // The courier never reports an empty session; render something
        // honest if a future caller does.
        (None, _) => short_session_embed_placeholder(),
    };

    WebhookPayload {
        content: format!(
            "Grind session complete ({} of {} samples in today's history)",
            session.len(),
            day.len()
        ),
        username: WEBHOOK_USERNAME.to_owned(),
        embeds: vec![embed],
    }
}

/// The per-skill gains table between the first and last session samples.
fn overview_embed(first: &Snapshot, last: &Snapshot) -> Embed {
    let gains = skill_gains(first, last);

    let mut skill_names = String::new();
    let mut xp_column = String::new();
    let mut rank_column = String::new();
    for gain in &gains {
        skill_names.push_str(&gain.name);
        skill_names.push('\n');
        xp_column.push_str(&format!("+{}\n", gain.xp_gain));
        rank_column.push_str(&format!("{:+} (#{})\n", gain.rank_gain, gain.final_rank));
    }

    let fields = if gains.is_empty() {
        Vec::new()
    } else {
        vec![
            EmbedField {
                name: "Skill".to_owned(),
                value: skill_names,
                inline: true,
            },
            EmbedField {
                name: "XP Gain".to_owned(),
                value: xp_column,
                inline: true,
            },
            EmbedField {
                name: "Rank".to_owned(),
                value: rank_column,
                inline: true,
            },
        ]
    };

    Embed {
        title: "XP Overview".to_owned(),
        color: EMBED_COLOR,
        description: None,
        thumbnail: Some(Thumbnail {
            url: EMBED_THUMBNAIL_URL.to_owned(),
        }),
        fields,
        timestamp: last.timestamp.to_rfc3339(),
    }
}

/// Fallback embed for a session with a single sample.
fn short_session_embed(only: &Snapshot) -> Embed {
    Embed {
        title: "XP Overview".to_owned(),
        color: EMBED_COLOR,
        description: Some(
            "Session ended after a single sample -- no per-skill breakdown available.".to_owned(),
        ),
        thumbnail: Some(Thumbnail {
            url: EMBED_THUMBNAIL_URL.to_owned(),
        }),
        fields: Vec::new(),
        timestamp: only.timestamp.to_rfc3339(),
    }
}

/// Defensive embed when no session samples were supplied at all.
fn short_session_embed_placeholder() -> Embed {
    Embed {
        title: "XP Overview".to_owned(),
        color: EMBED_COLOR,
        description: Some("Session ended with no samples.".to_owned()),
        thumbnail: None,
        fields: Vec::new(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}

/// Per-skill XP and rank movement between two snapshots, matched by
/// name. `Overall` and skills with no XP movement are skipped.
fn skill_gains(first: &Snapshot, last: &Snapshot) -> Vec<SkillGain> {
    first
        .skills
        .iter()
        .filter(|skill| skill.name != "Overall")
        .filter_map(|before| {
            let after = last.skill(&before.name)?;
            let xp_gain = after.xp.saturating_sub(before.xp);
            if xp_gain == 0 {
                return None;
            }
            Some(SkillGain {
                name: before.name.clone(),
                xp_gain,
                rank_gain: i64::from(before.rank).saturating_sub(i64::from(after.rank)),
                final_rank: after.rank,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use grindwatch_types::Skill;

    use super::*;

    fn skill(name: &str, rank: i32, xp: i64) -> Skill {
        Skill {
            id: 0,
            name: name.to_owned(),
            rank,
            level: 80,
            xp,
        }
    }

    fn snapshot(skills: Vec<Skill>) -> Snapshot {
        Snapshot {
            timestamp: Utc::now(),
            skills,
            activities: Vec::new(),
        }
    }

    #[test]
    fn gains_skip_overall_and_unmoved_skills() {
        let first = snapshot(vec![
            skill("Overall", 1000, 5_000_000),
            skill("Attack", 500, 1_000_000),
            skill("Mining", 700, 2_000_000),
        ]);
        let last = snapshot(vec![
            skill("Overall", 990, 5_100_000),
            skill("Attack", 480, 1_100_000),
            skill("Mining", 700, 2_000_000),
        ]);

        let gains = skill_gains(&first, &last);
        assert_eq!(gains.len(), 1);
        let attack = gains.first().unwrap();
        assert_eq!(attack.name, "Attack");
        assert_eq!(attack.xp_gain, 100_000);
        assert_eq!(attack.rank_gain, 20);
        assert_eq!(attack.final_rank, 480);
    }

    #[test]
    fn gains_match_by_name_across_reordered_tables() {
        let first = snapshot(vec![
            skill("Attack", 500, 1_000_000),
            skill("Mining", 700, 2_000_000),
        ]);
        let last = snapshot(vec![
            skill("Mining", 700, 2_050_000),
            skill("Attack", 500, 1_000_000),
        ]);

        let gains = skill_gains(&first, &last);
        assert_eq!(gains.len(), 1);
        assert_eq!(gains.first().unwrap().name, "Mining");
        assert_eq!(gains.first().unwrap().xp_gain, 50_000);
    }

    #[test]
    fn full_session_payload_has_three_inline_columns() {
        let first = snapshot(vec![skill("Attack", 500, 1_000_000)]);
        let last = snapshot(vec![skill("Attack", 480, 1_100_000)]);
        let day = vec![first.clone(), last.clone()];

        let payload = build_payload(&day, &[first, last]);
        assert_eq!(payload.username, WEBHOOK_USERNAME);
        assert_eq!(payload.embeds.len(), 1);
        let embed = payload.embeds.first().unwrap();
        assert_eq!(embed.fields.len(), 3);
        assert!(embed.fields.iter().all(|f| f.inline));
        assert!(embed.description.is_none());
    }

    #[test]
    fn single_sample_session_still_produces_an_embed() {
        let only = snapshot(vec![skill("Attack", 500, 1_000_000)]);
        let payload = build_payload(&[only.clone()], &[only]);
        let embed = payload.embeds.first().unwrap();
        assert!(embed.fields.is_empty());
        assert!(embed.description.is_some());
    }

    #[test]
    fn payload_serializes_without_empty_optionals() {
        let only = snapshot(vec![skill("Attack", 500, 1_000_000)]);
        let payload = build_payload(&[only.clone()], &[only]);
        let json = serde_json::to_value(&payload).unwrap();
        // skip_serializing_if keeps the payload lean for Discord.
        assert!(json.get("embeds").is_some());
        let embed = json.get("embeds").unwrap().get(0).unwrap();
        assert!(embed.get("fields").is_none());
    }
}
