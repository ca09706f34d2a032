//! Commands for tracked paths and daily completion

use chrono::{DateTime, Utc};

use crate::completion::CompletionAction;
use crate::engine::{Engine, ProgressRequest};
use crate::store::ProgressStore;

/// List registered paths with their level counts and ladders
pub fn list_paths<S: ProgressStore>(engine: &Engine<S>) -> String {
    engine
        .registry()
        .paths()
        .map(|path| {
            let ladder: Vec<&str> = path.tier_ladder.iter().map(|t| t.as_str()).collect();
            format!(
                "{:<10} {:<10} {} levels/tier, tiers {}",
                path.id,
                path.display_name,
                path.levels_per_tier,
                ladder.join(" > ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Start tracking a path
pub async fn create<S: ProgressStore>(
    engine: &Engine<S>,
    owner_id: &str,
    path: &str,
    now: DateTime<Utc>,
) -> Result<String, String> {
    let entity = engine
        .create_entity(owner_id, path, now)
        .await
        .map_err(|e| e.to_string())?;

    Ok(format!(
        "Tracking {} at tier {} level {} ({} days to next level)",
        entity.path_type, entity.tier, entity.level, entity.progress_required_for_level
    ))
}

/// Complete today's work on a path
pub async fn complete<S: ProgressStore>(
    engine: &Engine<S>,
    owner_id: &str,
    path: &str,
    now: DateTime<Utc>,
) -> Result<String, String> {
    apply(engine, owner_id, path, CompletionAction::Complete, now).await
}

/// Reverse today's completion on a path
pub async fn reverse<S: ProgressStore>(
    engine: &Engine<S>,
    owner_id: &str,
    path: &str,
    now: DateTime<Utc>,
) -> Result<String, String> {
    apply(engine, owner_id, path, CompletionAction::Reverse, now).await
}

async fn apply<S: ProgressStore>(
    engine: &Engine<S>,
    owner_id: &str,
    path: &str,
    action: CompletionAction,
    now: DateTime<Utc>,
) -> Result<String, String> {
    let entity = engine
        .entity_for_path(owner_id, path)
        .await
        .map_err(|e| e.to_string())?;

    let result = engine
        .update_progress(ProgressRequest {
            entity_id: entity.id,
            action,
            now,
        })
        .await
        .map_err(|e| e.to_string())?;

    if result.rewards.is_empty() {
        Ok(result.message)
    } else {
        Ok(format!(
            "{} (+{} coins, +{} stat points)",
            result.message, result.rewards.coins, result.rewards.stat_points
        ))
    }
}

/// Summarize the owner's paths, coins and today's quests
pub async fn status<S: ProgressStore>(
    engine: &Engine<S>,
    owner_id: &str,
    now: DateTime<Utc>,
    json: bool,
) -> Result<String, String> {
    let today = now.date_naive();
    let entities = engine.entities(owner_id).await.map_err(|e| e.to_string())?;
    let profile = engine
        .store()
        .get_profile(owner_id)
        .await
        .map_err(|e| e.to_string())?;
    let quests: Vec<_> = engine
        .quests(owner_id)
        .await
        .map_err(|e| e.to_string())?
        .into_iter()
        .filter(|q| q.date == today)
        .collect();

    if json {
        let value = serde_json::json!({
            "owner_id": owner_id,
            "date": today,
            "entities": entities,
            "profile": profile,
            "quests": quests,
        });
        return serde_json::to_string_pretty(&value)
            .map_err(|e| format!("Failed to serialize status: {}", e));
    }

    let mut lines = vec![format!(
        "{} on {}: {} coins, {} stat points",
        owner_id, today, profile.coins, profile.stat_points
    )];

    if entities.is_empty() {
        lines.push("No paths tracked yet".to_string());
    }
    for entity in &entities {
        let done = if entity.completed_on(today) { " [done]" } else { "" };
        lines.push(format!(
            "  {:<10} {:<3} lvl {:>2}  {}/{}  streak {}{}",
            entity.path_type,
            entity.tier,
            entity.level,
            entity.accumulated_progress,
            entity.progress_required_for_level,
            entity.streak_days,
            done
        ));
    }

    for quest in &quests {
        let mark = if quest.is_completed() { "x" } else { " " };
        lines.push(format!(
            "  [{}] #{} {} ({})",
            mark, quest.id, quest.title, quest.difficulty
        ));
    }

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::resolve_now;
    use crate::test_utils::{day, memory_engine};

    #[test]
    fn test_list_paths_in_registration_order() {
        let engine = memory_engine();
        let listing = list_paths(&engine);
        let ids: Vec<&str> = listing
            .lines()
            .filter_map(|l| l.split_whitespace().next())
            .collect();
        assert_eq!(ids, vec!["athlete", "scholar", "monk"]);
        assert!(listing.contains("D > C > B > A > S > SS > SSS"));
    }

    #[tokio::test]
    async fn test_level_up_reports_rewards() {
        let engine = memory_engine();
        create(&engine, "u1", "athlete", resolve_now(Some(day(1)))).await.unwrap();
        for d in 1..3 {
            complete(&engine, "u1", "athlete", resolve_now(Some(day(d)))).await.unwrap();
        }
        let out = complete(&engine, "u1", "athlete", resolve_now(Some(day(3)))).await.unwrap();
        assert!(out.starts_with("Level up!"), "{}", out);
        assert!(out.contains("+10 coins"), "{}", out);
    }

    #[tokio::test]
    async fn test_reverse_unknown_path() {
        let engine = memory_engine();
        let out = reverse(&engine, "u1", "scholar", resolve_now(Some(day(1)))).await;
        assert!(out.unwrap_err().contains("not found"));
    }

    #[tokio::test]
    async fn test_status_text_and_json() {
        let engine = memory_engine();
        let now = resolve_now(Some(day(4)));
        create(&engine, "u1", "monk", now).await.unwrap();
        complete(&engine, "u1", "monk", now).await.unwrap();

        let text = status(&engine, "u1", now, false).await.unwrap();
        assert!(text.contains("monk"));
        assert!(text.contains("[done]"));

        let json = status(&engine, "u1", now, true).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entities"][0]["accumulated_progress"], 1);
        assert_eq!(value["date"], "2024-01-04");
    }
}
