//! Commands for quests and the day boundary

use chrono::{DateTime, Utc};

use crate::engine::Engine;
use crate::models::{Difficulty, NewQuest, QuestStatus};
use crate::store::ProgressStore;

/// Borrowed form of the `quest-add` arguments
#[derive(Debug, Clone, Copy)]
pub struct QuestDraft<'a> {
    pub owner_id: &'a str,
    pub title: &'a str,
    pub difficulty: Option<Difficulty>,
    pub recurring: bool,
    pub backlog: bool,
    pub subtasks: &'a [String],
}

/// Add a quest dated today
pub async fn add<S: ProgressStore>(
    engine: &Engine<S>,
    draft: QuestDraft<'_>,
    now: DateTime<Utc>,
) -> Result<String, String> {
    let title = draft.title.trim();
    if title.is_empty() {
        return Err("Quest title cannot be empty".to_string());
    }

    let quest = engine
        .create_quest(NewQuest {
            owner_id: draft.owner_id.to_string(),
            title: title.to_string(),
            date: now.date_naive(),
            status: if draft.backlog {
                QuestStatus::Backlog
            } else {
                QuestStatus::Today
            },
            difficulty: draft.difficulty,
            is_recurring: draft.recurring,
            subtasks: draft.subtasks.to_vec(),
        })
        .await
        .map_err(|e| e.to_string())?;

    Ok(format!(
        "Added quest #{} {} ({}, {} coins)",
        quest.id,
        quest.title,
        quest.difficulty,
        quest.difficulty.reward_coins()
    ))
}

/// Complete a quest and pay out its reward
pub async fn done<S: ProgressStore>(
    engine: &Engine<S>,
    quest_id: i64,
    now: DateTime<Utc>,
) -> Result<String, String> {
    let completion = engine
        .complete_quest(quest_id, now)
        .await
        .map_err(|e| e.to_string())?;

    Ok(format!(
        "Completed #{} {} (+{} coins, {} total)",
        completion.quest.id, completion.quest.title, completion.reward_coins, completion.profile.coins
    ))
}

/// Run the day-boundary pass for today
pub async fn rollover<S: ProgressStore>(
    engine: &Engine<S>,
    owner_id: &str,
    now: DateTime<Utc>,
) -> Result<String, String> {
    let advance = engine
        .advance_day(owner_id, now.date_naive())
        .await
        .map_err(|e| e.to_string())?;

    let plan = &advance.rollover;
    if plan.is_empty() && advance.entities_reset == 0 {
        return Ok(format!("Already up to date for {}", plan.today));
    }

    Ok(format!(
        "Rolled over to {}: {} carried, {} recurring reset, {} days closed, {} paths reset",
        plan.today,
        plan.carried,
        plan.recurring_reset,
        plan.snapshots.len(),
        advance.entities_reset
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::resolve_now;
    use crate::test_utils::{day, memory_engine};

    fn draft<'a>(title: &'a str, subtasks: &'a [String]) -> QuestDraft<'a> {
        QuestDraft {
            owner_id: "u1",
            title,
            difficulty: Some(Difficulty::Moderate),
            recurring: false,
            backlog: false,
            subtasks,
        }
    }

    #[tokio::test]
    async fn test_add_then_done() {
        let engine = memory_engine();
        let now = resolve_now(Some(day(5)));

        let added = add(&engine, draft("Call the bank", &[]), now).await.unwrap();
        assert_eq!(added, "Added quest #1 Call the bank (Moderate, 20 coins)");

        let out = done(&engine, 1, now).await.unwrap();
        assert_eq!(out, "Completed #1 Call the bank (+20 coins, 20 total)");

        assert!(done(&engine, 1, now).await.is_err());
    }

    #[tokio::test]
    async fn test_blank_title_rejected() {
        let engine = memory_engine();
        let out = add(&engine, draft("   ", &[]), resolve_now(Some(day(5)))).await;
        assert!(out.is_err());
        assert!(engine.quests("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rollover_reports_once() {
        let engine = memory_engine();
        add(&engine, draft("Taxes", &[]), resolve_now(Some(day(5)))).await.unwrap();

        let first = rollover(&engine, "u1", resolve_now(Some(day(6)))).await.unwrap();
        assert!(first.contains("1 carried"), "{}", first);

        let second = rollover(&engine, "u1", resolve_now(Some(day(6)))).await.unwrap();
        assert_eq!(second, "Already up to date for 2024-01-06");
    }
}
