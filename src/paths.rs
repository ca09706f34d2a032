//! Shipped path content tables
//!
//! Each path is pure data: one row per level within a tier.
//! Row layout: (level, days_required, reward_coins, reward_stat_points,
//! xp_to_level_up, trial title, trial description).

use crate::registry::{LevelConfig, PathConfig, TrialConfig};

type LevelRow = (u32, u32, u32, u32, u32, &'static str, &'static str);

const ATHLETE: [LevelRow; 10] = [
    (1, 3, 10, 1, 300, "First Steps", "Move for 20 minutes three days running"),
    (2, 3, 15, 1, 300, "Warm Engine", "Hit a daily step goal three days in a row"),
    (3, 4, 20, 1, 400, "Mobility", "Stretch after every session for four days"),
    (4, 4, 25, 2, 400, "Tempo", "Add one interval block to four sessions"),
    (5, 5, 30, 2, 500, "Halfway", "Train five days without a skip"),
    (6, 5, 35, 2, 500, "Load", "Raise volume by 10% for five days"),
    (7, 6, 40, 3, 600, "Grit", "Six sessions including one long effort"),
    (8, 6, 45, 3, 600, "Recovery", "Track sleep alongside six sessions"),
    (9, 7, 50, 3, 700, "Peak Week", "A full week of planned training"),
    (10, 7, 60, 4, 700, "Evolution Trial", "Seven days, every session completed"),
];

const SCHOLAR: [LevelRow; 10] = [
    (1, 3, 10, 1, 300, "Open the Book", "Read 10 pages a day for three days"),
    (2, 3, 15, 1, 300, "Notes", "Summarize each reading session"),
    (3, 4, 20, 1, 400, "Focus Block", "One 25 minute deep work block daily"),
    (4, 4, 25, 2, 400, "Recall", "Review yesterday's notes before starting"),
    (5, 5, 30, 2, 500, "Chapter", "Finish a chapter within five days"),
    (6, 5, 35, 2, 500, "Teach Back", "Explain one idea aloud each day"),
    (7, 6, 40, 3, 600, "Practice", "Apply what you read for six days"),
    (8, 6, 45, 3, 600, "Synthesis", "Connect two sources per day"),
    (9, 7, 50, 3, 700, "Project", "Ship a small study project"),
    (10, 7, 60, 4, 700, "Evolution Trial", "Seven straight days of study"),
];

const MONK: [LevelRow; 10] = [
    (1, 3, 10, 1, 300, "Stillness", "Five minutes of meditation daily"),
    (2, 3, 15, 1, 300, "Breath", "Box breathing before bed"),
    (3, 4, 20, 1, 400, "Journal", "Write three lines every evening"),
    (4, 4, 25, 2, 400, "Digital Fast", "One screen-free hour a day"),
    (5, 5, 30, 2, 500, "Gratitude", "Name three good things daily"),
    (6, 5, 35, 2, 500, "Silence", "A quiet walk without audio"),
    (7, 6, 40, 3, 600, "Discipline", "Wake at the same time six days"),
    (8, 6, 45, 3, 600, "Clarity", "Plan tomorrow before sleeping"),
    (9, 7, 50, 3, 700, "Retreat", "Twenty minutes of meditation daily"),
    (10, 7, 60, 4, 700, "Evolution Trial", "Seven days of the full routine"),
];

fn levels_from(rows: &[LevelRow]) -> Vec<LevelConfig> {
    rows.iter()
        .map(
            |&(level, days_required, reward_coins, reward_stat_points, xp_to_level_up, title, description)| {
                LevelConfig {
                    level,
                    days_required,
                    reward_coins,
                    reward_stat_points,
                    xp_to_level_up,
                    trial: TrialConfig {
                        title: title.to_string(),
                        description: description.to_string(),
                        target_days: days_required,
                    },
                }
            },
        )
        .collect()
}

/// All shipped paths, in registration order
pub fn builtin_paths() -> Vec<PathConfig> {
    vec![
        PathConfig::new("athlete", "Athlete", levels_from(&ATHLETE)),
        PathConfig::new("scholar", "Scholar", levels_from(&SCHOLAR)),
        PathConfig::new("monk", "Monk", levels_from(&MONK)),
    ]
}
