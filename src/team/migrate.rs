//! Structural normalization of loaded documents.
//!
//! Documents come from three places with three vintages: the local cache, the
//! remote store, and fresh skeletons. Older documents predate some fields, and
//! a remote copy may have been written by an older client. `migrate` brings
//! any parsed document up to the current structural invariants and is safe to
//! run any number of times.

use tracing::debug;

use super::model::{AppData, Score, SetScore, SET_COUNT};

/// Normalize a document in place. Idempotent.
pub fn migrate(data: &mut AppData) {
    for team in &mut data.teams {
        for m in &mut team.matches {
            normalize_score(&mut m.score);
        }
    }

    // current_team_id must resolve; a dangling id gets re-pointed at the
    // first team, or cleared when there is none.
    if let Some(id) = data.current_team_id {
        if data.team(id).is_none() {
            let replacement = data.teams.first().map(|t| t.id);
            debug!(dangling = id, ?replacement, "re-pointing current team");
            data.current_team_id = replacement;
        }
    }
}

/// Force `sets` to exactly five entries, padding or truncating as needed.
fn normalize_score(score: &mut Score) {
    score.sets.resize(SET_COUNT, SetScore::default());
}
