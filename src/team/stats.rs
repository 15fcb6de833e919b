//! Season statistics, aggregated on demand from the raw match records.

use super::model::{FaultCounts, PlayerId, PointCounts, SetId, Team};
use super::model::ForfeitStatus;

/// Aggregated season line of one player.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerStats {
    pub player_id: PlayerId,
    pub name: String,
    /// Matches the player was on the sheet for.
    pub presence: u32,
    /// Matches the player actually entered.
    pub played: u32,
    /// Sets the player started or subbed into, once per set.
    pub sets_played: u32,
    pub sets_won: u32,
    pub faults: FaultCounts,
    pub points: PointCounts,
}

impl PlayerStats {
    pub fn total_faults(&self) -> u32 {
        self.faults.total()
    }

    pub fn total_points(&self) -> u32 {
        self.points.total()
    }
}

/// Season ranking line of the team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamStats {
    /// Ranking points. Forfeit losses subtract, so this can go negative.
    pub ranking_points: i32,
    pub played: u32,
    pub won: u32,
    pub lost: u32,
    pub won_3_0: u32,
    pub won_3_1: u32,
    pub won_3_2: u32,
    pub lost_2_3: u32,
    pub lost_1_3: u32,
    pub lost_0_3: u32,
    pub sets_for: u32,
    pub sets_against: u32,
    pub points_for: u32,
    pub points_against: u32,
}

/// Per-player aggregation across every match, sorted by player name.
pub fn player_stats(team: &Team) -> Vec<PlayerStats> {
    let mut players: Vec<&super::model::Player> = team.players.iter().collect();
    players.sort_by(|a, b| a.name.cmp(&b.name));

    players
        .into_iter()
        .map(|player| {
            let mut line = PlayerStats {
                player_id: player.id,
                name: player.name.clone(),
                ..PlayerStats::default()
            };
            for m in &team.matches {
                if m.present.contains(&player.id) {
                    line.presence += 1;
                }
                if m.played.contains(&player.id) {
                    line.played += 1;
                }
                for set in SetId::ALL {
                    let started = team
                        .lineup(m.id, set)
                        .is_some_and(|l| l.values().any(|&p| p == player.id));
                    let subbed_in = m
                        .substitutions
                        .get(&set)
                        .is_some_and(|subs| subs.iter().any(|s| s.player_in == player.id));
                    if started || subbed_in {
                        line.sets_played += 1;
                        if m.score.sets.get(set.index()).is_some_and(|s| s.won()) {
                            line.sets_won += 1;
                        }
                    }

                    if let Some(f) = m.faults.get(&set).and_then(|per| per.get(&player.id)) {
                        line.faults.service += f.service;
                        line.faults.attack += f.attack;
                        line.faults.reception += f.reception;
                        line.faults.net += f.net;
                    }
                    if let Some(p) = m.points.get(&set).and_then(|per| per.get(&player.id)) {
                        line.points.service += p.service;
                        line.points.attack += p.attack;
                        line.points.block += p.block;
                        line.points.net += p.net;
                    }
                }
            }
            line
        })
        .collect()
}

/// Team ranking aggregation. Matches without a result are skipped. Forfeits
/// count as 3-0 with the conventional 75 points and 3 sets; a forfeit win is
/// worth 3 ranking points, a forfeit loss costs one.
pub fn team_stats(team: &Team) -> TeamStats {
    let mut stats = TeamStats::default();

    for m in &team.matches {
        let has_score = m.score.my_team.is_some() || m.score.opponent.is_some();
        let is_forfeit = m.forfeit_status != ForfeitStatus::None;
        if !has_score && !is_forfeit {
            continue;
        }
        stats.played += 1;

        match m.forfeit_status {
            ForfeitStatus::Win => {
                stats.ranking_points += 3;
                stats.won += 1;
                stats.won_3_0 += 1;
                stats.sets_for += 3;
                stats.points_for += 75;
                continue;
            }
            ForfeitStatus::Loss => {
                stats.ranking_points -= 1;
                stats.lost += 1;
                stats.lost_0_3 += 1;
                stats.sets_against += 3;
                stats.points_against += 75;
                continue;
            }
            ForfeitStatus::None => {}
        }

        let my = m.score.my_team.unwrap_or(0);
        let opp = m.score.opponent.unwrap_or(0);
        stats.sets_for += my;
        stats.sets_against += opp;
        for set in &m.score.sets {
            stats.points_for += set.my_team.unwrap_or(0);
            stats.points_against += set.opponent.unwrap_or(0);
        }

        if my > opp {
            stats.won += 1;
            match (my, opp) {
                (3, 0) => {
                    stats.ranking_points += 3;
                    stats.won_3_0 += 1;
                }
                (3, 1) => {
                    stats.ranking_points += 3;
                    stats.won_3_1 += 1;
                }
                (3, 2) => {
                    stats.ranking_points += 2;
                    stats.won_3_2 += 1;
                }
                _ => {}
            }
        } else if opp > my {
            stats.lost += 1;
            match (my, opp) {
                (2, 3) => {
                    stats.ranking_points += 1;
                    stats.lost_2_3 += 1;
                }
                (1, 3) => stats.lost_1_3 += 1,
                (0, 3) => stats.lost_0_3 += 1,
                _ => {}
            }
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::model::{Gender, Location, Position, SetScore, Slot};
    use crate::team::model::{FaultCategory, MatchId};
    use crate::team::roster::PlayerDraft;

    fn draft(name: &str, jersey: &str) -> PlayerDraft {
        PlayerDraft {
            name: name.into(),
            license_number: String::new(),
            jersey_number: jersey.into(),
            gender: Gender::Female,
            main_position: Position::Pointu,
            secondary_position: None,
        }
    }

    fn match_with_score(team: &mut Team, sets: &[(u32, u32)]) -> MatchId {
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        for (i, &(my, opp)) in sets.iter().enumerate() {
            team.update_set_score(mid, SetId::ALL[i], Some(my), Some(opp))
                .unwrap();
        }
        mid
    }

    #[test]
    fn player_lines_tolerate_a_short_set_list() {
        let mut team = Team::new("A", "");
        let alice = team.add_player(draft("Alice", "1")).unwrap();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.set_slot(mid, SetId::Set1, Slot::P1, Some(alice)).unwrap();
        team.match_by_id_mut(mid).unwrap().score.sets.clear();

        let lines = player_stats(&team);
        assert_eq!(lines[0].sets_played, 5);
        assert_eq!(lines[0].sets_won, 0);
    }

    #[test]
    fn ranking_points_per_result_shape() {
        let mut team = Team::new("A", "");
        match_with_score(&mut team, &[(25, 20), (25, 18), (25, 22)]); // 3-0
        match_with_score(&mut team, &[(25, 20), (20, 25), (25, 18), (25, 22)]); // 3-1
        match_with_score(&mut team, &[(25, 20), (20, 25), (25, 18), (20, 25), (15, 13)]); // 3-2
        match_with_score(&mut team, &[(25, 20), (20, 25), (25, 18), (20, 25), (13, 15)]); // 2-3
        match_with_score(&mut team, &[(20, 25), (25, 20), (20, 25), (20, 25)]); // 1-3
        match_with_score(&mut team, &[(20, 25), (23, 25), (20, 25)]); // 0-3

        let stats = team_stats(&team);
        assert_eq!(stats.played, 6);
        assert_eq!(stats.won, 3);
        assert_eq!(stats.lost, 3);
        assert_eq!(stats.ranking_points, 3 + 3 + 2 + 1);
        assert_eq!(
            (stats.won_3_0, stats.won_3_1, stats.won_3_2),
            (1, 1, 1)
        );
        assert_eq!(
            (stats.lost_2_3, stats.lost_1_3, stats.lost_0_3),
            (1, 1, 1)
        );
    }

    #[test]
    fn forfeits_use_conventional_totals() {
        let mut team = Team::new("A", "");
        let w = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.set_forfeit(w, crate::team::model::ForfeitStatus::Win).unwrap();
        let l = team
            .create_match("2026-01-17".parse().unwrap(), "C", Location::Away)
            .unwrap();
        team.set_forfeit(l, crate::team::model::ForfeitStatus::Loss).unwrap();

        let stats = team_stats(&team);
        assert_eq!(stats.played, 2);
        assert_eq!(stats.ranking_points, 3 - 1);
        assert_eq!(stats.sets_for, 3);
        assert_eq!(stats.sets_against, 3);
        // Forfeit totals are the conventional 75, not the 3x25 sub-scores.
        assert_eq!(stats.points_for, 75 + 0);
        assert_eq!(stats.points_against, 0 + 75);
        assert_eq!(stats.won_3_0, 1);
        assert_eq!(stats.lost_0_3, 1);
    }

    #[test]
    fn matches_without_result_are_skipped() {
        let mut team = Team::new("A", "");
        team.create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        assert_eq!(team_stats(&team), TeamStats::default());
    }

    #[test]
    fn player_line_counts_sets_once_and_aggregates_tallies() {
        let mut team = Team::new("A", "");
        let alice = team.add_player(draft("Alice", "1")).unwrap();
        let bea = team.add_player(draft("Bea", "2")).unwrap();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.update_presence(mid, alice, true).unwrap();

        // Alice starts set 1 (cascades to all five) and also subs into set 1,
        // which must not double-count the set.
        team.set_slot(mid, SetId::Set1, Slot::P1, Some(alice)).unwrap();
        team.set_slot(mid, SetId::Set2, Slot::P1, Some(bea)).unwrap();
        team.match_by_id_mut(mid)
            .unwrap()
            .substitutions
            .entry(SetId::Set1)
            .or_default()
            .push(crate::team::model::Substitution { player_out: bea, player_in: alice });
        team.recalculate_played(mid);

        team.match_by_id_mut(mid).unwrap().score.sets[0] =
            SetScore { my_team: Some(25), opponent: Some(20) };
        let faults = team
            .match_by_id_mut(mid)
            .unwrap()
            .faults
            .entry(SetId::Set2)
            .or_default()
            .entry(alice)
            .or_default();
        faults.service = 2;
        faults.net = 1;

        let lines = player_stats(&team);
        assert_eq!(lines.len(), 2);
        let line = lines.iter().find(|l| l.player_id == alice).unwrap();
        assert_eq!(line.presence, 1);
        assert_eq!(line.played, 1);
        // Set 1 only: the set-2 edit re-pointed P1 at Bea and cascaded on.
        assert_eq!(line.sets_played, 1);
        assert_eq!(line.sets_won, 1);
        assert_eq!(line.total_faults(), 3);
        assert_eq!(line.faults.service, 2);
        // Sorted by name.
        assert_eq!(lines[0].name, "Alice");
        assert_eq!(lines[1].name, "Bea");
    }

    #[test]
    fn fault_categories_aggregate_across_sets() {
        let mut data = crate::team::model::AppData::skeleton();
        let mut team = Team::new("A", "");
        let alice = team.add_player(draft("Alice", "1")).unwrap();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        data.current_team_id = Some(team.id);
        data.teams.push(team);
        data.adjust_fault(mid, alice, FaultCategory::Attack, SetId::Set1, 1)
            .unwrap();
        data.adjust_fault(mid, alice, FaultCategory::Attack, SetId::Set2, 1)
            .unwrap();

        let lines = player_stats(data.current_team().unwrap());
        assert_eq!(lines[0].faults.attack, 2);
    }
}
