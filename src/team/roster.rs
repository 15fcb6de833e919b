//! Roster and fixture management: teams, players, matches, trainings.
//!
//! Validation failures carry the user-facing French message; callers surface
//! `RosterError` display text directly as a notice.

use chrono::NaiveDate;
use thiserror::Error;

use super::model::{
    AppData, Attendance, ForfeitStatus, Gender, Location, Match, MatchId, Player, PlayerId,
    Position, Score, SetId, SetScore, Team, TeamId, Training, TrainingId, SET_COUNT,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    #[error("Veuillez entrer un nom d'équipe.")]
    TeamNameRequired,
    #[error("Le nom de l'équipe ne peut pas être vide.")]
    TeamNameEmpty,
    #[error("Le nom du joueur est requis.")]
    PlayerNameRequired,
    #[error("Le nom du joueur ne peut pas être vide.")]
    PlayerNameEmpty,
    #[error("Un joueur avec ce nom existe déjà.")]
    DuplicatePlayerName,
    #[error("Un autre joueur a déjà ce nom.")]
    NameTakenByOther,
    #[error("Ce numéro de maillot est déjà pris.")]
    DuplicateJersey,
    #[error("Ce numéro de maillot est déjà pris par un autre joueur.")]
    JerseyTakenByOther,
    #[error("Veuillez sélectionner une date et un adversaire.")]
    MatchFieldsRequired,
    #[error("Veuillez renseigner la date et le nom de l'adversaire.")]
    MatchEditFieldsRequired,
    #[error("Le capitaine doit être présent sur la feuille de match.")]
    CaptainNotPresent,
    #[error("Équipe introuvable.")]
    UnknownTeam,
    #[error("Joueur introuvable.")]
    UnknownPlayer,
    #[error("Match introuvable.")]
    UnknownMatch,
    #[error("Entraînement introuvable.")]
    UnknownTraining,
}

/// New-player (or edited-player) field set, before validation.
#[derive(Debug, Clone)]
pub struct PlayerDraft {
    pub name: String,
    pub license_number: String,
    pub jersey_number: String,
    pub gender: Gender,
    pub main_position: Position,
    pub secondary_position: Option<Position>,
}

/// Attendance bucket of one player at a training session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Injured,
}

// ---------------------------------------------------------------------------
// Team-level operations
// ---------------------------------------------------------------------------

impl AppData {
    /// Create a team and make it current.
    pub fn add_team(
        &mut self,
        name: &str,
        season: &str,
    ) -> Result<TeamId, RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::TeamNameRequired);
        }
        let team = Team::new(name, season.trim());
        let id = team.id;
        self.teams.push(team);
        self.current_team_id = Some(id);
        Ok(id)
    }

    pub fn edit_team(
        &mut self,
        id: TeamId,
        name: &str,
        season: &str,
        ranking_url: Option<&str>,
    ) -> Result<(), RosterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RosterError::TeamNameEmpty);
        }
        let team = self.team_mut(id).ok_or(RosterError::UnknownTeam)?;
        team.name = name.to_string();
        team.season = season.trim().to_string();
        team.ranking_url = ranking_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        Ok(())
    }

    /// Delete a team and everything in it. The current-team pointer moves to
    /// the first remaining team, or clears.
    pub fn delete_team(&mut self, id: TeamId) -> Result<(), RosterError> {
        let before = self.teams.len();
        self.teams.retain(|t| t.id != id);
        if self.teams.len() == before {
            return Err(RosterError::UnknownTeam);
        }
        if self.current_team_id == Some(id) {
            self.current_team_id = self.teams.first().map(|t| t.id);
        }
        Ok(())
    }

    pub fn switch_team(&mut self, id: TeamId) -> Result<(), RosterError> {
        if self.team(id).is_none() {
            return Err(RosterError::UnknownTeam);
        }
        self.current_team_id = Some(id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Player operations
// ---------------------------------------------------------------------------

fn same_name(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

impl Team {
    pub fn add_player(&mut self, draft: PlayerDraft) -> Result<PlayerId, RosterError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(RosterError::PlayerNameRequired);
        }
        if self.players.iter().any(|p| same_name(&p.name, &name)) {
            return Err(RosterError::DuplicatePlayerName);
        }
        let jersey = draft.jersey_number.trim().to_string();
        if !jersey.is_empty() && self.players.iter().any(|p| p.jersey_number == jersey) {
            return Err(RosterError::DuplicateJersey);
        }
        let player = Player {
            id: super::model::next_id(),
            name,
            license_number: draft.license_number.trim().to_string(),
            jersey_number: jersey,
            gender: draft.gender,
            main_position: draft.main_position,
            secondary_position: draft.secondary_position,
        };
        let id = player.id;
        self.players.push(player);
        Ok(id)
    }

    pub fn edit_player(&mut self, id: PlayerId, draft: PlayerDraft) -> Result<(), RosterError> {
        let name = draft.name.trim().to_string();
        if name.is_empty() {
            return Err(RosterError::PlayerNameEmpty);
        }
        if self
            .players
            .iter()
            .any(|p| p.id != id && same_name(&p.name, &name))
        {
            return Err(RosterError::NameTakenByOther);
        }
        let jersey = draft.jersey_number.trim().to_string();
        if !jersey.is_empty()
            && self
                .players
                .iter()
                .any(|p| p.id != id && p.jersey_number == jersey)
        {
            return Err(RosterError::JerseyTakenByOther);
        }
        let player = self.player_mut(id).ok_or(RosterError::UnknownPlayer)?;
        player.name = name;
        player.license_number = draft.license_number.trim().to_string();
        player.jersey_number = jersey;
        player.gender = draft.gender;
        player.main_position = draft.main_position;
        player.secondary_position = draft.secondary_position;
        Ok(())
    }

    /// Remove a player and every trace of them: roster, presence, played,
    /// captaincy, lineups, substitution logs, fault and point counters.
    pub fn delete_player(&mut self, id: PlayerId) -> Result<(), RosterError> {
        if self.player(id).is_none() {
            return Err(RosterError::UnknownPlayer);
        }
        self.players.retain(|p| p.id != id);
        self.purge_player_refs(id);
        Ok(())
    }

    /// Remove every player at once, with the same referential purge.
    pub fn delete_all_players(&mut self) {
        let ids: Vec<PlayerId> = self.players.iter().map(|p| p.id).collect();
        self.players.clear();
        for id in ids {
            self.purge_player_refs(id);
        }
        for t in &mut self.trainings {
            t.attendance = Attendance::default();
        }
    }

    fn purge_player_refs(&mut self, id: PlayerId) {
        let match_ids: Vec<MatchId> = self.matches.iter().map(|m| m.id).collect();
        for m in &mut self.matches {
            m.present.retain(|&p| p != id);
            m.played.retain(|&p| p != id);
            if m.captain_id == Some(id) {
                m.captain_id = None;
            }
            for subs in m.substitutions.values_mut() {
                subs.retain(|s| s.player_in != id && s.player_out != id);
            }
            for per_set in m.faults.values_mut() {
                per_set.remove(&id);
            }
            for per_set in m.points.values_mut() {
                per_set.remove(&id);
            }
        }
        for per_match in self.court_positions.values_mut() {
            for lineup in per_match.values_mut() {
                lineup.retain(|_, &mut p| p != id);
            }
        }
        for t in &mut self.trainings {
            t.attendance.present.retain(|&p| p != id);
            t.attendance.absent.retain(|&p| p != id);
            t.attendance.injured.retain(|&p| p != id);
        }
        for mid in match_ids {
            self.recalculate_played(mid);
        }
    }
}

// ---------------------------------------------------------------------------
// Match operations
// ---------------------------------------------------------------------------

impl Team {
    pub fn create_match(
        &mut self,
        date: NaiveDate,
        opponent: &str,
        location: Location,
    ) -> Result<MatchId, RosterError> {
        let opponent = opponent.trim();
        if opponent.is_empty() {
            return Err(RosterError::MatchFieldsRequired);
        }
        let m = Match::new(date, opponent, location);
        let id = m.id;
        self.matches.push(m);
        Ok(id)
    }

    pub fn edit_match(
        &mut self,
        id: MatchId,
        date: NaiveDate,
        opponent: &str,
        location: Location,
    ) -> Result<(), RosterError> {
        let opponent = opponent.trim();
        if opponent.is_empty() {
            return Err(RosterError::MatchEditFieldsRequired);
        }
        let m = self.match_by_id_mut(id).ok_or(RosterError::UnknownMatch)?;
        m.date = date;
        m.opponent = opponent.to_string();
        m.location = location;
        Ok(())
    }

    /// Delete a match and its stored lineups. The caller drops any per-team
    /// last-selected-match key pointing at it.
    pub fn delete_match(&mut self, id: MatchId) -> Result<(), RosterError> {
        let before = self.matches.len();
        self.matches.retain(|m| m.id != id);
        if self.matches.len() == before {
            return Err(RosterError::UnknownMatch);
        }
        self.court_positions.remove(&id);
        Ok(())
    }

    /// Set (or clear) the match captain; a captain must be on the sheet.
    pub fn set_captain(
        &mut self,
        match_id: MatchId,
        captain: Option<PlayerId>,
    ) -> Result<(), RosterError> {
        let m = self
            .match_by_id_mut(match_id)
            .ok_or(RosterError::UnknownMatch)?;
        if let Some(pid) = captain {
            if !m.present.contains(&pid) {
                return Err(RosterError::CaptainNotPresent);
            }
        }
        m.captain_id = captain;
        Ok(())
    }

    /// Mark a player present or absent on the match sheet. Removing presence
    /// also removes them from the match's lineups, substitution logs, fault
    /// counters and captaincy, then recomputes `played`.
    pub fn update_presence(
        &mut self,
        match_id: MatchId,
        player_id: PlayerId,
        present: bool,
    ) -> Result<(), RosterError> {
        if self.player(player_id).is_none() {
            return Err(RosterError::UnknownPlayer);
        }
        {
            let m = self
                .match_by_id_mut(match_id)
                .ok_or(RosterError::UnknownMatch)?;
            if present {
                if !m.present.contains(&player_id) {
                    m.present.push(player_id);
                }
                return Ok(());
            }
            m.present.retain(|&p| p != player_id);
            if m.captain_id == Some(player_id) {
                m.captain_id = None;
            }
            for subs in m.substitutions.values_mut() {
                subs.retain(|s| s.player_in != player_id && s.player_out != player_id);
            }
            for per_set in m.faults.values_mut() {
                per_set.remove(&player_id);
            }
        }
        if let Some(per_match) = self.court_positions.get_mut(&match_id) {
            for lineup in per_match.values_mut() {
                lineup.retain(|_, &mut p| p != player_id);
            }
        }
        self.recalculate_played(match_id);
        Ok(())
    }

    /// Enter one set's sub-score by hand. Manual entry cancels any forfeit
    /// status, and the running set-win totals are recomputed.
    pub fn update_set_score(
        &mut self,
        match_id: MatchId,
        set: SetId,
        my_team: Option<u32>,
        opponent: Option<u32>,
    ) -> Result<(), RosterError> {
        let m = self
            .match_by_id_mut(match_id)
            .ok_or(RosterError::UnknownMatch)?;
        m.forfeit_status = ForfeitStatus::None;
        // Documents from outside the migration path may carry a short list.
        if m.score.sets.len() < SET_COUNT {
            m.score.sets.resize(SET_COUNT, SetScore::default());
        }
        m.score.sets[set.index()] = SetScore { my_team, opponent };
        m.score.recompute_totals();
        Ok(())
    }

    /// Declare a forfeit. Win and loss auto-populate the standard score
    /// (3 sets of 25-0 one way or the other); `None` clears the score.
    pub fn set_forfeit(
        &mut self,
        match_id: MatchId,
        status: ForfeitStatus,
    ) -> Result<(), RosterError> {
        let m = self
            .match_by_id_mut(match_id)
            .ok_or(RosterError::UnknownMatch)?;
        m.forfeit_status = status;
        let win = SetScore { my_team: Some(25), opponent: Some(0) };
        let loss = SetScore { my_team: Some(0), opponent: Some(25) };
        let empty = SetScore::default();
        m.score = match status {
            ForfeitStatus::Win => Score {
                my_team: Some(3),
                opponent: Some(0),
                sets: vec![win, win, win, empty, empty],
            },
            ForfeitStatus::Loss => Score {
                my_team: Some(0),
                opponent: Some(3),
                sets: vec![loss, loss, loss, empty, empty],
            },
            ForfeitStatus::None => Score::default(),
        };
        Ok(())
    }

    pub fn set_detail_mode(&mut self, match_id: MatchId, detail: bool) -> Result<(), RosterError> {
        let m = self
            .match_by_id_mut(match_id)
            .ok_or(RosterError::UnknownMatch)?;
        m.detail_mode = detail;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Training operations
// ---------------------------------------------------------------------------

impl Team {
    pub fn add_training(&mut self, date: NaiveDate, theme: &str) -> TrainingId {
        let t = Training::new(date, theme.trim());
        let id = t.id;
        self.trainings.push(t);
        id
    }

    pub fn edit_training(
        &mut self,
        id: TrainingId,
        date: NaiveDate,
        theme: &str,
        plan: &str,
    ) -> Result<(), RosterError> {
        let t = self.training_mut(id).ok_or(RosterError::UnknownTraining)?;
        t.date = date;
        t.theme = theme.trim().to_string();
        t.plan = plan.to_string();
        Ok(())
    }

    pub fn delete_training(&mut self, id: TrainingId) -> Result<(), RosterError> {
        let before = self.trainings.len();
        self.trainings.retain(|t| t.id != id);
        if self.trainings.len() == before {
            return Err(RosterError::UnknownTraining);
        }
        Ok(())
    }

    /// Move a player into one attendance bucket (or out of all of them).
    /// The three buckets stay disjoint.
    pub fn set_attendance(
        &mut self,
        training_id: TrainingId,
        player_id: PlayerId,
        status: Option<AttendanceStatus>,
    ) -> Result<(), RosterError> {
        if self.player(player_id).is_none() {
            return Err(RosterError::UnknownPlayer);
        }
        let t = self
            .training_mut(training_id)
            .ok_or(RosterError::UnknownTraining)?;
        t.attendance.present.retain(|&p| p != player_id);
        t.attendance.absent.retain(|&p| p != player_id);
        t.attendance.injured.retain(|&p| p != player_id);
        match status {
            Some(AttendanceStatus::Present) => t.attendance.present.push(player_id),
            Some(AttendanceStatus::Absent) => t.attendance.absent.push(player_id),
            Some(AttendanceStatus::Injured) => t.attendance.injured.push(player_id),
            None => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::model::Slot;

    fn draft(name: &str, jersey: &str) -> PlayerDraft {
        PlayerDraft {
            name: name.into(),
            license_number: String::new(),
            jersey_number: jersey.into(),
            gender: Gender::Female,
            main_position: Position::Central,
            secondary_position: None,
        }
    }

    fn team_with_players() -> (Team, PlayerId, PlayerId) {
        let mut team = Team::new("A", "2025-2026");
        let p1 = team.add_player(draft("Alice", "1")).unwrap();
        let p2 = team.add_player(draft("Bea", "2")).unwrap();
        (team, p1, p2)
    }

    #[test]
    fn add_team_selects_it() {
        let mut data = AppData::skeleton();
        let id = data.add_team("Les Aigles", "2025-2026").unwrap();
        assert_eq!(data.current_team_id, Some(id));
        assert_eq!(data.add_team("  ", ""), Err(RosterError::TeamNameRequired));
    }

    #[test]
    fn edit_team_updates_the_ranking_url() {
        let mut data = AppData::skeleton();
        let id = data.add_team("Les Aigles", "2025-2026").unwrap();

        data.edit_team(id, "Les Aigles", "2025-2026", Some(" https://ffvb.example/classement "))
            .unwrap();
        assert_eq!(
            data.team(id).unwrap().ranking_url.as_deref(),
            Some("https://ffvb.example/classement")
        );

        // A blank field clears the link.
        data.edit_team(id, "Les Aigles", "2025-2026", Some("  ")).unwrap();
        assert_eq!(data.team(id).unwrap().ranking_url, None);
    }

    #[test]
    fn delete_team_repoints_current() {
        let mut data = AppData::skeleton();
        let a = data.add_team("A", "").unwrap();
        let b = data.add_team("B", "").unwrap();
        assert_eq!(data.current_team_id, Some(b));
        data.delete_team(b).unwrap();
        assert_eq!(data.current_team_id, Some(a));
        data.delete_team(a).unwrap();
        assert_eq!(data.current_team_id, None);
    }

    #[test]
    fn duplicate_player_name_is_case_insensitive() {
        let (mut team, _, _) = team_with_players();
        assert_eq!(
            team.add_player(draft("  ALICE ", "9")),
            Err(RosterError::DuplicatePlayerName)
        );
        assert_eq!(
            team.add_player(draft("Chloé", "1")),
            Err(RosterError::DuplicateJersey)
        );
    }

    #[test]
    fn edit_player_ignores_self_in_uniqueness_checks() {
        let (mut team, p1, _) = team_with_players();
        team.edit_player(p1, draft("Alice", "1")).unwrap();
        assert_eq!(
            team.edit_player(p1, draft("Bea", "1")),
            Err(RosterError::NameTakenByOther)
        );
        assert_eq!(
            team.edit_player(p1, draft("Alice", "2")),
            Err(RosterError::JerseyTakenByOther)
        );
    }

    #[test]
    fn delete_player_purges_every_trace() {
        let (mut team, p1, p2) = team_with_players();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.update_presence(mid, p1, true).unwrap();
        team.update_presence(mid, p2, true).unwrap();
        team.set_captain(mid, Some(p1)).unwrap();
        team.lineup_mut(mid, SetId::Set1).insert(Slot::P1, p1);
        team.lineup_mut(mid, SetId::Set1).insert(Slot::P2, p2);
        team.recalculate_played(mid);
        let m = team.match_by_id_mut(mid).unwrap();
        m.substitutions.entry(SetId::Set1).or_default().push(
            crate::team::model::Substitution { player_out: p1, player_in: p2 },
        );
        m.faults
            .entry(SetId::Set1)
            .or_default()
            .entry(p1)
            .or_default()
            .service = 2;

        team.delete_player(p1).unwrap();

        assert!(team.player(p1).is_none());
        let m = team.match_by_id(mid).unwrap();
        assert!(!m.present.contains(&p1));
        assert!(!m.played.contains(&p1));
        assert_eq!(m.captain_id, None);
        assert!(m.substitutions.values().flatten().all(|s| {
            s.player_in != p1 && s.player_out != p1
        }));
        assert!(m.faults.values().all(|per_set| !per_set.contains_key(&p1)));
        assert!(team
            .lineup(mid, SetId::Set1)
            .unwrap()
            .values()
            .all(|&p| p != p1));
        // p2 untouched
        assert!(m.present.contains(&p2));
    }

    #[test]
    fn removing_presence_cleans_lineups_and_tallies() {
        let (mut team, p1, _) = team_with_players();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Away)
            .unwrap();
        team.update_presence(mid, p1, true).unwrap();
        team.set_captain(mid, Some(p1)).unwrap();
        team.lineup_mut(mid, SetId::Set2).insert(Slot::P4, p1);
        team.recalculate_played(mid);
        assert!(team.match_by_id(mid).unwrap().played.contains(&p1));

        team.update_presence(mid, p1, false).unwrap();

        let m = team.match_by_id(mid).unwrap();
        assert!(m.present.is_empty());
        assert_eq!(m.captain_id, None);
        assert!(!m.played.contains(&p1));
        assert!(team.lineup(mid, SetId::Set2).unwrap().is_empty());
    }

    #[test]
    fn captain_must_be_present() {
        let (mut team, p1, _) = team_with_players();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        assert_eq!(
            team.set_captain(mid, Some(p1)),
            Err(RosterError::CaptainNotPresent)
        );
        team.update_presence(mid, p1, true).unwrap();
        team.set_captain(mid, Some(p1)).unwrap();
        team.set_captain(mid, None).unwrap();
    }

    #[test]
    fn manual_score_entry_cancels_forfeit() {
        let (mut team, _, _) = team_with_players();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.set_forfeit(mid, ForfeitStatus::Win).unwrap();
        {
            let m = team.match_by_id(mid).unwrap();
            assert_eq!(m.score.my_team, Some(3));
            assert_eq!(m.score.sets[0].my_team, Some(25));
            assert_eq!(m.score.sets[3], SetScore::default());
        }
        team.update_set_score(mid, SetId::Set1, Some(20), Some(25))
            .unwrap();
        let m = team.match_by_id(mid).unwrap();
        assert_eq!(m.forfeit_status, ForfeitStatus::None);
        assert_eq!(m.score.opponent, Some(1));
    }

    #[test]
    fn score_entry_repairs_a_short_set_list() {
        let (mut team, _, _) = team_with_players();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.match_by_id_mut(mid).unwrap().score.sets.clear();

        team.update_set_score(mid, SetId::Set5, Some(25), Some(20))
            .unwrap();
        let m = team.match_by_id(mid).unwrap();
        assert_eq!(m.score.sets.len(), SET_COUNT);
        assert_eq!(m.score.sets[4].my_team, Some(25));
    }

    #[test]
    fn forfeit_none_clears_score() {
        let (mut team, _, _) = team_with_players();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.set_forfeit(mid, ForfeitStatus::Loss).unwrap();
        team.set_forfeit(mid, ForfeitStatus::None).unwrap();
        let m = team.match_by_id(mid).unwrap();
        assert!(!m.score.has_result());
    }

    #[test]
    fn delete_match_drops_lineups() {
        let (mut team, p1, _) = team_with_players();
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        team.lineup_mut(mid, SetId::Set1).insert(Slot::P1, p1);
        team.delete_match(mid).unwrap();
        assert!(team.match_by_id(mid).is_none());
        assert!(!team.court_positions.contains_key(&mid));
    }

    #[test]
    fn attendance_buckets_stay_disjoint() {
        let (mut team, p1, _) = team_with_players();
        let tid = team.add_training("2026-01-12".parse().unwrap(), "Réception");
        team.set_attendance(tid, p1, Some(AttendanceStatus::Present))
            .unwrap();
        team.set_attendance(tid, p1, Some(AttendanceStatus::Injured))
            .unwrap();
        let t = team.training(tid).unwrap();
        assert!(t.attendance.present.is_empty());
        assert_eq!(t.attendance.injured, vec![p1]);
        team.set_attendance(tid, p1, None).unwrap();
        assert!(team.training(tid).unwrap().attendance.injured.is_empty());
    }
}
