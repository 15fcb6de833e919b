//! Live fault and point tally with single-level undo.
//!
//! Each kind (faults, points) has exactly one last-action pointer stored in
//! the document. An increment overwrites it; undo consumes it. The pointer is
//! cleared before the decrement is applied, so the same action can never be
//! undone twice. Counters never go below zero; a decrement at zero is a no-op.

use thiserror::Error;

use super::model::{
    AppData, FaultCategory, LastFaultAction, LastPointAction, MatchId, PlayerId, PointCategory,
    SetId,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TallyError {
    #[error("Aucune équipe sélectionnée.")]
    NoCurrentTeam,
    #[error("Match introuvable.")]
    UnknownMatch,
}

/// Which tally the live view is tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyKind {
    Faults,
    Points,
}

impl TallyKind {
    fn label(self) -> &'static str {
        match self {
            TallyKind::Faults => "faute",
            TallyKind::Points => "point",
        }
    }
}

/// Result of an undo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Undone,
    NothingToUndo,
    /// The recorded action belongs to another set; nothing was changed.
    WrongSet { recorded: SetId, kind: TallyKind },
}

impl UndoOutcome {
    /// The user-facing notice, when the undo was refused.
    pub fn notice(&self) -> Option<String> {
        match self {
            UndoOutcome::Undone => None,
            UndoOutcome::NothingToUndo => {
                Some("Il n'y a pas de dernière action à annuler pour ce mode.".to_string())
            }
            UndoOutcome::WrongSet { recorded, kind } => Some(format!(
                "La dernière action ({}) a été enregistrée sur le set {}. \
                 Veuillez sélectionner ce set pour l'annuler.",
                kind.label(),
                recorded.number()
            )),
        }
    }
}

impl AppData {
    /// Adjust one fault counter by ±1. Increments record the undo pointer;
    /// a decrement at zero changes nothing.
    pub fn adjust_fault(
        &mut self,
        match_id: MatchId,
        player_id: PlayerId,
        category: FaultCategory,
        set: SetId,
        delta: i32,
    ) -> Result<(), TallyError> {
        let changed = {
            let team = self.current_team_mut().ok_or(TallyError::NoCurrentTeam)?;
            let m = team
                .match_by_id_mut(match_id)
                .ok_or(TallyError::UnknownMatch)?;
            let counts = m
                .faults
                .entry(set)
                .or_default()
                .entry(player_id)
                .or_default();
            let slot = match category {
                FaultCategory::Service => &mut counts.service,
                FaultCategory::Attack => &mut counts.attack,
                FaultCategory::Reception => &mut counts.reception,
                FaultCategory::Net => &mut counts.net,
            };
            if delta < 0 && *slot == 0 {
                false
            } else {
                *slot = slot.saturating_add_signed(delta);
                true
            }
        };
        if changed && delta > 0 {
            self.last_fault_action = Some(LastFaultAction {
                match_id,
                player_id,
                category,
                set,
            });
        }
        Ok(())
    }

    /// Adjust one point counter by ±1, same rules as `adjust_fault`.
    pub fn adjust_point(
        &mut self,
        match_id: MatchId,
        player_id: PlayerId,
        category: PointCategory,
        set: SetId,
        delta: i32,
    ) -> Result<(), TallyError> {
        let changed = {
            let team = self.current_team_mut().ok_or(TallyError::NoCurrentTeam)?;
            let m = team
                .match_by_id_mut(match_id)
                .ok_or(TallyError::UnknownMatch)?;
            let counts = m
                .points
                .entry(set)
                .or_default()
                .entry(player_id)
                .or_default();
            let slot = match category {
                PointCategory::Service => &mut counts.service,
                PointCategory::Attack => &mut counts.attack,
                PointCategory::Block => &mut counts.block,
                PointCategory::Net => &mut counts.net,
            };
            if delta < 0 && *slot == 0 {
                false
            } else {
                *slot = slot.saturating_add_signed(delta);
                true
            }
        };
        if changed && delta > 0 {
            self.last_point_action = Some(LastPointAction {
                match_id,
                player_id,
                category,
                set,
            });
        }
        Ok(())
    }

    /// Undo the recorded last action of `kind`, provided it was recorded on
    /// the currently selected set. The pointer is cleared before the counter
    /// is decremented.
    pub fn undo_last(
        &mut self,
        kind: TallyKind,
        current_set: SetId,
    ) -> Result<UndoOutcome, TallyError> {
        match kind {
            TallyKind::Faults => {
                let Some(action) = self.last_fault_action else {
                    return Ok(UndoOutcome::NothingToUndo);
                };
                if action.set != current_set {
                    return Ok(UndoOutcome::WrongSet { recorded: action.set, kind });
                }
                self.last_fault_action = None;
                self.adjust_fault(
                    action.match_id,
                    action.player_id,
                    action.category,
                    action.set,
                    -1,
                )?;
            }
            TallyKind::Points => {
                let Some(action) = self.last_point_action else {
                    return Ok(UndoOutcome::NothingToUndo);
                };
                if action.set != current_set {
                    return Ok(UndoOutcome::WrongSet { recorded: action.set, kind });
                }
                self.last_point_action = None;
                self.adjust_point(
                    action.match_id,
                    action.player_id,
                    action.category,
                    action.set,
                    -1,
                )?;
            }
        }
        Ok(UndoOutcome::Undone)
    }

    /// Switching the selected set abandons both undo pointers.
    pub fn clear_last_actions(&mut self) {
        self.last_fault_action = None;
        self.last_point_action = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::model::{Location, Team};

    fn fixture() -> (AppData, MatchId) {
        let mut data = AppData::skeleton();
        let mut team = Team::new("A", "");
        let mid = team
            .create_match("2026-01-10".parse().unwrap(), "B", Location::Home)
            .unwrap();
        data.current_team_id = Some(team.id);
        data.teams.push(team);
        (data, mid)
    }

    fn fault_count(data: &AppData, mid: MatchId, pid: PlayerId, set: SetId) -> u32 {
        data.current_team()
            .and_then(|t| t.match_by_id(mid))
            .and_then(|m| m.faults.get(&set))
            .and_then(|per| per.get(&pid))
            .map(|c| c.service)
            .unwrap_or(0)
    }

    #[test]
    fn increment_records_pointer_and_decrement_floors_at_zero() {
        let (mut data, mid) = fixture();
        data.adjust_fault(mid, 7, FaultCategory::Service, SetId::Set1, 1)
            .unwrap();
        assert_eq!(fault_count(&data, mid, 7, SetId::Set1), 1);
        assert!(data.last_fault_action.is_some());

        data.adjust_fault(mid, 7, FaultCategory::Service, SetId::Set1, -1)
            .unwrap();
        data.adjust_fault(mid, 7, FaultCategory::Service, SetId::Set1, -1)
            .unwrap();
        assert_eq!(fault_count(&data, mid, 7, SetId::Set1), 0);
    }

    #[test]
    fn undo_decrements_once_and_only_once() {
        let (mut data, mid) = fixture();
        data.adjust_fault(mid, 7, FaultCategory::Attack, SetId::Set2, 1)
            .unwrap();
        data.adjust_fault(mid, 7, FaultCategory::Attack, SetId::Set2, 1)
            .unwrap();

        assert_eq!(
            data.undo_last(TallyKind::Faults, SetId::Set2).unwrap(),
            UndoOutcome::Undone
        );
        // Second undo has nothing left to consume.
        assert_eq!(
            data.undo_last(TallyKind::Faults, SetId::Set2).unwrap(),
            UndoOutcome::NothingToUndo
        );
        let attack = data
            .current_team()
            .unwrap()
            .match_by_id(mid)
            .unwrap()
            .faults[&SetId::Set2][&7]
            .attack;
        assert_eq!(attack, 1);
    }

    #[test]
    fn undo_refuses_on_another_set() {
        let (mut data, mid) = fixture();
        data.adjust_point(mid, 7, PointCategory::Block, SetId::Set3, 1)
            .unwrap();
        let outcome = data.undo_last(TallyKind::Points, SetId::Set1).unwrap();
        assert_eq!(
            outcome,
            UndoOutcome::WrongSet { recorded: SetId::Set3, kind: TallyKind::Points }
        );
        assert!(outcome.notice().unwrap().contains("set 3"));
        // Pointer survives the refusal.
        assert!(data.last_point_action.is_some());
    }

    #[test]
    fn pointers_are_independent_per_kind() {
        let (mut data, mid) = fixture();
        data.adjust_fault(mid, 7, FaultCategory::Net, SetId::Set1, 1)
            .unwrap();
        assert_eq!(
            data.undo_last(TallyKind::Points, SetId::Set1).unwrap(),
            UndoOutcome::NothingToUndo
        );
        assert_eq!(
            data.undo_last(TallyKind::Faults, SetId::Set1).unwrap(),
            UndoOutcome::Undone
        );
    }

    #[test]
    fn set_switch_clears_both_pointers() {
        let (mut data, mid) = fixture();
        data.adjust_fault(mid, 7, FaultCategory::Service, SetId::Set1, 1)
            .unwrap();
        data.adjust_point(mid, 7, PointCategory::Attack, SetId::Set1, 1)
            .unwrap();
        data.clear_last_actions();
        assert_eq!(
            data.undo_last(TallyKind::Faults, SetId::Set1).unwrap(),
            UndoOutcome::NothingToUndo
        );
        assert_eq!(
            data.undo_last(TallyKind::Points, SetId::Set1).unwrap(),
            UndoOutcome::NothingToUndo
        );
    }

    #[test]
    fn decrement_at_zero_keeps_existing_pointer() {
        let (mut data, mid) = fixture();
        data.adjust_fault(mid, 7, FaultCategory::Service, SetId::Set1, 1)
            .unwrap();
        data.adjust_fault(mid, 9, FaultCategory::Attack, SetId::Set1, -1)
            .unwrap();
        // The failed decrement must not disturb the recorded action.
        let action = data.last_fault_action.unwrap();
        assert_eq!(action.player_id, 7);
        assert_eq!(action.category, FaultCategory::Service);
    }
}
