//! Court composition: slot assignment, substitutions, rotation.
//!
//! Every mutation of one set's lineup cascades forward: subsequent sets whose
//! lineup was identical to the mutated set's pre-mutation state receive the
//! same change, and the walk stops at the first set that had diverged. Coaches
//! usually keep one six-pack across sets, so editing set 1 updates untouched
//! later sets without clobbering a deliberate set-3 change.

use thiserror::Error;
use tracing::warn;

use super::model::{Lineup, MatchId, Player, PlayerId, SetId, Slot, Team};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineupError {
    #[error("Erreur: Impossible de trouver la composition du set.")]
    MissingComposition,
    #[error("Erreur : Le joueur à remplacer n'a pas été trouvé sur le terrain ou comme libéro.")]
    PlayerNotOnCourt,
    #[error("Erreur: Seul un autre libéro peut remplacer le libéro.")]
    LiberoSlotRequiresLibero,
    #[error("Match introuvable.")]
    UnknownMatch,
    #[error("Joueur introuvable.")]
    UnknownPlayer,
}

/// Verdict of the substitution rule check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubstitutionCheck {
    Allowed,
    /// Applied anyway; the message is surfaced as a notice.
    Warn(String),
    Reject(String),
}

/// Rule check for `player_in` taking over `slot`.
///
/// Only a libero-capable player may take the libero slot. A libero entering
/// a numbered slot is irregular but recorded anyway, since the tracker is a
/// bookkeeping aid, not a referee.
pub fn check_substitution(player_in: &Player, slot: Slot) -> SubstitutionCheck {
    if slot == Slot::Libero && !player_in.is_libero_capable() {
        // Same text as the error the substitution path returns.
        return SubstitutionCheck::Reject(LineupError::LiberoSlotRequiresLibero.to_string());
    }
    if slot.is_court() && player_in.is_libero_capable() {
        return SubstitutionCheck::Warn(format!(
            "{} est libéro et entre sur un poste de terrain.",
            player_in.name
        ));
    }
    SubstitutionCheck::Allowed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

impl Team {
    /// Assign `player` to `slot` of one set (or clear the slot with `None`),
    /// resolving conflicts so no player holds two slots of the same set, then
    /// cascade to identical subsequent sets.
    pub fn set_slot(
        &mut self,
        match_id: MatchId,
        set: SetId,
        slot: Slot,
        player: Option<PlayerId>,
    ) -> Result<(), LineupError> {
        if self.match_by_id(match_id).is_none() {
            return Err(LineupError::UnknownMatch);
        }
        if let Some(pid) = player {
            if self.player(pid).is_none() {
                return Err(LineupError::UnknownPlayer);
            }
        }

        let snapshot = self.lineup(match_id, set).cloned().unwrap_or_default();
        let lineup = self.lineup_mut(match_id, set);

        if let Some(pid) = player {
            // One slot per player per set. Placing on court evicts a libero
            // assignment and any other court slot; placing as libero evicts
            // every court slot.
            lineup.retain(|&s, &mut p| s == slot || p != pid);
            lineup.insert(slot, pid);
        } else {
            lineup.remove(&slot);
        }

        self.cascade(match_id, set, &snapshot);
        self.recalculate_played(match_id);
        Ok(())
    }

    /// Substitute `player_in` for `player_out` in one set. Locates the slot
    /// the outgoing player holds, checks the substitution rules, applies the
    /// swap, appends to the set's substitution log, and cascades.
    ///
    /// Returns the warning notice when the swap is irregular but applied.
    pub fn substitute(
        &mut self,
        match_id: MatchId,
        set: SetId,
        player_out: PlayerId,
        player_in: PlayerId,
    ) -> Result<Option<String>, LineupError> {
        let entrant = self
            .player(player_in)
            .cloned()
            .ok_or(LineupError::UnknownPlayer)?;
        let lineup = self
            .lineup(match_id, set)
            .ok_or(LineupError::MissingComposition)?;
        let slot = *lineup
            .iter()
            .find(|(_, &p)| p == player_out)
            .map(|(s, _)| s)
            .ok_or(LineupError::PlayerNotOnCourt)?;

        let notice = match check_substitution(&entrant, slot) {
            SubstitutionCheck::Reject(_) => {
                return Err(LineupError::LiberoSlotRequiresLibero);
            }
            SubstitutionCheck::Warn(msg) => {
                warn!(player = %entrant.name, %slot, "irregular substitution");
                Some(msg)
            }
            SubstitutionCheck::Allowed => None,
        };

        let snapshot = self.lineup(match_id, set).cloned().unwrap_or_default();
        self.lineup_mut(match_id, set).insert(slot, player_in);

        let m = self
            .match_by_id_mut(match_id)
            .ok_or(LineupError::UnknownMatch)?;
        m.substitutions
            .entry(set)
            .or_default()
            .push(super::model::Substitution { player_out, player_in });

        self.cascade(match_id, set, &snapshot);
        self.recalculate_played(match_id);
        Ok(notice)
    }

    /// Rotate the six numbered slots of one set. Clockwise rotation moves
    /// each player one slot down: the new P1 is the old P2, and the old P1
    /// wraps to P6. The libero slot never rotates and empty slots stay empty.
    pub fn rotate(
        &mut self,
        match_id: MatchId,
        set: SetId,
        direction: RotationDirection,
    ) -> Result<(), LineupError> {
        if self.match_by_id(match_id).is_none() {
            return Err(LineupError::UnknownMatch);
        }
        let snapshot = self.lineup(match_id, set).cloned().unwrap_or_default();

        let lineup = self.lineup_mut(match_id, set);
        let old: Vec<Option<PlayerId>> = Slot::COURT
            .iter()
            .map(|s| lineup.get(s).copied())
            .collect();
        for (i, slot) in Slot::COURT.iter().enumerate() {
            let source = match direction {
                RotationDirection::Clockwise => (i + 1) % 6,
                RotationDirection::CounterClockwise => (i + 5) % 6,
            };
            match old[source] {
                Some(pid) => {
                    lineup.insert(*slot, pid);
                }
                None => {
                    lineup.remove(slot);
                }
            }
        }

        self.cascade(match_id, set, &snapshot);
        self.recalculate_played(match_id);
        Ok(())
    }

    /// Copy the (already mutated) lineup of `set` onto each following set
    /// whose lineup still equals `snapshot`, stopping at the first one that
    /// differs. A set with no stored lineup counts as empty.
    fn cascade(&mut self, match_id: MatchId, set: SetId, snapshot: &Lineup) {
        let updated = self.lineup(match_id, set).cloned().unwrap_or_default();
        for next in set.following() {
            let current = self.lineup(match_id, next).cloned().unwrap_or_default();
            if &current != snapshot {
                break;
            }
            *self.lineup_mut(match_id, next) = updated.clone();
        }
    }

    /// Rebuild a match's `played` list: everyone occupying any slot of any
    /// set, plus everyone who subbed in. Sorted for stable serialization.
    pub fn recalculate_played(&mut self, match_id: MatchId) {
        let mut played: Vec<PlayerId> = Vec::new();
        if let Some(per_match) = self.court_positions.get(&match_id) {
            for lineup in per_match.values() {
                played.extend(lineup.values().copied());
            }
        }
        if let Some(m) = self.match_by_id(match_id) {
            for subs in m.substitutions.values() {
                played.extend(subs.iter().map(|s| s.player_in));
            }
        }
        played.sort_unstable();
        played.dedup();
        if let Some(m) = self.match_by_id_mut(match_id) {
            m.played = played;
        }
    }
}
