// Core data model: the application document and everything inside it.
//
// The document is serialized with camelCase keys so that local-cache and
// remote copies share one schema. Every map is a BTreeMap so that canonical
// serialization is deterministic; document equality throughout the sync layer
// is byte equality of the canonical form.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type TeamId = i64;
pub type PlayerId = i64;
pub type MatchId = i64;
pub type TrainingId = i64;

/// Number of sets in a match; `score.sets` always has exactly this many entries.
pub const SET_COUNT: usize = 5;

static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Allocate a timestamp-derived identifier (milliseconds since epoch).
///
/// Monotonic even when called twice within the same millisecond, so two
/// entities created back-to-back never collide.
pub fn next_id() -> i64 {
    let now = chrono::Utc::now().timestamp_millis();
    let mut prev = LAST_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match LAST_ID.compare_exchange_weak(prev, candidate, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => return candidate,
            Err(actual) => prev = actual,
        }
    }
}

// ---------------------------------------------------------------------------
// Sets and court slots
// ---------------------------------------------------------------------------

/// One of the five scoring periods of a match.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SetId {
    #[serde(rename = "set1")]
    Set1,
    #[serde(rename = "set2")]
    Set2,
    #[serde(rename = "set3")]
    Set3,
    #[serde(rename = "set4")]
    Set4,
    #[serde(rename = "set5")]
    Set5,
}

impl SetId {
    /// All sets in fixed play order. The cascade walks this order.
    pub const ALL: [SetId; SET_COUNT] = [
        SetId::Set1,
        SetId::Set2,
        SetId::Set3,
        SetId::Set4,
        SetId::Set5,
    ];

    /// Zero-based index into `score.sets`.
    pub fn index(self) -> usize {
        match self {
            SetId::Set1 => 0,
            SetId::Set2 => 1,
            SetId::Set3 => 2,
            SetId::Set4 => 3,
            SetId::Set5 => 4,
        }
    }

    /// Set number for user-facing messages (1..=5).
    pub fn number(self) -> usize {
        self.index() + 1
    }

    /// Sets strictly after this one, in play order.
    pub fn following(self) -> impl Iterator<Item = SetId> {
        SetId::ALL.into_iter().skip(self.index() + 1)
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "set{}", self.number())
    }
}

/// A lineup slot: one of the six numbered court positions or the libero slot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Slot {
    #[serde(rename = "pos-1")]
    P1,
    #[serde(rename = "pos-2")]
    P2,
    #[serde(rename = "pos-3")]
    P3,
    #[serde(rename = "pos-4")]
    P4,
    #[serde(rename = "pos-5")]
    P5,
    #[serde(rename = "pos-6")]
    P6,
    #[serde(rename = "libero")]
    Libero,
}

impl Slot {
    /// The six numbered court slots in rotation order P1..P6.
    pub const COURT: [Slot; 6] = [
        Slot::P1,
        Slot::P2,
        Slot::P3,
        Slot::P4,
        Slot::P5,
        Slot::P6,
    ];

    pub fn is_court(self) -> bool {
        self != Slot::Libero
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Slot::P1 => "pos-1",
            Slot::P2 => "pos-2",
            Slot::P3 => "pos-3",
            Slot::P4 => "pos-4",
            Slot::P5 => "pos-5",
            Slot::P6 => "pos-6",
            Slot::Libero => "libero",
        };
        f.write_str(s)
    }
}

/// Court composition for one set: slot -> player. Absent key = empty slot.
pub type Lineup = BTreeMap<Slot, PlayerId>;

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// The five playing roles, with their French display names as the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "Passeur")]
    Passeur,
    #[serde(rename = "Central")]
    Central,
    #[serde(rename = "Réceptionneur-Attaquant")]
    ReceptionneurAttaquant,
    #[serde(rename = "Pointu")]
    Pointu,
    #[serde(rename = "Libéro")]
    Libero,
}

impl Position {
    pub const ALL: [Position; 5] = [
        Position::Passeur,
        Position::Central,
        Position::ReceptionneurAttaquant,
        Position::Pointu,
        Position::Libero,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Position::Passeur => "Passeur",
            Position::Central => "Central",
            Position::ReceptionneurAttaquant => "Réceptionneur-Attaquant",
            Position::Pointu => "Pointu",
            Position::Libero => "Libéro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    #[serde(rename = "H")]
    Male,
    #[serde(rename = "F")]
    Female,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub license_number: String,
    /// Kept as text: clubs hand out jersey "numbers" like "1B".
    #[serde(default)]
    pub jersey_number: String,
    pub gender: Gender,
    pub main_position: Position,
    #[serde(default)]
    pub secondary_position: Option<Position>,
}

impl Player {
    /// Whether this player may occupy the libero slot.
    pub fn is_libero_capable(&self) -> bool {
        self.main_position == Position::Libero
            || self.secondary_position == Some(Position::Libero)
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Location {
    #[serde(rename = "domicile")]
    Home,
    #[serde(rename = "exterieur")]
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForfeitStatus {
    None,
    Win,
    Loss,
}

impl Default for ForfeitStatus {
    fn default() -> Self {
        ForfeitStatus::None
    }
}

/// Sub-score of a single set. `None` = not entered yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScore {
    #[serde(default)]
    pub my_team: Option<u32>,
    #[serde(default)]
    pub opponent: Option<u32>,
}

impl SetScore {
    /// True when both sub-scores are entered and ours is higher.
    pub fn won(&self) -> bool {
        matches!((self.my_team, self.opponent), (Some(m), Some(o)) if m > o)
    }

    pub fn lost(&self) -> bool {
        matches!((self.my_team, self.opponent), (Some(m), Some(o)) if o > m)
    }

    pub fn is_entered(&self) -> bool {
        self.my_team.is_some() || self.opponent.is_some()
    }
}

/// Match score: two running set-win totals plus exactly five set sub-scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    #[serde(default)]
    pub my_team: Option<u32>,
    #[serde(default)]
    pub opponent: Option<u32>,
    #[serde(default)]
    pub sets: Vec<SetScore>,
}

impl Default for Score {
    fn default() -> Self {
        Score {
            my_team: None,
            opponent: None,
            sets: vec![SetScore::default(); SET_COUNT],
        }
    }
}

impl Score {
    /// Recompute the running set-win totals from the five set sub-scores.
    pub fn recompute_totals(&mut self) {
        let won = self.sets.iter().filter(|s| s.won()).count() as u32;
        let lost = self.sets.iter().filter(|s| s.lost()).count() as u32;
        if self.sets.iter().any(|s| s.is_entered()) {
            self.my_team = Some(won);
            self.opponent = Some(lost);
        } else {
            self.my_team = None;
            self.opponent = None;
        }
    }

    /// True when a result has been entered (running totals or any set score).
    pub fn has_result(&self) -> bool {
        self.my_team.is_some()
            || self.opponent.is_some()
            || self.sets.iter().any(|s| s.is_entered())
    }
}

/// One substitution: `player_out` leaves, `player_in` takes the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    #[serde(rename = "out")]
    pub player_out: PlayerId,
    #[serde(rename = "in")]
    pub player_in: PlayerId,
}

/// Fault counters for one player in one set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultCounts {
    #[serde(default)]
    pub service: u32,
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub reception: u32,
    #[serde(default)]
    pub net: u32,
}

impl FaultCounts {
    pub fn total(&self) -> u32 {
        self.service + self.attack + self.reception + self.net
    }
}

/// Point counters for one player in one set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointCounts {
    #[serde(default)]
    pub service: u32,
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub block: u32,
    #[serde(default)]
    pub net: u32,
}

impl PointCounts {
    pub fn total(&self) -> u32 {
        self.service + self.attack + self.block + self.net
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub date: NaiveDate,
    pub opponent: String,
    pub location: Location,
    #[serde(default)]
    pub present: Vec<PlayerId>,
    /// Derived cache: everyone who ever occupied a slot or subbed in.
    /// Recomputed after every composition or presence change.
    #[serde(default)]
    pub played: Vec<PlayerId>,
    #[serde(default)]
    pub captain_id: Option<PlayerId>,
    #[serde(default)]
    pub score: Score,
    #[serde(default)]
    pub substitutions: BTreeMap<SetId, Vec<Substitution>>,
    #[serde(default)]
    pub faults: BTreeMap<SetId, BTreeMap<PlayerId, FaultCounts>>,
    #[serde(default)]
    pub points: BTreeMap<SetId, BTreeMap<PlayerId, PointCounts>>,
    #[serde(default)]
    pub forfeit_status: ForfeitStatus,
    /// Detailed per-category button grid vs a single aggregate counter.
    #[serde(default = "default_detail_mode")]
    pub detail_mode: bool,
}

fn default_detail_mode() -> bool {
    true
}

impl Match {
    pub fn new(date: NaiveDate, opponent: impl Into<String>, location: Location) -> Self {
        Match {
            id: next_id(),
            date,
            opponent: opponent.into(),
            location,
            present: Vec::new(),
            played: Vec::new(),
            captain_id: None,
            score: Score::default(),
            substitutions: BTreeMap::new(),
            faults: BTreeMap::new(),
            points: BTreeMap::new(),
            forfeit_status: ForfeitStatus::None,
            detail_mode: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Trainings
// ---------------------------------------------------------------------------

/// Attendance partition of a training session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendance {
    #[serde(default)]
    pub present: Vec<PlayerId>,
    #[serde(default)]
    pub absent: Vec<PlayerId>,
    #[serde(default)]
    pub injured: Vec<PlayerId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Training {
    pub id: TrainingId,
    pub date: NaiveDate,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub attendance: Attendance,
}

impl Training {
    pub fn new(date: NaiveDate, theme: impl Into<String>) -> Self {
        Training {
            id: next_id(),
            date,
            theme: theme.into(),
            plan: String::new(),
            attendance: Attendance::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub season: String,
    #[serde(default)]
    pub ranking_url: Option<String>,
    #[serde(default)]
    pub players: Vec<Player>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub trainings: Vec<Training>,
    /// match-id -> set -> lineup.
    #[serde(default)]
    pub court_positions: BTreeMap<MatchId, BTreeMap<SetId, Lineup>>,
}

impl Team {
    pub fn new(name: impl Into<String>, season: impl Into<String>) -> Self {
        Team {
            id: next_id(),
            name: name.into(),
            season: season.into(),
            ranking_url: None,
            players: Vec::new(),
            matches: Vec::new(),
            trainings: Vec::new(),
            court_positions: BTreeMap::new(),
        }
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn match_by_id(&self, id: MatchId) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == id)
    }

    pub fn match_by_id_mut(&mut self, id: MatchId) -> Option<&mut Match> {
        self.matches.iter_mut().find(|m| m.id == id)
    }

    pub fn training(&self, id: TrainingId) -> Option<&Training> {
        self.trainings.iter().find(|t| t.id == id)
    }

    pub fn training_mut(&mut self, id: TrainingId) -> Option<&mut Training> {
        self.trainings.iter_mut().find(|t| t.id == id)
    }

    /// The lineup of one set, if any slot was ever assigned.
    pub fn lineup(&self, match_id: MatchId, set: SetId) -> Option<&Lineup> {
        self.court_positions.get(&match_id)?.get(&set)
    }

    /// The lineup of one set, creating the nested containers on the way.
    pub fn lineup_mut(&mut self, match_id: MatchId, set: SetId) -> &mut Lineup {
        self.court_positions
            .entry(match_id)
            .or_default()
            .entry(set)
            .or_default()
    }
}

// ---------------------------------------------------------------------------
// Last-action pointers (single-level undo)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultCategory {
    Service,
    Attack,
    Reception,
    Net,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointCategory {
    Service,
    Attack,
    Block,
    Net,
}

/// The sole undo buffer for faults: the most recent increment, nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastFaultAction {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    #[serde(rename = "faultType")]
    pub category: FaultCategory,
    pub set: SetId,
}

/// The sole undo buffer for points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastPointAction {
    pub match_id: MatchId,
    pub player_id: PlayerId,
    #[serde(rename = "pointType")]
    pub category: PointCategory,
    pub set: SetId,
}

// ---------------------------------------------------------------------------
// Root document
// ---------------------------------------------------------------------------

/// The root application document: one per identity (or anonymous session).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppData {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub current_team_id: Option<TeamId>,
    #[serde(default)]
    pub last_fault_action: Option<LastFaultAction>,
    #[serde(default)]
    pub last_point_action: Option<LastPointAction>,
}

impl Default for AppData {
    fn default() -> Self {
        AppData::skeleton()
    }
}

impl AppData {
    /// Empty skeleton document, the state of a first load.
    pub fn skeleton() -> Self {
        AppData {
            teams: Vec::new(),
            current_team_id: None,
            last_fault_action: None,
            last_point_action: None,
        }
    }

    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn team_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id)
    }

    pub fn current_team(&self) -> Option<&Team> {
        self.current_team_id.and_then(|id| self.team(id))
    }

    pub fn current_team_mut(&mut self) -> Option<&mut Team> {
        let id = self.current_team_id?;
        self.team_mut(id)
    }
}

/// Deterministic serialization of a document.
///
/// Struct fields serialize in declaration order and every map in the model is
/// a BTreeMap, so two structurally equal documents always produce the same
/// bytes. The sync layer's equality heuristic depends on this.
pub fn to_canonical_json(data: &AppData) -> serde_json::Result<String> {
    serde_json::to_string(data)
}

/// Byte-equality of two documents under canonical serialization.
pub fn documents_equal(a: &AppData, b: &AppData) -> bool {
    match (to_canonical_json(a), to_canonical_json(b)) {
        (Ok(ja), Ok(jb)) => ja == jb,
        _ => false,
    }
}
