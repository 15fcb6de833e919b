// Single owner of the application document and the sign-in state.
//
// Every mutation goes through `&mut Session`; the event loop in `run`
// serializes UI commands and remote snapshots over one `tokio::select!`, so
// no lock ever guards the document itself.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use crate::auth::{register_user, AuthProvider, Identity};
use crate::import;
use crate::remote::{DocumentStore, RemoteChange};
use crate::sync::gateway::PersistenceGateway;
use crate::sync::reconciler;
use crate::sync::subscriber::{apply_remote_change, SnapshotOutcome};
use crate::team::lineup::RotationDirection;
use crate::team::model::{
    AppData, FaultCategory, ForfeitStatus, Location, MatchId, PlayerId, PointCategory, SetId,
    Slot, TeamId, TrainingId,
};
use crate::team::roster::{AttendanceStatus, PlayerDraft};
use crate::team::tally::{TallyKind, UndoOutcome};

/// What the presentation layer must do after an event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiUpdate {
    /// The document changed; redraw from it.
    Rerender,
    /// Text to surface to the user (validation refusals, sync notices).
    Notice(String),
}

/// Everything the presentation layer can ask of the session.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    // Accounts
    SignIn { email: String, password: String },
    SignUp { email: String, password: String, firstname: String, lastname: String },
    SignOut,
    PasswordReset { email: String },
    // Teams
    AddTeam { name: String, season: String },
    EditTeam { id: TeamId, name: String, season: String, ranking_url: Option<String> },
    DeleteTeam { id: TeamId },
    SwitchTeam { id: TeamId },
    // Players
    AddPlayer { draft: PlayerDraft },
    EditPlayer { id: PlayerId, draft: PlayerDraft },
    DeletePlayer { id: PlayerId },
    DeleteAllPlayers,
    ImportRoster { csv: String },
    // Matches
    CreateMatch { date: NaiveDate, opponent: String, location: Location },
    EditMatch { id: MatchId, date: NaiveDate, opponent: String, location: Location },
    DeleteMatch { id: MatchId },
    SelectMatch { id: MatchId },
    SetCaptain { match_id: MatchId, captain: Option<PlayerId> },
    UpdatePresence { match_id: MatchId, player_id: PlayerId, present: bool },
    UpdateSetScore { match_id: MatchId, set: SetId, my_team: Option<u32>, opponent: Option<u32> },
    SetForfeit { match_id: MatchId, status: ForfeitStatus },
    SetDetailMode { match_id: MatchId, detail: bool },
    // Lineups
    SetSlot { match_id: MatchId, set: SetId, slot: Slot, player: Option<PlayerId> },
    Substitute { match_id: MatchId, set: SetId, player_out: PlayerId, player_in: PlayerId },
    Rotate { match_id: MatchId, set: SetId, direction: RotationDirection },
    // Live tally
    SelectSet { set: SetId },
    AdjustFault { match_id: MatchId, player_id: PlayerId, category: FaultCategory, delta: i32 },
    AdjustPoint { match_id: MatchId, player_id: PlayerId, category: PointCategory, delta: i32 },
    Undo { kind: TallyKind },
    // Trainings
    AddTraining { date: NaiveDate, theme: String },
    EditTraining { id: TrainingId, date: NaiveDate, theme: String, plan: String },
    DeleteTraining { id: TrainingId },
    SetAttendance { training_id: TrainingId, player_id: PlayerId, status: Option<AttendanceStatus> },
    // UI memory
    SelectTab { tab: String },
    Quit,
}

pub struct Session {
    data: AppData,
    identity: Option<Identity>,
    subscribed_uid: Option<String>,
    changes: Option<broadcast::Receiver<RemoteChange>>,
    current_set: SetId,
    gateway: PersistenceGateway,
    auth: Arc<dyn AuthProvider>,
    ui_tx: mpsc::Sender<UiUpdate>,
}

impl Session {
    /// Start from the locally cached document, anonymous.
    pub fn new(
        gateway: PersistenceGateway,
        auth: Arc<dyn AuthProvider>,
        ui_tx: mpsc::Sender<UiUpdate>,
    ) -> Self {
        let data = gateway.load();
        Session {
            data,
            identity: None,
            subscribed_uid: None,
            changes: None,
            current_set: SetId::Set1,
            gateway,
            auth,
            ui_tx,
        }
    }

    pub fn data(&self) -> &AppData {
        &self.data
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn current_set(&self) -> SetId {
        self.current_set
    }

    async fn notify(&self, update: UiUpdate) {
        let _ = self.ui_tx.send(update).await;
    }

    async fn notice(&self, msg: impl Into<String>) {
        self.notify(UiUpdate::Notice(msg.into())).await;
    }

    /// Persist then request a redraw, after a successful mutation.
    async fn committed(&self) {
        self.gateway.save(&self.data, self.identity.as_ref()).await;
        self.notify(UiUpdate::Rerender).await;
    }

    async fn finish<E: std::fmt::Display>(&self, result: Result<(), E>) {
        match result {
            Ok(()) => self.committed().await,
            Err(err) => self.notice(err.to_string()).await,
        }
    }

    // -----------------------------------------------------------------------
    // Account lifecycle
    // -----------------------------------------------------------------------

    pub async fn sign_in(&mut self, email: &str, password: &str) {
        match self.auth.sign_in(email.trim(), password).await {
            Ok(identity) => self.adopt_identity(identity).await,
            Err(err) => {
                self.notice(format!("Erreur de connexion : {}", err.user_message()))
                    .await;
            }
        }
    }

    pub async fn sign_up(&mut self, email: &str, password: &str, firstname: &str, lastname: &str) {
        let registered = register_user(
            self.auth.as_ref(),
            self.gateway.store().as_ref(),
            email,
            password,
            firstname,
            lastname,
        )
        .await;
        match registered {
            Ok(identity) => self.adopt_identity(identity).await,
            Err(err) => self.notice(err.to_string()).await,
        }
    }

    /// Reconcile against the account's remote copy, then attach the live
    /// subscription. When the remote fetch fails the session stays signed in
    /// but local-only, with no subscription.
    async fn adopt_identity(&mut self, identity: Identity) {
        let uid = identity.uid.clone();
        let outcome = reconciler::reconcile(
            &self.data,
            self.gateway.cache(),
            self.gateway.store().as_ref(),
            &uid,
        )
        .await;
        match outcome {
            Ok(outcome) => {
                info!(%uid, email = %identity.email, "signed in");
                self.data = outcome.data;
                self.identity = Some(identity);
                self.changes = Some(self.gateway.store().subscribe(&uid));
                self.subscribed_uid = Some(uid);
                if outcome.pulled_remote {
                    self.notify(UiUpdate::Rerender).await;
                }
            }
            Err(err) => {
                warn!(%uid, error = %err, "remote fetch failed during sign-in, staying local");
                self.identity = Some(identity);
                self.notice(
                    "Impossible de récupérer les données en ligne. \
                     L'application continue en mode local.",
                )
                .await;
            }
        }
    }

    /// Detach the subscription first, so nothing the provider emits during
    /// sign-out can land on a session that no longer owns the account.
    pub async fn sign_out(&mut self) {
        self.changes = None;
        self.subscribed_uid = None;
        if let Err(err) = self.auth.sign_out().await {
            self.notice(format!("Erreur de déconnexion : {}", err.user_message()))
                .await;
        }
        self.identity = None;
        self.data = self.gateway.load();
        self.current_set = SetId::Set1;
        self.notify(UiUpdate::Rerender).await;
    }

    pub async fn password_reset(&self, email: &str) {
        let email = email.trim();
        if email.is_empty() {
            self.notice(
                "Veuillez saisir votre adresse email dans le champ 'Email' \
                 pour réinitialiser votre mot de passe.",
            )
            .await;
            return;
        }
        match self.auth.send_password_reset(email).await {
            Ok(()) => {
                self.notice(
                    "Un email de réinitialisation de mot de passe a été envoyé à \
                     votre adresse. Veuillez vérifier votre boîte de réception \
                     (et vos spams).",
                )
                .await;
            }
            Err(err) => {
                self.notice(format!(
                    "Erreur lors de l'envoi de l'email : {}",
                    err.user_message()
                ))
                .await;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Remote snapshots
    // -----------------------------------------------------------------------

    pub async fn handle_remote_change(&mut self, change: RemoteChange) {
        let Some(subscribed) = self.subscribed_uid.clone() else {
            return;
        };
        let outcome = apply_remote_change(
            &mut self.data,
            self.gateway.cache(),
            change,
            self.identity.as_ref().map(|i| i.uid.as_str()),
            &subscribed,
        );
        match outcome {
            SnapshotOutcome::Replaced | SnapshotOutcome::Reset => {
                self.notify(UiUpdate::Rerender).await;
            }
            SnapshotOutcome::Stale | SnapshotOutcome::Unchanged => {}
        }
    }

    // -----------------------------------------------------------------------
    // Command dispatch
    // -----------------------------------------------------------------------

    pub async fn handle_command(&mut self, cmd: SessionCommand) {
        use SessionCommand::*;
        match cmd {
            SignIn { email, password } => self.sign_in(&email, &password).await,
            SignUp { email, password, firstname, lastname } => {
                self.sign_up(&email, &password, &firstname, &lastname).await;
            }
            SignOut => self.sign_out().await,
            PasswordReset { email } => self.password_reset(&email).await,

            AddTeam { name, season } => {
                let result = self.data.add_team(&name, &season).map(|_| ());
                self.finish(result).await;
            }
            EditTeam { id, name, season, ranking_url } => {
                let result = self.data.edit_team(id, &name, &season, ranking_url.as_deref());
                self.finish(result).await;
            }
            DeleteTeam { id } => {
                let result = self.data.delete_team(id);
                self.finish(result).await;
            }
            SwitchTeam { id } => {
                let result = self.data.switch_team(id);
                self.finish(result).await;
            }

            AddPlayer { draft } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.add_player(draft).map(|_| ());
                self.finish(result).await;
            }
            EditPlayer { id, draft } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.edit_player(id, draft);
                self.finish(result).await;
            }
            DeletePlayer { id } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.delete_player(id);
                self.finish(result).await;
            }
            DeleteAllPlayers => {
                let Some(team) = self.data.current_team_mut() else { return };
                team.delete_all_players();
                self.committed().await;
            }
            ImportRoster { csv } => {
                let Some(team) = self.data.current_team_mut() else { return };
                match import::import_players(team, csv.as_bytes()) {
                    Ok(report) => {
                        self.notice(report.summary()).await;
                        self.committed().await;
                    }
                    Err(err) => self.notice(err.to_string()).await,
                }
            }

            CreateMatch { date, opponent, location } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.create_match(date, &opponent, location).map(|_| ());
                self.finish(result).await;
            }
            EditMatch { id, date, opponent, location } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.edit_match(id, date, &opponent, location);
                self.finish(result).await;
            }
            DeleteMatch { id } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let team_id = team.id;
                let result = team.delete_match(id);
                if result.is_ok() {
                    if let Err(err) = self.gateway.cache().clear_last_selected_match(team_id) {
                        warn!(error = %err, "failed to clear the last-selected match");
                    }
                }
                self.finish(result).await;
            }
            SelectMatch { id } => {
                let Some(team_id) = self.data.current_team_id else { return };
                if let Err(err) = self.gateway.cache().set_last_selected_match(team_id, id) {
                    warn!(error = %err, "failed to remember the selected match");
                }
            }
            SetCaptain { match_id, captain } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.set_captain(match_id, captain);
                self.finish(result).await;
            }
            UpdatePresence { match_id, player_id, present } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.update_presence(match_id, player_id, present);
                self.finish(result).await;
            }
            UpdateSetScore { match_id, set, my_team, opponent } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.update_set_score(match_id, set, my_team, opponent);
                self.finish(result).await;
            }
            SetForfeit { match_id, status } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.set_forfeit(match_id, status);
                self.finish(result).await;
            }
            SetDetailMode { match_id, detail } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.set_detail_mode(match_id, detail);
                self.finish(result).await;
            }

            SetSlot { match_id, set, slot, player } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.set_slot(match_id, set, slot, player);
                self.finish(result).await;
            }
            Substitute { match_id, set, player_out, player_in } => {
                let Some(team) = self.data.current_team_mut() else { return };
                match team.substitute(match_id, set, player_out, player_in) {
                    Ok(warning) => {
                        if let Some(msg) = warning {
                            self.notice(msg).await;
                        }
                        self.committed().await;
                    }
                    Err(err) => self.notice(err.to_string()).await,
                }
            }
            Rotate { match_id, set, direction } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.rotate(match_id, set, direction);
                self.finish(result).await;
            }

            SelectSet { set } => {
                self.current_set = set;
                self.data.clear_last_actions();
                self.committed().await;
            }
            AdjustFault { match_id, player_id, category, delta } => {
                let set = self.current_set;
                let result = self.data.adjust_fault(match_id, player_id, category, set, delta);
                self.finish(result).await;
            }
            AdjustPoint { match_id, player_id, category, delta } => {
                let set = self.current_set;
                let result = self.data.adjust_point(match_id, player_id, category, set, delta);
                self.finish(result).await;
            }
            Undo { kind } => {
                let set = self.current_set;
                match self.data.undo_last(kind, set) {
                    Ok(outcome) => {
                        if let Some(msg) = outcome.notice() {
                            self.notice(msg).await;
                        }
                        if outcome == UndoOutcome::Undone {
                            self.committed().await;
                        }
                    }
                    Err(err) => self.notice(err.to_string()).await,
                }
            }

            AddTraining { date, theme } => {
                let Some(team) = self.data.current_team_mut() else { return };
                team.add_training(date, &theme);
                self.committed().await;
            }
            EditTraining { id, date, theme, plan } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.edit_training(id, date, &theme, &plan);
                self.finish(result).await;
            }
            DeleteTraining { id } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.delete_training(id);
                self.finish(result).await;
            }
            SetAttendance { training_id, player_id, status } => {
                let Some(team) = self.data.current_team_mut() else { return };
                let result = team.set_attendance(training_id, player_id, status);
                self.finish(result).await;
            }

            SelectTab { tab } => {
                if let Err(err) = self.gateway.cache().set_last_active_tab(&tab) {
                    warn!(error = %err, "failed to remember the active tab");
                }
            }
            Quit => {}
        }
    }

}

async fn recv_change(
    rx: Option<&mut broadcast::Receiver<RemoteChange>>,
) -> Result<RemoteChange, broadcast::error::RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

enum Event {
    Command(Option<SessionCommand>),
    Change(Result<RemoteChange, broadcast::error::RecvError>),
}

/// Serialize commands and remote snapshots into the session until the
/// command channel closes or `Quit` arrives.
pub async fn run(
    mut session: Session,
    mut commands: mpsc::Receiver<SessionCommand>,
) -> anyhow::Result<()> {
    loop {
        let mut changes = session.changes.take();
        let event = tokio::select! {
            cmd = commands.recv() => Event::Command(cmd),
            change = recv_change(changes.as_mut()) => Event::Change(change),
        };
        session.changes = changes;

        match event {
            Event::Command(None) | Event::Command(Some(SessionCommand::Quit)) => break,
            Event::Command(Some(cmd)) => session.handle_command(cmd).await,
            Event::Change(Ok(change)) => session.handle_remote_change(change).await,
            Event::Change(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                warn!(skipped, "remote change stream lagged, snapshots dropped");
            }
            Event::Change(Err(broadcast::error::RecvError::Closed)) => {
                session.changes = None;
            }
        }
    }
    info!("session loop stopped");
    Ok(())
}
