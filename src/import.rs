// Roster import from a spreadsheet export.
//
// The template carries seven columns. Header binding normalizes each cell
// (trim, lowercase, accents folded) and compares against the declared names,
// so "Prénom ", "prenom" and "PRENOM" all bind the same column.

use std::io::Read;

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::info;

use crate::team::model::{Gender, Position, Team};
use crate::team::roster::PlayerDraft;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Le fichier importé est illisible : {0}")]
    Csv(#[from] csv::Error),
    #[error("Aucune colonne reconnue dans l'en-tête du fichier.")]
    NoRecognizedColumns,
}

/// What an import run did, shown to the user afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub skipped_no_name: usize,
    pub skipped_duplicates: usize,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!(
            "{} joueur(s) importé(s), {} doublon(s) ignoré(s), {} ligne(s) sans nom.",
            self.added, self.skipped_duplicates, self.skipped_no_name
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    LastName,
    FirstName,
    FullName,
    Jersey,
    License,
    Gender,
    MainPosition,
    SecondaryPosition,
}

fn match_column(header: &str) -> Option<Column> {
    match normalize(header).as_str() {
        "nom" => Some(Column::LastName),
        "prenom" => Some(Column::FirstName),
        "nom complet" => Some(Column::FullName),
        "numero de maillot" => Some(Column::Jersey),
        "licence" => Some(Column::License),
        "sexe" => Some(Column::Gender),
        "poste principal" => Some(Column::MainPosition),
        "poste secondaire" => Some(Column::SecondaryPosition),
        _ => None,
    }
}

/// Trim, lowercase, fold the accents of the template's vocabulary, collapse
/// runs of whitespace.
fn normalize(s: &str) -> String {
    s.trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' => 'i',
            'ô' | 'ö' => 'o',
            'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            _ => c,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_gender(value: &str) -> Gender {
    match normalize(value).as_str() {
        "f" | "femme" => Gender::Female,
        _ => Gender::Male,
    }
}

fn parse_position(value: &str) -> Option<Position> {
    let wanted = normalize(value);
    Position::ALL
        .into_iter()
        .find(|p| normalize(p.label()) == wanted)
}

/// Import players from CSV rows into `team`.
///
/// A row's name is "Prénom Nom", falling back to the "Nom complet" column
/// when both are empty. Rows with no resolvable name and rows whose name
/// matches an existing or already-imported player are skipped without
/// counting as added.
pub fn import_players<R: Read>(team: &mut Team, reader: R) -> Result<ImportReport, ImportError> {
    let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns: Vec<Option<Column>> = csv.headers()?.iter().map(match_column).collect();
    if columns.iter().all(Option::is_none) {
        return Err(ImportError::NoRecognizedColumns);
    }

    let mut report = ImportReport::default();
    for record in csv.records() {
        let record = record?;
        let field = |wanted: Column| -> &str {
            columns
                .iter()
                .zip(record.iter())
                .find(|(c, _)| **c == Some(wanted))
                .map(|(_, v)| v.trim())
                .unwrap_or("")
        };

        let mut name = format!("{} {}", field(Column::FirstName), field(Column::LastName))
            .trim()
            .to_string();
        if name.is_empty() {
            name = field(Column::FullName).to_string();
        }
        if name.is_empty() {
            report.skipped_no_name += 1;
            continue;
        }
        if team.players.iter().any(|p| normalize(&p.name) == normalize(&name)) {
            report.skipped_duplicates += 1;
            continue;
        }

        let draft = PlayerDraft {
            name,
            license_number: field(Column::License).to_string(),
            jersey_number: field(Column::Jersey).to_string(),
            gender: parse_gender(field(Column::Gender)),
            main_position: parse_position(field(Column::MainPosition))
                .unwrap_or(Position::ReceptionneurAttaquant),
            secondary_position: parse_position(field(Column::SecondaryPosition)),
        };
        match team.add_player(draft) {
            Ok(_) => report.added += 1,
            // Jersey collisions are skipped like name collisions.
            Err(_) => report.skipped_duplicates += 1,
        }
    }

    info!(
        added = report.added,
        duplicates = report.skipped_duplicates,
        no_name = report.skipped_no_name,
        "roster import finished"
    );
    Ok(report)
}
