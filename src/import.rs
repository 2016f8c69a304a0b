//! # Module de validation d'import CSV
//!
//! Valide un tableau de lignes (champs texte) contre les règles
//! structurelles et référentielles AVANT toute création par lot : soit
//! zéro erreur et l'import démarre, soit l'import est bloqué en entier.
//! Il n'y a jamais d'import partiel.
//!
//! Le parsing CSV lui-même est délégué à la crate `csv` ; ce module ne
//! s'occupe que des règles métier.

use std::collections::HashSet;
use std::path::Path;

use crate::utils;

/// Nombre de champs attendus par ligne :
/// identifiant, prénom, nom, UO, groupe
pub const REQUIRED_FIELDS: usize = 5;

/// Nombre maximum d'erreurs affichées avant troncature
pub const MAX_DISPLAYED_ERRORS: usize = 10;

/// Message unique de la politique de mot de passe
///
/// La règle canonique vit dans [`password_conforme`] ; personne d'autre ne
/// doit la reformuler.
pub const MSG_PASSWORD: &str =
    "mot de passe invalide: 8 caractères minimum, avec majuscule, minuscule et chiffre";

/// Noms des champs, dans l'ordre des colonnes
const FIELD_NAMES: [&str; REQUIRED_FIELDS] = ["identifiant", "prénom", "nom", "uo", "groupe"];

/// Ligne d'import validée, prête pour la création
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub identifier: String,
    pub given_name: String,
    pub surname: String,
    pub ou: String,
    pub group: String,
}

/// Erreurs de lecture du fichier CSV
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("lecture CSV impossible: {0}")]
    Csv(#[from] csv::Error),
}

/// Politique de complexité des mots de passe
///
/// 8 caractères minimum, au moins une majuscule, une minuscule et un
/// chiffre. Règle unique pour le pré-vol des lots, la validation d'import
/// et le changement de mot de passe en masse.
pub fn password_conforme(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(char::is_uppercase)
        && password.chars().any(char::is_lowercase)
        && password.chars().any(|c| c.is_ascii_digit())
}

/// Charge un fichier CSV sans en-tête en lignes de champs (espaces rognés)
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Valide toutes les lignes et retourne la liste complète des erreurs
///
/// Chaque ligne est validée indépendamment (pas de fail-fast) :
/// - arité : exactement [`REQUIRED_FIELDS`] champs
/// - chaque champ non vide après rognage, une erreur par champ manquant
///   (numéro de ligne 1-indexé + nom du champ)
/// - identifiant au jeu de caractères accepté par la passerelle
/// - UO et groupe présents dans les référentiels fournis, l'erreur nomme
///   la valeur fautive
///
/// La liste retournée est dédupliquée à ordre constant. Liste vide =
/// import autorisé.
pub fn validate_rows(
    rows: &[Vec<String>],
    known_ous: &HashSet<String>,
    known_groups: &HashSet<String>,
) -> Vec<String> {
    let mut errors = Vec::new();

    for (index, fields) in rows.iter().enumerate() {
        let line = index + 1;

        if fields.len() != REQUIRED_FIELDS {
            errors.push(format!(
                "ligne {}: {} champs au lieu de {}",
                line,
                fields.len(),
                REQUIRED_FIELDS
            ));
            continue;
        }

        for (field, name) in fields.iter().zip(FIELD_NAMES) {
            if field.trim().is_empty() {
                errors.push(format!("ligne {line}: champ '{name}' manquant"));
            }
        }

        let identifier = fields[0].trim();
        if !identifier.is_empty() && !utils::valid_identifier(identifier) {
            errors.push(format!("ligne {line}: identifiant '{identifier}' invalide"));
        }

        let ou = fields[3].trim();
        if !ou.is_empty() && !known_ous.contains(ou) {
            errors.push(format!("UO inconnue '{ou}'"));
        }

        let group = fields[4].trim();
        if !group.is_empty() && !known_groups.contains(group) {
            errors.push(format!("groupe inconnu '{group}'"));
        }
    }

    dedup_preserve_order(errors)
}

/// Tronque la liste d'erreurs pour l'affichage
///
/// Au-delà de [`MAX_DISPLAYED_ERRORS`], les erreurs restantes sont
/// remplacées par une ligne de résumé.
pub fn cap_errors(mut errors: Vec<String>) -> Vec<String> {
    if errors.len() > MAX_DISPLAYED_ERRORS {
        let remaining = errors.len() - MAX_DISPLAYED_ERRORS;
        errors.truncate(MAX_DISPLAYED_ERRORS);
        errors.push(format!("... et {remaining} autres erreurs"));
    }
    errors
}

/// Convertit des lignes validées en [`UserRow`]
///
/// À n'appeler qu'après une validation sans erreur.
pub fn rows_to_users(rows: &[Vec<String>]) -> Vec<UserRow> {
    rows.iter()
        .filter(|fields| fields.len() == REQUIRED_FIELDS)
        .map(|fields| UserRow {
            identifier: fields[0].trim().to_string(),
            given_name: fields[1].trim().to_string(),
            surname: fields[2].trim().to_string(),
            ou: fields[3].trim().to_string(),
            group: fields[4].trim().to_string(),
        })
        .collect()
}

/// Déduplication à ordre constant (première occurrence conservée)
fn dedup_preserve_order(errors: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    errors
        .into_iter()
        .filter(|e| seen.insert(e.clone()))
        .collect()
}
