//! # Module du moteur d'opérations par lots
//!
//! Applique la même opération logique (création, suppression, changement
//! de mot de passe) à une liste ordonnée de cibles, en tolérant l'échec
//! individuel et en rapportant la progression.
//!
//! ## Modèle d'exécution
//!
//! Les items sont traités **strictement en séquence**, dans l'ordre
//! d'entrée : l'annuaire ne doit jamais recevoir deux mutations
//! concurrentes. Chaque opération est menée à terme (succès ou échec)
//! avant la suivante ; l'échec d'un item n'interrompt pas les suivants.
//!
//! Les préconditions globales (mot de passe partagé, groupe cible) sont
//! vérifiées AVANT la boucle : en cas de violation, le lot échoue
//! atomiquement, zéro item tenté.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::data_structures::NewUser;
use crate::http_client::AdminClient;
use crate::import::{self, UserRow};

/// Item traité avec succès
#[derive(Debug, Clone)]
pub struct BatchSuccess {
    pub identifier: String,
    /// Écho éventuel de la passerelle (utilisateur créé, message...)
    pub details: Option<Value>,
}

/// Item en échec
#[derive(Debug, Clone)]
pub struct BatchFailure {
    pub identifier: String,
    pub error_message: String,
}

/// Résultat agrégé d'un lot
///
/// Invariants : `completed` s'incrémente exactement une fois par item
/// traité, `success.len() + errors.len() == completed` et
/// `completed <= total` à tout instant.
#[derive(Debug)]
pub struct BatchReport {
    pub total: usize,
    pub completed: usize,
    /// Vrai si le lot a été interrompu par le jeton d'annulation
    pub cancelled: bool,
    pub success: Vec<BatchSuccess>,
    pub errors: Vec<BatchFailure>,
}

impl BatchReport {
    /// Résumé lisible pour l'affichage de fin de lot
    pub fn summary(&self) -> String {
        format!(
            "{} réussite(s), {} échec(s) sur {} item(s){}",
            self.success.len(),
            self.errors.len(),
            self.total,
            if self.cancelled { " (lot annulé)" } else { "" }
        )
    }
}

/// Jeton d'annulation vérifié entre deux items
///
/// L'annulation n'interrompt jamais un item en cours : elle empêche
/// seulement le démarrage des suivants.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Pourcentage de progression arrondi (0..100)
fn percent(completed: usize, total: usize) -> u8 {
    ((completed as f64 / total as f64) * 100.0).round() as u8
}

/// Exécute un lot séquentiellement
///
/// # Arguments
/// * `items` - Cibles, traitées dans l'ordre (les doublons sont traités
///   une fois par occurrence)
/// * `identifier` - Extrait l'identifiant d'un item pour le rapport
/// * `operation` - Opération par item ; son `Err` alimente `errors` sans
///   interrompre le lot
/// * `progress` - Invoqué après chaque item avec le pourcentage arrondi ;
///   atteint exactement 100 au dernier item. Liste vide : jamais invoqué
///   (la progression est définie par item traité, et il n'y a pas d'item)
/// * `cancel` - Jeton optionnel vérifié entre deux items
pub fn run_batch<T, I, F, P>(
    items: &[T],
    identifier: I,
    mut operation: F,
    mut progress: P,
    cancel: Option<&CancelToken>,
) -> BatchReport
where
    I: Fn(&T) -> String,
    F: FnMut(&T) -> Result<Option<Value>, String>,
    P: FnMut(u8),
{
    let total = items.len();
    let mut report = BatchReport {
        total,
        completed: 0,
        cancelled: false,
        success: Vec::new(),
        errors: Vec::new(),
    };

    if total == 0 {
        return report;
    }

    for item in items {
        if let Some(token) = cancel {
            if token.is_cancelled() {
                report.cancelled = true;
                break;
            }
        }

        let id = identifier(item);
        match operation(item) {
            Ok(details) => report.success.push(BatchSuccess {
                identifier: id,
                details,
            }),
            Err(error_message) => report.errors.push(BatchFailure {
                identifier: id,
                error_message,
            }),
        }

        report.completed += 1;
        progress(percent(report.completed, total));
    }

    report
}

// ============================================================================
// OPÉRATIONS PAR LOTS SUR L'ANNUAIRE
// ============================================================================

/// Création en masse depuis des lignes d'import validées
///
/// Pré-vol : le mot de passe partagé s'applique à toutes les lignes et
/// chaque ligne doit désigner un groupe cible. Toute violation bloque le
/// lot avant le premier appel.
pub fn bulk_create<P: FnMut(u8)>(
    client: &AdminClient,
    rows: &[UserRow],
    password: &str,
    progress: P,
    cancel: Option<&CancelToken>,
) -> Result<BatchReport, Vec<String>> {
    let mut preflight = Vec::new();

    if !import::password_conforme(password) {
        preflight.push(import::MSG_PASSWORD.to_string());
    }
    if rows.iter().any(|r| r.group.trim().is_empty()) {
        preflight.push("chaque ligne doit désigner un groupe cible".to_string());
    }
    if !preflight.is_empty() {
        return Err(preflight);
    }

    Ok(run_batch(
        rows,
        |row| row.identifier.clone(),
        |row| {
            let user = NewUser {
                sam_account_name: row.identifier.clone(),
                given_name: row.given_name.clone(),
                sn: row.surname.clone(),
                password: password.to_string(),
                ou: row.ou.clone(),
                groups: vec![row.group.clone()],
            };
            client
                .create_user(&user)
                .map(Some)
                .map_err(|e| e.to_string())
        },
        progress,
        cancel,
    ))
}

/// Suppression en masse
pub fn bulk_delete<P: FnMut(u8)>(
    client: &AdminClient,
    usernames: &[String],
    progress: P,
    cancel: Option<&CancelToken>,
) -> BatchReport {
    run_batch(
        usernames,
        Clone::clone,
        |username| {
            client
                .delete_user(username)
                .map(|_| None)
                .map_err(|e| e.to_string())
        },
        progress,
        cancel,
    )
}

/// Changement de mot de passe en masse
///
/// Pré-vol : le nouveau mot de passe partagé doit respecter la politique
/// de complexité.
pub fn bulk_change_password<P: FnMut(u8)>(
    client: &AdminClient,
    usernames: &[String],
    new_password: &str,
    progress: P,
    cancel: Option<&CancelToken>,
) -> Result<BatchReport, Vec<String>> {
    if !import::password_conforme(new_password) {
        return Err(vec![import::MSG_PASSWORD.to_string()]);
    }

    Ok(run_batch(
        usernames,
        Clone::clone,
        |username| {
            client
                .change_password(username, new_password)
                .map(Some)
                .map_err(|e| e.to_string())
        },
        progress,
        cancel,
    ))
}
