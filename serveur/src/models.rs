//! # Module des modèles de données
//!
//! Définit les structures de données échangées entre l'interface web, la
//! passerelle et les scripts d'annuaire, ainsi que les sessions dérivées
//! du journal d'événements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Utilisateur de l'annuaire tel que renvoyé par les scripts de listing.
///
/// Le mot de passe n'apparaît jamais dans cette structure : il est en
/// écriture seule (voir [`NewUser`] et [`UserUpdate`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifiant unique (sAMAccountName)
    pub sam_account_name: String,

    /// Prénom
    pub given_name: String,

    /// Nom de famille
    pub sn: String,

    /// Unité organisationnelle (filière/département)
    #[serde(default)]
    pub ou: String,

    /// Groupes d'appartenance (uniques, ordre non significatif)
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Demande de création d'utilisateur (POST /api/users)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub sam_account_name: String,
    pub given_name: String,
    pub sn: String,
    /// Mot de passe initial (transmis au script, jamais renvoyé)
    pub password: String,
    pub ou: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

/// Mise à jour partielle d'utilisateur (PUT /api/users/:username)
///
/// Seuls les champs présents sont transmis au script `editUser`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sn: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ou: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,
}

impl UserUpdate {
    /// Vrai si aucun champ n'est renseigné (requête sans effet)
    pub fn is_empty(&self) -> bool {
        self.given_name.is_none()
            && self.sn.is_none()
            && self.password.is_none()
            && self.ou.is_none()
            && self.groups.is_none()
    }
}

/// Type d'événement du journal de connexions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Connect,
    Disconnect,
    /// Tout autre événement (verrouillage, inventaire...) : ignoré par la
    /// dérivation de sessions
    #[serde(other)]
    Other,
}

/// Entrée brute du journal d'événements (source externe, en lecture seule)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogEntry {
    /// Nom d'utilisateur
    pub user: String,

    /// Type d'événement
    pub event: EventKind,

    /// Adresse IP du poste
    pub ip: String,

    /// Salle de TP
    #[serde(default)]
    pub lab: String,

    /// Horodatage de l'événement (ISO 8601)
    pub date: DateTime<Utc>,

    /// Détails libres
    #[serde(default)]
    pub details: String,
}

/// Statut d'une session dérivée
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
}

/// Session dérivée du journal (jamais persistée, recalculée à chaque lecture)
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Session {
    /// Nom d'utilisateur
    pub username: String,

    /// Adresse IP du poste
    pub ip: String,

    /// Salle de TP (reprise de l'événement de connexion)
    pub lab: String,

    /// Date/heure de connexion
    pub start_time: DateTime<Utc>,

    /// Date/heure de déconnexion (None pour une session active)
    pub end_time: Option<DateTime<Utc>>,

    /// Durée en secondes (pour une session active : now - start_time)
    pub duration: i64,

    /// active ou completed
    pub status: SessionStatus,
}

/// Réponse de l'endpoint GET /api/sessions
#[derive(Debug, Clone, Serialize)]
pub struct SessionsSnapshot {
    pub active_sessions: Vec<Session>,
    pub completed_sessions: Vec<Session>,
}

/// Réponse de suppression d'utilisateur
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Réponse d'erreur retournée au client
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    /// Crée une réponse d'erreur simple
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    /// Crée une réponse d'erreur avec détails
    pub fn with_details(error: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            error: error.into(),
            details: Some(details),
        }
    }
}
