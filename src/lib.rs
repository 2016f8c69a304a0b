//! # Gestad - Librairie cliente
//!
//! Cette librairie contient la logique commune utilisée par les binaires
//! (importcsv, moniteur) pour dialoguer avec la passerelle d'administration :
//! client HTTP, moteur d'opérations par lots, validation d'import CSV et
//! polling générique.

// Déclaration des modules externes
pub mod batch;
pub mod config;
pub mod import;
pub mod poll;

/// Module de gestion des requêtes HTTP vers la passerelle
pub mod http_client {
    use crate::config;
    use crate::data_structures::{
        DeleteResult, LogRecord, NewUser, SessionsSnapshot, UserRecord, UserUpdate,
    };
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use std::time::Duration;

    /// Erreurs du client HTTP
    ///
    /// Le timeout est une variante distincte : l'interface doit pouvoir
    /// afficher « délai de connexion dépassé » plutôt qu'une erreur serveur
    /// générique.
    #[derive(Debug, thiserror::Error)]
    pub enum ClientError {
        #[error("délai de connexion dépassé")]
        Timeout,

        #[error("erreur réseau: {0}")]
        Network(String),

        #[error("erreur API (HTTP {status}): {error}")]
        Api { status: i32, error: String },

        #[error("réponse invalide: {0}")]
        InvalidResponse(String),
    }

    /// Client HTTP pour dialoguer avec la passerelle d'administration
    pub struct AdminClient {
        base_url: String,
        timeout: u64,
    }

    impl AdminClient {
        /// Crée une nouvelle instance du client HTTP
        pub fn new(server_url: Option<String>) -> Self {
            let base_url = server_url.unwrap_or_else(|| config::DEFAULT_SERVER_URL.to_string());
            Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                timeout: config::DEFAULT_TIMEOUT,
            }
        }

        /// Remplace le timeout par défaut (en secondes)
        pub fn with_timeout(mut self, secs: u64) -> Self {
            self.timeout = secs;
            self
        }

        /// Classe une erreur minreq : timeout ou erreur réseau générique
        fn classify(e: minreq::Error) -> ClientError {
            match e {
                minreq::Error::IoError(io)
                    if matches!(
                        io.kind(),
                        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
                    ) =>
                {
                    ClientError::Timeout
                }
                other => ClientError::Network(other.to_string()),
            }
        }

        /// Interprète une réponse HTTP : payload typé ou enveloppe d'erreur
        fn handle_response<T: DeserializeOwned>(
            response: minreq::Response,
        ) -> Result<T, ClientError> {
            let status = response.status_code;

            if (200..300).contains(&status) {
                return response
                    .json::<T>()
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()));
            }

            // La passerelle répond toujours {error, details?} en échec
            let error = response
                .json::<Value>()
                .ok()
                .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| response.reason_phrase.clone());

            Err(ClientError::Api { status, error })
        }

        /// GET avec retry borné (lectures idempotentes uniquement)
        fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
            let url = format!("{}{}", self.base_url, path);
            let mut last_error = ClientError::Network("aucune tentative effectuée".to_string());

            for attempt in 1..=config::MAX_RETRIES {
                match minreq::get(&url)
                    .with_header("User-Agent", config::USER_AGENT)
                    .with_timeout(self.timeout)
                    .send()
                {
                    Ok(response) => return Self::handle_response(response),
                    Err(e) => {
                        let error = Self::classify(e);
                        eprintln!(
                            "Erreur réseau (tentative {}/{}): {}",
                            attempt,
                            config::MAX_RETRIES,
                            error
                        );
                        last_error = error;
                    }
                }

                if attempt < config::MAX_RETRIES {
                    std::thread::sleep(Duration::from_millis(config::RETRY_DELAY_MS));
                }
            }

            Err(last_error)
        }

        /// Envoie une mutation (une seule tentative : non idempotente)
        fn send_mutation(&self, request: minreq::Request) -> Result<Value, ClientError> {
            let response = request.send().map_err(Self::classify)?;
            Self::handle_response(response)
        }

        /// Liste des utilisateurs de l'annuaire
        pub fn list_users(&self) -> Result<Vec<UserRecord>, ClientError> {
            self.get_json("/api/users")
        }

        /// Liste des groupes
        pub fn list_groups(&self) -> Result<Vec<String>, ClientError> {
            self.get_json("/api/groups")
        }

        /// Liste des unités organisationnelles
        pub fn list_ous(&self) -> Result<Vec<String>, ClientError> {
            self.get_json("/api/ous")
        }

        /// Journal brut des événements de connexion
        pub fn list_logs(&self) -> Result<Vec<LogRecord>, ClientError> {
            self.get_json("/api/logs")
        }

        /// Sessions dérivées (actives + terminées)
        pub fn get_sessions(&self) -> Result<SessionsSnapshot, ClientError> {
            self.get_json("/api/sessions")
        }

        /// Création d'utilisateur ; retourne l'écho de la passerelle
        pub fn create_user(&self, user: &NewUser) -> Result<Value, ClientError> {
            let request = minreq::post(format!("{}/api/users", self.base_url))
                .with_header("User-Agent", config::USER_AGENT)
                .with_header("Content-Type", "application/json")
                .with_timeout(self.timeout)
                .with_json(user)
                .map_err(Self::classify)?;

            self.send_mutation(request)
        }

        /// Mise à jour partielle d'un utilisateur
        pub fn update_user(
            &self,
            username: &str,
            update: &UserUpdate,
        ) -> Result<Value, ClientError> {
            let request = minreq::put(format!("{}/api/users/{}", self.base_url, username))
                .with_header("User-Agent", config::USER_AGENT)
                .with_header("Content-Type", "application/json")
                .with_timeout(self.timeout)
                .with_json(update)
                .map_err(Self::classify)?;

            self.send_mutation(request)
        }

        /// Changement de mot de passe (cas particulier de la mise à jour)
        pub fn change_password(
            &self,
            username: &str,
            new_password: &str,
        ) -> Result<Value, ClientError> {
            let update = UserUpdate {
                password: Some(new_password.to_string()),
                ..UserUpdate::default()
            };
            self.update_user(username, &update)
        }

        /// Suppression d'un utilisateur
        pub fn delete_user(&self, username: &str) -> Result<DeleteResult, ClientError> {
            let request = minreq::delete(format!("{}/api/users/{}", self.base_url, username))
                .with_header("User-Agent", config::USER_AGENT)
                .with_timeout(self.timeout);

            let response = request.send().map_err(Self::classify)?;
            Self::handle_response(response)
        }
    }
}

/// Module des structures de données
pub mod data_structures {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::time::Instant;

    /// Utilisateur tel que listé par la passerelle (jamais de mot de passe)
    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    pub struct UserRecord {
        pub sam_account_name: String,
        pub given_name: String,
        pub sn: String,
        #[serde(default)]
        pub ou: String,
        #[serde(default)]
        pub groups: Vec<String>,
    }

    /// Demande de création d'utilisateur
    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct NewUser {
        pub sam_account_name: String,
        pub given_name: String,
        pub sn: String,
        pub password: String,
        pub ou: String,
        pub groups: Vec<String>,
    }

    /// Mise à jour partielle (seuls les champs présents sont transmis)
    #[derive(Debug, Clone, Default, Serialize)]
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

    /// Réponse de suppression
    #[derive(Debug, Clone, Deserialize)]
    pub struct DeleteResult {
        pub success: bool,
        pub message: String,
    }

    /// Entrée brute du journal d'événements
    #[derive(Debug, Clone, Deserialize)]
    pub struct LogRecord {
        pub user: String,
        pub event: String,
        pub ip: String,
        #[serde(default)]
        pub lab: String,
        pub date: DateTime<Utc>,
        #[serde(default)]
        pub details: String,
    }

    /// Session dérivée renvoyée par GET /api/sessions
    #[derive(Debug, Clone, Deserialize)]
    pub struct SessionInfo {
        pub username: String,
        pub ip: String,
        #[serde(default)]
        pub lab: String,
        pub start_time: DateTime<Utc>,
        pub end_time: Option<DateTime<Utc>>,
        pub duration: i64,
        pub status: String,
    }

    /// Réponse complète de GET /api/sessions
    #[derive(Debug, Clone, Deserialize)]
    pub struct SessionsSnapshot {
        pub active_sessions: Vec<SessionInfo>,
        pub completed_sessions: Vec<SessionInfo>,
    }

    /// Session active ancrée localement au moment de la lecture
    ///
    /// La durée affichée se recalcule par rapport à l'ancre locale, sans
    /// redemander le serveur : durée serveur + temps écoulé depuis la
    /// lecture. Elle est donc croissante tant que la session reste active.
    #[derive(Debug, Clone)]
    pub struct AnchoredSession {
        pub info: SessionInfo,
        anchor: Instant,
    }

    impl AnchoredSession {
        /// Ancre une session au moment présent
        pub fn new(info: SessionInfo) -> Self {
            Self {
                info,
                anchor: Instant::now(),
            }
        }

        /// Durée courante en secondes
        pub fn duration_now(&self) -> i64 {
            self.duration_at(Instant::now())
        }

        /// Durée à un instant donné (pour les tests)
        pub fn duration_at(&self, now: Instant) -> i64 {
            self.info.duration + now.saturating_duration_since(self.anchor).as_secs() as i64
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::time::Duration;

        fn session_active(duration: i64) -> SessionInfo {
            SessionInfo {
                username: "AL001".to_string(),
                ip: "10.0.1.15".to_string(),
                lab: "B12".to_string(),
                start_time: "2025-03-10T08:00:00Z".parse().expect("date valide"),
                end_time: None,
                duration,
                status: "active".to_string(),
            }
        }

        #[test]
        fn duree_ancree_croissante() {
            let anchored = AnchoredSession::new(session_active(120));
            let t0 = anchored.anchor;

            let d1 = anchored.duration_at(t0 + Duration::from_secs(10));
            let d2 = anchored.duration_at(t0 + Duration::from_secs(25));

            assert_eq!(d1, 130);
            assert_eq!(d2, 145);
            assert!(d2 >= d1);
        }

        #[test]
        fn duree_ancree_jamais_inferieure_a_la_duree_serveur() {
            let anchored = AnchoredSession::new(session_active(120));
            // Une horloge antérieure à l'ancre ne fait pas reculer la durée
            assert_eq!(anchored.duration_at(anchored.anchor), 120);
        }

        #[test]
        fn desserialisation_snapshot() {
            let json = r#"{
                "active_sessions": [{
                    "username": "AL001", "ip": "10.0.1.15", "lab": "B12",
                    "start_time": "2025-03-10T08:00:00Z", "end_time": null,
                    "duration": 60, "status": "active"
                }],
                "completed_sessions": []
            }"#;

            let snapshot: SessionsSnapshot =
                serde_json::from_str(json).expect("désérialisation snapshot");
            assert_eq!(snapshot.active_sessions.len(), 1);
            assert_eq!(snapshot.active_sessions[0].duration, 60);
        }
    }
}

/// Module des utilitaires communs
pub mod utils {
    /// Génère un timestamp au format ISO 8601 UTC
    pub fn get_current_timestamp() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    /// Vérifie qu'un identifiant est acceptable par la passerelle
    ///
    /// Même jeu de caractères que côté serveur : alphanumériques, point,
    /// tiret, tiret bas.
    pub fn valid_identifier(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= 64
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
    }

}
