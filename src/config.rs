//! # Configuration centralisée du projet Gestad
//!
//! Ce module contient toutes les constantes de configuration utilisées
//! par la librairie cliente et les différents binaires du projet.

/// URL par défaut de la passerelle d'administration
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Timeout par défaut pour les requêtes HTTP (en secondes)
pub const DEFAULT_TIMEOUT: u64 = 8;

/// Nombre maximum de tentatives pour les lectures (GET idempotents)
pub const MAX_RETRIES: u32 = 3;

/// User-Agent utilisé pour les requêtes HTTP
pub const USER_AGENT: &str = "Gestad/0.2.0";

/// Délai entre les tentatives de retry (en millisecondes)
pub const RETRY_DELAY_MS: u64 = 1000;

/// Intervalle de base du polling des sessions (en secondes)
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Facteur multiplicatif du backoff en cas d'erreur de polling
pub const POLL_BACKOFF_FACTOR: u32 = 2;

/// Intervalle maximum atteint par le backoff (en secondes)
pub const POLL_MAX_INTERVAL_SECS: u64 = 60;
