//! # Module de configuration
//!
//! Charge et valide la configuration depuis le fichier `config.toml`.
//! Utilise serde pour désérialiser automatiquement le TOML en structures Rust.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration complète du serveur
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub scripts: ScriptsConfig,
    pub cache: CacheConfig,
    pub security: SecurityConfig,
    #[allow(dead_code)] // Logging prévu pour évolutions futures
    pub logging: LoggingConfig,
}

/// Configuration du serveur HTTP
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Adresse d'écoute (ex: "127.0.0.1")
    pub host: String,
    /// Port d'écoute (ex: 3000)
    pub port: u16,
}

/// Configuration des scripts d'annuaire externes
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsConfig {
    /// Répertoire contenant les exécutables (getUsers, addUser, ...)
    pub dir: String,
    /// Délai maximum d'exécution d'un script (en secondes)
    pub timeout_secs: u64,
}

impl ScriptsConfig {
    /// Retourne le répertoire des scripts en PathBuf (multi-plateforme)
    ///
    /// Convertit le chemin TOML en PathBuf natif du système d'exploitation.
    /// Gère automatiquement les séparateurs Windows (\) et Unix (/).
    pub fn dir_buf(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }

    /// Retourne le délai d'exécution en Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Configuration du cache de réponses
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Durée de vie d'une entrée de cache (en secondes)
    pub ttl_secs: u64,
}

impl CacheConfig {
    /// Retourne la durée de vie en Duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Configuration de sécurité
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Origine CORS autorisée pour l'interface web (ex: "http://localhost:8080")
    pub allowed_origin: String,
}

/// Configuration du logging (prévu pour personnalisation future)
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Niveau de log (trace, debug, info, warn, error)
    #[allow(dead_code)] // API complète pour évolutions futures
    pub level: String,
    /// Format (compact, full)
    #[allow(dead_code)] // API complète pour évolutions futures
    pub format: String,
}

impl Config {
    /// Charge la configuration depuis un fichier TOML
    ///
    /// # Arguments
    /// * `path` - Chemin vers le fichier config.toml
    ///
    /// # Erreurs
    /// Retourne une erreur si le fichier n'existe pas ou si le format est invalide
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Retourne l'adresse complète d'écoute (host:port)
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Valide la cohérence de la configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Vérifier que le port est dans une plage valide
        if self.server.port == 0 {
            return Err(ConfigError::InvalidPort);
        }

        // Vérifier que le répertoire des scripts est renseigné
        if self.scripts.dir.trim().is_empty() {
            return Err(ConfigError::EmptyScriptsDir);
        }

        // Un timeout nul bloquerait toutes les requêtes
        if self.scripts.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }
}

/// Erreurs de configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Impossible de lire le fichier de configuration: {0}")]
    FileRead(String),

    #[error("Erreur de parsing TOML: {0}")]
    Parse(String),

    #[error("Port invalide")]
    InvalidPort,

    #[error("Répertoire des scripts non renseigné")]
    EmptyScriptsDir,

    #[error("Timeout des scripts invalide (doit être > 0)")]
    InvalidTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_minimale(port: u16, dir: &str, timeout: u64) -> Config {
        Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port,
            },
            scripts: ScriptsConfig {
                dir: dir.to_string(),
                timeout_secs: timeout,
            },
            cache: CacheConfig { ttl_secs: 30 },
            security: SecurityConfig {
                allowed_origin: "http://localhost:8080".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepte_une_configuration_complete() {
        assert!(config_minimale(3000, "/opt/annuaire/scripts", 8)
            .validate()
            .is_ok());
    }

    #[test]
    fn validate_rejette_port_nul() {
        assert!(matches!(
            config_minimale(0, "/opt/annuaire/scripts", 8).validate(),
            Err(ConfigError::InvalidPort)
        ));
    }

    #[test]
    fn validate_rejette_repertoire_vide() {
        assert!(matches!(
            config_minimale(3000, "   ", 8).validate(),
            Err(ConfigError::EmptyScriptsDir)
        ));
    }

    #[test]
    fn validate_rejette_timeout_nul() {
        assert!(matches!(
            config_minimale(3000, "/opt/annuaire/scripts", 0).validate(),
            Err(ConfigError::InvalidTimeout)
        ));
    }

    #[test]
    fn parse_toml_complet() {
        let toml = r#"
            [server]
            host = "0.0.0.0"
            port = 3000

            [scripts]
            dir = "/opt/annuaire/scripts"
            timeout_secs = 8

            [cache]
            ttl_secs = 30

            [security]
            allowed_origin = "http://localhost:8080"

            [logging]
            level = "info"
            format = "compact"
        "#;

        let config: Config = toml::from_str(toml).expect("TOML valide");
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
        assert_eq!(config.scripts.timeout(), Duration::from_secs(8));
        assert_eq!(config.cache.ttl(), Duration::from_secs(30));
    }
}
