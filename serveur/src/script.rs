//! # Module d'invocation des scripts d'annuaire
//!
//! Gère le lancement des exécutables externes (getUsers, addUser, ...),
//! le passage du payload JSON sur l'entrée standard et l'interprétation
//! de leur sortie.
//!
//! Les noms de scripts sont centralisés ici sous forme de constantes
//! préfixées par `SCRIPT_` : une constante = tous les usages (routes et
//! clés de cache).

use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

// ============================================================================
// NOMS DES SCRIPTS EXTERNES
// ============================================================================

/// Listing des utilisateurs. Sert aussi de clé de cache, invalidée par
/// addUser/editUser/deleteUser.
pub const SCRIPT_GET_USERS: &str = "getUsers";

/// Listing des groupes
pub const SCRIPT_GET_GROUPS: &str = "getGroups";

/// Listing des unités organisationnelles
pub const SCRIPT_GET_OUS: &str = "getOus";

/// Journal brut des événements de connexion/déconnexion
pub const SCRIPT_GET_LOGS: &str = "getLogs";

/// Inventaire des postes par salle
pub const SCRIPT_GET_COMPUTERS: &str = "getComputers";

/// Création d'utilisateur (payload JSON sur stdin)
pub const SCRIPT_ADD_USER: &str = "addUser";

/// Modification d'utilisateur (payload JSON sur stdin)
pub const SCRIPT_EDIT_USER: &str = "editUser";

/// Suppression d'utilisateur (identifiant en argument)
pub const SCRIPT_DELETE_USER: &str = "deleteUser";

// ============================================================================
// VALIDATION DES IDENTIFIANTS
// ============================================================================

/// Vérifie qu'un identifiant peut être passé en argument de script
///
/// Jeu de caractères autorisé : alphanumériques, point, tiret, tiret bas.
/// Tout le reste est rejeté avant d'atteindre le shell.
pub fn valid_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= 64
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_')
}

// ============================================================================
// INTERPRÉTATION DE LA SORTIE
// ============================================================================

/// Résultat interprété d'une exécution de script
///
/// Les quatre branches (échec d'exécution + sortie illisible, échec + JSON
/// d'erreur, succès + JSON d'erreur, succès + JSON propre) sont rendues
/// explicites par ce type au lieu d'une chaîne de try/catch.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptOutcome {
    /// Sortie JSON propre, sans champ `error`
    Success(Value),

    /// Le script a émis une enveloppe d'erreur `{error, code?, details?}`
    Rejected {
        error: String,
        code: Option<String>,
        details: Option<Value>,
    },

    /// Échec d'exécution sans enveloppe exploitable (stderr en détails)
    Failed { details: String },
}

/// Interprète la sortie d'un script selon son statut d'exécution
///
/// La sortie standard est parsée en JSON quel que soit le code de retour :
/// un script peut émettre une enveloppe d'erreur tout en sortant en échec.
pub fn interpret_output(exec_ok: bool, stdout: &[u8], stderr: &[u8]) -> ScriptOutcome {
    let parsed: Result<Value, _> = serde_json::from_slice(stdout);

    match parsed {
        Ok(value) => {
            if let Some(error) = value.get("error").and_then(Value::as_str) {
                return ScriptOutcome::Rejected {
                    error: error.to_string(),
                    code: value
                        .get("code")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    details: value.get("details").cloned(),
                };
            }

            if exec_ok {
                ScriptOutcome::Success(value)
            } else {
                // Script mort sans enveloppe d'erreur : le payload n'est pas
                // digne de confiance
                ScriptOutcome::Failed {
                    details: String::from_utf8_lossy(stderr).trim().to_string(),
                }
            }
        }
        Err(_) => ScriptOutcome::Failed {
            details: String::from_utf8_lossy(stderr).trim().to_string(),
        },
    }
}

// ============================================================================
// LANCEUR DE SCRIPTS
// ============================================================================

/// Erreurs de lancement d'un script
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Impossible de lancer le script `{script}`: {source}")]
    Spawn {
        script: String,
        source: std::io::Error,
    },

    #[error("Erreur d'entrée/sortie avec le script `{script}`: {source}")]
    Io {
        script: String,
        source: std::io::Error,
    },

    #[error("Délai d'exécution dépassé pour le script `{script}`")]
    Timeout { script: String },
}

/// Lanceur de scripts d'annuaire
///
/// Chaque requête lance un processus indépendant ; aucun état partagé
/// entre exécutions concurrentes.
#[derive(Clone)]
pub struct ScriptRunner {
    dir: PathBuf,
    timeout: Duration,
}

impl ScriptRunner {
    /// Crée un lanceur pour le répertoire de scripts donné
    pub fn new(dir: PathBuf, timeout: Duration) -> Self {
        Self { dir, timeout }
    }

    /// Exécute un script et interprète sa sortie
    ///
    /// # Arguments
    /// * `script` - Nom de l'exécutable (constante `SCRIPT_*`)
    /// * `arg` - Argument de ligne de commande optionnel (déjà validé par
    ///   [`valid_identifier`])
    /// * `stdin_json` - Payload JSON optionnel transmis sur stdin
    ///
    /// # Erreurs
    /// Retourne une erreur de lancement, d'entrée/sortie ou de timeout ;
    /// l'interprétation logique de la sortie passe par [`ScriptOutcome`].
    pub async fn run(
        &self,
        script: &str,
        arg: Option<&str>,
        stdin_json: Option<&Value>,
    ) -> Result<ScriptOutcome, ScriptError> {
        let path = self.dir.join(script);

        let mut command = Command::new(&path);
        if let Some(arg) = arg {
            command.arg(arg);
        }
        command
            .stdin(if stdin_json.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Le processus est tué si le future est abandonné (timeout)
            .kill_on_drop(true);

        let mut child = command.spawn().map_err(|source| ScriptError::Spawn {
            script: script.to_string(),
            source,
        })?;

        // Transmission du payload sur stdin, puis fermeture du flux pour
        // que le script voie la fin d'entrée
        if let Some(payload) = stdin_json {
            let mut stdin = child.stdin.take().ok_or_else(|| ScriptError::Io {
                script: script.to_string(),
                source: std::io::Error::other("stdin du processus indisponible"),
            })?;

            let bytes = serde_json::to_vec(payload).map_err(|e| ScriptError::Io {
                script: script.to_string(),
                source: std::io::Error::other(e),
            })?;

            stdin
                .write_all(&bytes)
                .await
                .map_err(|source| ScriptError::Io {
                    script: script.to_string(),
                    source,
                })?;
            drop(stdin);
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ScriptError::Timeout {
                script: script.to_string(),
            })?
            .map_err(|source| ScriptError::Io {
                script: script.to_string(),
                source,
            })?;

        tracing::debug!(
            "Script `{}` terminé (succès={}, stdout={} octets)",
            script,
            output.status.success(),
            output.stdout.len()
        );

        Ok(interpret_output(
            output.status.success(),
            &output.stdout,
            &output.stderr,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identifiants_valides() {
        assert!(valid_identifier("AL001"));
        assert!(valid_identifier("jean.dupont"));
        assert!(valid_identifier("al-001_b"));
    }

    #[test]
    fn identifiants_invalides() {
        assert!(!valid_identifier(""));
        assert!(!valid_identifier("al 001"));
        assert!(!valid_identifier("al;rm -rf /"));
        assert!(!valid_identifier("été"));
        assert!(!valid_identifier(&"a".repeat(65)));
    }

    #[test]
    fn succes_et_json_propre() {
        let outcome = interpret_output(true, br#"[{"samAccountName":"AL001"}]"#, b"");
        assert_eq!(
            outcome,
            ScriptOutcome::Success(json!([{"samAccountName": "AL001"}]))
        );
    }

    #[test]
    fn succes_mais_enveloppe_d_erreur() {
        let outcome = interpret_output(true, br#"{"error":"ya existe"}"#, b"");
        assert_eq!(
            outcome,
            ScriptOutcome::Rejected {
                error: "ya existe".to_string(),
                code: None,
                details: None,
            }
        );
    }

    #[test]
    fn echec_avec_enveloppe_d_erreur() {
        // Même en échec d'exécution, une enveloppe d'erreur JSON est
        // restituée telle quelle
        let outcome = interpret_output(
            false,
            br#"{"error":"usuario no encontrado","code":"not_found","details":"cn=AL999"}"#,
            b"stack trace",
        );
        assert_eq!(
            outcome,
            ScriptOutcome::Rejected {
                error: "usuario no encontrado".to_string(),
                code: Some("not_found".to_string()),
                details: Some(json!("cn=AL999")),
            }
        );
    }

    #[test]
    fn echec_et_sortie_illisible() {
        let outcome = interpret_output(false, b"Died at line 42\n", b"  Perl error  ");
        assert_eq!(
            outcome,
            ScriptOutcome::Failed {
                details: "Perl error".to_string(),
            }
        );
    }

    #[test]
    fn echec_avec_json_propre_reste_un_echec() {
        // Un script mort sans enveloppe d'erreur n'est pas cru sur parole
        let outcome = interpret_output(false, br#"[{"samAccountName":"AL001"}]"#, b"oom");
        assert_eq!(
            outcome,
            ScriptOutcome::Failed {
                details: "oom".to_string(),
            }
        );
    }

    #[test]
    fn succes_mais_sortie_non_json() {
        let outcome = interpret_output(true, b"pas du json", b"");
        assert_eq!(
            outcome,
            ScriptOutcome::Failed {
                details: String::new(),
            }
        );
    }

    #[tokio::test]
    async fn script_inexistant_erreur_de_lancement() {
        let runner = ScriptRunner::new(
            PathBuf::from("/nonexistent/scripts"),
            Duration::from_secs(1),
        );
        let result = runner.run("getUsers", None, None).await;
        assert!(matches!(result, Err(ScriptError::Spawn { .. })));
    }
}
