//! # Module des handlers HTTP
//!
//! Définit les endpoints de l'API REST de la passerelle. Chaque route se
//! traduit par exactement une invocation de script d'annuaire ; la sortie
//! est interprétée puis normalisée en réponse JSON.
//!
//! Les listings en succès passent par le cache de réponses ; toute mutation
//! réussie invalide l'entrée de listing concernée avant de répondre.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{
    cache::ResponseCache,
    config::Config,
    models::{DeleteResponse, ErrorResponse, LogEntry, NewUser, User, UserUpdate},
    script::{self, ScriptError, ScriptOutcome, ScriptRunner},
    sessions,
};

/// État partagé de l'application
#[derive(Clone)]
pub struct AppState {
    #[allow(dead_code)] // Conservé pour les évolutions des handlers
    pub config: Config,
    pub scripts: ScriptRunner,
    pub cache: ResponseCache,
}

/// Réponse d'erreur normalisée (statut + enveloppe JSON)
type ApiError = (StatusCode, Json<ErrorResponse>);

/// Construit le routeur de l'API
///
/// Les middlewares (trace, CORS) sont ajoutés par `main` ; les tests
/// utilisent le routeur nu.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        // Utilisateurs : listing, création, modification, suppression
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:username",
            axum::routing::put(update_user).delete(delete_user),
        )
        // Listings annexes
        .route("/api/groups", get(list_groups))
        .route("/api/ous", get(list_ous))
        .route("/api/logs", get(list_logs))
        .route("/api/computers", get(list_computers))
        // Sessions dérivées du journal
        .route("/api/sessions", get(get_sessions))
        // Health check
        .route("/health", get(health_check))
        // Route inconnue : 404 JSON
        .fallback(not_found)
        .with_state(state)
}

// ============================================================================
// AIDES DE NORMALISATION DES RÉPONSES
// ============================================================================

/// Ajoute `Cache-Control: no-store` (les listings sont pollés côté client,
/// aucun intermédiaire ne doit les mémoriser)
fn no_store<T: IntoResponse>(inner: T) -> impl IntoResponse {
    ([(header::CACHE_CONTROL, "no-store")], inner)
}

/// Réponse pour une erreur de lancement de script
///
/// Le timeout est distingué de l'erreur générique : le client doit pouvoir
/// différencier « le script a mis trop longtemps » de « le script a planté ».
fn script_error_response(script: &str, e: &ScriptError) -> ApiError {
    tracing::error!("Erreur d'exécution du script `{}`: {}", script, e);
    match e {
        ScriptError::Timeout { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(ErrorResponse::new("Connection timeout")),
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Script execution failed")),
        ),
    }
}

/// Réponse pour une enveloppe d'erreur émise par le script
///
/// `code: "not_found"` est le seul code traduit en 404 ; tout le reste est
/// une erreur corrigeable côté client (400).
fn rejection_response(error: String, code: Option<String>, details: Option<Value>) -> ApiError {
    let status = if code.as_deref() == Some("not_found") {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::BAD_REQUEST
    };

    let body = match details {
        Some(details) => ErrorResponse::with_details(error, details),
        None => ErrorResponse::new(error),
    };

    (status, Json(body))
}

/// Réponse pour un échec d'exécution sans enveloppe exploitable
fn failure_response(details: String) -> ApiError {
    let body = if details.is_empty() {
        ErrorResponse::new("Script execution failed")
    } else {
        ErrorResponse::with_details("Script execution failed", Value::String(details))
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body))
}

/// Réponse pour une sortie de script valide JSON mais hors schéma
fn invalid_output_response(script: &str, e: &serde_json::Error) -> ApiError {
    tracing::error!("Sortie du script `{}` hors schéma: {}", script, e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("Invalid script output")),
    )
}

fn invalid_identifier_response() -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new("Invalid username format")),
    )
}

// ============================================================================
// LISTINGS (lecture seule, avec cache)
// ============================================================================

/// Exécute un script de listing à travers le cache
///
/// 1. Lecture du cache (la clé est le nom du script)
/// 2. Exécution du script si absent
/// 3. Validation du schéma de la sortie
/// 4. Mise en cache après validation uniquement
async fn cached_listing<T: DeserializeOwned>(
    state: &AppState,
    script_name: &'static str,
) -> Result<T, ApiError> {
    // 1. Lecture du cache
    if let Some(value) = state.cache.get(script_name) {
        match serde_json::from_value::<T>(value) {
            Ok(data) => {
                tracing::debug!("Cache hit: {}", script_name);
                return Ok(data);
            }
            Err(_) => {
                // Entrée inexploitable : on la retire et on repart du script
                state.cache.invalidate(script_name);
            }
        }
    }

    // 2. Exécution du script
    let outcome = state
        .scripts
        .run(script_name, None, None)
        .await
        .map_err(|e| script_error_response(script_name, &e))?;

    // 3. Interprétation et validation
    match outcome {
        ScriptOutcome::Success(value) => {
            let data: T = serde_json::from_value(value.clone())
                .map_err(|e| invalid_output_response(script_name, &e))?;

            // 4. Seules les réponses valides en succès sont mises en cache
            state.cache.put(script_name, value);
            Ok(data)
        }
        ScriptOutcome::Rejected {
            error,
            code,
            details,
        } => Err(rejection_response(error, code, details)),
        ScriptOutcome::Failed { details } => Err(failure_response(details)),
    }
}

/// GET /api/users - Liste des utilisateurs de l'annuaire
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let users: Vec<User> = cached_listing(&state, script::SCRIPT_GET_USERS).await?;
    Ok(no_store(Json(users)))
}

/// GET /api/groups - Liste des groupes
pub async fn list_groups(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let groups: Vec<String> = cached_listing(&state, script::SCRIPT_GET_GROUPS).await?;
    Ok(no_store(Json(groups)))
}

/// GET /api/ous - Liste des unités organisationnelles
pub async fn list_ous(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let ous: Vec<String> = cached_listing(&state, script::SCRIPT_GET_OUS).await?;
    Ok(no_store(Json(ous)))
}

/// GET /api/logs - Journal brut des événements
pub async fn list_logs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let logs: Vec<LogEntry> = cached_listing(&state, script::SCRIPT_GET_LOGS).await?;
    Ok(no_store(Json(logs)))
}

/// GET /api/computers - Inventaire des postes par salle
pub async fn list_computers(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let computers: BTreeMap<String, Vec<String>> =
        cached_listing(&state, script::SCRIPT_GET_COMPUTERS).await?;
    Ok(no_store(Json(computers)))
}

/// GET /api/sessions - Sessions dérivées du journal
///
/// Le journal est lu à travers le même cache que /api/logs ; la dérivation
/// est refaite à chaque appel avec l'horloge courante.
pub async fn get_sessions(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let logs: Vec<LogEntry> = cached_listing(&state, script::SCRIPT_GET_LOGS).await?;
    let snapshot = sessions::derive_sessions(&logs, chrono::Utc::now());
    Ok(no_store(Json(snapshot)))
}

// ============================================================================
// MUTATIONS (invalidation du cache avant réponse)
// ============================================================================

/// POST /api/users - Création d'utilisateur
///
/// 1. Validation de l'identifiant
/// 2. Transmission du payload au script addUser (stdin)
/// 3. Invalidation du listing utilisateurs
/// 4. Écho de l'utilisateur créé (jamais le mot de passe)
pub async fn create_user(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validation de l'identifiant
    if !script::valid_identifier(&new_user.sam_account_name) {
        tracing::warn!("Identifiant refusé: {:?}", new_user.sam_account_name);
        return Err(invalid_identifier_response());
    }

    // 2. Exécution du script
    let payload = serde_json::to_value(&new_user).map_err(|e| {
        tracing::error!("Payload non sérialisable: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Internal error")),
        )
    })?;

    let outcome = state
        .scripts
        .run(script::SCRIPT_ADD_USER, None, Some(&payload))
        .await
        .map_err(|e| script_error_response(script::SCRIPT_ADD_USER, &e))?;

    match outcome {
        ScriptOutcome::Success(value) => {
            // 3. Invalidation du listing avant de répondre : aucune lecture
            // ne doit servir la liste d'avant la création
            state.cache.invalidate(script::SCRIPT_GET_USERS);

            // 4. Écho typé
            let user: User = serde_json::from_value(value)
                .map_err(|e| invalid_output_response(script::SCRIPT_ADD_USER, &e))?;

            tracing::info!("Utilisateur créé: {}", user.sam_account_name);
            Ok(Json(user))
        }
        ScriptOutcome::Rejected {
            error,
            code,
            details,
        } => Err(rejection_response(error, code, details)),
        ScriptOutcome::Failed { details } => Err(failure_response(details)),
    }
}

/// PUT /api/users/:username - Mise à jour partielle
pub async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Json(update): Json<UserUpdate>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validation de l'identifiant
    if !script::valid_identifier(&username) {
        tracing::warn!("Identifiant refusé: {:?}", username);
        return Err(invalid_identifier_response());
    }

    // 2. Une mise à jour vide n'a pas de sens
    if update.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("No fields to update")),
        ));
    }

    // 3. Payload stdin : champs présents + identifiant cible
    let mut payload = serde_json::to_value(&update).map_err(|e| {
        tracing::error!("Payload non sérialisable: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Internal error")),
        )
    })?;
    if let Some(fields) = payload.as_object_mut() {
        fields.insert(
            "samAccountName".to_string(),
            Value::String(username.clone()),
        );
    }

    // 4. Exécution du script
    let outcome = state
        .scripts
        .run(script::SCRIPT_EDIT_USER, None, Some(&payload))
        .await
        .map_err(|e| script_error_response(script::SCRIPT_EDIT_USER, &e))?;

    match outcome {
        ScriptOutcome::Success(value) => {
            // 5. Invalidation du listing avant de répondre
            state.cache.invalidate(script::SCRIPT_GET_USERS);
            tracing::info!("Utilisateur modifié: {}", username);
            Ok(Json(value))
        }
        ScriptOutcome::Rejected {
            error,
            code,
            details,
        } => Err(rejection_response(error, code, details)),
        ScriptOutcome::Failed { details } => Err(failure_response(details)),
    }
}

/// DELETE /api/users/:username - Suppression d'utilisateur
pub async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Validation de l'identifiant (seul cas où une valeur atteint la
    // ligne de commande)
    if !script::valid_identifier(&username) {
        tracing::warn!("Identifiant refusé: {:?}", username);
        return Err(invalid_identifier_response());
    }

    // 2. Exécution du script
    let outcome = state
        .scripts
        .run(script::SCRIPT_DELETE_USER, Some(&username), None)
        .await
        .map_err(|e| script_error_response(script::SCRIPT_DELETE_USER, &e))?;

    match outcome {
        ScriptOutcome::Success(value) => {
            // 3. Invalidation du listing avant de répondre
            state.cache.invalidate(script::SCRIPT_GET_USERS);

            let message = value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Utilisateur supprimé")
                .to_string();

            tracing::info!("Utilisateur supprimé: {}", username);
            Ok(Json(DeleteResponse {
                success: true,
                message,
            }))
        }
        ScriptOutcome::Rejected {
            error,
            code,
            details,
        } => Err(rejection_response(error, code, details)),
        ScriptOutcome::Failed { details } => Err(failure_response(details)),
    }
}

// ============================================================================
// DIVERS
// ============================================================================

/// Health check endpoint (GET /health)
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "gestad-serveur",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Fallback : route inconnue
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new("Not found")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{
        CacheConfig, LoggingConfig, ScriptsConfig, SecurityConfig, ServerConfig,
    };
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tower::ServiceExt;

    /// Matérialise un script stub exécutable dans le répertoire de test
    fn stub_script(dir: &std::path::Path, name: &str, body: &str) {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("écriture du stub");
        let mut perms = std::fs::metadata(&path).expect("métadonnées").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod du stub");
    }

    fn test_state(dir: PathBuf, timeout_secs: u64) -> AppState {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            scripts: ScriptsConfig {
                dir: dir.display().to_string(),
                timeout_secs,
            },
            cache: CacheConfig { ttl_secs: 30 },
            security: SecurityConfig {
                allowed_origin: "http://localhost:8080".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "compact".to_string(),
            },
        };

        AppState {
            scripts: ScriptRunner::new(config.scripts.dir_buf(), config.scripts.timeout()),
            cache: ResponseCache::new(config.cache.ttl()),
            config,
        }
    }

    async fn call(
        router: Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = match body {
            Some(json) => Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("requête de test"),
            None => Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .expect("requête de test"),
        };

        let response = router.oneshot(request).await.expect("réponse du routeur");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("corps de réponse")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("corps JSON")
        };
        (status, value)
    }

    #[tokio::test]
    async fn creation_utilisateur_echo_sans_mot_de_passe() {
        let dir = tempfile::tempdir().expect("tempdir");
        stub_script(
            dir.path(),
            "addUser",
            r#"cat > /dev/null
echo '{"samAccountName":"AL999","givenName":"Test","sn":"User","ou":"CC","groups":["Estudiante"]}'"#,
        );
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(
            api_router(state),
            "POST",
            "/api/users",
            Some(json!({
                "samAccountName": "AL999",
                "givenName": "Test",
                "sn": "User",
                "password": "Abcd1234",
                "ou": "CC",
                "groups": ["Estudiante"]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["samAccountName"], "AL999");
        assert_eq!(body["groups"], json!(["Estudiante"]));
        assert!(body.get("password").is_none());
    }

    #[tokio::test]
    async fn creation_doublon_renvoie_l_erreur_du_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        stub_script(
            dir.path(),
            "addUser",
            r#"cat > /dev/null
echo '{"error":"ya existe"}'"#,
        );
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(
            api_router(state),
            "POST",
            "/api/users",
            Some(json!({
                "samAccountName": "AL999",
                "givenName": "Test",
                "sn": "User",
                "password": "Abcd1234",
                "ou": "CC",
                "groups": ["Estudiante"]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ya existe");
    }

    #[tokio::test]
    async fn listing_mis_en_cache_puis_invalide_par_suppression() {
        let dir = tempfile::tempdir().expect("tempdir");
        let count_file = dir.path().join("count");
        stub_script(
            dir.path(),
            "getUsers",
            &format!(
                r#"printf x >> "{}"
echo '[{{"samAccountName":"AL001","givenName":"Ana","sn":"Lopez","ou":"CC","groups":[]}}]'"#,
                count_file.display()
            ),
        );
        stub_script(
            dir.path(),
            "deleteUser",
            r#"echo '{"success":true,"message":"eliminado"}'"#,
        );
        let state = test_state(dir.path().to_path_buf(), 5);
        let executions = || {
            std::fs::read_to_string(&count_file)
                .map(|s| s.len())
                .unwrap_or(0)
        };

        // Deux lectures successives : une seule exécution du script
        let (status, _) = call(api_router(state.clone()), "GET", "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(api_router(state.clone()), "GET", "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(executions(), 1);

        // La suppression invalide le cache : la lecture suivante ne doit
        // pas servir la liste d'avant la suppression
        let (status, body) = call(
            api_router(state.clone()),
            "DELETE",
            "/api/users/AL001",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "eliminado");

        let (status, _) = call(api_router(state), "GET", "/api/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(executions(), 2);
    }

    #[tokio::test]
    async fn script_en_echec_sortie_illisible_donne_500() {
        let dir = tempfile::tempdir().expect("tempdir");
        stub_script(
            dir.path(),
            "getUsers",
            r#"echo "Died at line 42" >&2
exit 1"#,
        );
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(api_router(state), "GET", "/api/users", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Script execution failed");
        assert_eq!(body["details"], "Died at line 42");
    }

    #[tokio::test]
    async fn timeout_distinct_de_l_erreur_generique() {
        let dir = tempfile::tempdir().expect("tempdir");
        stub_script(dir.path(), "getUsers", "sleep 5\necho '[]'");
        let state = test_state(dir.path().to_path_buf(), 1);

        let (status, body) = call(api_router(state), "GET", "/api/users", None).await;

        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"], "Connection timeout");
    }

    #[tokio::test]
    async fn identifiant_invalide_rejete_avant_execution() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Aucun script : la validation doit couper avant le lancement
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(
            api_router(state),
            "DELETE",
            "/api/users/al%20001",
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid username format");
    }

    #[tokio::test]
    async fn modification_utilisateur_inconnu_donne_404() {
        let dir = tempfile::tempdir().expect("tempdir");
        stub_script(
            dir.path(),
            "editUser",
            r#"cat > /dev/null
echo '{"error":"usuario no encontrado","code":"not_found"}'"#,
        );
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(
            api_router(state),
            "PUT",
            "/api/users/AL999",
            Some(json!({"ou": "INF"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "usuario no encontrado");
    }

    #[tokio::test]
    async fn modification_vide_rejetee() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(
            api_router(state),
            "PUT",
            "/api/users/AL001",
            Some(json!({})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No fields to update");
    }

    #[tokio::test]
    async fn sessions_derivees_du_journal() {
        let dir = tempfile::tempdir().expect("tempdir");
        stub_script(
            dir.path(),
            "getLogs",
            r#"echo '[
  {"user":"AL001","event":"connect","ip":"10.0.1.15","lab":"B12","date":"2025-03-10T08:00:00Z","details":""},
  {"user":"AL001","event":"disconnect","ip":"10.0.1.15","lab":"B12","date":"2025-03-10T09:00:00Z","details":""},
  {"user":"AL002","event":"connect","ip":"10.0.1.16","lab":"B12","date":"2025-03-10T08:30:00Z","details":""}
]'"#,
        );
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(api_router(state), "GET", "/api/sessions", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completed_sessions"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["completed_sessions"][0]["duration"], 3600);
        assert_eq!(body["active_sessions"].as_array().map(Vec::len), Some(1));
        assert_eq!(body["active_sessions"][0]["username"], "AL002");
    }

    #[tokio::test]
    async fn route_inconnue_donne_404_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(api_router(state), "GET", "/api/inconnu", None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn listing_groupes_et_postes_types() {
        let dir = tempfile::tempdir().expect("tempdir");
        stub_script(
            dir.path(),
            "getGroups",
            r#"echo '["Estudiante","Profesor"]'"#,
        );
        stub_script(
            dir.path(),
            "getComputers",
            r#"echo '{"B12":["pc-b12-01","pc-b12-02"],"B14":["pc-b14-01"]}'"#,
        );
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(api_router(state.clone()), "GET", "/api/groups", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["Estudiante", "Profesor"]));

        let (status, body) = call(api_router(state), "GET", "/api/computers", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["B12"], json!(["pc-b12-01", "pc-b12-02"]));
    }

    #[tokio::test]
    async fn listing_hors_schema_donne_500() {
        let dir = tempfile::tempdir().expect("tempdir");
        // JSON valide mais pas un tableau d'utilisateurs
        stub_script(dir.path(), "getUsers", r#"echo '{"foo": 1}'"#);
        let state = test_state(dir.path().to_path_buf(), 5);

        let (status, body) = call(api_router(state), "GET", "/api/users", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Invalid script output");
    }
}
