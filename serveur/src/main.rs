//! # Passerelle d'administration AD (Rust/Axum)
//!
//! Serveur HTTP traduisant les requêtes de l'interface web en invocations
//! des scripts d'annuaire (getUsers, addUser, deleteUser, ...) et
//! normalisant leurs sorties JSON.
//!
//! ## Architecture
//! - **Framework Web** : Axum 0.7 (simplicité + stabilité)
//! - **Scripts externes** : un processus indépendant par requête, payload
//!   JSON sur stdin, timeout borné
//! - **Cache** : réponses de listing à durée de vie courte, invalidées par
//!   les mutations
//! - **Sérialisation** : serde + serde_json
//! - **Logging** : tracing + tracing-subscriber
//!
//! ## Endpoints
//! - `GET    /api/users`            - Liste des utilisateurs
//! - `POST   /api/users`            - Création d'utilisateur
//! - `PUT    /api/users/:username`  - Mise à jour partielle
//! - `DELETE /api/users/:username`  - Suppression
//! - `GET    /api/groups|ous|logs|computers` - Listings annexes
//! - `GET    /api/sessions`         - Sessions dérivées du journal
//! - `GET    /health`               - Health check
//!
//! ## Configuration
//! Le serveur charge sa configuration depuis `config.toml` au démarrage.

mod cache;
mod config;
mod handlers;
mod models;
mod script;
mod sessions;

use axum::http::{HeaderValue, Method};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    cache::ResponseCache,
    config::Config,
    handlers::{api_router, AppState},
    script::ScriptRunner,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Chargement de la configuration
    let config = Config::from_file("config.toml").expect("Impossible de charger config.toml");

    config.validate().expect("Configuration invalide");

    // 2. Initialisation du logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Démarrage de la passerelle d'administration...");
    tracing::info!("Configuration chargée depuis config.toml");
    tracing::info!(
        "Répertoire des scripts: {}",
        config.scripts.dir_buf().display()
    );

    // 3. Création de l'état partagé
    let state = AppState {
        scripts: ScriptRunner::new(config.scripts.dir_buf(), config.scripts.timeout()),
        cache: ResponseCache::new(config.cache.ttl()),
        config: config.clone(),
    };

    // 4. CORS restreint à l'origine de l'interface web
    let cors = CorsLayer::new()
        .allow_origin(
            config
                .security
                .allowed_origin
                .parse::<HeaderValue>()
                .expect("Origine CORS invalide"),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    // 5. Définition des routes Axum + middlewares
    let app = api_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    // 6. Démarrage du serveur
    let addr: SocketAddr = config.bind_address().parse()?;

    tracing::info!("✓ Passerelle démarrée sur http://{}", addr);
    tracing::info!("  GET    /api/users            - Liste des utilisateurs");
    tracing::info!("  POST   /api/users            - Création d'utilisateur");
    tracing::info!("  PUT    /api/users/:username  - Mise à jour partielle");
    tracing::info!("  DELETE /api/users/:username  - Suppression");
    tracing::info!("  GET    /api/sessions         - Sessions dérivées");
    tracing::info!("  GET    /health               - Health check");
    tracing::info!("");
    tracing::info!("Appuyez sur Ctrl+C pour arrêter le serveur");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Signal de shutdown gracieux (Ctrl+C)
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("");
            tracing::info!("🛑 Arrêt gracieux de la passerelle...");
        }
        Err(e) => {
            tracing::error!("Erreur lors de l'installation du handler Ctrl+C: {}", e);
            tracing::info!("🛑 Arrêt de la passerelle...");
        }
    }
}
