//! # Binaire Moniteur
//!
//! Affiche en continu les sessions actives des salles de TP. Les durées
//! affichées sont ancrées localement au moment de chaque lecture : elles
//! progressent entre deux rafraîchissements sans redemander le serveur.

use std::time::Duration;

use gestad::{
    config,
    data_structures::AnchoredSession,
    http_client::AdminClient,
    poll::Poller,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server_url = std::env::args().nth(1);
    let client = AdminClient::new(server_url);

    println!("[MONITEUR] Surveillance des sessions (Ctrl+C pour quitter)");

    let poller = Poller::new(Duration::from_secs(config::POLL_INTERVAL_SECS));
    poller.run(
        || {
            client.get_sessions().map_err(|e| {
                eprintln!("[MONITEUR] Erreur de lecture: {}", e);
                e
            })
        },
        |snapshot| {
            let anchored: Vec<AnchoredSession> = snapshot
                .active_sessions
                .iter()
                .cloned()
                .map(AnchoredSession::new)
                .collect();

            println!(
                "[MONITEUR] {} session(s) active(s), {} terminée(s)",
                anchored.len(),
                snapshot.completed_sessions.len()
            );
            for session in &anchored {
                println!(
                    "[MONITEUR]   {}@{} ({}) - connecté depuis {} s",
                    session.info.username,
                    session.info.ip,
                    session.info.lab,
                    session.duration_now()
                );
            }
        },
        || true,
    );

    Ok(())
}
