//! # Module de dérivation des sessions
//!
//! Transforme le journal plat d'événements connexion/déconnexion en
//! sessions appariées, sans rien persister : le calcul est refait à chaque
//! lecture du journal.
//!
//! ## Règles d'appariement
//!
//! - Regroupement par couple (utilisateur, IP)
//! - Chaque connexion est appariée à la première déconnexion ultérieure
//!   non encore appariée du même couple (FIFO : la plus ancienne connexion
//!   d'abord, pour rester correct en cas de reconnexions rapprochées)
//! - Une connexion sans déconnexion ultérieure devient une session active,
//!   dont la durée se mesure par rapport à l'horloge fournie
//! - Une déconnexion sans connexion préalable est une anomalie : journalisée
//!   puis ignorée

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::{EventKind, LogEntry, Session, SessionStatus, SessionsSnapshot};

/// Dérive les sessions actives et terminées du journal d'événements
///
/// Les événements sont triés par horodatage avant appariement : l'ordre
/// d'arrivée du journal n'est pas garanti.
///
/// # Arguments
/// * `events` - Journal brut (les événements `other` sont ignorés)
/// * `now` - Horloge de référence pour la durée des sessions actives
pub fn derive_sessions(events: &[LogEntry], now: DateTime<Utc>) -> SessionsSnapshot {
    let mut sorted: Vec<&LogEntry> = events
        .iter()
        .filter(|e| e.event != EventKind::Other)
        .collect();
    sorted.sort_by_key(|e| e.date);

    // Connexions en attente d'appariement, par couple (user, ip), dans
    // l'ordre chronologique (FIFO)
    let mut pending: HashMap<(String, String), Vec<&LogEntry>> = HashMap::new();
    let mut completed = Vec::new();

    for event in sorted {
        let key = (event.user.clone(), event.ip.clone());

        match event.event {
            EventKind::Connect => {
                pending.entry(key).or_default().push(event);
            }
            EventKind::Disconnect => {
                let Some(queue) = pending.get_mut(&key).filter(|q| !q.is_empty()) else {
                    tracing::warn!(
                        "Déconnexion orpheline ignorée: {}@{} à {}",
                        event.user,
                        event.ip,
                        event.date
                    );
                    continue;
                };

                // FIFO : la connexion la plus ancienne est fermée d'abord
                let connect = queue.remove(0);
                completed.push(Session {
                    username: connect.user.clone(),
                    ip: connect.ip.clone(),
                    lab: connect.lab.clone(),
                    start_time: connect.date,
                    end_time: Some(event.date),
                    duration: (event.date - connect.date).num_seconds(),
                    status: SessionStatus::Completed,
                });
            }
            EventKind::Other => unreachable!("filtré en amont"),
        }
    }

    // Les connexions restées sans déconnexion sont des sessions actives
    let mut active: Vec<Session> = pending
        .into_values()
        .flatten()
        .map(|connect| Session {
            username: connect.user.clone(),
            ip: connect.ip.clone(),
            lab: connect.lab.clone(),
            start_time: connect.date,
            end_time: None,
            duration: (now - connect.date).num_seconds().max(0),
            status: SessionStatus::Active,
        })
        .collect();

    // Actives : plus anciennes en premier ; terminées : plus récentes en
    // premier (même présentation que les listings de monitoring)
    active.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.ip.cmp(&b.ip)));
    completed.sort_by(|a, b| b.start_time.cmp(&a.start_time).then(a.ip.cmp(&b.ip)));

    SessionsSnapshot {
        active_sessions: active,
        completed_sessions: completed,
    }
}
