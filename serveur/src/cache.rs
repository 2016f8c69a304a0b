//! # Module de cache des réponses
//!
//! Cache mémoire à durée de vie courte pour les réponses des scripts de
//! listing (getUsers, getLogs...). Seules les réponses en succès sont mises
//! en cache ; toute mutation invalide l'entrée de listing concernée avant
//! de répondre au client.
//!
//! Le cache est une abstraction injectable : les lectures/écritures passent
//! par des variantes `*_at(now)` qui prennent l'horloge en paramètre, ce qui
//! permet aux tests de contrôler le temps sans dormir.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Entrée de cache : valeur + date d'expiration
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// Cache de réponses à expiration par clé
///
/// Clonable à faible coût (partage interne via Arc), comme l'état partagé
/// des handlers l'exige.
#[derive(Clone)]
pub struct ResponseCache {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
}

impl ResponseCache {
    /// Crée un cache avec la durée de vie donnée
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Lit une entrée non expirée
    pub fn get(&self, key: &str) -> Option<Value> {
        self.get_at(key, Instant::now())
    }

    /// Lit une entrée en fournissant l'horloge (pour les tests)
    ///
    /// Une entrée expirée est retirée au passage.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<Value> {
        let mut entries = self.entries.lock().expect("verrou du cache");

        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Insère une réponse en succès
    pub fn put(&self, key: &str, value: Value) {
        self.put_at(key, value, Instant::now());
    }

    /// Insère une réponse en fournissant l'horloge (pour les tests)
    pub fn put_at(&self, key: &str, value: Value, now: Instant) {
        let mut entries = self.entries.lock().expect("verrou du cache");
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + self.ttl,
            },
        );
    }

    /// Invalide l'entrée d'une clé (appelé par les mutations)
    pub fn invalidate(&self, key: &str) {
        let mut entries = self.entries.lock().expect("verrou du cache");
        entries.remove(key);
    }
}
