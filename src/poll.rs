//! # Module de polling générique
//!
//! Boucle de rafraîchissement à intervalle configurable, découplée de
//! toute interface : une fonction de lecture, un consommateur de données
//! et un prédicat de poursuite. En cas d'erreur de lecture, l'intervalle
//! augmente par backoff multiplicatif jusqu'à un plafond, puis revient à
//! l'intervalle de base au premier succès.

use std::time::Duration;

use crate::config;

/// Boucle de polling à backoff
#[derive(Debug, Clone)]
pub struct Poller {
    interval: Duration,
    backoff_factor: u32,
    max_interval: Duration,
}

impl Poller {
    /// Crée une boucle avec l'intervalle de base donné et le backoff par
    /// défaut du projet
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            backoff_factor: config::POLL_BACKOFF_FACTOR,
            max_interval: Duration::from_secs(config::POLL_MAX_INTERVAL_SECS),
        }
    }

    /// Remplace le facteur de backoff et le plafond d'intervalle
    pub fn with_backoff(mut self, factor: u32, max_interval: Duration) -> Self {
        self.backoff_factor = factor;
        self.max_interval = max_interval;
        self
    }

    /// Lance la boucle avec l'horloge réelle
    ///
    /// # Arguments
    /// * `fetch` - Lecture des données ; son `Err` déclenche le backoff
    /// * `on_update` - Consommateur invoqué à chaque lecture réussie
    /// * `keep_going` - Évalué avant chaque lecture ; `false` termine
    pub fn run<T, E, F, U, K>(&self, fetch: F, on_update: U, keep_going: K)
    where
        F: FnMut() -> Result<T, E>,
        U: FnMut(&T),
        K: FnMut() -> bool,
    {
        self.run_with_sleeper(fetch, on_update, keep_going, std::thread::sleep);
    }

    /// Lance la boucle avec un endormeur injecté (pour les tests)
    pub fn run_with_sleeper<T, E, F, U, K, S>(
        &self,
        mut fetch: F,
        mut on_update: U,
        mut keep_going: K,
        mut sleeper: S,
    ) where
        F: FnMut() -> Result<T, E>,
        U: FnMut(&T),
        K: FnMut() -> bool,
        S: FnMut(Duration),
    {
        let mut delay = self.interval;

        while keep_going() {
            match fetch() {
                Ok(data) => {
                    on_update(&data);
                    // Retour à l'intervalle de base dès le premier succès
                    delay = self.interval;
                }
                Err(_) => {
                    delay = (delay * self.backoff_factor).min(self.max_interval);
                }
            }
            sleeper(delay);
        }
    }
}
