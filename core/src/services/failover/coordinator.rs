//! Failover coordinator
//!
//! Tracks health for every rostered provider and picks the next provider to
//! try. The health map lock is held only for the map read or mutation, never
//! across a provider call.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument, Span};

use smsflow_shared::{FailoverConfig, FailoverStrategy, ProviderRoster};

use crate::cancel::CancellationSignal;
use crate::domain::ProviderHealth;
use crate::errors::{SmsError, SmsResult};
use crate::providers::{ProviderRegistry, SmsProvider};

/// Mutable selection state guarded by one lock
struct CoordinatorState {
    /// Health keyed by provider name
    health: HashMap<String, ProviderHealth>,
    /// Next round-robin index into the roster
    cursor: usize,
    /// Random source for the random strategy
    rng: Box<dyn RngCore + Send + Sync>,
}

/// Provider health tracker and selector
pub struct FailoverCoordinator {
    /// Primary first, then backups in configured order
    providers: Vec<Arc<dyn SmsProvider>>,
    /// How the next provider is chosen
    strategy: FailoverStrategy,
    /// How long a failed provider is skipped
    cooldown: Duration,
    /// Health map, round-robin cursor and random source
    state: RwLock<CoordinatorState>,
    /// Parent span for coordinator events
    span: Span,
}

impl FailoverCoordinator {
    /// Build a coordinator for `roster`, resolving names through `registry`
    ///
    /// Backups missing from the registry are skipped, as are names listed
    /// twice. Every rostered provider starts healthy.
    ///
    /// # Arguments
    ///
    /// * `roster` - Primary and backup provider names
    /// * `registry` - Providers available to this process
    /// * `config` - Selection strategy and cooldown
    ///
    /// # Returns
    ///
    /// * `Ok(FailoverCoordinator)` - Coordinator over the resolved providers
    /// * `Err(SmsError::Configuration)` - If the primary is not registered
    pub fn new(roster: &ProviderRoster, registry: &ProviderRegistry, config: &FailoverConfig) -> SmsResult<Self> {
        let primary = registry.get(&roster.primary).ok_or_else(|| SmsError::Configuration {
            message: format!("primary provider '{}' is not registered", roster.primary),
        })?;

        let mut providers = vec![primary];
        for name in &roster.backups {
            if providers.iter().any(|p| p.name() == name) {
                continue;
            }
            match registry.get(name) {
                Some(provider) => providers.push(provider),
                None => warn!(provider = %name, "backup provider not registered, skipping"),
            }
        }

        let health = providers
            .iter()
            .map(|p| (p.name().to_string(), ProviderHealth::new(p.name())))
            .collect();

        info!(
            primary = %roster.primary,
            backups = providers.len() - 1,
            strategy = ?config.strategy,
            "failover coordinator initialized"
        );

        Ok(Self {
            providers,
            strategy: config.strategy,
            cooldown: config.cooldown(),
            state: RwLock::new(CoordinatorState {
                health,
                cursor: 0,
                rng: Box::new(StdRng::from_entropy()),
            }),
            span: tracing::info_span!("failover"),
        })
    }

    /// Replace the random source used by the random strategy
    pub fn with_rng(mut self, rng: impl RngCore + Send + Sync + 'static) -> Self {
        self.state.get_mut().rng = Box::new(rng);
        self
    }

    /// Override the configured cooldown window
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn strategy(&self) -> FailoverStrategy {
        self.strategy
    }

    pub fn primary(&self) -> Arc<dyn SmsProvider> {
        self.providers[0].clone()
    }

    /// Rostered providers, primary first
    pub fn providers(&self) -> &[Arc<dyn SmsProvider>] {
        &self.providers
    }

    pub fn provider(&self, name: &str) -> Option<Arc<dyn SmsProvider>> {
        self.providers.iter().find(|p| p.name() == name).cloned()
    }

    /// Pick the provider to try next
    ///
    /// Providers inside their cooldown window are skipped. Sequential takes
    /// the first eligible provider in roster order, random picks uniformly
    /// among eligible ones and round-robin advances a shared cursor.
    ///
    /// # Returns
    ///
    /// The selected provider, or the primary when every provider is cooling
    /// down.
    pub async fn get_available_provider(&self) -> Arc<dyn SmsProvider> {
        let index = match self.strategy {
            FailoverStrategy::Sequential => self.select_sequential().await,
            FailoverStrategy::Random => self.select_random().await,
            FailoverStrategy::RoundRobin => self.select_round_robin().await,
        };
        let provider = self.providers[index.unwrap_or(0)].clone();
        debug!(parent: &self.span, provider = provider.name(), "provider selected");
        provider
    }

    async fn select_sequential(&self) -> Option<usize> {
        let state = self.state.read().await;
        let now = Utc::now();
        (0..self.providers.len()).find(|&i| !self.cooling_down(&state, i, now))
    }

    async fn select_random(&self) -> Option<usize> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let eligible: Vec<usize> = (0..self.providers.len())
            .filter(|&i| !self.cooling_down(&state, i, now))
            .collect();
        if eligible.is_empty() {
            return None;
        }
        let pick = state.rng.gen_range(0..eligible.len());
        Some(eligible[pick])
    }

    async fn select_round_robin(&self) -> Option<usize> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let count = self.providers.len();
        for _ in 0..count {
            let index = state.cursor % count;
            state.cursor = (index + 1) % count;
            if !self.cooling_down(&state, index, now) {
                return Some(index);
            }
        }
        None
    }

    fn cooling_down(&self, state: &CoordinatorState, index: usize, now: chrono::DateTime<Utc>) -> bool {
        state
            .health
            .get(self.providers[index].name())
            .map(|health| health.in_cooldown(self.cooldown, now))
            .unwrap_or(false)
    }

    /// Record a failed send, starting the provider's cooldown
    ///
    /// # Arguments
    ///
    /// * `name` - Provider name; untracked names are ignored
    pub async fn mark_provider_failed(&self, name: &str) {
        let mut state = self.state.write().await;
        match state.health.get_mut(name) {
            Some(health) => {
                health.record_failure(Utc::now());
                warn!(
                    parent: &self.span,
                    provider = name,
                    error_count = health.error_count,
                    event = "provider_unhealthy",
                    "provider marked unhealthy"
                );
            }
            None => debug!(parent: &self.span, provider = name, "ignoring failure for untracked provider"),
        }
    }

    /// Record a successful send or probe; the error count is kept
    pub async fn mark_provider_healthy(&self, name: &str) {
        let mut state = self.state.write().await;
        if let Some(health) = state.health.get_mut(name) {
            if !health.healthy {
                info!(parent: &self.span, provider = name, event = "provider_recovered", "provider healthy again");
            }
            health.record_healthy(Utc::now());
        }
    }

    /// Snapshot of every tracked provider, in roster order
    pub async fn get_health_status(&self) -> Vec<ProviderHealth> {
        let state = self.state.read().await;
        self.providers
            .iter()
            .filter_map(|p| state.health.get(p.name()).cloned())
            .collect()
    }

    /// Probe unhealthy providers whose cooldown has elapsed
    ///
    /// Providers are probed outside the health lock, one at a time.
    ///
    /// # Returns
    ///
    /// Number of providers that answered healthy and were marked recovered
    pub async fn run_health_checks(&self) -> usize {
        let due: Vec<Arc<dyn SmsProvider>> = {
            let state = self.state.read().await;
            let now = Utc::now();
            self.providers
                .iter()
                .enumerate()
                .filter(|(i, p)| {
                    let unhealthy = state.health.get(p.name()).map(|h| !h.healthy).unwrap_or(false);
                    unhealthy && !self.cooling_down(&state, *i, now)
                })
                .map(|(_, p)| p.clone())
                .collect()
        };

        let mut recovered = 0;
        for provider in due {
            if provider.health_check().await {
                self.mark_provider_healthy(provider.name()).await;
                recovered += 1;
            } else {
                debug!(parent: &self.span, provider = provider.name(), "health probe failed");
            }
        }
        recovered
    }

    /// Run [`run_health_checks`](Self::run_health_checks) every `interval`
    /// until `cancel` fires
    ///
    /// # Arguments
    ///
    /// * `interval` - Delay between probe rounds
    /// * `cancel` - Stops the monitor when fired
    ///
    /// # Returns
    ///
    /// Handle of the spawned monitor task
    pub fn spawn_health_monitor(self: Arc<Self>, interval: Duration, cancel: CancellationSignal) -> JoinHandle<()> {
        let span = self.span.clone();
        tokio::spawn(
            async move {
                let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            debug!("health monitor stopped");
                            break;
                        }
                        _ = ticker.tick() => {
                            let recovered = self.run_health_checks().await;
                            if recovered > 0 {
                                info!(recovered, "health monitor restored providers");
                            }
                        }
                    }
                }
            }
            .instrument(span),
        )
    }
}

impl std::fmt::Debug for FailoverCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverCoordinator")
            .field("providers", &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>())
            .field("strategy", &self.strategy)
            .field("cooldown", &self.cooldown)
            .finish()
    }
}
