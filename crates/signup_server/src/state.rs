//! Shared application state and its construction from config.

use std::sync::Arc;

use signup_client::{
    GoalClient, HttpGoalClient, HttpRegistrationClient, InProcessGoalClient,
    InProcessRegistrationClient, RegistrationClient,
};
use signup_core::config::SignupConfig;
use signup_core::dispatch::{Dispatcher, OperationRegistry};
use signup_core::resilience::ResiliencePolicy;
use signup_core::service::{GoalService, RegistrationService, SignupOrchestrator};
use signup_core::store::{MockGoalStore, MockRegistrationStore};

#[derive(Clone)]
pub struct AppState {
    pub registrations: Arc<MockRegistrationStore>,
    pub goals: Arc<MockGoalStore>,
    pub dispatcher: Arc<Dispatcher>,
    pub default_user: Arc<str>,
}

impl AppState {
    /// Seeded registration mock and an empty goal mock.
    pub fn from_config(config: &SignupConfig) -> anyhow::Result<Self> {
        Self::with_stores(
            config,
            Arc::new(MockRegistrationStore::seeded()),
            Arc::new(MockGoalStore::new()),
        )
    }

    /// Wire the workflow over the given mocks. A configured remote URL
    /// replaces the in-process client for that service; the mock routes are
    /// served either way.
    pub fn with_stores(
        config: &SignupConfig,
        registrations: Arc<MockRegistrationStore>,
        goals: Arc<MockGoalStore>,
    ) -> anyhow::Result<Self> {
        let registration_client: Arc<dyn RegistrationClient> = match &config.registration_url {
            Some(url) => {
                tracing::info!(%url, "using remote registration service");
                Arc::new(HttpRegistrationClient::new(url.as_str(), config.client_timeout)?)
            }
            None => Arc::new(InProcessRegistrationClient::new(Arc::clone(&registrations))),
        };
        let goal_client: Arc<dyn GoalClient> = match &config.goal_url {
            Some(url) => {
                tracing::info!(%url, "using remote goal service");
                Arc::new(HttpGoalClient::new(url.as_str(), config.client_timeout)?)
            }
            None => Arc::new(InProcessGoalClient::new(Arc::clone(&goals))),
        };

        let orchestrator = SignupOrchestrator::new(
            Arc::new(RegistrationService::with_cache_ttl(
                registration_client,
                config.event_cache_ttl,
            )),
            Arc::new(GoalService::new(goal_client, config.demo_id.as_str())),
            Arc::new(ResiliencePolicy::new(config.goal_lookup.clone())),
        )
        .on_lookup_failure(config.lookup_failure);
        let dispatcher = Dispatcher::new(OperationRegistry::signup(Arc::new(orchestrator)));

        Ok(Self {
            registrations,
            goals,
            dispatcher: Arc::new(dispatcher),
            default_user: Arc::from(config.default_user.as_str()),
        })
    }
}
