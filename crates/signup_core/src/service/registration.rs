use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, SignupError};
use crate::ports::RegistrationClient;
use crate::resilience::TtlCache;
use crate::types::{Event, Session, CONFERENCE_NAME};

/// Conference registration on top of a [`RegistrationClient`].
///
/// Calls are not wrapped in a resilience policy; the event list is cached.
pub struct RegistrationService {
    client: Arc<dyn RegistrationClient>,
    events: TtlCache<Vec<Event>>,
}

impl RegistrationService {
    pub const EVENT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

    pub fn new(client: Arc<dyn RegistrationClient>) -> Self {
        Self::with_cache_ttl(client, Self::EVENT_CACHE_TTL)
    }

    pub fn with_cache_ttl(client: Arc<dyn RegistrationClient>, ttl: Duration) -> Self {
        Self {
            client,
            events: TtlCache::new(ttl),
        }
    }

    /// All events, served from cache while fresh.
    pub async fn events(&self) -> Result<Vec<Event>> {
        self.events
            .get_or_try_load(|| self.client.list_events())
            .await
    }

    pub async fn conference(&self) -> Result<Event> {
        self.events()
            .await?
            .into_iter()
            .find(|e| e.name == CONFERENCE_NAME)
            .ok_or_else(|| SignupError::NotFound(format!("event '{CONFERENCE_NAME}'")))
    }

    /// Session of `event` whose title matches, ignoring case.
    pub async fn find_session(&self, event: &Event, title: &str) -> Result<Session> {
        self.client
            .list_sessions(event.id)
            .await?
            .into_iter()
            .find(|s| s.title.eq_ignore_ascii_case(title.trim()))
            .ok_or_else(|| {
                SignupError::NotFound(format!("session '{title}' in event '{}'", event.name))
            })
    }

    pub async fn sign_up_for_conference(&self, participant: &str) -> Result<Event> {
        let event = self.conference().await?;
        self.client.register_for_event(event.id, participant).await?;
        tracing::info!(event = %event.name, participant, "registered for event");
        Ok(event)
    }

    pub async fn sign_up_for_session(&self, title: &str, participant: &str) -> Result<Session> {
        let event = self.conference().await?;
        let session = self.find_session(&event, title).await?;
        self.client
            .register_for_session(event.id, session.id, participant)
            .await?;
        tracing::info!(session = %session.title, participant, "registered for session");
        Ok(session)
    }
}
