use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, SignupError};
use crate::types::{Event, Registration, Session, CONFERENCE_NAME};

/// In-memory registration service.
///
/// Events and sessions are fixed at construction. Each event owns its own
/// registration list behind its own lock.
pub struct MockRegistrationStore {
    events: Vec<Event>,
    sessions: HashMap<u64, Session>,
    registrations: HashMap<u64, Mutex<Vec<Registration>>>,
}

impl MockRegistrationStore {
    pub fn new(events: Vec<Event>, sessions: Vec<Session>) -> Self {
        let registrations = events
            .iter()
            .map(|e| (e.id, Mutex::new(Vec::new())))
            .collect();
        Self {
            events,
            sessions: sessions.into_iter().map(|s| (s.id, s)).collect(),
            registrations,
        }
    }

    /// The conference plus one unrelated event.
    pub fn seeded() -> Self {
        let session = |id, title: &str, duration, location: &str, event_id| Session {
            id,
            title: title.to_string(),
            duration,
            location: location.to_string(),
            event_id,
        };
        let events = vec![
            Event {
                id: 1,
                name: CONFERENCE_NAME.to_string(),
                session_ids: vec![101, 102, 103, 104],
            },
            Event {
                id: 2,
                name: "Some other Event".to_string(),
                session_ids: vec![201, 202],
            },
        ];
        let sessions = vec![
            session(101, "Opening Keynote", 60, "Main Stage", 1),
            session(
                102,
                "Build Resilient Apps on SAP BTP with the SAP Cloud SDK",
                45,
                "Hall A",
                1,
            ),
            session(103, "Develop CAP Applications with Ease", 90, "Hall B", 1),
            session(104, "Elevate your Business with Joule", 45, "Main Stage", 1),
            session(201, "Some session", 20, "Somewhere", 2),
            session(202, "Some other session", 40, "Anywhere", 2),
        ];
        Self::new(events, sessions)
    }

    pub fn list_events(&self) -> Vec<Event> {
        self.events.clone()
    }

    pub fn get_event(&self, event_id: u64) -> Result<Event> {
        self.event(event_id).cloned()
    }

    pub fn list_sessions(&self, event_id: u64) -> Result<Vec<Session>> {
        let event = self.event(event_id)?;
        Ok(event
            .session_ids
            .iter()
            .filter_map(|id| self.sessions.get(id).cloned())
            .collect())
    }

    pub fn register(&self, event_id: u64, participant: &str) -> Result<Registration> {
        self.event(event_id)?;
        self.append(Registration {
            event_id,
            session_id: None,
            participant: participant_name(participant)?,
        })
    }

    pub fn register_session(
        &self,
        event_id: u64,
        session_id: u64,
        participant: &str,
    ) -> Result<Registration> {
        let event = self.event(event_id)?;
        if !event.session_ids.contains(&session_id) {
            return Err(SignupError::NotFound(format!(
                "session {session_id} in event {event_id}"
            )));
        }
        self.append(Registration {
            event_id,
            session_id: Some(session_id),
            participant: participant_name(participant)?,
        })
    }

    pub fn registrations(&self, event_id: u64) -> Result<Vec<Registration>> {
        let list = self
            .registrations
            .get(&event_id)
            .ok_or_else(|| SignupError::NotFound(format!("event {event_id}")))?;
        Ok(list.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn event(&self, event_id: u64) -> Result<&Event> {
        self.events
            .iter()
            .find(|e| e.id == event_id)
            .ok_or_else(|| SignupError::NotFound(format!("event {event_id}")))
    }

    fn append(&self, registration: Registration) -> Result<Registration> {
        let list = self
            .registrations
            .get(&registration.event_id)
            .ok_or_else(|| SignupError::NotFound(format!("event {}", registration.event_id)))?;
        list.lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(registration.clone());
        tracing::debug!(
            event_id = registration.event_id,
            session_id = ?registration.session_id,
            participant = %registration.participant,
            "registration recorded"
        );
        Ok(registration)
    }
}

impl Default for MockRegistrationStore {
    fn default() -> Self {
        Self::seeded()
    }
}

fn participant_name(participant: &str) -> Result<String> {
    let participant = participant.trim();
    if participant.is_empty() {
        return Err(SignupError::InvalidInput("participant is required".into()));
    }
    Ok(participant.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_with_conference() {
        let store = MockRegistrationStore::seeded();
        let events = store.list_events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].name, "TechEd 2023");
        let titles: Vec<String> = store
            .list_sessions(1)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles.len(), 4);
        assert_eq!(titles[0], "Opening Keynote");
    }

    #[test]
    fn sessions_of_unknown_event_not_found() {
        let store = MockRegistrationStore::seeded();
        assert!(matches!(store.list_sessions(99), Err(SignupError::NotFound(_))));
        assert!(matches!(store.get_event(99), Err(SignupError::NotFound(_))));
    }

    #[test]
    fn duplicate_registrations_are_kept() {
        let store = MockRegistrationStore::seeded();
        store.register(1, "alice").unwrap();
        store.register(1, "alice").unwrap();
        assert_eq!(store.registrations(1).unwrap().len(), 2);
        assert!(store.registrations(2).unwrap().is_empty());
    }

    #[test]
    fn session_must_belong_to_event() {
        let store = MockRegistrationStore::seeded();
        store.register_session(1, 101, "alice").unwrap();
        let err = store.register_session(1, 201, "alice").unwrap_err();
        assert!(matches!(err, SignupError::NotFound(_)));
        assert_eq!(store.registrations(1).unwrap().len(), 1);
    }

    #[test]
    fn register_unknown_event_not_found() {
        let store = MockRegistrationStore::seeded();
        assert!(matches!(store.register(42, "alice"), Err(SignupError::NotFound(_))));
    }

    #[test]
    fn blank_participant_is_invalid() {
        let store = MockRegistrationStore::seeded();
        assert!(matches!(store.register(1, "  "), Err(SignupError::InvalidInput(_))));
    }

    #[test]
    fn concurrent_registrations_all_land() {
        let store = std::sync::Arc::new(MockRegistrationStore::seeded());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.register_session(1, 101, &format!("user{i}")).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.registrations(1).unwrap().len(), 200);
    }
}
