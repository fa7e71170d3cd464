//! Delivery primitive contract.
//!
//! The platform notification service is opaque: it can schedule an event at
//! a local date/time under a unique id, replaces on re-registration with the
//! same id, and refuses more than a fixed number of outstanding events.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::reminders::CandidateEvent;

/// Errors a delivery primitive can report.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("event rejected: {0}")]
    Rejected(String),

    #[error("outstanding event ceiling of {ceiling} reached")]
    CapacityExceeded { ceiling: usize },

    #[error("delivery service unavailable: {0}")]
    Unavailable(String),

    #[error("delivery store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Permission state reported by the delivery primitive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Authorization {
    #[default]
    NotDetermined,
    Denied,
    Authorized,
    Provisional,
    Ephemeral,
}

impl Authorization {
    pub fn allows_delivery(self) -> bool {
        matches!(
            self,
            Authorization::Authorized | Authorization::Provisional | Authorization::Ephemeral
        )
    }
}

/// Platform notification service seen from the scheduler.
#[async_trait::async_trait]
pub trait DeliveryPrimitive: Send + Sync {
    async fn authorization(&self) -> Authorization;

    /// Drop every outstanding event.
    async fn clear_all_outstanding(&mut self) -> Result<(), DeliveryError>;

    /// Schedule `event`, replacing any outstanding event with the same id.
    async fn register(&mut self, event: &CandidateEvent) -> Result<(), DeliveryError>;

    /// Called once after the last registration of a pass.
    async fn flush(&mut self) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn outstanding(&self) -> Result<Vec<CandidateEvent>, DeliveryError>;

    /// Human-readable name for logs (e.g. "memory", "outbox").
    fn name(&self) -> &str;
}

/// In-process delivery primitive with the same replace-by-id and ceiling
/// behavior as a platform service.
#[derive(Debug, Clone)]
pub struct InMemoryDelivery {
    authorization: Authorization,
    ceiling: usize,
    events: Vec<CandidateEvent>,
    reject: HashSet<String>,
    clears: usize,
    fail_clear: bool,
    fail_flush: bool,
}

impl InMemoryDelivery {
    pub fn new(authorization: Authorization, ceiling: usize) -> Self {
        Self {
            authorization,
            ceiling,
            events: Vec::new(),
            reject: HashSet::new(),
            clears: 0,
            fail_clear: false,
            fail_flush: false,
        }
    }

    pub fn authorized(ceiling: usize) -> Self {
        Self::new(Authorization::Authorized, ceiling)
    }

    /// Make `register` fail for this event id.
    pub fn reject_event(mut self, event_id: impl Into<String>) -> Self {
        self.reject.insert(event_id.into());
        self
    }

    /// Make `clear_all_outstanding` fail.
    pub fn fail_clear(mut self) -> Self {
        self.fail_clear = true;
        self
    }

    /// Make `flush` fail.
    pub fn fail_flush(mut self) -> Self {
        self.fail_flush = true;
        self
    }

    pub fn set_authorization(&mut self, authorization: Authorization) {
        self.authorization = authorization;
    }

    /// Seed an outstanding event without going through a scheduling pass.
    pub fn preload(&mut self, event: CandidateEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[CandidateEvent] {
        &self.events
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

#[async_trait::async_trait]
impl DeliveryPrimitive for InMemoryDelivery {
    async fn authorization(&self) -> Authorization {
        self.authorization
    }

    async fn clear_all_outstanding(&mut self) -> Result<(), DeliveryError> {
        if self.fail_clear {
            return Err(DeliveryError::Unavailable("clear refused by test hook".to_string()));
        }
        self.events.clear();
        self.clears += 1;
        Ok(())
    }

    async fn register(&mut self, event: &CandidateEvent) -> Result<(), DeliveryError> {
        if self.reject.contains(&event.id) {
            return Err(DeliveryError::Rejected(format!("{} refused by test hook", event.id)));
        }
        if let Some(existing) = self.events.iter_mut().find(|e| e.id == event.id) {
            *existing = event.clone();
            return Ok(());
        }
        if self.events.len() >= self.ceiling {
            return Err(DeliveryError::CapacityExceeded { ceiling: self.ceiling });
        }
        self.events.push(event.clone());
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), DeliveryError> {
        if self.fail_flush {
            return Err(DeliveryError::Unavailable("flush refused by test hook".to_string()));
        }
        Ok(())
    }

    async fn outstanding(&self) -> Result<Vec<CandidateEvent>, DeliveryError> {
        Ok(self.events.clone())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reminders::EventKind;
    use chrono::NaiveDate;

    fn event(id: &str, title: &str) -> CandidateEvent {
        CandidateEvent {
            id: id.to_string(),
            person_id: "p".to_string(),
            kind: EventKind::DayOf,
            trigger_at: NaiveDate::from_ymd_opt(2026, 7, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            title: title.to_string(),
            body: String::new(),
        }
    }

    #[test]
    fn only_granted_states_allow_delivery() {
        assert!(Authorization::Authorized.allows_delivery());
        assert!(Authorization::Provisional.allows_delivery());
        assert!(Authorization::Ephemeral.allows_delivery());
        assert!(!Authorization::Denied.allows_delivery());
        assert!(!Authorization::NotDetermined.allows_delivery());
    }

    #[tokio::test]
    async fn register_replaces_by_id() {
        let mut d = InMemoryDelivery::authorized(4);
        d.register(&event("a", "first")).await.unwrap();
        d.register(&event("a", "second")).await.unwrap();
        let out = d.outstanding().await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title, "second");
    }

    #[tokio::test]
    async fn ceiling_refuses_new_ids_but_not_replacements() {
        let mut d = InMemoryDelivery::authorized(1);
        d.register(&event("a", "x")).await.unwrap();
        let err = d.register(&event("b", "x")).await.unwrap_err();
        assert!(matches!(err, DeliveryError::CapacityExceeded { ceiling: 1 }));
        d.register(&event("a", "y")).await.unwrap();
    }

    #[tokio::test]
    async fn rejection_hook_fails_one_id() {
        let mut d = InMemoryDelivery::authorized(4).reject_event("bad");
        assert!(d.register(&event("bad", "x")).await.is_err());
        assert!(d.register(&event("good", "x")).await.is_ok());
        assert_eq!(d.events().len(), 1);
    }
}
