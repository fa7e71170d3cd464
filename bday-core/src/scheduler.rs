//! Capacity-bounded birthday scheduler.
//!
//! One pass:
//! - validate records and drop duplicates
//! - stable-sort people by days until their next birthday
//! - resolve each person's effective preference and generate candidates
//! - stop at the ceiling (the whole pass halts, it does not skip ahead)
//! - clear every outstanding event, then register the batch
//!
//! The delivery primitive lives behind a mutex that is held for the entire
//! clear + register sequence, so two passes never interleave.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::delivery::{Authorization, DeliveryError, DeliveryPrimitive};
use crate::preference::effective_preference;
use crate::reminders::{generate_candidates, CandidateEvent, DeliveryTime};
use crate::source::ContactSource;

/// Outstanding-event limit of the reference platform.
pub const DEFAULT_CEILING: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub ceiling: usize,
    pub delivery: DeliveryTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ceiling: DEFAULT_CEILING,
            delivery: DeliveryTime::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub person_id: String,
    pub reason: String,
}

/// Output of the pure planning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedBatch {
    /// Ordered, capacity-capped events.
    pub events: Vec<CandidateEvent>,
    pub rejected: Vec<RejectedRecord>,
    /// True when the ceiling stopped processing before every person was seen.
    pub truncated: bool,
}

/// Sort, generate, and cap. Touches nothing outside its arguments.
pub fn plan_batch<S>(source: &S, config: &SchedulerConfig, now: NaiveDateTime) -> PlannedBatch
where
    S: ContactSource + ?Sized,
{
    let people = source.list_people();
    let mut plan = PlannedBatch::default();

    let mut seen: HashSet<&str> = HashSet::with_capacity(people.len());
    let mut ranked = Vec::with_capacity(people.len());

    for person in &people {
        match person.validate() {
            Ok(_) if !seen.insert(person.id.as_str()) => {
                tracing::warn!(person_id = %person.id, "duplicate person identifier, keeping first");
                plan.rejected.push(RejectedRecord {
                    person_id: person.id.clone(),
                    reason: "duplicate identifier".to_string(),
                });
            }
            Ok(md) => ranked.push((md.days_until(now), person)),
            Err(e) => {
                tracing::warn!(person_id = %person.id, error = %e, "rejecting birthday record");
                plan.rejected.push(RejectedRecord {
                    person_id: person.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    // Stable: equal urgency keeps input order.
    ranked.sort_by_key(|(days, _)| *days);

    'people: for (_, person) in ranked {
        if plan.events.len() >= config.ceiling {
            plan.truncated = true;
            break;
        }

        let preference = effective_preference(source.group_preferences_for(&person.id));
        let candidates = match generate_candidates(person, preference, config.delivery, now) {
            Ok(c) => c,
            Err(e) => {
                plan.rejected.push(RejectedRecord {
                    person_id: person.id.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for event in candidates {
            if plan.events.len() >= config.ceiling {
                plan.truncated = true;
                break 'people;
            }
            plan.events.push(event);
        }
    }

    plan
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PassStatus {
    Completed,
    /// Authorization did not allow delivery; nothing was cleared or registered.
    NotAuthorized,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationFailure {
    pub event_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    pub status: PassStatus,
    pub authorization: Authorization,
    /// Events the primitive accepted.
    pub scheduled: usize,
    /// The batch that was submitted, in submission order.
    pub batch: Vec<CandidateEvent>,
    pub failures: Vec<RegistrationFailure>,
    pub rejected: Vec<RejectedRecord>,
    pub truncated: bool,
}

impl PassReport {
    fn not_authorized(authorization: Authorization) -> Self {
        Self {
            status: PassStatus::NotAuthorized,
            authorization,
            scheduled: 0,
            batch: Vec::new(),
            failures: Vec::new(),
            rejected: Vec::new(),
            truncated: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("clearing outstanding events failed")]
    Clear(#[source] DeliveryError),

    #[error("committing scheduled events failed")]
    Flush(#[source] DeliveryError),
}

/// Exclusive owner of a delivery primitive.
pub struct BirthdayScheduler<D> {
    delivery: Mutex<D>,
    config: SchedulerConfig,
}

impl<D: DeliveryPrimitive> BirthdayScheduler<D> {
    pub fn new(delivery: D, config: SchedulerConfig) -> Self {
        Self {
            delivery: Mutex::new(delivery),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replace every outstanding event with a fresh batch.
    ///
    /// Individual registration failures are collected in the report and do
    /// not stop the remaining registrations.
    pub async fn reschedule<S>(&self, source: &S, now: NaiveDateTime) -> Result<PassReport, ScheduleError>
    where
        S: ContactSource + Sync + ?Sized,
    {
        let mut delivery = self.delivery.lock().await;

        let authorization = delivery.authorization().await;
        if !authorization.allows_delivery() {
            tracing::info!(
                channel = delivery.name(),
                ?authorization,
                "notifications not authorized, skipping reschedule"
            );
            return Ok(PassReport::not_authorized(authorization));
        }

        let plan = plan_batch(source, &self.config, now);

        delivery.clear_all_outstanding().await.map_err(ScheduleError::Clear)?;

        let mut scheduled = 0usize;
        let mut failures = Vec::new();

        for event in &plan.events {
            match delivery.register(event).await {
                Ok(()) => {
                    tracing::debug!(
                        event_id = %event.id,
                        trigger_at = %event.trigger_at,
                        "registered birthday reminder"
                    );
                    scheduled += 1;
                }
                Err(e) => {
                    tracing::warn!(event_id = %event.id, error = %e, "failed to register reminder");
                    failures.push(RegistrationFailure {
                        event_id: event.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        delivery.flush().await.map_err(ScheduleError::Flush)?;

        tracing::info!(
            channel = delivery.name(),
            scheduled,
            failed = failures.len(),
            rejected = plan.rejected.len(),
            truncated = plan.truncated,
            "birthday reschedule complete"
        );

        Ok(PassReport {
            status: PassStatus::Completed,
            authorization,
            scheduled,
            batch: plan.events,
            failures,
            rejected: plan.rejected,
            truncated: plan.truncated,
        })
    }

    pub async fn outstanding(&self) -> Result<Vec<CandidateEvent>, DeliveryError> {
        self.delivery.lock().await.outstanding().await
    }

    pub fn into_inner(self) -> D {
        self.delivery.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::InMemoryDelivery;
    use crate::person::BirthdayRecord;
    use crate::preference::NotificationPreference;
    use crate::reminders::EventKind;
    use crate::source::ContactSnapshot;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, hh: u32, mm: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(hh, mm, 0)
            .unwrap()
    }

    fn config(ceiling: usize) -> SchedulerConfig {
        SchedulerConfig {
            ceiling,
            ..SchedulerConfig::default()
        }
    }

    fn ids(events: &[CandidateEvent]) -> Vec<&str> {
        events.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn sorts_by_urgency() {
        let now = at(2026, 4, 1, 12, 0);
        let snapshot = ContactSnapshot::new(vec![
            BirthdayRecord::new("far", "F", "", 9, 1),
            BirthdayRecord::new("near", "N", "", 4, 3),
            BirthdayRecord::new("mid", "M", "", 5, 1),
        ]);
        let plan = plan_batch(&snapshot, &config(64), now);
        assert_eq!(
            ids(&plan.events),
            vec![
                "near-birthday-daybefore",
                "near-birthday-dayof",
                "mid-birthday-daybefore",
                "mid-birthday-dayof",
                "far-birthday-daybefore",
                "far-birthday-dayof",
            ]
        );
        assert!(!plan.truncated);
    }

    #[test]
    fn ties_keep_input_order() {
        let now = at(2026, 4, 1, 12, 0);
        let people: Vec<_> = ["z", "a", "m", "b"]
            .iter()
            .map(|id| BirthdayRecord::new(*id, *id, "", 4, 20))
            .collect();
        let snapshot = ContactSnapshot::new(people);
        let plan = plan_batch(&snapshot, &config(64), now);
        let persons: Vec<_> = plan.events.iter().map(|e| e.person_id.as_str()).collect();
        assert_eq!(persons, vec!["z", "z", "a", "a", "m", "m", "b", "b"]);
    }

    #[test]
    fn halts_at_ceiling_mid_person() {
        let now = at(2026, 4, 1, 12, 0);
        let snapshot = ContactSnapshot::new(vec![
            BirthdayRecord::new("a", "A", "", 4, 10),
            BirthdayRecord::new("b", "B", "", 4, 11),
            BirthdayRecord::new("c", "C", "", 4, 12),
        ]);
        let plan = plan_batch(&snapshot, &config(3), now);
        assert_eq!(
            ids(&plan.events),
            vec!["a-birthday-daybefore", "a-birthday-dayof", "b-birthday-daybefore"]
        );
        assert!(plan.truncated);
    }

    #[test]
    fn exact_fit_is_not_truncated() {
        let now = at(2026, 4, 1, 12, 0);
        let snapshot = ContactSnapshot::new(vec![BirthdayRecord::new("a", "A", "", 4, 10)]);
        let plan = plan_batch(&snapshot, &config(2), now);
        assert_eq!(plan.events.len(), 2);
        assert!(!plan.truncated);
    }

    #[test]
    fn zero_ceiling_plans_nothing() {
        let now = at(2026, 4, 1, 12, 0);
        let snapshot = ContactSnapshot::new(vec![BirthdayRecord::new("a", "A", "", 4, 10)]);
        let plan = plan_batch(&snapshot, &config(0), now);
        assert!(plan.events.is_empty());
        assert!(plan.truncated);
    }

    #[test]
    fn invalid_and_duplicate_records_are_rejected_without_stopping() {
        let now = at(2026, 4, 1, 12, 0);
        let snapshot = ContactSnapshot::new(vec![
            BirthdayRecord::new("bad", "X", "", 2, 30),
            BirthdayRecord::new("ok", "O", "", 4, 10),
            BirthdayRecord::new("ok", "Dup", "", 4, 2),
            BirthdayRecord::new("", "Anon", "", 4, 2),
        ]);
        let plan = plan_batch(&snapshot, &config(64), now);
        assert_eq!(ids(&plan.events), vec!["ok-birthday-daybefore", "ok-birthday-dayof"]);
        let rejected: Vec<_> = plan.rejected.iter().map(|r| r.person_id.as_str()).collect();
        assert_eq!(rejected, vec!["bad", "ok", ""]);
        assert_eq!(plan.rejected[1].reason, "duplicate identifier");
    }

    #[test]
    fn group_preferences_drive_kinds() {
        let now = at(2026, 4, 1, 12, 0);
        let snapshot = ContactSnapshot::new(vec![
            BirthdayRecord::new("a", "A", "", 4, 10),
            BirthdayRecord::new("b", "B", "", 4, 11),
            BirthdayRecord::new("c", "C", "", 4, 12),
        ])
        .with_preferences("a", [NotificationPreference::DayOfOnly])
        .with_preferences("b", [NotificationPreference::DayBeforeOnly])
        .with_preferences(
            "c",
            [NotificationPreference::DayOfOnly, NotificationPreference::DayBeforeOnly],
        );
        let plan = plan_batch(&snapshot, &config(64), now);
        let kinds: Vec<_> = plan.events.iter().map(|e| (e.person_id.as_str(), e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("a", EventKind::DayOf),
                ("b", EventKind::DayBefore),
                ("c", EventKind::DayBefore),
                ("c", EventKind::DayOf),
            ]
        );
    }

    #[tokio::test]
    async fn unauthorized_pass_touches_nothing() {
        let now = at(2026, 4, 1, 12, 0);
        let mut delivery = InMemoryDelivery::new(Authorization::Denied, 64);
        let snapshot = ContactSnapshot::new(vec![BirthdayRecord::new("a", "A", "", 4, 10)]);
        let stale = generate_candidates(
            &BirthdayRecord::new("old", "O", "", 5, 5),
            NotificationPreference::Both,
            DeliveryTime::default(),
            now,
        )
        .unwrap();
        for e in stale {
            delivery.preload(e);
        }

        let scheduler = BirthdayScheduler::new(delivery, config(64));
        let report = scheduler.reschedule(&snapshot, now).await.unwrap();

        assert_eq!(report.status, PassStatus::NotAuthorized);
        assert_eq!(report.authorization, Authorization::Denied);
        assert_eq!(report.scheduled, 0);
        assert!(report.batch.is_empty());

        let delivery = scheduler.into_inner();
        assert_eq!(delivery.clear_count(), 0);
        assert_eq!(delivery.events().len(), 2);
    }

    #[tokio::test]
    async fn registration_failure_does_not_abort_pass() {
        let now = at(2026, 4, 1, 12, 0);
        let delivery = InMemoryDelivery::authorized(64).reject_event("a-birthday-dayof");
        let snapshot = ContactSnapshot::new(vec![
            BirthdayRecord::new("a", "A", "", 4, 10),
            BirthdayRecord::new("b", "B", "", 4, 11),
        ]);
        let scheduler = BirthdayScheduler::new(delivery, config(64));
        let report = scheduler.reschedule(&snapshot, now).await.unwrap();

        assert_eq!(report.status, PassStatus::Completed);
        assert_eq!(report.scheduled, 3);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].event_id, "a-birthday-dayof");
        assert_eq!(scheduler.outstanding().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn stale_events_are_cleared() {
        let now = at(2026, 4, 1, 12, 0);
        let mut delivery = InMemoryDelivery::authorized(64);
        let gone = generate_candidates(
            &BirthdayRecord::new("gone", "G", "", 4, 5),
            NotificationPreference::Both,
            DeliveryTime::default(),
            now,
        )
        .unwrap();
        for e in gone {
            delivery.preload(e);
        }

        let snapshot = ContactSnapshot::new(vec![BirthdayRecord::new("a", "A", "", 4, 10)]);
        let scheduler = BirthdayScheduler::new(delivery, config(64));
        scheduler.reschedule(&snapshot, now).await.unwrap();

        let outstanding = scheduler.outstanding().await.unwrap();
        assert_eq!(ids(&outstanding), vec!["a-birthday-daybefore", "a-birthday-dayof"]);
    }

    #[tokio::test]
    async fn clear_failure_aborts_before_any_registration() {
        let now = at(2026, 4, 1, 12, 0);
        let mut delivery = InMemoryDelivery::authorized(64).fail_clear();
        let stale = generate_candidates(
            &BirthdayRecord::new("old", "O", "", 5, 5),
            NotificationPreference::Both,
            DeliveryTime::default(),
            now,
        )
        .unwrap();
        for e in stale {
            delivery.preload(e);
        }

        let snapshot = ContactSnapshot::new(vec![BirthdayRecord::new("a", "A", "", 4, 10)]);
        let scheduler = BirthdayScheduler::new(delivery, config(64));
        let err = scheduler.reschedule(&snapshot, now).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Clear(DeliveryError::Unavailable(_))));

        let delivery = scheduler.into_inner();
        assert_eq!(delivery.clear_count(), 0);
        assert_eq!(
            ids(delivery.events()),
            vec!["old-birthday-daybefore", "old-birthday-dayof"]
        );
    }

    #[tokio::test]
    async fn flush_failure_is_reported() {
        let now = at(2026, 4, 1, 12, 0);
        let delivery = InMemoryDelivery::authorized(64).fail_flush();
        let snapshot = ContactSnapshot::new(vec![BirthdayRecord::new("a", "A", "", 4, 10)]);
        let scheduler = BirthdayScheduler::new(delivery, config(64));

        let err = scheduler.reschedule(&snapshot, now).await.unwrap_err();
        assert!(matches!(err, ScheduleError::Flush(_)));
    }

    #[test]
    fn schedule_error_names_cause_once() {
        use std::error::Error;

        let err = ScheduleError::Clear(DeliveryError::Unavailable("offline".to_string()));
        assert_eq!(err.to_string(), "clearing outstanding events failed");
        let source = err.source().unwrap().to_string();
        assert_eq!(source, "delivery service unavailable: offline");
    }
}
