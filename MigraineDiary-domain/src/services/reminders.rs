use std::sync::Arc;

use chrono::{DateTime, Duration, Months, Utc};
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

use crate::clients::push::{NotificationError, NotificationSender, PushMessage};
use crate::entities::conversions;
use crate::entities::reminder::{
    CreatePushSubscriptionRequest, CreateReminderRequest, PushSubscription, Reminder, ReminderKind,
    ReminderRunReport, ReminderStatus, RepeatInterval, UpdateReminderRequest,
};
use crate::services::error::ServiceError;
use migraine_diary_data::repository::{PushSubscriptionRepositoryTrait, ReminderRepositoryTrait};

/// Reminders due within this many minutes are sent in the current run
pub const DUE_WINDOW_MINUTES: i64 = 5;

/// Claims older than this are assumed to belong to a crashed run
pub const STALE_CLAIM_MINUTES: i64 = 10;

/// Next firing time strictly after `now`, or `None` for one-off reminders
///
/// Monthly reminders keep their day of month where possible and clamp to the
/// last day of shorter months (Jan 31 -> Feb 29 -> Mar 31).
pub fn next_occurrence(
    date_time: DateTime<Utc>,
    repeat: RepeatInterval,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let step = match repeat {
        RepeatInterval::None => return None,
        RepeatInterval::Daily => Duration::days(1),
        RepeatInterval::Weekly => Duration::weeks(1),
        RepeatInterval::Monthly => return next_monthly(date_time, now),
    };

    if date_time > now {
        return Some(date_time + step);
    }
    let elapsed_steps = (now - date_time).num_seconds() / step.num_seconds();
    let mut next = date_time + step * (elapsed_steps as i32 + 1);
    while next <= now {
        next = next + step;
    }
    Some(next)
}

fn next_monthly(date_time: DateTime<Utc>, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let mut months = 1u32;
    loop {
        let candidate = date_time.checked_add_months(Months::new(months))?;
        if candidate > now {
            return Some(candidate);
        }
        months += 1;
    }
}

/// Notification shown for a reminder
pub fn message_for(reminder: &Reminder) -> PushMessage {
    let body = match (&reminder.body, reminder.kind, &reminder.medication_name) {
        (Some(body), _, _) => body.clone(),
        (None, ReminderKind::Medication, Some(name)) => format!("Time to take {}", name),
        (None, ReminderKind::Medication, None) => "Time to take your medication".to_string(),
        (None, ReminderKind::Appointment, _) => "You have an upcoming appointment".to_string(),
    };

    PushMessage {
        title: reminder.title.clone(),
        body,
        data: serde_json::json!({
            "reminder_id": reminder.id,
            "kind": reminder.kind.as_str(),
        }),
    }
}

enum Outcome {
    Completed,
    Rescheduled,
    Failed,
}

/// Reminder CRUD, push subscriptions and the due-reminder processor
pub struct ReminderService {
    reminders: Arc<dyn ReminderRepositoryTrait + Send + Sync>,
    subscriptions: Arc<dyn PushSubscriptionRepositoryTrait + Send + Sync>,
    sender: Arc<dyn NotificationSender>,
}

impl ReminderService {
    pub fn new(
        reminders: Arc<dyn ReminderRepositoryTrait + Send + Sync>,
        subscriptions: Arc<dyn PushSubscriptionRepositoryTrait + Send + Sync>,
        sender: Arc<dyn NotificationSender>,
    ) -> Self {
        Self {
            reminders,
            subscriptions,
            sender,
        }
    }

    pub async fn list(&self, user_id: &str, status: Option<ReminderStatus>) -> Result<Vec<Reminder>, ServiceError> {
        Ok(self.reminders.list(user_id, status).await?)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> Result<Reminder, ServiceError> {
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        self.reminders
            .get(user_id, uuid)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Reminder with ID {} not found", id)))
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, user_id: &str, request: CreateReminderRequest) -> Result<Reminder, ServiceError> {
        request.validate()?;
        let reminder = conversions::convert_to_data_new_reminder(user_id, &request);
        if reminder.title.is_empty() {
            return Err(ServiceError::Validation("title: Title must not be blank".to_string()));
        }
        Ok(self.reminders.create(reminder).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        request: UpdateReminderRequest,
    ) -> Result<Reminder, ServiceError> {
        request.validate()?;
        if let Some(status) = request.status {
            if !matches!(status, ReminderStatus::Pending | ReminderStatus::Cancelled) {
                return Err(ServiceError::Validation(
                    "status: Only pending or cancelled can be set".to_string(),
                ));
            }
        }

        let mut reminder = self.get(user_id, id).await?;
        if reminder.status == ReminderStatus::Processing {
            return Err(ServiceError::Conflict(format!("Reminder {} is being delivered", id)));
        }
        conversions::apply_reminder_update(&mut reminder, &request);
        if reminder.title.is_empty() {
            return Err(ServiceError::Validation("title: Title must not be blank".to_string()));
        }
        Ok(self.reminders.update(&reminder).await?)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), ServiceError> {
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        if !self.reminders.delete(user_id, uuid).await? {
            return Err(ServiceError::NotFound(format!("Reminder with ID {} not found", id)));
        }
        Ok(())
    }

    pub async fn list_subscriptions(&self, user_id: &str) -> Result<Vec<PushSubscription>, ServiceError> {
        Ok(self.subscriptions.list_for_user(user_id).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn subscribe(
        &self,
        user_id: &str,
        request: CreatePushSubscriptionRequest,
    ) -> Result<PushSubscription, ServiceError> {
        request.validate()?;
        Ok(self.subscriptions.upsert(user_id, request.endpoint.trim()).await?)
    }

    pub async fn unsubscribe(&self, user_id: &str, id: &str) -> Result<(), ServiceError> {
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        if !self.subscriptions.delete(user_id, uuid).await? {
            return Err(ServiceError::NotFound(format!("Subscription with ID {} not found", id)));
        }
        Ok(())
    }

    /// Send every reminder due by `now + DUE_WINDOW_MINUTES`
    #[instrument(skip(self))]
    pub async fn process_due(&self, now: DateTime<Utc>) -> Result<ReminderRunReport, ServiceError> {
        let mut report = ReminderRunReport {
            released_stale: self
                .reminders
                .release_stale(now - Duration::minutes(STALE_CLAIM_MINUTES))
                .await?,
            ..ReminderRunReport::default()
        };
        if report.released_stale > 0 {
            warn!("Released {} stale reminder claims", report.released_stale);
        }

        let due = self.reminders.due(now + Duration::minutes(DUE_WINDOW_MINUTES)).await?;
        report.due = due.len();

        for reminder in due {
            match self.reminders.claim(reminder.id, now).await {
                Ok(true) => report.claimed += 1,
                Ok(false) => {
                    debug!("Reminder {} already claimed", reminder.id);
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    error!("Failed to claim reminder {}: {}", reminder.id, e);
                    report.failed += 1;
                    continue;
                }
            }

            match self.process_claimed(&reminder, now, &mut report).await {
                Ok(Outcome::Completed) => report.completed += 1,
                Ok(Outcome::Rescheduled) => report.rescheduled += 1,
                Ok(Outcome::Failed) => report.failed += 1,
                Err(e) => {
                    error!("Failed to finish reminder {}: {}", reminder.id, e);
                    report.failed += 1;
                    if let Err(e) = self.reminders.release(reminder.id, now).await {
                        error!("Failed to release reminder {}: {}", reminder.id, e);
                    }
                }
            }
        }

        info!(
            due = report.due,
            claimed = report.claimed,
            sent = report.sent,
            failed = report.failed,
            "Reminder run finished"
        );
        Ok(report)
    }

    async fn process_claimed(
        &self,
        reminder: &Reminder,
        now: DateTime<Utc>,
        report: &mut ReminderRunReport,
    ) -> Result<Outcome, ServiceError> {
        let delivered = self.deliver(reminder).await?;
        report.sent += delivered.sent;

        if delivered.failed > 0 && delivered.sent == 0 {
            warn!("Delivery of reminder {} failed, releasing for retry", reminder.id);
            self.reminders.release(reminder.id, now).await?;
            return Ok(Outcome::Failed);
        }

        match next_occurrence(reminder.date_time, reminder.repeat, now) {
            Some(next) => {
                self.reminders.reschedule(reminder.id, next, now).await?;
                Ok(Outcome::Rescheduled)
            }
            None => {
                self.reminders.complete(reminder.id, now).await?;
                Ok(Outcome::Completed)
            }
        }
    }

    async fn deliver(&self, reminder: &Reminder) -> Result<Delivery, ServiceError> {
        let subscriptions = self.subscriptions.list_for_user(&reminder.user_id).await?;
        let message = message_for(reminder);
        let mut delivery = Delivery::default();

        for subscription in subscriptions {
            match self.sender.send(&subscription.endpoint, &message).await {
                Ok(()) => delivery.sent += 1,
                Err(NotificationError::Gone(_)) => {
                    info!("Removing expired push subscription {}", subscription.id);
                    self.subscriptions.delete_by_id(subscription.id).await?;
                }
                Err(e) => {
                    warn!("Push to subscription {} failed: {}", subscription.id, e);
                    delivery.failed += 1;
                }
            }
        }

        Ok(delivery)
    }
}

#[derive(Debug, Default)]
struct Delivery {
    sent: usize,
    failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::push::MockNotificationSender;
    use chrono::TimeZone;
    use migraine_diary_data::database::DatabasePool;
    use migraine_diary_data::repository::{PushSubscriptionRepository, ReminderRepository};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn service_with(sender: MockNotificationSender) -> ReminderService {
        let pool = DatabasePool::in_memory().unwrap();
        ReminderService::new(
            Arc::new(ReminderRepository::new(pool.clone())),
            Arc::new(PushSubscriptionRepository::new(pool)),
            Arc::new(sender),
        )
    }

    fn reminder_request(date_time: DateTime<Utc>, repeat: RepeatInterval) -> CreateReminderRequest {
        CreateReminderRequest {
            kind: ReminderKind::Medication,
            title: "Magnesium".to_string(),
            body: None,
            medication_name: Some("Magnesium".to_string()),
            date_time,
            repeat,
        }
    }

    #[test]
    fn test_next_occurrence_daily_and_weekly() {
        let now = at(2024, 3, 10, 9);
        assert_eq!(next_occurrence(at(2024, 3, 10, 8), RepeatInterval::Daily, now), Some(at(2024, 3, 11, 8)));
        // Missed several days: lands on the first slot after now
        assert_eq!(next_occurrence(at(2024, 3, 1, 8), RepeatInterval::Daily, now), Some(at(2024, 3, 11, 8)));
        assert_eq!(next_occurrence(at(2024, 3, 10, 9), RepeatInterval::Daily, now), Some(at(2024, 3, 11, 9)));
        assert_eq!(next_occurrence(at(2024, 3, 8, 8), RepeatInterval::Weekly, now), Some(at(2024, 3, 15, 8)));
        assert_eq!(next_occurrence(at(2024, 3, 10, 8), RepeatInterval::None, now), None);
    }

    #[test]
    fn test_next_occurrence_from_reminder_slightly_ahead() {
        // Picked up inside the due window, before its own time
        let now = at(2024, 3, 10, 9);
        let date_time = now + Duration::minutes(3);
        assert_eq!(
            next_occurrence(date_time, RepeatInterval::Daily, now),
            Some(date_time + Duration::days(1))
        );
    }

    #[test]
    fn test_next_occurrence_monthly_clamps_to_month_end() {
        assert_eq!(
            next_occurrence(at(2024, 1, 31, 8), RepeatInterval::Monthly, at(2024, 1, 31, 9)),
            Some(at(2024, 2, 29, 8))
        );
        // Day of month is kept relative to the original date
        assert_eq!(
            next_occurrence(at(2024, 1, 31, 8), RepeatInterval::Monthly, at(2024, 3, 1, 0)),
            Some(at(2024, 3, 31, 8))
        );
        assert_eq!(
            next_occurrence(at(2023, 1, 31, 8), RepeatInterval::Monthly, at(2023, 2, 1, 0)),
            Some(at(2023, 2, 28, 8))
        );
    }

    #[test]
    fn test_message_falls_back_to_medication_name() {
        let reminder = Reminder {
            id: uuid::Uuid::new_v4(),
            user_id: "user-1".to_string(),
            kind: ReminderKind::Medication,
            title: "Evening dose".to_string(),
            body: None,
            medication_name: Some("Topiramate".to_string()),
            date_time: Utc::now(),
            repeat: RepeatInterval::Daily,
            status: ReminderStatus::Pending,
            last_sent_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(message_for(&reminder).body, "Time to take Topiramate");
    }

    #[tokio::test]
    async fn test_process_due_completes_and_reschedules() {
        let mut sender = MockNotificationSender::new();
        sender.expect_send().times(2).returning(|_, _| Ok(()));
        let service = service_with(sender);
        let now = Utc::now();

        service
            .subscribe(
                "user-1",
                CreatePushSubscriptionRequest {
                    endpoint: "device-1".to_string(),
                },
            )
            .await
            .unwrap();
        let once = service
            .create("user-1", reminder_request(now - Duration::minutes(1), RepeatInterval::None))
            .await
            .unwrap();
        let daily = service
            .create("user-1", reminder_request(now + Duration::minutes(2), RepeatInterval::Daily))
            .await
            .unwrap();
        service
            .create("user-1", reminder_request(now + Duration::hours(2), RepeatInterval::None))
            .await
            .unwrap();

        let report = service.process_due(now).await.unwrap();
        assert_eq!(report.due, 2);
        assert_eq!(report.claimed, 2);
        assert_eq!(report.sent, 2);
        assert_eq!(report.completed, 1);
        assert_eq!(report.rescheduled, 1);
        assert_eq!(report.failed, 0);

        let once = service.get("user-1", &once.id.to_string()).await.unwrap();
        assert_eq!(once.status, ReminderStatus::Completed);
        let daily_after = service.get("user-1", &daily.id.to_string()).await.unwrap();
        assert_eq!(daily_after.status, ReminderStatus::Pending);
        assert_eq!(daily_after.date_time, daily.date_time + Duration::days(1));
        assert!(daily_after.last_sent_at.is_some());

        // Second run finds nothing
        let report = service.process_due(now).await.unwrap();
        assert_eq!(report.due, 0);
    }

    #[tokio::test]
    async fn test_failed_delivery_releases_claim() {
        let mut sender = MockNotificationSender::new();
        sender.expect_send().times(1).returning(|_, _| {
            Err(NotificationError::Gateway {
                status: 500,
                body: "down".to_string(),
            })
        });
        let service = service_with(sender);
        let now = Utc::now();

        service
            .subscribe(
                "user-1",
                CreatePushSubscriptionRequest {
                    endpoint: "device-1".to_string(),
                },
            )
            .await
            .unwrap();
        let reminder = service
            .create("user-1", reminder_request(now, RepeatInterval::None))
            .await
            .unwrap();

        let report = service.process_due(now).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.sent, 0);

        let stored = service.get("user-1", &reminder.id.to_string()).await.unwrap();
        assert_eq!(stored.status, ReminderStatus::Pending);
    }

    #[tokio::test]
    async fn test_gone_subscription_is_removed_and_reminder_completes() {
        let mut sender = MockNotificationSender::new();
        sender
            .expect_send()
            .times(1)
            .returning(|endpoint, _| Err(NotificationError::Gone(endpoint.to_string())));
        let service = service_with(sender);
        let now = Utc::now();

        service
            .subscribe(
                "user-1",
                CreatePushSubscriptionRequest {
                    endpoint: "stale-device".to_string(),
                },
            )
            .await
            .unwrap();
        service
            .create("user-1", reminder_request(now, RepeatInterval::None))
            .await
            .unwrap();

        let report = service.process_due(now).await.unwrap();
        assert_eq!(report.completed, 1);
        assert!(service.list_subscriptions("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_subscriptions_still_completes() {
        let mut sender = MockNotificationSender::new();
        sender.expect_send().never();
        let service = service_with(sender);
        let now = Utc::now();

        service
            .create("user-1", reminder_request(now, RepeatInterval::Weekly))
            .await
            .unwrap();

        let report = service.process_due(now).await.unwrap();
        assert_eq!(report.rescheduled, 1);
        assert_eq!(report.sent, 0);
    }

    #[tokio::test]
    async fn test_update_rejects_processing_status() {
        let service = service_with(MockNotificationSender::new());
        let reminder = service
            .create("user-1", reminder_request(Utc::now(), RepeatInterval::None))
            .await
            .unwrap();

        let result = service
            .update(
                "user-1",
                &reminder.id.to_string(),
                UpdateReminderRequest {
                    status: Some(ReminderStatus::Completed),
                    ..UpdateReminderRequest::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }
}
