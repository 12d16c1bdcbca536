//! In-process background jobs

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::services::reminders::ReminderService;

/// Periodically runs the due-reminder processor
pub struct ReminderScheduler;

impl ReminderScheduler {
    /// Start the polling loop; a zero interval leaves reminders to the cron endpoint
    pub fn spawn(service: Arc<ReminderService>, every: Duration) -> Option<JoinHandle<()>> {
        if every.is_zero() {
            info!("Reminder scheduler disabled");
            return None;
        }

        info!("Starting reminder scheduler (interval: {:?})", every);
        Some(tokio::spawn(async move {
            let mut interval = time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                debug!("Running scheduled reminder processing");
                match service.process_due(Utc::now()).await {
                    Ok(report) if report.claimed > 0 => {
                        info!("Processed {} reminders, {} notifications sent", report.claimed, report.sent);
                    }
                    Ok(_) => {}
                    Err(e) => error!("Reminder processing failed: {}", e),
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::reminder::{
        CreatePushSubscriptionRequest, CreateReminderRequest, ReminderKind, ReminderStatus, RepeatInterval,
    };
    use crate::testing::RecordingPushSender;
    use migraine_diary_data::database::DatabasePool;
    use migraine_diary_data::repository::{PushSubscriptionRepository, ReminderRepository};

    #[tokio::test]
    async fn test_zero_interval_does_not_spawn() {
        let pool = DatabasePool::in_memory().unwrap();
        let service = Arc::new(ReminderService::new(
            Arc::new(ReminderRepository::new(pool.clone())),
            Arc::new(PushSubscriptionRepository::new(pool)),
            Arc::new(RecordingPushSender::new()),
        ));
        assert!(ReminderScheduler::spawn(service, Duration::ZERO).is_none());
    }

    #[tokio::test]
    async fn test_loop_delivers_due_reminders() {
        let pool = DatabasePool::in_memory().unwrap();
        let sender = Arc::new(RecordingPushSender::new());
        let service = Arc::new(ReminderService::new(
            Arc::new(ReminderRepository::new(pool.clone())),
            Arc::new(PushSubscriptionRepository::new(pool)),
            sender.clone(),
        ));

        service
            .subscribe(
                "user-1",
                CreatePushSubscriptionRequest {
                    endpoint: "https://push.example/device".to_string(),
                },
            )
            .await
            .unwrap();
        service
            .create(
                "user-1",
                CreateReminderRequest {
                    kind: ReminderKind::Medication,
                    title: "Take magnesium".to_string(),
                    body: None,
                    medication_name: Some("Magnesium".to_string()),
                    date_time: Utc::now(),
                    repeat: RepeatInterval::None,
                },
            )
            .await
            .unwrap();

        let handle = ReminderScheduler::spawn(service.clone(), Duration::from_millis(20)).unwrap();
        time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert_eq!(sender.sent().len(), 1);
        let completed = service.list("user-1", Some(ReminderStatus::Completed)).await.unwrap();
        assert_eq!(completed.len(), 1);
    }
}
