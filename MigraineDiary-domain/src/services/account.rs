use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::logging::log_account_event;
use crate::entities::entry::EntryFilter;
use crate::entities::report::{AccountExport, DeletionReport};
use crate::services::error::ServiceError;
use migraine_diary_data::repository::{
    AccountRepositoryTrait, AssessmentRepositoryTrait, ConsentRepositoryTrait, EntryRepositoryTrait,
    MedicationRepositoryTrait, PushSubscriptionRepositoryTrait, ReminderRepositoryTrait, ShareRepositoryTrait,
    WeatherRepositoryTrait,
};

/// Repositories a data-portability export reads from
pub struct AccountRepositories {
    pub account: Arc<dyn AccountRepositoryTrait + Send + Sync>,
    pub entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
    pub medications: Arc<dyn MedicationRepositoryTrait + Send + Sync>,
    pub reminders: Arc<dyn ReminderRepositoryTrait + Send + Sync>,
    pub subscriptions: Arc<dyn PushSubscriptionRepositoryTrait + Send + Sync>,
    pub shares: Arc<dyn ShareRepositoryTrait + Send + Sync>,
    pub consents: Arc<dyn ConsentRepositoryTrait + Send + Sync>,
    pub assessments: Arc<dyn AssessmentRepositoryTrait + Send + Sync>,
    pub weather: Arc<dyn WeatherRepositoryTrait + Send + Sync>,
}

/// Export and erasure of everything a user owns
pub struct AccountService {
    repos: AccountRepositories,
}

impl AccountService {
    pub fn new(repos: AccountRepositories) -> Self {
        Self { repos }
    }

    #[instrument(skip(self))]
    pub async fn export(&self, user_id: &str) -> Result<AccountExport, ServiceError> {
        let all_entries = EntryFilter::default();
        let (entries, medications, limits, reminders, subscriptions, shares, consents, assessments) = futures::try_join!(
            self.repos.entries.list(user_id, &all_entries),
            self.repos.medications.list_medications(user_id),
            self.repos.medications.list_limits(user_id, false),
            self.repos.reminders.list(user_id, None),
            self.repos.subscriptions.list_for_user(user_id),
            self.repos.shares.list(user_id),
            self.repos.consents.list(user_id),
            self.repos.assessments.list(user_id, None),
        )?;
        let (entries, _) = entries;

        let weather_ids: Vec<Uuid> = entries
            .iter()
            .filter_map(|e| e.weather_id)
            .collect::<BTreeSet<Uuid>>()
            .into_iter()
            .collect();
        let weather_logs = if weather_ids.is_empty() {
            Vec::new()
        } else {
            self.repos.weather.get_many(&weather_ids).await?
        };

        log_account_event(user_id, "export", &format!("{} entries", entries.len()));
        Ok(AccountExport {
            user_id: user_id.to_string(),
            exported_at: Utc::now(),
            entries,
            medications,
            medication_limits: limits,
            reminders,
            push_subscriptions: subscriptions,
            doctor_shares: shares,
            consents,
            assessments,
            weather_logs,
        })
    }

    /// Remove every row owned by the user in one transaction
    ///
    /// Cached weather observations are shared between users and stay.
    #[instrument(skip(self))]
    pub async fn delete_all(&self, user_id: &str) -> Result<DeletionReport, ServiceError> {
        let deleted = self.repos.account.delete_all(user_id).await?;
        let total: usize = deleted.values().sum();

        info!("Deleted {} rows for erasure request", total);
        log_account_event(user_id, "erasure", &format!("{} rows", total));
        Ok(DeletionReport {
            user_id: user_id.to_string(),
            deleted,
            total,
        })
    }
}
