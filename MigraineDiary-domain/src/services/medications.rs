use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};
use validator::Validate;

use crate::entities::conversions;
use crate::entities::entry::{EntryFilter, PainEntry};
use crate::entities::medication::{
    CreateLimitRequest, CreateMedicationRequest, LimitCheckRequest, LimitCheckResult, LimitPeriod, LimitStatus,
    MedicationLimit, UpdateLimitRequest, UpdateMedicationRequest, UserMedication,
};
use crate::services::error::ServiceError;
use migraine_diary_data::repository::{EntryRepositoryTrait, MedicationRepositoryTrait};

/// The user's personal medication list
pub struct MedicationService {
    repository: Arc<dyn MedicationRepositoryTrait + Send + Sync>,
}

impl MedicationService {
    pub fn new(repository: Arc<dyn MedicationRepositoryTrait + Send + Sync>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<UserMedication>, ServiceError> {
        Ok(self.repository.list_medications(user_id).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, user_id: &str, request: CreateMedicationRequest) -> Result<UserMedication, ServiceError> {
        request.validate()?;
        let medication = conversions::convert_to_data_new_medication(user_id, &request);
        if medication.name.is_empty() {
            return Err(ServiceError::Validation("name: Name must not be blank".to_string()));
        }
        Ok(self.repository.create_medication(medication).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        request: UpdateMedicationRequest,
    ) -> Result<UserMedication, ServiceError> {
        request.validate()?;
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        let mut medication = self
            .repository
            .get_medication(user_id, uuid)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Medication with ID {} not found", id)))?;

        conversions::apply_medication_update(&mut medication, &request);
        if medication.name.is_empty() {
            return Err(ServiceError::Validation("name: Name must not be blank".to_string()));
        }
        Ok(self.repository.update_medication(&medication).await?)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), ServiceError> {
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        if !self.repository.delete_medication(user_id, uuid).await? {
            return Err(ServiceError::NotFound(format!("Medication with ID {} not found", id)));
        }
        Ok(())
    }
}

/// Start of the counting window for a limit period
///
/// `day` counts since midnight UTC; `week` and `month` are rolling windows
/// of 7 and 30 days.
pub fn window_start(period: LimitPeriod, now: DateTime<Utc>) -> DateTime<Utc> {
    match period {
        LimitPeriod::Day => now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now),
        LimitPeriod::Week => now - Duration::days(7),
        LimitPeriod::Month => now - Duration::days(30),
    }
}

/// Count intakes of `medication` across entries; every array element counts
pub fn count_intakes(entries: &[PainEntry], medication: &str) -> u32 {
    let wanted = medication.trim().to_lowercase();
    entries
        .iter()
        .flat_map(|entry| entry.medications.iter())
        .filter(|name| name.trim().to_lowercase() == wanted)
        .count() as u32
}

/// Limit configuration and usage checks
pub struct MedicationLimitService {
    limits: Arc<dyn MedicationRepositoryTrait + Send + Sync>,
    entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
}

impl MedicationLimitService {
    pub fn new(
        limits: Arc<dyn MedicationRepositoryTrait + Send + Sync>,
        entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
    ) -> Self {
        Self { limits, entries }
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<MedicationLimit>, ServiceError> {
        Ok(self.limits.list_limits(user_id, false).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn create(&self, user_id: &str, request: CreateLimitRequest) -> Result<MedicationLimit, ServiceError> {
        request.validate()?;
        let limit = conversions::convert_to_data_new_limit(user_id, &request);
        if limit.medication_name.is_empty() {
            return Err(ServiceError::Validation(
                "medication_name: Medication name must not be blank".to_string(),
            ));
        }
        Ok(self.limits.create_limit(limit).await?)
    }

    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        user_id: &str,
        id: &str,
        request: UpdateLimitRequest,
    ) -> Result<MedicationLimit, ServiceError> {
        request.validate()?;
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        let mut limit = self
            .limits
            .get_limit(user_id, uuid)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Limit with ID {} not found", id)))?;

        if let Some(count) = request.limit_count {
            limit.limit_count = count;
        }
        if let Some(period) = request.period {
            limit.period = period;
        }
        if let Some(active) = request.is_active {
            limit.is_active = active;
        }
        Ok(self.limits.update_limit(&limit).await?)
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> Result<(), ServiceError> {
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        if !self.limits.delete_limit(user_id, uuid).await? {
            return Err(ServiceError::NotFound(format!("Limit with ID {} not found", id)));
        }
        Ok(())
    }

    /// Usage against every active limit, optionally restricted to some medications
    #[instrument(skip(self, request))]
    pub async fn check(
        &self,
        user_id: &str,
        request: &LimitCheckRequest,
        now: DateTime<Utc>,
    ) -> Result<Vec<LimitCheckResult>, ServiceError> {
        let wanted: Vec<String> = conversions::normalize_names(&request.medication_names)
            .into_iter()
            .map(|name| name.to_lowercase())
            .collect();

        let limits: Vec<MedicationLimit> = self
            .limits
            .list_limits(user_id, true)
            .await?
            .into_iter()
            .filter(|limit| wanted.is_empty() || wanted.contains(&limit.medication_name.to_lowercase()))
            .collect();

        if limits.is_empty() {
            return Ok(Vec::new());
        }

        // One query covering the widest window; narrower periods filter in memory
        let earliest = limits
            .iter()
            .map(|limit| window_start(limit.period, now))
            .min()
            .unwrap_or(now);
        let filter = EntryFilter {
            from: Some(earliest),
            to: Some(now),
            ..EntryFilter::default()
        };
        let (entries, _) = self.entries.list(user_id, &filter).await?;

        let results = limits
            .into_iter()
            .map(|limit| {
                let start = window_start(limit.period, now);
                let in_window: Vec<PainEntry> = entries
                    .iter()
                    .filter(|entry| entry.timestamp >= start)
                    .cloned()
                    .collect();
                let used = count_intakes(&in_window, &limit.medication_name);

                LimitCheckResult {
                    limit_id: limit.id,
                    medication_name: limit.medication_name,
                    period: limit.period,
                    limit: limit.limit_count,
                    used,
                    remaining: limit.limit_count.saturating_sub(used),
                    window_start: start,
                    status: LimitStatus::classify(used, limit.limit_count),
                }
            })
            .collect::<Vec<_>>();

        debug!("Checked {} medication limits", results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use migraine_diary_data::database::DatabasePool;
    use migraine_diary_data::models::NewPainEntry;
    use migraine_diary_data::repository::{EntryRepository, MedicationRepository};

    fn services() -> (MedicationService, MedicationLimitService, Arc<EntryRepository>) {
        let pool = DatabasePool::in_memory().unwrap();
        let medications = Arc::new(MedicationRepository::new(pool.clone()));
        let entries = Arc::new(EntryRepository::new(pool));
        (
            MedicationService::new(medications.clone()),
            MedicationLimitService::new(medications, entries.clone()),
            entries,
        )
    }

    fn entry_at(timestamp: DateTime<Utc>, medications: &[&str]) -> NewPainEntry {
        NewPainEntry {
            user_id: "user-1".to_string(),
            timestamp,
            pain_level: 5,
            pain_location: None,
            aura_type: None,
            triggers: vec![],
            medications: medications.iter().map(|m| m.to_string()).collect(),
            me_cfs_severity: None,
            notes: None,
            latitude: None,
            longitude: None,
        }
    }

    #[test]
    fn test_window_start_per_period() {
        let now = Utc.with_ymd_and_hms(2024, 5, 15, 17, 45, 0).unwrap();
        assert_eq!(window_start(LimitPeriod::Day, now), Utc.with_ymd_and_hms(2024, 5, 15, 0, 0, 0).unwrap());
        assert_eq!(window_start(LimitPeriod::Week, now), Utc.with_ymd_and_hms(2024, 5, 8, 17, 45, 0).unwrap());
        assert_eq!(window_start(LimitPeriod::Month, now), Utc.with_ymd_and_hms(2024, 4, 15, 17, 45, 0).unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_medication_is_conflict() {
        let (medications, _, _) = services();
        let request = CreateMedicationRequest {
            name: "Sumatriptan".to_string(),
            dosage: Some("50mg".to_string()),
            notes: None,
        };
        medications.create("user-1", request.clone()).await.unwrap();

        let duplicate = CreateMedicationRequest {
            name: " sumatriptan ".to_string(),
            ..request
        };
        let result = medications.create("user-1", duplicate).await;
        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_check_counts_every_occurrence_case_insensitively() {
        let (_, limits, entries) = services();
        let now = Utc::now();

        limits
            .create(
                "user-1",
                CreateLimitRequest {
                    medication_name: "Ibuprofen".to_string(),
                    limit_count: 4,
                    period: LimitPeriod::Week,
                },
            )
            .await
            .unwrap();

        entries
            .create(entry_at(now - Duration::days(1), &["ibuprofen", "Ibuprofen"]))
            .await
            .unwrap();
        entries
            .create(entry_at(now - Duration::days(2), &["IBUPROFEN", "Coffee"]))
            .await
            .unwrap();
        // Outside the rolling week
        entries
            .create(entry_at(now - Duration::days(9), &["Ibuprofen"]))
            .await
            .unwrap();

        let results = limits.check("user-1", &LimitCheckRequest::default(), now).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].used, 3);
        assert_eq!(results[0].remaining, 1);
        assert_eq!(results[0].status, LimitStatus::Ok);

        entries.create(entry_at(now - Duration::hours(1), &["Ibuprofen", "Ibuprofen"])).await.unwrap();
        let results = limits.check("user-1", &LimitCheckRequest::default(), now).await.unwrap();
        assert_eq!(results[0].used, 5);
        assert_eq!(results[0].remaining, 0);
        assert_eq!(results[0].status, LimitStatus::Exceeded);
    }

    #[tokio::test]
    async fn test_check_filters_by_name_and_skips_inactive() {
        let (_, limits, _) = services();
        let now = Utc::now();

        let paused = limits
            .create(
                "user-1",
                CreateLimitRequest {
                    medication_name: "Naproxen".to_string(),
                    limit_count: 2,
                    period: LimitPeriod::Day,
                },
            )
            .await
            .unwrap();
        limits
            .create(
                "user-1",
                CreateLimitRequest {
                    medication_name: "Rizatriptan".to_string(),
                    limit_count: 10,
                    period: LimitPeriod::Month,
                },
            )
            .await
            .unwrap();

        limits
            .update(
                "user-1",
                &paused.id.to_string(),
                UpdateLimitRequest {
                    is_active: Some(false),
                    ..UpdateLimitRequest::default()
                },
            )
            .await
            .unwrap();

        let all = limits.check("user-1", &LimitCheckRequest::default(), now).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].medication_name, "Rizatriptan");

        let request = LimitCheckRequest {
            medication_names: vec!["naproxen".to_string()],
        };
        assert!(limits.check("user-1", &request, now).await.unwrap().is_empty());
    }
}
