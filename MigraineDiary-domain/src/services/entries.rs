use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, instrument};
use validator::Validate;

use crate::entities::conversions;
use crate::entities::entry::{CreateEntryRequest, EntryFilter, EntryQuery, PainEntry, UpdateEntryRequest};
use crate::services::error::ServiceError;
use migraine_diary_data::repository::EntryRepositoryTrait;

/// Default look-back window when a list request has no lower bound
pub const DEFAULT_LIST_DAYS: i64 = 30;
pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

/// How far in the future an entry timestamp may lie (clock skew between devices)
pub const MAX_FUTURE_SKEW_MINUTES: i64 = 5;

/// Trait for pain entry operations
#[async_trait]
pub trait EntryServiceTrait: Send + Sync {
    /// Validate a create request against `now`
    fn validate_create_request(&self, request: &CreateEntryRequest, now: DateTime<Utc>) -> Result<(), ServiceError>;

    async fn create_entry(&self, user_id: &str, request: CreateEntryRequest) -> Result<PainEntry, ServiceError>;

    async fn get_entry(&self, user_id: &str, id: &str) -> Result<PainEntry, ServiceError>;

    /// Entries in the query window plus the total count before pagination
    async fn list_entries(&self, user_id: &str, query: &EntryQuery) -> Result<(Vec<PainEntry>, usize), ServiceError>;

    /// Every entry in `[from, to]`, oldest first
    async fn entries_in_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PainEntry>, ServiceError>;

    async fn update_entry(
        &self,
        user_id: &str,
        id: &str,
        request: UpdateEntryRequest,
    ) -> Result<PainEntry, ServiceError>;

    async fn delete_entry(&self, user_id: &str, id: &str) -> Result<(), ServiceError>;
}

/// Pain entry service backed by the entry repository
pub struct EntryService {
    repository: Arc<dyn EntryRepositoryTrait + Send + Sync>,
}

impl EntryService {
    pub fn new(repository: Arc<dyn EntryRepositoryTrait + Send + Sync>) -> Self {
        Self { repository }
    }

    fn check_timestamp(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if timestamp > now + Duration::minutes(MAX_FUTURE_SKEW_MINUTES) {
            return Err(ServiceError::Validation(
                "timestamp: Entry timestamp cannot be in the future".to_string(),
            ));
        }
        Ok(())
    }

    fn check_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ServiceError> {
        if latitude.is_some() != longitude.is_some() {
            return Err(ServiceError::Validation(
                "location: Latitude and longitude must be given together".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve an optional window; missing bounds default to the last 30 days
    pub fn resolve_window(
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(DateTime<Utc>, DateTime<Utc>), ServiceError> {
        let to = to.unwrap_or(now);
        let from = from.unwrap_or(to - Duration::days(DEFAULT_LIST_DAYS));
        if from > to {
            return Err(ServiceError::Validation("from: Start of range must not be after its end".to_string()));
        }
        Ok((from, to))
    }

    async fn load(&self, user_id: &str, id: &str) -> Result<PainEntry, ServiceError> {
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        self.repository
            .get(user_id, uuid)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Entry with ID {} not found", id)))
    }
}

#[async_trait]
impl EntryServiceTrait for EntryService {
    fn validate_create_request(&self, request: &CreateEntryRequest, now: DateTime<Utc>) -> Result<(), ServiceError> {
        request.validate()?;
        Self::check_coordinates(request.latitude, request.longitude)?;
        if let Some(timestamp) = request.timestamp {
            Self::check_timestamp(timestamp, now)?;
        }
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn create_entry(&self, user_id: &str, request: CreateEntryRequest) -> Result<PainEntry, ServiceError> {
        let now = Utc::now();
        self.validate_create_request(&request, now)?;

        let new_entry = conversions::convert_to_data_new_entry(user_id, &request, now);
        let entry = self.repository.create(new_entry).await?;
        debug!("Created entry {}", entry.id);
        Ok(entry)
    }

    async fn get_entry(&self, user_id: &str, id: &str) -> Result<PainEntry, ServiceError> {
        self.load(user_id, id).await
    }

    #[instrument(skip(self))]
    async fn list_entries(&self, user_id: &str, query: &EntryQuery) -> Result<(Vec<PainEntry>, usize), ServiceError> {
        let (from, to) = Self::resolve_window(query.from, query.to, Utc::now())?;
        let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT);

        let filter = EntryFilter {
            from: Some(from),
            to: Some(to),
            limit: Some(limit),
            offset: query.offset,
            sort_desc: query.sort_desc.unwrap_or(true),
            ..EntryFilter::default()
        };

        Ok(self.repository.list(user_id, &filter).await?)
    }

    async fn entries_in_range(
        &self,
        user_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PainEntry>, ServiceError> {
        let (entries, _) = self.repository.list(user_id, &EntryFilter::range(from, to)).await?;
        Ok(entries)
    }

    #[instrument(skip(self, request))]
    async fn update_entry(
        &self,
        user_id: &str,
        id: &str,
        request: UpdateEntryRequest,
    ) -> Result<PainEntry, ServiceError> {
        request.validate()?;
        if let Some(timestamp) = request.timestamp {
            Self::check_timestamp(timestamp, Utc::now())?;
        }

        let mut entry = self.load(user_id, id).await?;
        conversions::apply_entry_update(&mut entry, &request);
        Self::check_coordinates(entry.latitude, entry.longitude)?;

        Ok(self.repository.update(&entry).await?)
    }

    #[instrument(skip(self))]
    async fn delete_entry(&self, user_id: &str, id: &str) -> Result<(), ServiceError> {
        let uuid = conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        if !self.repository.delete(user_id, uuid).await? {
            return Err(ServiceError::NotFound(format!("Entry with ID {} not found", id)));
        }
        Ok(())
    }
}
