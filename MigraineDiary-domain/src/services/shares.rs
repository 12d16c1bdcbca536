use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use tracing::{info, instrument, warn};

use crate::auth::logging::log_share_access;
use crate::entities::consent::ConsentType;
use crate::entities::entry::{EntryFilter, PainEntry};
use crate::entities::share::{CreateShareRequest, DoctorShare, SharedDiary, MAX_SHARE_HOURS};
use crate::services::consents::ConsentService;
use crate::services::error::ServiceError;
use crate::services::statistics::StatisticsService;
use migraine_diary_data::models::NewDoctorShare;
use migraine_diary_data::repository::{EntryRepositoryTrait, RepositoryError, ShareRepositoryTrait};

/// Code characters; 0 O 1 I L are left out so codes can be read aloud
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 8;
const MAX_CODE_ATTEMPTS: usize = 5;

pub fn generate_code<R: Rng>(rng: &mut R) -> String {
    (0..CODE_LENGTH)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Codes are typed by hand: ignore case and whitespace
pub fn normalize_code(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Half-open `[start, end)` instants covering whole days `from..=to`
pub fn date_range_bounds(from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = from.and_hms_opt(0, 0, 0).map(|d| d.and_utc()).unwrap_or_default();
    let end = to
        .succ_opt()
        .and_then(|next| next.and_hms_opt(0, 0, 0))
        .map(|d| d.and_utc())
        .unwrap_or(start);
    (start, end)
}

fn strip_notes(entries: Vec<PainEntry>) -> Vec<PainEntry> {
    entries
        .into_iter()
        .map(|mut entry| {
            entry.notes = None;
            entry
        })
        .collect()
}

/// Physician access codes
pub struct ShareService {
    shares: Arc<dyn ShareRepositoryTrait + Send + Sync>,
    entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
    statistics: Arc<StatisticsService>,
    consents: Arc<ConsentService>,
    default_hours: u32,
}

impl ShareService {
    pub fn new(
        shares: Arc<dyn ShareRepositoryTrait + Send + Sync>,
        entries: Arc<dyn EntryRepositoryTrait + Send + Sync>,
        statistics: Arc<StatisticsService>,
        consents: Arc<ConsentService>,
        default_hours: u32,
    ) -> Self {
        Self {
            shares,
            entries,
            statistics,
            consents,
            default_hours: default_hours.clamp(1, MAX_SHARE_HOURS),
        }
    }

    #[instrument(skip(self, request))]
    pub async fn create(
        &self,
        user_id: &str,
        request: CreateShareRequest,
        now: DateTime<Utc>,
    ) -> Result<DoctorShare, ServiceError> {
        if request.from_date > request.to_date {
            return Err(ServiceError::Validation(
                "from_date: Start date must not be after end date".to_string(),
            ));
        }
        let hours = request.expires_in_hours.unwrap_or(self.default_hours);
        if !(1..=MAX_SHARE_HOURS).contains(&hours) {
            return Err(ServiceError::Validation(format!(
                "expires_in_hours: Lifetime must be between 1 and {} hours",
                MAX_SHARE_HOURS
            )));
        }

        self.consents.require(user_id, ConsentType::DoctorSharing).await?;

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let code = generate_code(&mut rand::thread_rng());
            let share = NewDoctorShare {
                user_id: user_id.to_string(),
                code,
                from_date: request.from_date,
                to_date: request.to_date,
                include_notes: request.include_notes,
                expires_at: now + Duration::hours(i64::from(hours)),
            };

            match self.shares.create(share).await {
                Ok(created) => {
                    info!("Created doctor share {} valid for {}h", created.id, hours);
                    return Ok(created);
                }
                Err(RepositoryError::Conflict(_)) => {
                    warn!("Share code collision on attempt {}", attempt);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ServiceError::Internal("Could not generate a unique share code".to_string()))
    }

    pub async fn list(&self, user_id: &str) -> Result<Vec<DoctorShare>, ServiceError> {
        Ok(self.shares.list(user_id).await?)
    }

    #[instrument(skip(self))]
    pub async fn revoke(&self, user_id: &str, id: &str, now: DateTime<Utc>) -> Result<(), ServiceError> {
        let uuid = crate::entities::conversions::parse_string_to_uuid(id).map_err(ServiceError::Validation)?;
        if !self.shares.revoke(user_id, uuid, now).await? {
            return Err(ServiceError::NotFound(format!("Active share with ID {} not found", id)));
        }
        Ok(())
    }

    /// Resolve a code into the shared view; unknown, expired and revoked codes all look the same
    #[instrument(skip(self, raw_code))]
    pub async fn open(&self, raw_code: &str, now: DateTime<Utc>) -> Result<(DoctorShare, SharedDiary), ServiceError> {
        let code = normalize_code(raw_code);
        let not_found = || ServiceError::NotFound("Share not found".to_string());

        if code.len() != CODE_LENGTH {
            log_share_access(None, false, "malformed code");
            return Err(not_found());
        }

        let share = match self.shares.find_by_code(&code).await? {
            Some(share) if share.is_active(now) => share,
            Some(share) => {
                log_share_access(Some(&share.user_id), false, "inactive share");
                return Err(not_found());
            }
            None => {
                log_share_access(None, false, "unknown code");
                return Err(not_found());
            }
        };

        self.shares.touch(share.id, now).await?;
        log_share_access(Some(&share.user_id), true, "share opened");

        let (from, before) = date_range_bounds(share.from_date, share.to_date);
        let (entries, _) = self.entries.list(&share.user_id, &EntryFilter::half_open(from, before)).await?;
        let statistics = self.statistics.for_entries(&entries, from, before).await?;
        let entries = if share.include_notes { entries } else { strip_notes(entries) };

        let diary = SharedDiary {
            from_date: share.from_date,
            to_date: share.to_date,
            expires_at: share.expires_at,
            include_notes: share.include_notes,
            entries,
            statistics,
        };
        Ok((share, diary))
    }
}
