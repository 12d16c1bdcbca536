// Domain entities and value objects
pub mod assessment;
pub mod consent;
pub mod conversions;
pub mod entry;
pub mod medication;
pub mod reminder;
pub mod report;
pub mod share;
pub mod statistics;
pub mod weather;

// Re-export common types for easier imports
pub use assessment::{Hit6Category, Hit6Request, Hit6Result};
pub use consent::{ConsentType, GrantConsentRequest, UserConsent};
pub use entry::{CreateEntryRequest, EntryQuery, PainEntry, UpdateEntryRequest};
pub use medication::{
    CreateLimitRequest, CreateMedicationRequest, LimitCheckRequest, LimitCheckResult, LimitPeriod, LimitStatus,
    MedicationLimit, UpdateLimitRequest, UpdateMedicationRequest, UserMedication,
};
pub use reminder::{
    CreatePushSubscriptionRequest, CreateReminderRequest, PushSubscription, Reminder, ReminderKind,
    ReminderRunReport, ReminderStatus, RepeatInterval, UpdateReminderRequest,
};
pub use report::{AccountExport, AiReport, AiReportRequest, DeletionReport, ReportData, ReportQuery};
pub use share::{CreateShareRequest, DoctorShare, SharedDiary};
pub use statistics::{EntryStatistics, SampleTier, StatisticsQuery};
pub use weather::{BackfillReport, WeatherLog};
