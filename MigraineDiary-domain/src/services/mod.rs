// Domain services
// This module contains business logic implementations.

pub mod account;
pub mod ai_report;
pub mod assessments;
pub mod consents;
pub mod entries;
pub mod error;
pub mod medications;
pub mod pdf;
pub mod reminders;
pub mod reports;
pub mod shares;
pub mod statistics;
pub mod weather;

// Re-export services and their error type
pub use account::{AccountRepositories, AccountService};
pub use ai_report::AiReportService;
pub use assessments::AssessmentService;
pub use consents::ConsentService;
pub use entries::{EntryService, EntryServiceTrait};
pub use error::ServiceError;
pub use medications::{MedicationLimitService, MedicationService};
pub use reminders::ReminderService;
pub use reports::ReportService;
pub use shares::ShareService;
pub use statistics::StatisticsService;
pub use weather::WeatherService;
