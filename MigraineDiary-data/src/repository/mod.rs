// Repository module structure
pub mod errors;
mod rows;

mod account;
mod assessment;
mod consent;
mod entry;
mod medication;
mod notification;
mod reminder;
mod share;
mod weather;

// Re-export commonly used types
pub use errors::RepositoryError;

pub use account::{AccountRepository, AccountRepositoryTrait};
pub use assessment::{AssessmentRepository, AssessmentRepositoryTrait};
pub use consent::{ConsentRepository, ConsentRepositoryTrait};
pub use entry::{EntryRepository, EntryRepositoryTrait};
pub use medication::{MedicationRepository, MedicationRepositoryTrait};
pub use notification::{PushSubscriptionRepository, PushSubscriptionRepositoryTrait};
pub use reminder::{ReminderRepository, ReminderRepositoryTrait};
pub use share::{ShareRepository, ShareRepositoryTrait};
pub use weather::{WeatherRepository, WeatherRepositoryTrait};
