// Storage models shared by the repositories and the domain layer

pub mod assessment;
pub mod consent;
pub mod entry;
pub mod medication;
pub mod notification;
pub mod reminder;
pub mod share;
pub mod weather;

pub use assessment::{Hit6Assessment, NewHit6Assessment};
pub use consent::{ConsentType, UserConsent};
pub use entry::{EntryFilter, NewPainEntry, PainEntry};
pub use medication::{LimitPeriod, MedicationLimit, NewMedicationLimit, NewUserMedication, UserMedication};
pub use notification::PushSubscription;
pub use reminder::{NewReminder, Reminder, ReminderKind, ReminderStatus, RepeatInterval};
pub use share::{DoctorShare, NewDoctorShare};
pub use weather::{NewWeatherLog, WeatherLog};

/// Error returned when a stored enum value is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    /// Name of the enum being parsed
    pub kind: &'static str,
    /// The offending value
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
