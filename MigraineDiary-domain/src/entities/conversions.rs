use chrono::{DateTime, Utc};
use uuid::Uuid;

use migraine_diary_data::models::{
    NewMedicationLimit, NewPainEntry, NewReminder, NewUserMedication, PainEntry, Reminder, UserMedication,
};

use crate::entities::entry::{CreateEntryRequest, UpdateEntryRequest};
use crate::entities::medication::{CreateLimitRequest, CreateMedicationRequest, UpdateMedicationRequest};
use crate::entities::reminder::{CreateReminderRequest, UpdateReminderRequest};

/// Conversion functions between request entities and data models.
/// These functions follow the pattern convert_to_[target_layer]_[model_name].

/// Parse a path or query id into a UUID
pub fn parse_string_to_uuid(id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|_| format!("Invalid UUID format: {}", id))
}

/// Trim every name and drop the empty ones
pub fn normalize_names(names: &[String]) -> Vec<String> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Trim optional text; blank text becomes `None`
pub fn normalize_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

/// Convert a create request into the data model, stamping `now` when no time is given
pub fn convert_to_data_new_entry(user_id: &str, request: &CreateEntryRequest, now: DateTime<Utc>) -> NewPainEntry {
    NewPainEntry {
        user_id: user_id.to_string(),
        timestamp: request.timestamp.unwrap_or(now),
        pain_level: request.pain_level,
        pain_location: normalize_text(request.pain_location.as_deref()),
        aura_type: normalize_text(request.aura_type.as_deref()),
        triggers: normalize_names(&request.triggers),
        medications: normalize_names(&request.medications),
        me_cfs_severity: request.me_cfs_severity,
        notes: normalize_text(request.notes.as_deref()),
        latitude: request.latitude,
        longitude: request.longitude,
    }
}

/// Apply a partial update to a stored entry
pub fn apply_entry_update(entry: &mut PainEntry, request: &UpdateEntryRequest) {
    if let Some(timestamp) = request.timestamp {
        entry.timestamp = timestamp;
    }
    if let Some(pain_level) = request.pain_level {
        entry.pain_level = pain_level;
    }
    if let Some(location) = &request.pain_location {
        entry.pain_location = normalize_text(Some(location));
    }
    if let Some(aura) = &request.aura_type {
        entry.aura_type = normalize_text(Some(aura));
    }
    if let Some(triggers) = &request.triggers {
        entry.triggers = normalize_names(triggers);
    }
    if let Some(medications) = &request.medications {
        entry.medications = normalize_names(medications);
    }
    if let Some(severity) = request.me_cfs_severity {
        entry.me_cfs_severity = Some(severity);
    }
    if let Some(notes) = &request.notes {
        entry.notes = normalize_text(Some(notes));
    }
    // Moving the entry invalidates the linked observation
    if request.latitude.is_some() || request.longitude.is_some() {
        entry.latitude = request.latitude.or(entry.latitude);
        entry.longitude = request.longitude.or(entry.longitude);
        entry.weather_id = None;
    }
    if request.timestamp.is_some() && entry.coordinates().is_some() {
        entry.weather_id = None;
    }
}

pub fn convert_to_data_new_medication(user_id: &str, request: &CreateMedicationRequest) -> NewUserMedication {
    NewUserMedication {
        user_id: user_id.to_string(),
        name: request.name.trim().to_string(),
        dosage: normalize_text(request.dosage.as_deref()),
        notes: normalize_text(request.notes.as_deref()),
    }
}

pub fn apply_medication_update(medication: &mut UserMedication, request: &UpdateMedicationRequest) {
    if let Some(name) = &request.name {
        medication.name = name.trim().to_string();
    }
    if let Some(dosage) = &request.dosage {
        medication.dosage = normalize_text(Some(dosage));
    }
    if let Some(notes) = &request.notes {
        medication.notes = normalize_text(Some(notes));
    }
}

pub fn convert_to_data_new_limit(user_id: &str, request: &CreateLimitRequest) -> NewMedicationLimit {
    NewMedicationLimit {
        user_id: user_id.to_string(),
        medication_name: request.medication_name.trim().to_string(),
        limit_count: request.limit_count,
        period: request.period,
    }
}

pub fn convert_to_data_new_reminder(user_id: &str, request: &CreateReminderRequest) -> NewReminder {
    NewReminder {
        user_id: user_id.to_string(),
        kind: request.kind,
        title: request.title.trim().to_string(),
        body: normalize_text(request.body.as_deref()),
        medication_name: normalize_text(request.medication_name.as_deref()),
        date_time: request.date_time,
        repeat: request.repeat,
    }
}

pub fn apply_reminder_update(reminder: &mut Reminder, request: &UpdateReminderRequest) {
    if let Some(title) = &request.title {
        reminder.title = title.trim().to_string();
    }
    if let Some(body) = &request.body {
        reminder.body = normalize_text(Some(body));
    }
    if let Some(name) = &request.medication_name {
        reminder.medication_name = normalize_text(Some(name));
    }
    if let Some(date_time) = request.date_time {
        reminder.date_time = date_time;
    }
    if let Some(repeat) = request.repeat {
        reminder.repeat = repeat;
    }
    if let Some(status) = request.status {
        reminder.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_names_trims_and_drops_empty() {
        let names = vec![" Ibuprofen ".to_string(), "".to_string(), "   ".to_string(), "Coffee".to_string()];
        assert_eq!(normalize_names(&names), vec!["Ibuprofen".to_string(), "Coffee".to_string()]);
    }

    #[test]
    fn test_parse_string_to_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(parse_string_to_uuid(&id.to_string()), Ok(id));
        assert!(parse_string_to_uuid("not-a-uuid").unwrap_err().contains("Invalid UUID"));
    }

    #[test]
    fn test_new_entry_defaults_timestamp() {
        let now = Utc::now();
        let request = CreateEntryRequest {
            timestamp: None,
            pain_level: 6,
            pain_location: Some("  ".to_string()),
            aura_type: None,
            triggers: vec!["stress ".to_string()],
            medications: vec![],
            me_cfs_severity: None,
            notes: Some(" slept badly ".to_string()),
            latitude: None,
            longitude: None,
        };

        let entry = convert_to_data_new_entry("user-1", &request, now);
        assert_eq!(entry.timestamp, now);
        assert_eq!(entry.pain_location, None);
        assert_eq!(entry.triggers, vec!["stress".to_string()]);
        assert_eq!(entry.notes.as_deref(), Some("slept badly"));
    }
}
