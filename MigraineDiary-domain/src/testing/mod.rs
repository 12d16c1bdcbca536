// Testing utilities and fake collaborators for the domain layer
// This module is only available in tests or when the "mock" feature is enabled

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::clients::llm::Completion;
use crate::clients::{LlmClient, LlmError, NotificationError, NotificationSender, PushMessage, WeatherError, WeatherProvider};
use migraine_diary_data::models::NewWeatherLog;

/// Weather provider returning a fixed observation, or failing every call
#[derive(Default)]
pub struct FakeWeatherProvider {
    calls: AtomicUsize,
    fail: bool,
    fail_latitudes: Vec<f64>,
}

impl FakeWeatherProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup fails with `NoData`
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Lookups at the given latitudes fail with `NoData`
    pub fn failing_at(latitudes: &[f64]) -> Self {
        Self {
            fail_latitudes: latitudes.to_vec(),
            ..Self::default()
        }
    }

    /// Number of upstream lookups so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherProvider for FakeWeatherProvider {
    async fn observation(&self, latitude: f64, longitude: f64, at: DateTime<Utc>) -> Result<NewWeatherLog, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail || self.fail_latitudes.iter().any(|l| (l - latitude).abs() < 1e-9) {
            return Err(WeatherError::NoData("fake provider has no data".to_string()));
        }
        Ok(NewWeatherLog {
            latitude,
            longitude,
            observed_at: at,
            temperature_c: Some(12.5),
            pressure_hpa: Some(1008.0),
            pressure_change_24h: Some(-6.0),
            humidity: Some(81.0),
            precipitation_mm: Some(0.4),
            wind_speed_kmh: Some(14.0),
            weather_code: Some(61),
            source: "fake".to_string(),
        })
    }
}

/// Push sender that records deliveries; endpoints listed as gone answer `Gone`
#[derive(Default)]
pub struct RecordingPushSender {
    sent: Mutex<Vec<(String, PushMessage)>>,
    gone: Vec<String>,
}

impl RecordingPushSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_gone(endpoints: &[&str]) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            gone: endpoints.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn sent(&self) -> Vec<(String, PushMessage)> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSender for RecordingPushSender {
    async fn send(&self, endpoint: &str, message: &PushMessage) -> Result<(), NotificationError> {
        if self.gone.iter().any(|e| e == endpoint) {
            return Err(NotificationError::Gone(endpoint.to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((endpoint.to_string(), message.clone()));
        }
        Ok(())
    }
}

/// LLM client with a canned answer that remembers the prompts it was given
pub struct FakeLlmClient {
    answer: Result<String, LlmError>,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlmClient {
    pub fn answering(text: &str) -> Self {
        Self {
            answer: Ok(text.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: LlmError) -> Self {
        Self {
            answer: Err(error),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for FakeLlmClient {
    async fn complete(&self, _system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(user_prompt.to_string());
        }
        self.answer.clone().map(|content| Completion {
            content,
            model: "fake-model".to_string(),
        })
    }
}
