// Outbound HTTP clients
// Each client sits behind a trait so services can be tested with fakes.

pub mod llm;
pub mod push;
pub mod weather;

pub use llm::{LlmClient, LlmError, OpenAiCompatibleClient};
pub use push::{LoggingPushSender, NotificationError, NotificationSender, PushMessage, WebhookPushSender};
pub use weather::{OpenMeteoProvider, WeatherError, WeatherProvider, WeatherSource};
