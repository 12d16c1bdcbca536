//! Domain layer health check functionality
//! This module provides health check services for the application

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use migraine_diary_data::database::DatabasePool;

/// System health status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone, Serialize)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Ok(true) when the database answers, Err when it cannot be reached
    async fn check_database_status(&self) -> Result<bool, String>;
}

/// Health checks backed by the SQLite pool
#[derive(Debug, Clone)]
pub struct HealthService {
    pool: DatabasePool,
    /// Optional integrations that are not configured report as degraded
    llm_configured: bool,
}

impl HealthService {
    pub fn new(pool: DatabasePool, llm_configured: bool) -> Self {
        Self { pool, llm_configured }
    }
}

#[async_trait]
impl HealthServiceTrait for HealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let db_component = match self.check_database_status().await {
            Ok(true) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(self.pool.connection_info()),
            },
            Ok(false) => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("Database is available but has performance issues".to_string()),
            },
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e),
            },
        };

        let llm_component = if self.llm_configured {
            HealthComponent {
                status: ComponentStatus::Healthy,
                details: None,
            }
        } else {
            HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some("LLM gateway not configured; AI reports are disabled".to_string()),
            }
        };

        let overall_status = if db_component.status == ComponentStatus::Unhealthy {
            SystemStatus::Unhealthy
        } else if db_component.status == ComponentStatus::Degraded {
            SystemStatus::Degraded
        } else {
            SystemStatus::Healthy
        };

        SystemHealth {
            status: overall_status,
            components: vec![
                ("database".to_string(), db_component),
                ("llm".to_string(), llm_component),
            ]
            .into_iter()
            .collect(),
        }
    }

    async fn check_database_status(&self) -> Result<bool, String> {
        self.pool
            .ping()
            .map(|_| true)
            .map_err(|e| format!("Database connection error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_healthy() {
        let service = HealthService::new(DatabasePool::in_memory().unwrap(), false);
        let health = service.get_system_health().await;

        assert_eq!(health.status, SystemStatus::Healthy);
        assert_eq!(health.components["database"].status, ComponentStatus::Healthy);
        // A missing LLM key never makes the whole system unhealthy
        assert_eq!(health.components["llm"].status, ComponentStatus::Degraded);
    }
}
