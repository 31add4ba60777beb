//! Coordinator and Service Configuration

use serde::{Deserialize, Serialize};

use tonal_platform::TrackerConfig;

/// Session coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Name of the session worker thread
    pub thread_name: String,

    /// Capacity of the task queue; callers block briefly when it is full
    pub queue_capacity: usize,

    /// Skip attaching effects to new sessions while audio is being recorded
    pub suppress_attach_while_recording: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            thread_name: "tonal-sessions".into(),
            queue_capacity: 64,
            suppress_attach_while_recording: true,
        }
    }
}

impl CoordinatorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.thread_name.trim().is_empty() {
            return Err("Worker thread name must not be empty".into());
        }
        if self.queue_capacity == 0 || self.queue_capacity > 4096 {
            return Err(format!("Invalid queue capacity: {}", self.queue_capacity));
        }
        Ok(())
    }
}

/// Everything the effects service needs to start
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub coordinator: CoordinatorConfig,
    pub tracker: TrackerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.thread_name, "tonal-sessions");
        assert!(config.suppress_attach_while_recording);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let no_name = CoordinatorConfig {
            thread_name: "  ".into(),
            ..Default::default()
        };
        assert!(no_name.validate().is_err());

        let no_queue = CoordinatorConfig {
            queue_capacity: 0,
            ..Default::default()
        };
        assert!(no_queue.validate().is_err());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "coordinator": { "queue_capacity": 8 } }"#;
        let config: ServiceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.coordinator.queue_capacity, 8);
        assert_eq!(config.coordinator.thread_name, "tonal-sessions");
        assert_eq!(config.tracker.thread_name, TrackerConfig::default().thread_name);
    }
}
