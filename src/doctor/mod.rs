//! Doctor command for deployment diagnostics
//!
//! Checks configuration, search backend reachability, index schema and
//! generator credentials without loading the embedding model.

use std::sync::Arc;

use crate::config::{Config, GenerationProvider};
use crate::index::IndexClient;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
    index: Arc<dyn IndexClient>,
}

impl Doctor {
    pub fn new(config: Config, index: Arc<dyn IndexClient>) -> Self {
        Self { config, index }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self) -> Vec<HealthCheck> {
        let mut checks = vec![self.check_config()];

        let backend = self.check_backend().await;
        let reachable = backend.status == HealthStatus::Pass;
        checks.push(backend);

        if reachable {
            checks.push(self.check_index().await);
        } else {
            checks.push(HealthCheck::new(
                "Index",
                HealthStatus::Warn("Skipped: backend unreachable".to_string()),
            ));
        }

        checks.push(self.check_generator());
        checks
    }

    /// Check 1: configuration values
    fn check_config(&self) -> HealthCheck {
        let status = match self.config.validate() {
            Ok(()) => HealthStatus::Pass,
            Err(e) => HealthStatus::Fail(e.to_string()),
        };
        HealthCheck::new("Configuration", status)
    }

    /// Check 2: search backend reachable
    async fn check_backend(&self) -> HealthCheck {
        let status = match self.index.health_check().await {
            Ok(()) => HealthStatus::Pass,
            Err(e) => HealthStatus::Fail(format!("{} ({})", e, self.config.index.url)),
        };
        HealthCheck::new("Search Backend", status)
    }

    /// Check 3: index exists and its vector dims match
    async fn check_index(&self) -> HealthCheck {
        let name = &self.config.index.name;
        let status = match self.index.index_dims(name).await {
            Ok(Some(dims)) if dims == self.config.index.dims => HealthStatus::Pass,
            Ok(Some(dims)) => HealthStatus::Fail(format!(
                "Index '{}' has {} dims, configuration expects {}",
                name, dims, self.config.index.dims
            )),
            Ok(None) => HealthStatus::Warn(format!(
                "Index '{}' not found; run `patentwhisperer ingest <FILE>`",
                name
            )),
            Err(e) => HealthStatus::Fail(e.to_string()),
        };
        HealthCheck::new("Index", status)
    }

    /// Check 4: generator credentials present
    fn check_generator(&self) -> HealthCheck {
        let generation = &self.config.generation;
        let status = match generation.provider {
            GenerationProvider::OpenAi if generation.api_key.is_none() => HealthStatus::Warn(
                "No API key set (OPENAI_API_KEY); answers will be unavailable".to_string(),
            ),
            _ => HealthStatus::Pass,
        };
        HealthCheck::new("Generator", status)
    }

    /// False if any check failed; warnings pass
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks
            .iter()
            .any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexBackend;
    use crate::index::MemoryIndex;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.index.backend = IndexBackend::Memory;
        config.index.dims = 4;
        config
    }

    #[tokio::test]
    async fn test_missing_index_warns() {
        let config = memory_config();
        let doctor = Doctor::new(config, Arc::new(MemoryIndex::new(4)));
        let checks = doctor.run_diagnostics().await;

        let index = checks.iter().find(|c| c.name == "Index").unwrap();
        assert!(matches!(index.status, HealthStatus::Warn(_)));
        assert!(Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_dims_disagreement_fails() {
        let config = memory_config();
        let index = Arc::new(MemoryIndex::new(8));
        index.ensure_schema("patents", 8).await.unwrap();

        let doctor = Doctor::new(config, index);
        let checks = doctor.run_diagnostics().await;
        let check = checks.iter().find(|c| c.name == "Index").unwrap();
        assert!(matches!(check.status, HealthStatus::Fail(_)));
        assert!(!Doctor::overall_status(&checks));
    }

    #[tokio::test]
    async fn test_matching_index_passes() {
        let mut config = memory_config();
        config.generation.api_key = Some("sk-test".to_string());
        let index = Arc::new(MemoryIndex::new(4));
        index.ensure_schema("patents", 4).await.unwrap();

        let doctor = Doctor::new(config, index);
        let checks = doctor.run_diagnostics().await;
        assert!(checks.iter().all(|c| c.status == HealthStatus::Pass));
    }

    #[test]
    fn test_missing_openai_key_warns() {
        let doctor = Doctor::new(memory_config(), Arc::new(MemoryIndex::new(4)));
        assert!(matches!(
            doctor.check_generator().status,
            HealthStatus::Warn(_)
        ));
    }

    #[test]
    fn test_invalid_config_fails() {
        let mut config = memory_config();
        config.query.max_context_chars = 0;
        let doctor = Doctor::new(config, Arc::new(MemoryIndex::new(4)));
        assert!(matches!(doctor.check_config().status, HealthStatus::Fail(_)));
    }
}
