use std::env;
use std::time::Duration;

/// Engine tuning and deployment policy, read once at construction time.
///
/// Every knob has a usable default so a bare environment still produces a
/// working single-tenant engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How often the dispatcher drains the run queue and checks interval
    /// triggers.
    pub tick_interval: Duration,
    /// Upper bound on runs executing in parallel.
    pub max_concurrent_runs: usize,
    /// Upper bound on queued-but-not-yet-dispatched runs.
    pub run_queue_capacity: usize,
    /// Multi-tenant deployments enforce the restricted provider policy.
    pub multi_tenant: bool,
    /// Provider types workflows may not use when `multi_tenant` is set.
    pub restricted_providers: Vec<String>,
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(EngineConfig {
            tick_interval: Duration::from_millis(
                env::var("VIGIL_SCHEDULER_TICK_MS")
                    .unwrap_or_else(|_| "1000".to_string())
                    .parse()
                    .unwrap_or(1000),
            ),
            max_concurrent_runs: env::var("VIGIL_MAX_CONCURRENT_RUNS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .unwrap_or(20),
            run_queue_capacity: env::var("VIGIL_RUN_QUEUE_CAPACITY")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .unwrap_or(1024),
            multi_tenant: env::var("VIGIL_MULTI_TENANT")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            restricted_providers: parse_provider_list(
                &env::var("VIGIL_RESTRICTED_PROVIDERS")
                    .unwrap_or_else(|_| "shell,python".to_string()),
            ),
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tick_interval: Duration::from_millis(1000),
            max_concurrent_runs: 20,
            run_queue_capacity: 1024,
            multi_tenant: false,
            restricted_providers: vec!["shell".to_string(), "python".to_string()],
        }
    }
}

fn parse_provider_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_single_tenant() {
        let config = EngineConfig::default();
        assert!(!config.multi_tenant);
        assert_eq!(config.max_concurrent_runs, 20);
        assert_eq!(config.tick_interval, Duration::from_millis(1000));
        assert_eq!(config.restricted_providers, vec!["shell", "python"]);
    }

    #[test]
    fn test_parse_provider_list_trims_and_drops_empties() {
        assert_eq!(
            parse_provider_list(" shell , python ,,local-llm"),
            vec!["shell", "python", "local-llm"]
        );
        assert!(parse_provider_list("").is_empty());
    }
}
