use crate::domain::{OrchestratorConfig, ProxyConfig, ReportConfig, ServerSetConfig};
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Programmatic configuration
// ============================================================================

/// Configuration assembled in code by the host.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    orchestrator: OrchestratorConfig,
    server_set: ServerSetConfig,
    proxy: ProxyConfig,
    report: ReportConfig,
}

impl StaticConfigProvider {
    /// Create with every default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timers everywhere, for tests driving a manual clock.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            orchestrator: OrchestratorConfig::for_testing(),
            server_set: ServerSetConfig::for_testing(),
            proxy: ProxyConfig::for_testing(),
            report: ReportConfig::for_testing(),
        }
    }

    #[must_use]
    pub fn with_orchestrator(mut self, config: OrchestratorConfig) -> Self {
        self.orchestrator = config;
        self
    }

    #[must_use]
    pub fn with_server_set(mut self, config: ServerSetConfig) -> Self {
        self.server_set = config;
        self
    }

    #[must_use]
    pub fn with_proxy(mut self, config: ProxyConfig) -> Self {
        self.proxy = config;
        self
    }

    #[must_use]
    pub fn with_report(mut self, config: ReportConfig) -> Self {
        self.report = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn orchestrator_config(&self) -> OrchestratorConfig {
        self.orchestrator.clone()
    }

    fn server_set_config(&self) -> ServerSetConfig {
        self.server_set.clone()
    }

    fn proxy_config(&self) -> ProxyConfig {
        self.proxy.clone()
    }

    fn report_config(&self) -> ReportConfig {
        self.report.clone()
    }
}
