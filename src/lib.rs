pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod test_utils;

use application::services::{ChartBuilder, HierarchyService, PermissionResolver, RoleGraphService};
use domain::{DEFAULT_MAX_LEVELS, HierarchyPolicy};
use infrastructure::{
    InMemoryOrgStore, InMemoryRoleStore, InMemoryUserDirectory, OrgStore, RoleStore, UserDirectory,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Application configuration with all environment variables
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub max_levels: u32,
}

impl AppConfig {
    /// Creates a new AppConfig from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let max_levels = match std::env::var("ORG_MAX_LEVELS") {
            Ok(raw) => raw.parse::<u32>().ok().filter(|n| *n > 0).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "ORG_MAX_LEVELS must be a positive integer, got '{raw}'"
                ))
            })?,
            Err(_) => DEFAULT_MAX_LEVELS,
        };

        Ok(AppConfig { max_levels })
    }

    /// Creates an AppConfig with custom values (useful for testing)
    pub fn new(max_levels: u32) -> Self {
        Self { max_levels }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_levels: DEFAULT_MAX_LEVELS,
        }
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// APPLICATION BUILDER
// ============================================================================

/// Shared handles to every service, ready for embedding
pub struct AppState {
    pub hierarchy_service: Arc<HierarchyService>,
    pub chart_builder: Arc<ChartBuilder>,
    pub role_graph_service: Arc<RoleGraphService>,
    pub permission_resolver: Arc<PermissionResolver>,
    pub config: AppConfig,
}

/// Builder for creating application state with better testability
#[derive(Default)]
pub struct AppStateBuilder {
    org_store: Option<Arc<dyn OrgStore>>,
    role_store: Option<Arc<dyn RoleStore>>,
    user_directory: Option<Arc<dyn UserDirectory>>,
    config: Option<AppConfig>,
}

impl AppStateBuilder {
    /// Creates a new AppStateBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the organizational store
    pub fn with_org_store(mut self, org_store: Arc<dyn OrgStore>) -> Self {
        self.org_store = Some(org_store);
        self
    }

    /// Sets the role store
    pub fn with_role_store(mut self, role_store: Arc<dyn RoleStore>) -> Self {
        self.role_store = Some(role_store);
        self
    }

    /// Sets the user directory consulted for chart head names
    pub fn with_user_directory(mut self, user_directory: Arc<dyn UserDirectory>) -> Self {
        self.user_directory = Some(user_directory);
        self
    }

    /// Sets the configuration
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds the application state. Stores not supplied fall back to fresh
    /// in-memory implementations; configuration not supplied is read from the
    /// environment.
    pub fn build(self) -> Result<Arc<AppState>, AppError> {
        let config = match self.config {
            Some(config) => config,
            None => AppConfig::from_env()?,
        };
        if config.max_levels == 0 {
            return Err(ConfigError::Invalid("max_levels must be positive".to_string()).into());
        }

        let org_store = self
            .org_store
            .unwrap_or_else(|| Arc::new(InMemoryOrgStore::new()));
        let role_store = self
            .role_store
            .unwrap_or_else(|| Arc::new(InMemoryRoleStore::new()));
        let user_directory = self
            .user_directory
            .unwrap_or_else(|| Arc::new(InMemoryUserDirectory::new()));

        let hierarchy_service = Arc::new(HierarchyService {
            org_store,
            policy: HierarchyPolicy::new(config.max_levels),
        });
        let permission_resolver = Arc::new(PermissionResolver::new(role_store.clone()));
        let role_graph_service = Arc::new(RoleGraphService {
            role_store,
            resolver: permission_resolver.clone(),
        });
        let chart_builder = Arc::new(ChartBuilder {
            hierarchy: hierarchy_service.clone(),
            directory: user_directory,
        });

        Ok(Arc::new(AppState {
            hierarchy_service,
            chart_builder,
            role_graph_service,
            permission_resolver,
            config,
        }))
    }
}

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Initialization error: {0}")]
    Initialization(String),
}

// ============================================================================
// OBSERVABILITY
// ============================================================================

/// Initializes the tracing subscriber, filtered through `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();
}

// ============================================================================
// TESTING UTILITIES
// ============================================================================
