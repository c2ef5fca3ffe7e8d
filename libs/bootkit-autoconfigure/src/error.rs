use bootkit_env::EnvError;
use bootkit_security::SecurityConfigError;

/// Startup failure while binding properties or assembling components.
#[derive(thiserror::Error, Debug)]
pub enum BootstrapError {
    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("security configuration: {0}")]
    Security(#[from] SecurityConfigError),

    #[error("data.tenant.enable is set but no tenant table source is configured")]
    MissingTenantTables,
}
