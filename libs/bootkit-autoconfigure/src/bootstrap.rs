use std::sync::Arc;

use bootkit_data::tenant::{TenantLineHandler, TenantTableService};
use bootkit_data::{InnerInterceptor, SqlInterceptor};
use bootkit_env::Environment;
use bootkit_security::{
    AuthenticationFailureHandler, AuthenticationSuccessHandler, CorsProperties, PasswordEncoder,
    SecurityFilterChain, SecurityProperties, TokenResolver, UserDetailsService,
};

use crate::data::{DataProperties, configure_sql_interceptor, configure_tenant_handler};
use crate::error::BootstrapError;
use crate::security::{SecurityComponents, configure_security};
use crate::validation::{
    MethodValidationExcludeFilter, MethodValidator, ValidationGroupsProvider,
    ValidationProperties,
};

/// Everything the application wired at startup.
pub struct Components {
    /// SQL rewriting pipeline, when any interceptor is configured.
    pub sql: Option<SqlInterceptor>,
    pub security: SecurityFilterChain,
    /// Present only when a validation groups provider was supplied.
    pub validator: Option<MethodValidator>,
    pub tenant_handler: Option<Arc<dyn TenantLineHandler>>,
}

/// Collects the environment and optional components, then builds
/// [`Components`] according to the bound properties.
///
/// ```rust
/// use bootkit_autoconfigure::Bootstrap;
/// use bootkit_env::{Environment, PropertySource};
///
/// let mut env = Environment::new();
/// env.add_first(PropertySource::from_flat("app", [
///     ("data.tenant.enable", serde_json::json!(true)),
///     ("data.tenant.tables.orders", serde_json::json!(true)),
/// ]));
/// let components = Bootstrap::new(env).build().unwrap();
/// assert!(components.tenant_handler.is_some());
/// assert!(components.validator.is_none());
/// ```
pub struct Bootstrap {
    env: Environment,
    tenant_tables: Option<Arc<dyn TenantTableService>>,
    security: SecurityComponents,
    groups: Option<Arc<dyn ValidationGroupsProvider>>,
    exclude_filters: Vec<Arc<dyn MethodValidationExcludeFilter>>,
    interceptors: Vec<Arc<dyn InnerInterceptor>>,
}

impl Bootstrap {
    #[must_use]
    pub fn new(env: Environment) -> Self {
        Self {
            env,
            tenant_tables: None,
            security: SecurityComponents::default(),
            groups: None,
            exclude_filters: Vec::new(),
            interceptors: Vec::new(),
        }
    }

    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    #[must_use]
    pub fn with_tenant_tables(mut self, tables: Arc<dyn TenantTableService>) -> Self {
        self.tenant_tables = Some(tables);
        self
    }

    #[must_use]
    pub fn with_token_resolver(mut self, resolver: Arc<dyn TokenResolver>) -> Self {
        self.security.token_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn with_user_details(mut self, users: Arc<dyn UserDetailsService>) -> Self {
        self.security.user_details = Some(users);
        self
    }

    #[must_use]
    pub fn with_password_encoder(mut self, encoder: Arc<dyn PasswordEncoder>) -> Self {
        self.security.password_encoder = Some(encoder);
        self
    }

    #[must_use]
    pub fn with_success_handler(mut self, handler: Arc<dyn AuthenticationSuccessHandler>) -> Self {
        self.security.success_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_failure_handler(mut self, handler: Arc<dyn AuthenticationFailureHandler>) -> Self {
        self.security.failure_handler = Some(handler);
        self
    }

    #[must_use]
    pub fn with_validation_groups(mut self, provider: Arc<dyn ValidationGroupsProvider>) -> Self {
        self.groups = Some(provider);
        self
    }

    #[must_use]
    pub fn with_exclude_filter(mut self, filter: Arc<dyn MethodValidationExcludeFilter>) -> Self {
        self.exclude_filters.push(filter);
        self
    }

    /// Extra interceptor, run after the built-in ones.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: Arc<dyn InnerInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Bind properties and construct the components.
    ///
    /// # Errors
    /// Property binding failures, tenant injection enabled without a table
    /// source, and invalid security configuration.
    pub fn build(self) -> Result<Components, BootstrapError> {
        let data: DataProperties = self.env.bind("data")?;
        let tenant_handler = configure_tenant_handler(&data.tenant, self.tenant_tables)?;
        let sql = configure_sql_interceptor(&data.sql, tenant_handler.as_ref(), &self.interceptors);

        let security_props: SecurityProperties = self.env.bind("security")?;
        let cors: Option<CorsProperties> = if self.env.contains_property("cors") {
            Some(self.env.bind("cors")?)
        } else {
            None
        };
        let security = configure_security(&security_props, cors.as_ref(), &self.security)?;

        let validator = match self.groups {
            Some(groups) => {
                let props: ValidationProperties = self.env.bind("validation")?;
                let validator = self
                    .exclude_filters
                    .into_iter()
                    .fold(MethodValidator::new(groups, &props), MethodValidator::with_exclude_filter);
                Some(validator)
            }
            None => None,
        };

        tracing::info!(
            sql = sql.is_some(),
            tenant = tenant_handler.is_some(),
            validation = validator.is_some(),
            "components assembled"
        );
        Ok(Components {
            sql,
            security,
            validator,
            tenant_handler,
        })
    }
}
