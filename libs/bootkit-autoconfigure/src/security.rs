use std::sync::Arc;

use bootkit_security::filters::{
    AnonymousAuthenticationFilter, AuthorizationFilter, BasicAuthenticationFilter,
    BearerTokenFilter, LogoutFilter, RememberMeAuthenticationFilter,
    SecurityContextPersistenceFilter, SessionManagementFilter,
    UsernamePasswordAuthenticationFilter,
};
use bootkit_security::{
    AuthenticationFailureHandler, AuthenticationSuccessHandler, CorsProperties, FilterOrder,
    NoOpPasswordEncoder, PasswordEncoder, RememberMeServices, ResultAuthenticationFailureHandler,
    ResultAuthenticationSuccessHandler, SecurityConfigError, SecurityFilterChain,
    SecurityProperties, SessionCreationPolicy, SessionRegistry, TokenResolver,
    UserDetailsService, build_cors_layer,
};
use tracing::info;

/// Caller-provided collaborators of the security chain. Everything is
/// optional; missing handlers and encoder fall back to the JSON result
/// handlers and the no-op encoder.
#[derive(Clone, Default)]
pub struct SecurityComponents {
    pub token_resolver: Option<Arc<dyn TokenResolver>>,
    pub user_details: Option<Arc<dyn UserDetailsService>>,
    pub password_encoder: Option<Arc<dyn PasswordEncoder>>,
    pub success_handler: Option<Arc<dyn AuthenticationSuccessHandler>>,
    pub failure_handler: Option<Arc<dyn AuthenticationFailureHandler>>,
}

impl std::fmt::Debug for SecurityComponents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityComponents")
            .field("token_resolver", &self.token_resolver.is_some())
            .field("user_details", &self.user_details.is_some())
            .field("password_encoder", &self.password_encoder.is_some())
            .field("success_handler", &self.success_handler.is_some())
            .field("failure_handler", &self.failure_handler.is_some())
            .finish()
    }
}

/// Assemble the security chain from properties and components.
///
/// Installed filters, in chain order:
/// - context persistence and session management, unless the policy is
///   `stateless`;
/// - logout, always;
/// - bearer authentication, with a token resolver;
/// - form login, with a user details service;
/// - basic authentication, when `security.basic.enable`;
/// - remember-me, when `security.remember_me.enable`;
/// - anonymous, when `security.anonymous.enable`;
/// - authorization, always.
///
/// CORS wraps the chain when `cors` is given.
///
/// # Errors
/// - `MissingUserDetailsService` when basic or remember-me is enabled
///   without a user details service;
/// - `MissingRememberMeKey` when remember-me is enabled without a key;
/// - CORS and access-rule pattern errors.
pub fn configure_security(
    props: &SecurityProperties,
    cors: Option<&CorsProperties>,
    components: &SecurityComponents,
) -> Result<SecurityFilterChain, SecurityConfigError> {
    let mut chain = SecurityFilterChain::new();
    if let Some(cors) = cors {
        chain = chain.with_cors(build_cors_layer(cors)?);
    }

    let encoder = components
        .password_encoder
        .clone()
        .unwrap_or_else(|| Arc::new(NoOpPasswordEncoder));
    let remember_me = remember_me_services(props, components)?;

    let policy = props.session.policy;
    let sessions = install_sessions(&mut chain, policy);

    let mut logout = LogoutFilter::new(props.logout.url.clone());
    if let Some(rm) = &remember_me {
        logout = logout.with_remember_me_cookie(rm.cookie_name());
    }
    if let Some(sessions) = &sessions {
        logout = logout.with_sessions(Arc::clone(sessions));
    }
    chain.add_filter_at(FilterOrder::Logout, Arc::new(logout));

    if let Some(resolver) = &components.token_resolver {
        chain.add_filter_at(
            FilterOrder::BearerAuthentication,
            Arc::new(BearerTokenFilter::new(Arc::clone(resolver))),
        );
    }

    if let Some(users) = &components.user_details {
        let mut login = UsernamePasswordAuthenticationFilter::new(
            props.login.url.clone(),
            Arc::clone(users),
            Arc::clone(&encoder),
            components
                .success_handler
                .clone()
                .unwrap_or_else(|| Arc::new(ResultAuthenticationSuccessHandler)),
            components
                .failure_handler
                .clone()
                .unwrap_or_else(|| Arc::new(ResultAuthenticationFailureHandler)),
        )
        .with_session(sessions.is_some());
        if let Some(rm) = &remember_me {
            login = login.with_remember_me(Arc::clone(rm));
        }
        chain.add_filter_at(FilterOrder::UsernamePasswordAuthentication, Arc::new(login));
    }

    if props.basic.enable {
        let users = components.user_details.as_ref().ok_or(
            SecurityConfigError::MissingUserDetailsService {
                feature: "basic authentication",
            },
        )?;
        chain.add_filter_at(
            FilterOrder::BasicAuthentication,
            Arc::new(BasicAuthenticationFilter::new(Arc::clone(users), encoder)),
        );
    }

    if let (Some(rm), Some(users)) = (&remember_me, &components.user_details) {
        chain.add_filter_at(
            FilterOrder::RememberMe,
            Arc::new(RememberMeAuthenticationFilter::new(
                Arc::clone(rm),
                Arc::clone(users),
            )),
        );
    }

    if props.anonymous.enable {
        chain.add_filter_at(FilterOrder::Anonymous, Arc::new(AnonymousAuthenticationFilter));
    }

    chain.add_filter_at(
        FilterOrder::Authorization,
        Arc::new(AuthorizationFilter::new(&props.access.rules)?),
    );

    info!(
        filters = ?chain.filter_names(),
        policy = ?policy,
        cors = chain.has_cors(),
        "security filter chain configured"
    );
    Ok(chain)
}

fn install_sessions(
    chain: &mut SecurityFilterChain,
    policy: SessionCreationPolicy,
) -> Option<Arc<SessionRegistry>> {
    if policy == SessionCreationPolicy::Stateless {
        return None;
    }
    let sessions = Arc::new(SessionRegistry::new());
    chain.add_filter_at(
        FilterOrder::SecurityContextPersistence,
        Arc::new(SecurityContextPersistenceFilter::new(
            Arc::clone(&sessions),
            policy,
        )),
    );
    chain.add_filter_at(
        FilterOrder::SessionManagement,
        Arc::new(SessionManagementFilter::new(policy)),
    );
    Some(sessions)
}

fn remember_me_services(
    props: &SecurityProperties,
    components: &SecurityComponents,
) -> Result<Option<Arc<RememberMeServices>>, SecurityConfigError> {
    let rm = &props.remember_me;
    if !rm.enable {
        return Ok(None);
    }
    if components.user_details.is_none() {
        return Err(SecurityConfigError::MissingUserDetailsService {
            feature: "remember-me",
        });
    }
    let key = rm
        .key
        .as_deref()
        .filter(|k| !k.is_empty())
        .ok_or(SecurityConfigError::MissingRememberMeKey)?;
    Ok(Some(Arc::new(RememberMeServices::new(key, rm))))
}
