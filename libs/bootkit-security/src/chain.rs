use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::extract::{Request, State};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::Response;
use tower_http::cors::CorsLayer;

/// Named positions in the chain, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterOrder {
    SecurityContextPersistence,
    Logout,
    BearerAuthentication,
    UsernamePasswordAuthentication,
    BasicAuthentication,
    RememberMe,
    Anonymous,
    SessionManagement,
    Authorization,
}

/// One step of the security chain.
///
/// A filter either answers the request itself or hands it on with
/// `next.run(req).await`, possibly after adding request extensions.
#[async_trait]
pub trait SecurityFilter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn filter(&self, req: Request, next: Next) -> Response;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
    Before,
    At,
}

#[derive(Clone)]
struct Entry {
    order: FilterOrder,
    phase: Phase,
    filter: Arc<dyn SecurityFilter>,
}

/// Ordered security filters plus the optional CORS layer in front of them.
#[derive(Clone, Default)]
pub struct SecurityFilterChain {
    entries: Vec<Entry>,
    cors: Option<CorsLayer>,
}

impl std::fmt::Debug for SecurityFilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecurityFilterChain")
            .field("filters", &self.filter_names())
            .field("cors", &self.cors.is_some())
            .finish()
    }
}

impl SecurityFilterChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_cors(mut self, cors: CorsLayer) -> Self {
        self.cors = Some(cors);
        self
    }

    #[must_use]
    pub fn has_cors(&self) -> bool {
        self.cors.is_some()
    }

    /// Place `filter` at `order`, after filters already placed there.
    pub fn add_filter_at(&mut self, order: FilterOrder, filter: Arc<dyn SecurityFilter>) {
        self.insert(order, Phase::At, filter);
    }

    /// Place `filter` immediately before the filters at `order`.
    pub fn add_filter_before(&mut self, order: FilterOrder, filter: Arc<dyn SecurityFilter>) {
        self.insert(order, Phase::Before, filter);
    }

    fn insert(&mut self, order: FilterOrder, phase: Phase, filter: Arc<dyn SecurityFilter>) {
        let key = (order, phase);
        let pos = self
            .entries
            .iter()
            .position(|e| (e.order, e.phase) > key)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            pos,
            Entry {
                order,
                phase,
                filter,
            },
        );
    }

    /// Filter names in execution order.
    #[must_use]
    pub fn filter_names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.filter.name()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Wrap every route of `router` with the chain.
    ///
    /// Call after all routes are registered; routes added later are not
    /// protected.
    #[must_use]
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        // Layers added last run first.
        let mut router = self.entries.iter().rev().fold(router, |router, entry| {
            router.layer(from_fn_with_state(Arc::clone(&entry.filter), run_filter))
        });
        if let Some(cors) = &self.cors {
            router = router.layer(cors.clone());
        }
        tracing::info!(filters = ?self.filter_names(), cors = self.cors.is_some(), "security chain applied");
        router
    }
}

async fn run_filter(
    State(filter): State<Arc<dyn SecurityFilter>>,
    req: Request,
    next: Next,
) -> Response {
    filter.filter(req, next).await
}
