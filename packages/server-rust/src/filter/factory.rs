//! Filter construction seam.
//!
//! The service never builds `PrioritizedFilter`s directly; it asks an injected
//! [`FilterFactory`]. Hosts substitute their own factory to decorate
//! predicates, rewrite endpoints, or count constructions in tests.

use std::sync::Arc;

use dynrouter_core::{FilterStatistics, Predicate, PrioritizedFilter};

/// Builds filters. Must be free of side effects on any registry.
pub trait FilterFactory: Send + Sync {
    fn create(
        &self,
        id: &str,
        priority: i32,
        predicate: Arc<dyn Predicate>,
        endpoint: &str,
        statistics: Arc<FilterStatistics>,
    ) -> PrioritizedFilter;
}

/// Factory that builds plain [`PrioritizedFilter`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFilterFactory;

impl FilterFactory for DefaultFilterFactory {
    fn create(
        &self,
        id: &str,
        priority: i32,
        predicate: Arc<dyn Predicate>,
        endpoint: &str,
        statistics: Arc<FilterStatistics>,
    ) -> PrioritizedFilter {
        PrioritizedFilter::new(id, priority, predicate, endpoint, statistics)
    }
}
