//! Filter service: subscription management and priority-ordered matching.

use std::fmt;
use std::sync::Arc;

use dynrouter_core::{
    ClockSource, FilterStatistics, Message, Predicate, PrioritizedFilter, SystemClock,
    ORIGINAL_BODY_HEADER,
};
use metrics::counter;
use tracing::{debug, warn};

use super::channel::ChannelFilters;
use super::error::{AddRejected, FilterError};
use super::factory::{DefaultFilterFactory, FilterFactory};
use super::registry::ChannelRegistry;

/// Logger category prefix of the diagnostic endpoint.
pub const DROP_LOG_CATEGORY: &str = "dynrouter.filter.service";

/// Log level embedded in the diagnostic endpoint of a dropped message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropLevel {
    Warn,
    Debug,
}

impl DropLevel {
    #[must_use]
    pub fn from_warn_flag(warn_on_drop: bool) -> Self {
        if warn_on_drop {
            DropLevel::Warn
        } else {
            DropLevel::Debug
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DropLevel::Warn => "WARN",
            DropLevel::Debug => "DEBUG",
        }
    }
}

impl fmt::Display for DropLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one matching pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutingOutcome {
    /// Endpoints of the matching filters in evaluation order, duplicates kept.
    Matched(Vec<String>),
    /// Nothing matched. The message body now holds a diagnostic text, the
    /// original body sits under [`ORIGINAL_BODY_HEADER`], and `log_endpoint`
    /// names the diagnostic destination for the host to deliver to.
    Unmatched { log_endpoint: String, level: DropLevel },
}

impl RoutingOutcome {
    /// Matched endpoints; empty for an unmatched message.
    #[must_use]
    pub fn endpoints(&self) -> &[String] {
        match self {
            RoutingOutcome::Matched(endpoints) => endpoints,
            RoutingOutcome::Unmatched { .. } => &[],
        }
    }

    /// Where the message should go: the matched endpoints, or the single
    /// diagnostic endpoint when nothing matched.
    #[must_use]
    pub fn recipients(&self) -> Vec<String> {
        match self {
            RoutingOutcome::Matched(endpoints) => endpoints.clone(),
            RoutingOutcome::Unmatched { log_endpoint, .. } => vec![log_endpoint.clone()],
        }
    }

    #[must_use]
    pub fn is_matched(&self) -> bool {
        matches!(self, RoutingOutcome::Matched(_))
    }

    /// Comma-joined matched endpoints; the empty string when nothing matched.
    #[must_use]
    pub fn joined(&self) -> String {
        self.endpoints().join(",")
    }
}

/// Subscription management and message matching over a [`ChannelRegistry`].
///
/// All operations take `&self` and may be called from any number of threads.
pub struct FilterService {
    registry: ChannelRegistry,
    factory: Arc<dyn FilterFactory>,
    clock: Arc<dyn ClockSource>,
}

impl FilterService {
    /// Creates a service with an injected factory and statistics clock.
    #[must_use]
    pub fn new(factory: Arc<dyn FilterFactory>, clock: Arc<dyn ClockSource>) -> Self {
        Self {
            registry: ChannelRegistry::new(),
            factory,
            clock,
        }
    }

    /// Creates a service using [`DefaultFilterFactory`] and [`SystemClock`].
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(DefaultFilterFactory), Arc::new(SystemClock))
    }

    /// Creates the channel's structures if they do not exist yet.
    pub fn initialize_channel_filters(&self, channel: &str) {
        self.registry.ensure_initialized(channel);
    }

    /// Names of every initialized channel, sorted.
    #[must_use]
    pub fn channels(&self) -> Vec<String> {
        self.registry
            .channels()
            .iter()
            .map(|c| c.channel().to_string())
            .collect()
    }

    /// Copy of the channel's active filters in evaluation order.
    ///
    /// # Errors
    ///
    /// [`FilterError::ChannelNotFound`] if the channel was never initialized.
    pub fn get_filters_for_channel(
        &self,
        channel: &str,
    ) -> Result<Vec<Arc<PrioritizedFilter>>, FilterError> {
        Ok(self.channel(channel)?.filters())
    }

    /// Copy of the channel's statistics log, including removed filters.
    ///
    /// # Errors
    ///
    /// [`FilterError::ChannelNotFound`] if the channel was never initialized.
    pub fn get_statistics_for_channel(
        &self,
        channel: &str,
    ) -> Result<Vec<Arc<FilterStatistics>>, FilterError> {
        Ok(self.channel(channel)?.statistics())
    }

    /// Builds a filter through the injected factory. Touches no channel.
    #[must_use]
    pub fn create_filter(
        &self,
        id: &str,
        priority: i32,
        predicate: Arc<dyn Predicate>,
        endpoint: &str,
        statistics: Arc<FilterStatistics>,
    ) -> PrioritizedFilter {
        self.factory
            .create(id, priority, predicate, endpoint, statistics)
    }

    /// Builds a filter with fresh statistics and adds it to `channel`.
    ///
    /// # Errors
    ///
    /// See [`FilterService::add_filter_for_channel`].
    pub fn add_new_filter_for_channel(
        &self,
        id: &str,
        priority: i32,
        predicate: Arc<dyn Predicate>,
        endpoint: &str,
        channel: &str,
        update: bool,
    ) -> Result<String, AddRejected> {
        let statistics = Arc::new(FilterStatistics::new(id, Arc::clone(&self.clock)));
        let filter = self.create_filter(id, priority, predicate, endpoint, statistics);
        self.add_filter_for_channel(filter, channel, update)
    }

    /// Adds `filter` to `channel`, initializing the channel if needed, and
    /// returns the filter id.
    ///
    /// With `update == false` the id must be new to the channel; with
    /// `update == true` it must already be active, and the old entry is
    /// replaced wholesale even if its priority differs. The filter's
    /// statistics are appended to the channel's statistics log.
    ///
    /// # Errors
    ///
    /// [`AddRejected`] when `update` disagrees with whether the id exists.
    pub fn add_filter_for_channel(
        &self,
        filter: PrioritizedFilter,
        channel: &str,
        update: bool,
    ) -> Result<String, AddRejected> {
        let id = filter.id().to_string();
        let priority = filter.priority();
        let filters = self.registry.ensure_initialized(channel);
        match filters.add(Arc::new(filter), update) {
            Ok(()) => {
                debug!(channel, filter_id = %id, priority, update, "filter added");
                Ok(id)
            }
            Err(rejected) => {
                debug!(channel, filter_id = %id, update, exists = rejected.exists, "filter rejected");
                Err(rejected)
            }
        }
    }

    /// Finds an active filter by id.
    ///
    /// With `channel` absent or empty every channel is searched (in channel
    /// name order) and the first hit wins.
    ///
    /// # Errors
    ///
    /// [`FilterError::FilterNotFound`] if no active filter has the id;
    /// [`FilterError::ChannelNotFound`] if a named channel does not exist.
    pub fn get_filter_by_id(
        &self,
        filter_id: &str,
        channel: Option<&str>,
    ) -> Result<Arc<PrioritizedFilter>, FilterError> {
        match non_empty(channel) {
            Some(channel) => self
                .channel(channel)?
                .get(filter_id)
                .ok_or_else(|| FilterError::FilterNotFound {
                    filter_id: filter_id.to_string(),
                    channel: Some(channel.to_string()),
                }),
            None => self
                .registry
                .channels()
                .iter()
                .find_map(|c| c.get(filter_id))
                .ok_or_else(|| FilterError::FilterNotFound {
                    filter_id: filter_id.to_string(),
                    channel: None,
                }),
        }
    }

    /// Removes a filter from the active set. Statistics stay in the log.
    ///
    /// With `channel` absent or empty, the channel currently holding the id is
    /// located first. Returns `false` if the filter disappeared between that
    /// lookup and the removal (another caller removed it first).
    ///
    /// # Errors
    ///
    /// [`FilterError::FilterNotFound`] if no channel holds the id during
    /// lookup; [`FilterError::ChannelNotFound`] for an unknown named channel.
    pub fn remove_filter_by_id(
        &self,
        filter_id: &str,
        channel: Option<&str>,
    ) -> Result<bool, FilterError> {
        let filters = match non_empty(channel) {
            Some(channel) => self.channel(channel)?,
            None => self
                .registry
                .channels()
                .into_iter()
                .find(|c| c.contains_id(filter_id))
                .ok_or_else(|| FilterError::FilterNotFound {
                    filter_id: filter_id.to_string(),
                    channel: None,
                })?,
        };
        let removed = filters.remove(filter_id).is_some();
        debug!(channel = filters.channel(), filter_id, removed, "filter removal");
        Ok(removed)
    }

    /// Matches `message` against the channel's filters in evaluation order.
    ///
    /// Each matching filter contributes its endpoint and has its statistics
    /// incremented; with `first_match_only` evaluation stops at the first
    /// match. When nothing matches, the message is rewritten: the original
    /// body moves to the [`ORIGINAL_BODY_HEADER`] header and the body becomes
    /// a diagnostic text naming the channel and the log endpoint.
    ///
    /// # Errors
    ///
    /// [`FilterError::ChannelNotFound`] if the channel was never initialized.
    pub fn match_recipients(
        &self,
        message: &mut Message,
        channel: &str,
        first_match_only: bool,
        warn_on_drop: bool,
    ) -> Result<RoutingOutcome, FilterError> {
        let filters = self.channel(channel)?;
        let snapshot = filters.snapshot();

        let mut endpoints = Vec::new();
        for filter in snapshot.iter() {
            if filter.matches(message) {
                filter.statistics().increment_count();
                endpoints.push(filter.endpoint().to_string());
                if first_match_only {
                    break;
                }
            }
        }

        if !endpoints.is_empty() {
            counter!("dynrouter_recipients_total", "channel" => channel.to_string())
                .increment(endpoints.len() as u64);
            return Ok(RoutingOutcome::Matched(endpoints));
        }
        counter!("dynrouter_unmatched_total", "channel" => channel.to_string()).increment(1);

        let level = DropLevel::from_warn_flag(warn_on_drop);
        let log_endpoint = log_endpoint(channel, level);
        let original = message.take_body();
        message.set_header(ORIGINAL_BODY_HEADER, original);
        message.set_body(format!(
            "DynamicRouter channel '{channel}': no filters matched for the message. \
             The '{ORIGINAL_BODY_HEADER}' header contains the original message body. \
             Diagnostic endpoint: {log_endpoint}"
        ));
        match level {
            DropLevel::Warn => warn!(channel, "no filters matched, message dropped"),
            DropLevel::Debug => debug!(channel, "no filters matched, message dropped"),
        }
        Ok(RoutingOutcome::Unmatched {
            log_endpoint,
            level,
        })
    }

    /// Comma-joined endpoints of the matching filters, in evaluation order and
    /// without deduplication. Returns the empty string when nothing matched,
    /// after rewriting the message as described on
    /// [`FilterService::match_recipients`].
    ///
    /// # Errors
    ///
    /// [`FilterError::ChannelNotFound`] if the channel was never initialized.
    pub fn get_matching_endpoints_for_exchange_by_channel(
        &self,
        message: &mut Message,
        channel: &str,
        first_match_only: bool,
        warn_on_drop: bool,
    ) -> Result<String, FilterError> {
        self.match_recipients(message, channel, first_match_only, warn_on_drop)
            .map(|outcome| outcome.joined())
    }

    fn channel(&self, channel: &str) -> Result<Arc<ChannelFilters>, FilterError> {
        self.registry
            .get(channel)
            .ok_or_else(|| FilterError::ChannelNotFound {
                channel: channel.to_string(),
            })
    }
}

impl Default for FilterService {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for FilterService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

fn non_empty(channel: Option<&str>) -> Option<&str> {
    channel.filter(|c| !c.is_empty())
}

/// Diagnostic destination for dropped messages of `channel`.
fn log_endpoint(channel: &str, level: DropLevel) -> String {
    format!("log:{DROP_LOG_CATEGORY}.{channel}?level={level}&showAll=true&multiline=true")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use dynrouter_core::{Always, HeaderEquals, ManualClock, Never, Value};
    use proptest::prelude::*;

    use super::*;

    fn service() -> (FilterService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        (
            FilterService::new(Arc::new(DefaultFilterFactory), clock.clone()),
            clock,
        )
    }

    fn add(svc: &FilterService, channel: &str, id: &str, priority: i32, endpoint: &str) {
        svc.add_new_filter_for_channel(id, priority, Arc::new(Always), endpoint, channel, false)
            .expect("add filter");
    }

    fn count(svc: &FilterService, channel: &str, id: &str) -> u64 {
        svc.get_filter_by_id(id, Some(channel))
            .expect("filter present")
            .statistics()
            .count()
    }

    #[test]
    fn orders_scenario_routes_by_priority() {
        let (svc, _clock) = service();
        add(&svc, "orders", "f1", 10, "q1");
        add(&svc, "orders", "f2", 5, "q2");

        let mut msg = Message::new("order-1");
        let recipients = svc
            .get_matching_endpoints_for_exchange_by_channel(&mut msg, "orders", false, false)
            .unwrap();

        assert_eq!(recipients, "q2,q1");
        assert_eq!(count(&svc, "orders", "f1"), 1);
        assert_eq!(count(&svc, "orders", "f2"), 1);
        assert_eq!(msg.body(), &Value::from("order-1"));

        assert!(svc.remove_filter_by_id("f2", Some("orders")).unwrap());
        let recipients = svc
            .get_matching_endpoints_for_exchange_by_channel(&mut msg, "orders", true, false)
            .unwrap();
        assert_eq!(recipients, "q1");
    }

    #[test]
    fn first_match_only_touches_only_the_winner() {
        let (svc, _clock) = service();
        add(&svc, "c", "p3", 3, "e3");
        add(&svc, "c", "p1", 1, "e1");
        add(&svc, "c", "p2", 2, "e2");

        let mut msg = Message::new("m");
        let outcome = svc.match_recipients(&mut msg, "c", true, false).unwrap();

        assert_eq!(outcome, RoutingOutcome::Matched(vec!["e1".to_string()]));
        assert_eq!(count(&svc, "c", "p1"), 1);
        assert_eq!(count(&svc, "c", "p2"), 0);
        assert_eq!(count(&svc, "c", "p3"), 0);
    }

    #[test]
    fn duplicate_endpoints_are_kept() {
        let (svc, _clock) = service();
        add(&svc, "c", "a", 1, "shared");
        add(&svc, "c", "b", 2, "shared");

        let mut msg = Message::new("m");
        let joined = svc
            .get_matching_endpoints_for_exchange_by_channel(&mut msg, "c", false, false)
            .unwrap();
        assert_eq!(joined, "shared,shared");
    }

    #[test]
    fn only_matching_predicates_contribute() {
        let (svc, _clock) = service();
        svc.add_new_filter_for_channel(
            "eu",
            1,
            Arc::new(HeaderEquals::new("region", "eu")),
            "queue:eu",
            "c",
            false,
        )
        .unwrap();
        svc.add_new_filter_for_channel(
            "us",
            2,
            Arc::new(HeaderEquals::new("region", "us")),
            "queue:us",
            "c",
            false,
        )
        .unwrap();

        let mut msg = Message::new("m").with_header("region", "us");
        let joined = svc
            .get_matching_endpoints_for_exchange_by_channel(&mut msg, "c", false, false)
            .unwrap();
        assert_eq!(joined, "queue:us");
        assert_eq!(count(&svc, "c", "eu"), 0);
    }

    #[test]
    fn unmatched_message_keeps_original_body() {
        let (svc, _clock) = service();
        svc.add_new_filter_for_channel("n", 1, Arc::new(Never), "mock:n", "c", false)
            .unwrap();

        let original = Value::Bytes(vec![0, 159, 146, 150]);
        let mut msg = Message::new(original.clone());
        let outcome = svc.match_recipients(&mut msg, "c", false, true).unwrap();

        let RoutingOutcome::Unmatched {
            log_endpoint,
            level,
        } = &outcome
        else {
            panic!("expected unmatched outcome");
        };
        assert_eq!(*level, DropLevel::Warn);
        assert!(log_endpoint.starts_with("log:dynrouter.filter.service.c?"));
        assert!(log_endpoint.contains(".c?level=WARN"));
        assert_eq!(outcome.recipients(), vec![log_endpoint.clone()]);
        assert_eq!(outcome.joined(), "");

        assert_eq!(msg.original_body(), Some(&original));
        let body = msg.body().as_str().expect("diagnostic body is text");
        assert!(body.contains("channel 'c'"));
        assert!(body.contains(log_endpoint.as_str()));
        assert_eq!(count(&svc, "c", "n"), 0);
    }

    #[test]
    fn empty_channel_drops_with_debug_level() {
        let (svc, _clock) = service();
        svc.initialize_channel_filters("quiet");

        let mut msg = Message::new("m");
        let joined = svc
            .get_matching_endpoints_for_exchange_by_channel(&mut msg, "quiet", false, false)
            .unwrap();

        assert_eq!(joined, "");
        assert_eq!(msg.original_body(), Some(&Value::from("m")));
        let body = msg.body().as_str().unwrap();
        assert!(body.contains("level=DEBUG"));
    }

    #[test]
    fn unknown_channel_is_an_explicit_error() {
        let (svc, _clock) = service();
        let mut msg = Message::new("m");

        let expected = FilterError::ChannelNotFound {
            channel: "nope".to_string(),
        };
        assert_eq!(
            svc.get_matching_endpoints_for_exchange_by_channel(&mut msg, "nope", false, false),
            Err(expected.clone())
        );
        assert_eq!(svc.get_filters_for_channel("nope").unwrap_err(), expected);
        assert_eq!(svc.get_statistics_for_channel("nope").unwrap_err(), expected);
        assert_eq!(msg.body(), &Value::from("m"));
    }

    #[test]
    fn add_update_gate() {
        let (svc, _clock) = service();

        let err = svc
            .add_new_filter_for_channel("f1", 1, Arc::new(Always), "old", "c", true)
            .unwrap_err();
        assert!(err.update && !err.exists);

        assert_eq!(
            svc.add_new_filter_for_channel("f1", 1, Arc::new(Always), "old", "c", false),
            Ok("f1".to_string())
        );

        let err = svc
            .add_new_filter_for_channel("f1", 1, Arc::new(Always), "old", "c", false)
            .unwrap_err();
        assert!(!err.update && err.exists);

        svc.add_new_filter_for_channel("f1", 9, Arc::new(Always), "new", "c", true)
            .unwrap();

        let mut msg = Message::new("m");
        let joined = svc
            .get_matching_endpoints_for_exchange_by_channel(&mut msg, "c", false, false)
            .unwrap();
        assert_eq!(joined, "new");
        let filters = svc.get_filters_for_channel("c").unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].priority(), 9);
    }

    #[test]
    fn add_initializes_channel_lazily() {
        let (svc, _clock) = service();
        assert!(svc.channels().is_empty());
        add(&svc, "fresh", "f", 0, "e");
        assert_eq!(svc.channels(), vec!["fresh".to_string()]);
    }

    #[test]
    fn statistics_survive_removal() {
        let (svc, clock) = service();
        add(&svc, "c", "f1", 1, "e1");

        let mut msg = Message::new("m");
        svc.match_recipients(&mut msg, "c", false, false).unwrap();
        clock.advance(10);
        svc.match_recipients(&mut msg, "c", false, false).unwrap();

        assert!(svc.remove_filter_by_id("f1", Some("c")).unwrap());
        assert!(svc.get_filters_for_channel("c").unwrap().is_empty());

        let stats = svc.get_statistics_for_channel("c").unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].filter_id(), "f1");
        assert_eq!(stats[0].count(), 2);
        assert_eq!(stats[0].first(), 1_000);
        assert_eq!(stats[0].last(), 1_010);
    }

    #[test]
    fn lookup_without_channel_searches_all_channels() {
        let (svc, _clock) = service();
        add(&svc, "alpha", "a1", 1, "ea");
        add(&svc, "beta", "b1", 1, "eb");

        let found = svc.get_filter_by_id("b1", None).unwrap();
        assert_eq!(found.endpoint(), "eb");
        let found = svc.get_filter_by_id("a1", Some("")).unwrap();
        assert_eq!(found.endpoint(), "ea");

        assert_eq!(
            svc.get_filter_by_id("zz", None).unwrap_err(),
            FilterError::FilterNotFound {
                filter_id: "zz".to_string(),
                channel: None,
            }
        );
        assert_eq!(
            svc.get_filter_by_id("b1", Some("alpha")).unwrap_err(),
            FilterError::FilterNotFound {
                filter_id: "b1".to_string(),
                channel: Some("alpha".to_string()),
            }
        );
    }

    #[test]
    fn remove_resolves_channel_or_fails_hard() {
        let (svc, _clock) = service();
        add(&svc, "beta", "b1", 1, "eb");

        assert!(svc.remove_filter_by_id("b1", None).unwrap());
        assert!(svc.get_filters_for_channel("beta").unwrap().is_empty());

        // Resolution-phase absence is an error...
        assert!(matches!(
            svc.remove_filter_by_id("b1", None),
            Err(FilterError::FilterNotFound { .. })
        ));
        // ...while removal-phase absence in a known channel is a soft false.
        assert_eq!(svc.remove_filter_by_id("b1", Some("beta")), Ok(false));
        assert!(matches!(
            svc.remove_filter_by_id("b1", Some("gamma")),
            Err(FilterError::ChannelNotFound { .. })
        ));
    }

    #[test]
    fn create_filter_uses_injected_factory() {
        struct CountingFactory(AtomicUsize);

        impl FilterFactory for CountingFactory {
            fn create(
                &self,
                id: &str,
                priority: i32,
                predicate: Arc<dyn Predicate>,
                endpoint: &str,
                statistics: Arc<FilterStatistics>,
            ) -> PrioritizedFilter {
                self.0.fetch_add(1, Ordering::SeqCst);
                PrioritizedFilter::new(
                    id,
                    priority,
                    predicate,
                    format!("wrapped:{endpoint}"),
                    statistics,
                )
            }
        }

        let factory = Arc::new(CountingFactory(AtomicUsize::new(0)));
        let svc = FilterService::new(factory.clone(), Arc::new(SystemClock));

        let stats = Arc::new(FilterStatistics::with_system_clock("x"));
        let standalone = svc.create_filter("x", 0, Arc::new(Always), "e", stats);
        assert_eq!(standalone.endpoint(), "wrapped:e");
        assert!(svc.channels().is_empty());

        add(&svc, "c", "y", 0, "e");
        assert_eq!(factory.0.load(Ordering::SeqCst), 2);
        assert_eq!(svc.get_filter_by_id("y", Some("c")).unwrap().endpoint(), "wrapped:e");
    }

    #[test]
    fn concurrent_matching_counts_every_hit() {
        let (svc, _clock) = service();
        add(&svc, "hot", "always", 0, "e");
        let svc = Arc::new(svc);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let svc = Arc::clone(&svc);
                thread::spawn(move || {
                    for i in 0..250 {
                        let mut msg = Message::new(i64::from(i));
                        let joined = svc
                            .get_matching_endpoints_for_exchange_by_channel(
                                &mut msg, "hot", false, false,
                            )
                            .unwrap();
                        assert!(joined.starts_with('e'));
                        // Churn the channel while others are matching.
                        let id = format!("churn-{t}-{i}");
                        svc.add_new_filter_for_channel(&id, 100, Arc::new(Never), "x", "hot", false)
                            .unwrap();
                        svc.remove_filter_by_id(&id, Some("hot")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("matcher panicked");
        }

        let filter = svc.get_filter_by_id("always", Some("hot")).unwrap();
        assert_eq!(filter.statistics().count(), 2_000);
        assert_eq!(svc.get_filters_for_channel("hot").unwrap().len(), 1);
        assert!(filter.statistics().last() >= filter.statistics().first());
    }

    #[test]
    fn rejected_update_does_not_register_the_id() {
        let (svc, _clock) = service();
        assert!(svc
            .add_new_filter_for_channel("a", 0, Arc::new(Always), "e", "p", true)
            .is_err());
        assert_eq!(
            svc.add_new_filter_for_channel("a", 0, Arc::new(Always), "e", "p", false),
            Ok("a".to_string())
        );
        assert_eq!(svc.get_filters_for_channel("p").unwrap().len(), 1);
    }

    proptest! {
        #[test]
        fn add_succeeds_iff_update_matches_existence(
            ops in proptest::collection::vec(("[a-c]", any::<bool>()), 1..30)
        ) {
            let (svc, _clock) = service();
            let mut active = std::collections::HashSet::new();
            for (id, update) in ops {
                let exists = active.contains(&id);
                let result =
                    svc.add_new_filter_for_channel(&id, 0, Arc::new(Always), "e", "p", update);
                prop_assert_eq!(result.is_ok(), update == exists);
                if result.is_ok() {
                    active.insert(id);
                }
            }
        }

        #[test]
        fn matching_order_is_priority_then_id(
            entries in proptest::collection::btree_map("[a-z]{1,5}", -20i32..20, 1..20)
        ) {
            let (svc, _clock) = service();
            for (id, priority) in &entries {
                add(&svc, "p", id, *priority, id);
            }
            let mut expected: Vec<(i32, String)> =
                entries.iter().map(|(id, p)| (*p, id.clone())).collect();
            expected.sort();
            let expected: Vec<String> = expected.into_iter().map(|(_, id)| id).collect();

            let mut msg = Message::new("m");
            let joined = svc
                .get_matching_endpoints_for_exchange_by_channel(&mut msg, "p", false, false)
                .unwrap();
            prop_assert_eq!(joined, expected.join(","));
        }
    }
}
