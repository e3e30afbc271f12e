//! Query engine facade.
//!
//! Runs the pipeline validate → retrieve candidates → evaluate → sort →
//! group over an [`IndexProvider`]. Malformed queries never surface as
//! errors: they are logged and produce empty results. Provider failures are
//! I/O problems and are returned to the caller.
//!
//! The engine subscribes to the provider when it is built. Pending index
//! events are applied before every operation, so cached lookups never
//! outlive a change. A background task forwards each event to engine
//! subscribers as [`EngineEvent::DataChanged`].

use super::candidates::{CandidateRetriever, PathSet};
use super::cache::TtlCache;
use super::dates::local_today;
use super::evaluate::{EvalContext, evaluate_group};
use super::group::{GroupContext, TaskGroup, group_tasks};
use super::safety::{PruneStrategy, analyze};
use super::sort::sort_tasks;
use super::tree::{FilterProperty, FilterQuery};
use super::validate::validate_group;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, QueryError};
use crate::provider::{IndexEvent, IndexProvider};
use crate::recurrence::OccurrenceEvaluator;
use crate::registry::{PriorityRegistry, StatusRegistry};
use crate::types::TaskRecord;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the engine's change channel.
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Signals sent to engine subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The underlying data changed; dependent views should re-query.
    DataChanged,
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct QueryEngine {
    provider: Arc<dyn IndexProvider>,
    statuses: Arc<dyn StatusRegistry>,
    priorities: Arc<dyn PriorityRegistry>,
    occurrences: Arc<dyn OccurrenceEvaluator>,
    config: EngineConfig,
    retriever: CandidateRetriever,
    values: TtlCache<FilterProperty, Vec<String>>,
    changes: broadcast::Sender<EngineEvent>,
    index_events: Mutex<broadcast::Receiver<IndexEvent>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    clock: Clock,
}

impl QueryEngine {
    pub fn new(
        provider: Arc<dyn IndexProvider>,
        statuses: Arc<dyn StatusRegistry>,
        priorities: Arc<dyn PriorityRegistry>,
        occurrences: Arc<dyn OccurrenceEvaluator>,
        config: EngineConfig,
    ) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let index_events = Mutex::new(provider.subscribe());
        let engine = Self {
            provider,
            statuses,
            priorities,
            occurrences,
            retriever: CandidateRetriever::new(config.cache_ttl()),
            values: TtlCache::new(config.values_cache_ttl()),
            config,
            changes,
            index_events,
            forwarder: Mutex::new(None),
            clock: Arc::new(local_today),
        };
        engine.ensure_forwarder();
        engine
    }

    /// Replace the clock used to resolve "today".
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Filter, sort and group. Invalid queries yield no groups.
    pub async fn get_grouped_results(
        &self,
        query: &FilterQuery,
        reference_date: Option<NaiveDate>,
    ) -> EngineResult<Vec<TaskGroup>> {
        self.sync_with_index();
        let today = self.today();
        let reference = reference_date.unwrap_or(today);

        let matched = match self.matching(query, today, reference, None).await {
            Ok(matched) => matched,
            Err(err) => return recover(err, Vec::new()),
        };
        let mut tasks: Vec<TaskRecord> = matched.into_iter().map(|(_, record)| record).collect();
        sort_tasks(
            &mut tasks,
            query.sort_key,
            query.sort_direction,
            self.priorities.as_ref(),
        );

        let ctx = self.group_context(today, reference);
        Ok(group_tasks(tasks, query.group_key, &ctx))
    }

    /// Records of `base` that fall on `date`: due or scheduled that day, or
    /// recurring with an occurrence on it. When `date` is today and
    /// `include_overdue_today` is set, overdue records are folded in.
    pub async fn get_results_for_date(
        &self,
        date: NaiveDate,
        base: &FilterQuery,
        include_overdue_today: bool,
    ) -> EngineResult<Vec<TaskRecord>> {
        self.sync_with_index();
        match self.results_for_date(date, base, include_overdue_today).await {
            Ok(tasks) => Ok(tasks),
            Err(err) => recover(err, Vec::new()),
        }
    }

    /// Union of [`Self::get_results_for_date`] over `dates`, deduplicated by
    /// path and sorted by the base query.
    pub async fn get_flat_results_for_dates(
        &self,
        dates: &[NaiveDate],
        base: &FilterQuery,
    ) -> EngineResult<Vec<TaskRecord>> {
        self.sync_with_index();
        let mut seen = HashSet::new();
        let mut tasks = Vec::new();
        for date in dates {
            let day = match self.results_for_date(*date, base, false).await {
                Ok(day) => day,
                Err(err) => return recover(err, Vec::new()),
            };
            for record in day {
                if seen.insert(record.path.clone()) {
                    tasks.push(record);
                }
            }
        }
        sort_tasks(
            &mut tasks,
            base.sort_key,
            base.sort_direction,
            self.priorities.as_ref(),
        );
        Ok(tasks)
    }

    /// Sorted distinct non-blank values of `property` across all records.
    ///
    /// Only list and selection properties are supported; others yield none.
    pub async fn get_distinct_property_values(
        &self,
        property: FilterProperty,
    ) -> EngineResult<Vec<String>> {
        self.sync_with_index();
        if let Some(values) = self.values.get(&property) {
            debug!("values cache hit: {}", property);
            return Ok(values);
        }

        let paths = self
            .provider
            .get_all_paths()
            .await
            .map_err(EngineError::provider)?;
        let records = self.hydrate(paths).await?;

        let mut values = BTreeSet::new();
        for record in &records {
            let found: Vec<&String> = match property {
                FilterProperty::Status => vec![&record.status],
                FilterProperty::Priority => vec![&record.priority],
                FilterProperty::Tags => record.tags.iter().collect(),
                FilterProperty::Contexts => record.contexts.iter().collect(),
                FilterProperty::Projects => record.projects.iter().collect(),
                _ => Vec::new(),
            };
            values.extend(
                found
                    .into_iter()
                    .map(|v| v.trim())
                    .filter(|v| !v.is_empty())
                    .map(str::to_string),
            );
        }

        let values: Vec<String> = values.into_iter().collect();
        self.values.insert(property, values.clone());
        Ok(values)
    }

    /// Receive [`EngineEvent::DataChanged`] after every provider change.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.ensure_forwarder();
        self.changes.subscribe()
    }

    /// React to a provider change: drop caches and notify subscribers.
    pub fn handle_index_event(&self, event: &IndexEvent) {
        debug!("index event: {:?}", event);
        self.invalidate();
        // No subscribers is fine.
        let _ = self.changes.send(EngineEvent::DataChanged);
    }

    /// Clear every cache and cancel pending expiry timers.
    pub fn invalidate(&self) {
        self.retriever.clear();
        self.values.clear();
    }

    /// Release timers and stop forwarding index events. The engine stays
    /// usable; the next operation resumes forwarding.
    pub fn shutdown(&self) {
        self.stop_forwarder();
        self.invalidate();
        info!("query engine shut down");
    }

    /// Cached index lookups and distinct-value lists currently held.
    pub fn cache_stats(&self) -> (usize, usize) {
        self.sync_with_index();
        (self.retriever.cached_lookups(), self.values.len())
    }

    /// Expiry timers still pending across both caches.
    pub fn pending_timers(&self) -> usize {
        self.sync_with_index();
        self.retriever.pending_timers() + self.values.pending_timers()
    }

    /// Apply index events received since the last operation.
    fn sync_with_index(&self) {
        self.ensure_forwarder();
        let mut changed = false;
        {
            let mut events = lock(&self.index_events);
            loop {
                match events.try_recv() {
                    Ok(event) => {
                        debug!("index event: {:?}", event);
                        changed = true;
                    }
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!("missed {} index events; invalidating", skipped);
                        changed = true;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
                }
            }
        }
        if changed {
            self.invalidate();
        }
    }

    /// Start forwarding provider events when a runtime is available.
    fn ensure_forwarder(&self) {
        let mut forwarder = lock(&self.forwarder);
        if forwarder.is_some() || Handle::try_current().is_err() {
            return;
        }
        *forwarder = Some(spawn_forwarder(
            self.provider.subscribe(),
            self.changes.clone(),
        ));
    }

    fn stop_forwarder(&self) {
        if let Some(handle) = lock(&self.forwarder).take() {
            handle.abort();
        }
    }

    async fn results_for_date(
        &self,
        date: NaiveDate,
        base: &FilterQuery,
        include_overdue_today: bool,
    ) -> EngineResult<Vec<TaskRecord>> {
        let today = self.today();
        let candidates = self.candidate_paths(base, today).await?;
        let overdue: PathSet = if include_overdue_today && date == today {
            self.provider
                .get_overdue_paths()
                .await
                .map_err(EngineError::provider)?
                .into_iter()
                .filter(|path| candidates.contains(path))
                .collect()
        } else {
            PathSet::new()
        };

        let matched = self
            .matching(base, today, date, Some(candidates))
            .await?;
        let ctx = self.group_context(today, date);

        let mut tasks: Vec<TaskRecord> = matched
            .into_iter()
            .filter(|(path, record)| {
                falls_on(record, date)
                    || (record.is_recurring() && self.occurrences.is_active_on(record, date))
                    || (overdue.contains(path) && ctx.is_overdue(record))
            })
            .map(|(_, record)| record)
            .collect();

        sort_tasks(
            &mut tasks,
            base.sort_key,
            base.sort_direction,
            self.priorities.as_ref(),
        );
        Ok(tasks)
    }

    /// Validated, evaluated matches as `(path, record)` in path order.
    async fn matching(
        &self,
        query: &FilterQuery,
        today: NaiveDate,
        target_date: NaiveDate,
        candidates: Option<PathSet>,
    ) -> EngineResult<Vec<(String, TaskRecord)>> {
        validate_group(&query.root, false)?;

        let candidates = match candidates {
            Some(candidates) => candidates,
            None => self.candidate_paths(query, today).await?,
        };
        let records = self.hydrate(candidates).await?;

        let ctx = EvalContext {
            statuses: self.statuses.as_ref(),
            today,
            target_date,
        };
        let mut matched = Vec::new();
        for record in records {
            if evaluate_group(&query.root, &record, &ctx)? {
                matched.push((record.path.clone(), record));
            }
        }
        Ok(matched)
    }

    async fn candidate_paths(&self, query: &FilterQuery, today: NaiveDate) -> EngineResult<PathSet> {
        validate_group(&query.root, false)?;
        let strategy = if self.config.optimize {
            analyze(&query.root)
        } else {
            PruneStrategy::FullScan
        };
        debug!("candidate strategy: {:?}", strategy);
        self.retriever
            .candidates(self.provider.as_ref(), &strategy, today)
            .await
            .map_err(EngineError::provider)
    }

    /// Load records in batches, yielding to the runtime between batches.
    async fn hydrate(&self, paths: impl IntoIterator<Item = String>) -> EngineResult<Vec<TaskRecord>> {
        let paths: Vec<String> = paths.into_iter().collect();
        let batch_size = self.config.batch_size.max(1);
        let mut records = Vec::with_capacity(paths.len());

        for (i, batch) in paths.chunks(batch_size).enumerate() {
            if i > 0 {
                tokio::task::yield_now().await;
            }
            for path in batch {
                // Paths removed since the lookup are skipped.
                if let Some(record) = self
                    .provider
                    .get_record(path)
                    .await
                    .map_err(EngineError::provider)?
                {
                    records.push(record);
                }
            }
        }
        Ok(records)
    }

    fn group_context(&self, today: NaiveDate, reference_date: NaiveDate) -> GroupContext<'_> {
        GroupContext {
            statuses: self.statuses.as_ref(),
            priorities: self.priorities.as_ref(),
            occurrences: self.occurrences.as_ref(),
            today,
            reference_date,
            overdue_policy: self.config.overdue_policy,
        }
    }
}

impl Drop for QueryEngine {
    fn drop(&mut self) {
        self.stop_forwarder();
        self.invalidate();
    }
}

/// Relay provider events as [`EngineEvent::DataChanged`] until the provider
/// closes its channel or the task is aborted.
fn spawn_forwarder(
    mut events: broadcast::Receiver<IndexEvent>,
    changes: broadcast::Sender<EngineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!("forwarder skipped {} index events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
            // No subscribers is fine.
            let _ = changes.send(EngineEvent::DataChanged);
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Stored due or scheduled date on `date`.
fn falls_on(record: &TaskRecord, date: NaiveDate) -> bool {
    [&record.due, &record.scheduled]
        .into_iter()
        .flatten()
        .filter_map(|raw| super::dates::parse_task_date(raw))
        .any(|d| d.day == date)
}

/// Query errors become `fallback`; provider errors propagate.
fn recover<T>(err: EngineError, fallback: T) -> EngineResult<T> {
    match err {
        EngineError::Query(err) => {
            log_query_error(&err);
            Ok(fallback)
        }
        other => Err(other),
    }
}

fn log_query_error(err: &QueryError) {
    if err.is_validation() {
        warn!("query rejected: {}", err);
    } else {
        warn!("query evaluation failed: {}", err);
    }
}
