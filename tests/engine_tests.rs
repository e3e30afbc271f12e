//! Integration tests for the query engine facade.
//!
//! These tests drive `QueryEngine` end to end over an in-memory index with a
//! fixed clock (Monday 2025-03-10).

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use task_view_query::config::{Config, EngineConfig};
use task_view_query::error::EngineError;
use task_view_query::provider::{IndexEvent, IndexProvider, MemoryIndex};
use task_view_query::query::{
    ConditionValue, EngineEvent, FilterCondition, FilterGroup, FilterNode, FilterOperator,
    FilterProperty, FilterQuery, GroupKey, QueryEngine, SortDirection, SortKey, TaskGroup,
    default_query, toggle_show_completed,
};
use task_view_query::recurrence::{NoRecurrence, OccurrenceEvaluator, SimpleRecurrence};
use task_view_query::registry::{ConfiguredPriorities, ConfiguredStatuses};
use task_view_query::types::TaskRecord;
use tokio::sync::broadcast;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Helper to create a record with a status.
fn task(path: &str, status: &str) -> TaskRecord {
    let mut t = TaskRecord::new(path, path);
    t.status = status.to_string();
    t
}

fn due(path: &str, status: &str, date: &str) -> TaskRecord {
    let mut t = task(path, status);
    t.due = Some(date.to_string());
    t
}

fn cond(
    id: &str,
    property: FilterProperty,
    operator: FilterOperator,
    value: Option<&str>,
) -> FilterNode {
    FilterCondition::new(id, property, operator, value.map(ConditionValue::text)).into()
}

/// Helper to build an engine over `index` with the fixed clock.
fn engine_with(
    index: Arc<MemoryIndex>,
    occurrences: Arc<dyn OccurrenceEvaluator>,
    engine: EngineConfig,
) -> QueryEngine {
    let config = Config::default();
    QueryEngine::new(
        index,
        Arc::new(ConfiguredStatuses::from_config(&config)),
        Arc::new(ConfiguredPriorities::from_config(&config)),
        occurrences,
        engine,
    )
    .with_clock(today)
}

fn engine(records: Vec<TaskRecord>) -> (Arc<MemoryIndex>, QueryEngine) {
    let index = Arc::new(MemoryIndex::from_records(records).with_today(today));
    let engine = engine_with(index.clone(), Arc::new(NoRecurrence), EngineConfig::default());
    (index, engine)
}

fn paths(groups: &[TaskGroup]) -> Vec<Vec<String>> {
    groups
        .iter()
        .map(|g| g.tasks.iter().map(|t| t.path.clone()).collect())
        .collect()
}

fn flat(groups: &[TaskGroup]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|g| g.tasks.iter().map(|t| t.path.clone()))
        .collect()
}

#[tokio::test]
async fn due_ascending_puts_dateless_last() {
    let (_, engine) = engine(vec![task("b.md", "open"), due("a.md", "open", "2025-01-08")]);
    let query = default_query().with_sort(SortKey::Due, SortDirection::Asc);

    let groups = engine.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["a.md", "b.md"]);

    let query = default_query().with_sort(SortKey::Due, SortDirection::Desc);
    let groups = engine.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["a.md", "b.md"]);
}

#[tokio::test]
async fn and_of_status_and_priority() {
    let mut r1 = task("r1.md", "open");
    r1.priority = "high".to_string();
    let mut r2 = task("r2.md", "open");
    r2.priority = "low".to_string();
    let (_, engine) = engine(vec![r1, r2]);

    let query = FilterQuery::new(FilterGroup::and(
        "root",
        vec![
            cond("c1", FilterProperty::Status, FilterOperator::Is, Some("open")),
            cond("c2", FilterProperty::Priority, FilterOperator::Is, Some("high")),
        ],
    ));
    let groups = engine.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["r1.md"]);
}

#[tokio::test]
async fn project_grouping_is_multi_membership() {
    let mut both = task("both.md", "open");
    both.projects = vec!["Alpha".to_string(), "Beta".to_string()];
    let (_, engine) = engine(vec![both, task("none.md", "open")]);

    let query = default_query().with_group(GroupKey::Project);
    let groups = engine.get_grouped_results(&query, None).await.unwrap();

    let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, vec!["Alpha", "Beta", "No Project"]);
    assert_eq!(
        paths(&groups),
        vec![vec!["both.md"], vec!["both.md"], vec!["none.md"]]
    );
}

#[tokio::test]
async fn recurring_task_bucketed_by_reference_date() {
    let mut standup = task("standup.md", "open");
    standup.recurrence = Some("FREQ=DAILY".to_string());
    standup.date_created = Some("2025-01-01".to_string());

    let index = Arc::new(MemoryIndex::from_records(vec![standup]).with_today(today));
    let engine = engine_with(index, Arc::new(SimpleRecurrence), EngineConfig::default());

    let query = default_query().with_group(GroupKey::Due);
    let groups = engine
        .get_grouped_results(&query, Some(day("2025-03-10")))
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Today");

    let groups = engine
        .get_grouped_results(&query, Some(day("2025-03-11")))
        .await
        .unwrap();
    assert_eq!(groups[0].name, "Tomorrow");
}

#[tokio::test]
async fn due_is_today_ignores_time_of_day() {
    let (_, engine) = engine(vec![
        due("late.md", "open", "2025-03-10T23:30"),
        due("bare.md", "open", "2025-03-10"),
        due("other.md", "open", "2025-03-11T00:10"),
    ]);
    let query = FilterQuery::new(FilterGroup::and(
        "root",
        vec![cond("c1", FilterProperty::Due, FilterOperator::Is, Some("today"))],
    ));
    let groups = engine.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["bare.md", "late.md"]);
}

#[tokio::test]
async fn repeated_queries_are_identical() {
    let (_, engine) = engine(vec![
        due("a.md", "open", "2025-03-12"),
        due("b.md", "done", "2025-03-01"),
        task("c.md", "in-progress"),
    ]);
    let query = FilterQuery::new(FilterGroup::or(
        "root",
        vec![
            cond("c1", FilterProperty::Status, FilterOperator::Is, Some("open")),
            cond("c2", FilterProperty::Due, FilterOperator::IsEmpty, None),
        ],
    ))
    .with_group(GroupKey::Status);

    let first = engine.get_grouped_results(&query, None).await.unwrap();
    let second = engine.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(flat(&first), vec!["a.md", "c.md"]);
}

#[tokio::test]
async fn empty_group_matches_everything() {
    let (_, engine) = engine(vec![task("a.md", "open"), task("b.md", "done")]);
    let groups = engine.get_grouped_results(&default_query(), None).await.unwrap();
    assert_eq!(flat(&groups).len(), 2);
}

#[tokio::test]
async fn incomplete_condition_is_ignored_under_any_conjunction() {
    let (_, engine) = engine(vec![task("a.md", "open"), task("b.md", "done")]);
    let incomplete = cond("x", FilterProperty::Title, FilterOperator::Contains, None);
    let status = cond("c1", FilterProperty::Status, FilterOperator::Is, Some("open"));

    for group in [
        FilterGroup::and("root", vec![status.clone(), incomplete.clone()]),
        FilterGroup::or("root", vec![status.clone(), incomplete.clone()]),
    ] {
        let groups = engine
            .get_grouped_results(&FilterQuery::new(group), None)
            .await
            .unwrap();
        assert_eq!(flat(&groups), vec!["a.md"]);
    }

    let only_incomplete = FilterQuery::new(FilterGroup::or("root", vec![incomplete]));
    let groups = engine.get_grouped_results(&only_incomplete, None).await.unwrap();
    assert_eq!(flat(&groups).len(), 2);
}

#[tokio::test]
async fn invalid_operator_yields_empty_result() {
    let (_, engine) = engine(vec![task("a.md", "open")]);
    let query = FilterQuery::new(FilterGroup::and(
        "root",
        vec![cond("bad", FilterProperty::Tags, FilterOperator::IsBefore, Some("today"))],
    ));
    let groups = engine.get_grouped_results(&query, None).await.unwrap();
    assert!(groups.is_empty());

    let tasks = engine.get_results_for_date(today(), &query, true).await.unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn results_for_date_with_overdue_folding() {
    let mut done_past = due("done-past.md", "done", "2025-03-01");
    done_past.title = "done past".to_string();
    let mut scheduled = task("scheduled.md", "open");
    scheduled.scheduled = Some("2025-03-10T08:00".to_string());
    let (_, engine) = engine(vec![
        due("today.md", "open", "2025-03-10"),
        due("past.md", "open", "2025-03-03"),
        done_past,
        scheduled,
        due("later.md", "open", "2025-03-20"),
    ]);
    let base = default_query();

    let without = engine.get_results_for_date(today(), &base, false).await.unwrap();
    let without: Vec<&str> = without.iter().map(|t| t.path.as_str()).collect();
    // Dateless (scheduled only) records sort after dated ones under due order.
    assert_eq!(without, vec!["today.md", "scheduled.md"]);

    let with = engine.get_results_for_date(today(), &base, true).await.unwrap();
    let mut with: Vec<&str> = with.iter().map(|t| t.path.as_str()).collect();
    with.sort();
    assert_eq!(with, vec!["past.md", "scheduled.md", "today.md"]);

    // Overdue folding only applies to today.
    let tomorrow = engine
        .get_results_for_date(day("2025-03-11"), &base, true)
        .await
        .unwrap();
    assert!(tomorrow.is_empty());
}

#[tokio::test]
async fn flat_results_across_dates_are_deduplicated() {
    let mut both = due("both.md", "open", "2025-03-11");
    both.scheduled = Some("2025-03-10".to_string());
    let (_, engine) = engine(vec![
        both,
        due("a.md", "open", "2025-03-10"),
        due("b.md", "open", "2025-03-12"),
    ]);

    let tasks = engine
        .get_flat_results_for_dates(&[day("2025-03-10"), day("2025-03-11")], &default_query())
        .await
        .unwrap();
    let tasks: Vec<&str> = tasks.iter().map(|t| t.path.as_str()).collect();
    assert_eq!(tasks, vec!["a.md", "both.md"]);
}

#[tokio::test]
async fn distinct_values_are_sorted_and_cached() {
    let mut a = task("a.md", "open");
    a.tags = vec!["work".to_string(), " ".to_string()];
    let mut b = task("b.md", "done");
    b.tags = vec!["home".to_string(), "work".to_string()];
    let (index, engine) = engine(vec![a, b]);

    let tags = engine
        .get_distinct_property_values(FilterProperty::Tags)
        .await
        .unwrap();
    assert_eq!(tags, vec!["home", "work"]);

    let statuses = engine
        .get_distinct_property_values(FilterProperty::Status)
        .await
        .unwrap();
    assert_eq!(statuses, vec!["done", "open"]);

    assert_eq!(engine.cache_stats().1, 2);

    // Index changes drop the cached lists.
    let mut c = task("c.md", "open");
    c.tags = vec!["errands".to_string()];
    index.upsert(c);
    let tags = engine
        .get_distinct_property_values(FilterProperty::Tags)
        .await
        .unwrap();
    assert_eq!(tags, vec!["errands", "home", "work"]);
    assert_eq!(engine.cache_stats().1, 1);

    engine.handle_index_event(&IndexEvent::Reindexed);
    assert_eq!(engine.cache_stats(), (0, 0));
}

#[tokio::test]
async fn provider_events_invalidate_and_notify() {
    let index = Arc::new(MemoryIndex::from_records(vec![task("a.md", "open")]).with_today(today));
    let engine = engine_with(index.clone(), Arc::new(NoRecurrence), EngineConfig::default());
    let mut changes = engine.subscribe();

    let query = FilterQuery::new(FilterGroup::and(
        "root",
        vec![cond("c1", FilterProperty::Status, FilterOperator::Is, Some("open"))],
    ));
    let groups = engine.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["a.md"]);
    assert_eq!(engine.cache_stats().0, 1);

    index.upsert(task("b.md", "open"));
    let event = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, EngineEvent::DataChanged);
    assert_eq!(engine.cache_stats(), (0, 0));
    assert_eq!(engine.pending_timers(), 0);

    let groups = engine.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["a.md", "b.md"]);
}

#[tokio::test]
async fn pruned_and_full_scan_engines_agree_after_upsert() {
    let index = Arc::new(MemoryIndex::from_records(vec![task("a.md", "open")]).with_today(today));
    let optimized = engine_with(index.clone(), Arc::new(NoRecurrence), EngineConfig::default());
    let full_scan = engine_with(
        index.clone(),
        Arc::new(NoRecurrence),
        EngineConfig {
            optimize: false,
            ..EngineConfig::default()
        },
    );
    let query = FilterQuery::new(FilterGroup::and(
        "root",
        vec![cond("c1", FilterProperty::Status, FilterOperator::Is, Some("open"))],
    ));
    let groups = optimized.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["a.md"]);
    assert_eq!(optimized.cache_stats().0, 1);

    // No yield: the next query must see the change on its own.
    index.upsert(task("b.md", "open"));
    let fast = optimized.get_grouped_results(&query, None).await.unwrap();
    let slow = full_scan.get_grouped_results(&query, None).await.unwrap();
    assert_eq!(flat(&fast), vec!["a.md", "b.md"]);
    assert_eq!(fast, slow);
}

#[tokio::test]
async fn dropping_the_engine_stops_forwarding() {
    let (index, engine) = engine(vec![task("a.md", "open")]);
    let mut changes = engine.subscribe();
    drop(engine);

    // Only the aborted forwarder could keep the channel open.
    let closed = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap();
    assert_eq!(closed, Err(broadcast::error::RecvError::Closed));
    assert_eq!(index.len(), 1);
}

#[tokio::test]
async fn shutdown_stops_forwarding_until_next_use() {
    let (index, engine) = engine(vec![task("a.md", "open")]);
    let mut changes = engine.subscribe();
    engine.shutdown();

    index.upsert(task("b.md", "open"));
    tokio::task::yield_now().await;
    assert_eq!(changes.try_recv(), Err(broadcast::error::TryRecvError::Empty));

    let groups = engine.get_grouped_results(&default_query(), None).await.unwrap();
    assert_eq!(flat(&groups), vec!["a.md", "b.md"]);
    index.upsert(task("c.md", "open"));
    let event = tokio::time::timeout(Duration::from_secs(5), changes.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, EngineEvent::DataChanged);
}

#[tokio::test]
async fn shutdown_cancels_timers() {
    let (_, engine) = engine(vec![task("a.md", "open")]);
    let query = FilterQuery::new(FilterGroup::and(
        "root",
        vec![cond("c1", FilterProperty::Status, FilterOperator::Is, Some("open"))],
    ));
    engine.get_grouped_results(&query, None).await.unwrap();
    engine
        .get_distinct_property_values(FilterProperty::Status)
        .await
        .unwrap();
    assert_eq!(engine.pending_timers(), 2);

    engine.shutdown();
    assert_eq!(engine.pending_timers(), 0);
    assert_eq!(engine.cache_stats(), (0, 0));
}

#[tokio::test]
async fn quick_toggle_hides_completed() {
    let (_, engine) = engine(vec![task("a.md", "open"), task("b.md", "done")]);
    let base = default_query();
    let hidden = toggle_show_completed(&base, false);

    let groups = engine.get_grouped_results(&hidden, None).await.unwrap();
    assert_eq!(flat(&groups), vec!["a.md"]);
    assert!(base.root.children.is_empty());
}

/// Provider whose every lookup fails.
struct FailingProvider {
    events: broadcast::Sender<IndexEvent>,
}

#[async_trait]
impl IndexProvider for FailingProvider {
    async fn get_all_paths(&self) -> Result<Vec<String>> {
        Err(anyhow!("disk unavailable"))
    }

    async fn get_paths_by_status(&self, _status: &str) -> Result<Vec<String>> {
        Err(anyhow!("disk unavailable"))
    }

    async fn get_paths_by_date(&self, _date_key: &str) -> Result<Vec<String>> {
        Err(anyhow!("disk unavailable"))
    }

    async fn get_overdue_paths(&self) -> Result<Vec<String>> {
        Err(anyhow!("disk unavailable"))
    }

    async fn get_record(&self, _path: &str) -> Result<Option<TaskRecord>> {
        Err(anyhow!("disk unavailable"))
    }

    fn subscribe(&self) -> broadcast::Receiver<IndexEvent> {
        self.events.subscribe()
    }
}

#[tokio::test]
async fn provider_errors_propagate() {
    let (events, _) = broadcast::channel(4);
    let config = Config::default();
    let engine = QueryEngine::new(
        Arc::new(FailingProvider { events }),
        Arc::new(ConfiguredStatuses::from_config(&config)),
        Arc::new(ConfiguredPriorities::from_config(&config)),
        Arc::new(NoRecurrence),
        EngineConfig::default(),
    )
    .with_clock(today);

    let err = engine
        .get_grouped_results(&default_query(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Provider(_)));
    assert!(err.to_string().contains("disk unavailable"));

    let err = engine
        .get_distinct_property_values(FilterProperty::Tags)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Provider(_)));
}

#[tokio::test]
async fn small_batches_hydrate_everything() {
    let records: Vec<TaskRecord> = (0..23).map(|i| task(&format!("t{:02}.md", i), "open")).collect();
    let index = Arc::new(MemoryIndex::from_records(records).with_today(today));
    let engine = engine_with(
        index,
        Arc::new(NoRecurrence),
        EngineConfig {
            batch_size: 5,
            ..EngineConfig::default()
        },
    );
    let groups = engine.get_grouped_results(&default_query(), None).await.unwrap();
    assert_eq!(flat(&groups).len(), 23);
}
