//! Integration tests for scheduling and execution without the network
//!
//! Stages here are synthetic: they record what ran and enqueue links from a
//! generated graph, so the tests exercise ordering, deduplication, routing
//! and the configuration-driven policies through the public API only.

use async_trait::async_trait;
use parking_lot::Mutex;
use ripple_frontier::config::{parse_config, EngineConfig};
use ripple_frontier::crawler::{ProcessingContext, RunContext, Runner, Services, Task};
use ripple_frontier::pipeline::{
    Pipeline, PipelineResult, RouteTable, SimpleRoute, Stage, StageOutcome,
};
use ripple_frontier::policy::{AllowAll, NoPoliteness, SimpleRetryPolicy};
use ripple_frontier::queue::PriorityFrontier;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

type Journal = Arc<Mutex<Vec<String>>>;

/// Appends `label:path` for every task it sees, then optionally continues
/// on another route
struct Record {
    label: &'static str,
    journal: Journal,
    continue_on: Option<&'static str>,
}

impl Record {
    fn new(label: &'static str, journal: &Journal) -> Self {
        Self {
            label,
            journal: Arc::clone(journal),
            continue_on: None,
        }
    }

    fn then_route(mut self, route_id: &'static str) -> Self {
        self.continue_on = Some(route_id);
        self
    }
}

#[async_trait]
impl Stage for Record {
    fn id(&self) -> &str {
        self.label
    }

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome> {
        self.journal
            .lock()
            .push(format!("{}:{}", self.label, ctx.task().url().path()));

        Ok(match self.continue_on {
            Some(route_id) => StageOutcome::Finish(PipelineResult::Route(route_id.to_string())),
            None => StageOutcome::Continue,
        })
    }
}

/// Enqueues a fixed list of links, optionally with a routing hint
struct Links {
    links: Vec<&'static str>,
    hint: Option<&'static str>,
}

#[async_trait]
impl Stage for Links {
    fn id(&self) -> &str {
        "links"
    }

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome> {
        for link in &self.links {
            ctx.enqueue(link, self.hint);
        }
        Ok(StageOutcome::Continue)
    }
}

/// Walks a generated graph: node `i` links to three other nodes
struct Graph {
    nodes: usize,
    visits: Arc<Mutex<HashMap<String, usize>>>,
}

#[async_trait]
impl Stage for Graph {
    fn id(&self) -> &str {
        "graph"
    }

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome> {
        let path = ctx.task().url().path().to_string();
        *self.visits.lock().entry(path.clone()).or_default() += 1;

        let node: usize = path.trim_start_matches("/n/").parse()?;
        for next in [
            (node + 1) % self.nodes,
            (node * 7 + 1) % self.nodes,
            (node * 3 + 2) % self.nodes,
        ] {
            ctx.enqueue(&format!("/n/{}", next), None);
        }

        tokio::task::yield_now().await;
        Ok(StageOutcome::Continue)
    }
}

fn open_run() -> RunContext {
    RunContext::builder()
        .scope(Arc::new(AllowAll))
        .politeness(Arc::new(NoPoliteness))
        .retry_policy(Arc::new(SimpleRetryPolicy::new(
            2,
            Duration::from_millis(10),
        )))
        .frontier(Arc::new(PriorityFrontier::new()))
        .build()
        .expect("Failed to build run")
}

fn engine_config(max_in_flight: usize) -> EngineConfig {
    EngineConfig {
        max_in_flight,
        ..EngineConfig::default()
    }
}

fn url(path: &str) -> Url {
    Url::parse(&format!("https://example.com{}", path)).expect("Failed to parse URL")
}

#[tokio::test]
async fn test_priority_frontier_orders_sequential_run() {
    let journal: Journal = Arc::default();
    let run = Arc::new(open_run());

    let now = Instant::now();
    for (path, priority) in [("/low", 5), ("/urgent", -1), ("/normal", 0), ("/late", 5)] {
        run.frontier()
            .offer(Task::seed(url(path), now).with_priority(priority));
    }

    let routes = RouteTable::new().fallback(Arc::new(SimpleRoute::new(
        "record",
        Pipeline::new().then(Record::new("record", &journal)),
    )));
    let runner = Runner::from_config(Arc::clone(&run), Arc::new(routes), &engine_config(1))
        .expect("Failed to build runner");

    let summary = runner.run().await;

    assert_eq!(summary.completed, 4);
    assert_eq!(
        *journal.lock(),
        vec![
            "record:/urgent",
            "record:/normal",
            "record:/low",
            "record:/late"
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_graph_walk_visits_each_node_once() {
    const NODES: usize = 500;

    let visits = Arc::new(Mutex::new(HashMap::new()));
    let run = Arc::new(open_run());
    let seeds = run.seed(["https://example.com/n/0"]);
    assert_eq!(seeds.accepted_count(), 1);

    let routes = RouteTable::new().fallback(Arc::new(SimpleRoute::new(
        "graph",
        Pipeline::new().then(Graph {
            nodes: NODES,
            visits: Arc::clone(&visits),
        }),
    )));
    let runner = Runner::from_config(Arc::clone(&run), Arc::new(routes), &engine_config(16))
        .expect("Failed to build runner");

    let summary = runner.run().await;

    let visits = visits.lock();
    assert_eq!(visits.len(), NODES);
    assert!(visits.values().all(|&count| count == 1));
    assert_eq!(summary.completed, NODES as u64);
    assert_eq!(summary.executed, NODES as u64);
    assert_eq!(run.seen().discovered_count(), NODES);
    assert_eq!(run.seen().processed_count(), NODES);
    assert!(run.is_idle());
}

#[tokio::test]
async fn test_hints_and_continuations_route_tasks() {
    let journal: Journal = Arc::default();
    let run = Arc::new(open_run());
    run.frontier()
        .offer(Task::seed(url("/listing"), Instant::now()).with_hint("listing"));

    let routes = RouteTable::new()
        .on_hint(
            "listing",
            Arc::new(SimpleRoute::new(
                "listing",
                Pipeline::new()
                    .then(Record::new("listing", &journal))
                    .then(Links {
                        links: vec!["/item/1", "/item/2"],
                        hint: Some("item"),
                    }),
            )),
        )
        .on_hint(
            "item",
            Arc::new(SimpleRoute::new(
                "item",
                Pipeline::new().then(Record::new("item", &journal).then_route("archive")),
            )),
        )
        .add(Arc::new(SimpleRoute::new(
            "archive",
            Pipeline::new().then(Record::new("archive", &journal)),
        )));
    let runner = Runner::from_config(Arc::clone(&run), Arc::new(routes), &engine_config(1))
        .expect("Failed to build runner");

    let summary = runner.run().await;

    assert_eq!(summary.executed, 3);
    assert_eq!(summary.completed, 3);
    assert_eq!(
        *journal.lock(),
        vec![
            "listing:/listing",
            "item:/item/1",
            "archive:/item/1",
            "item:/item/2",
            "archive:/item/2"
        ]
    );
}

#[tokio::test]
async fn test_unroutable_tasks_are_dead_lettered() {
    let run = Arc::new(open_run());
    run.frontier()
        .offer(Task::seed(url("/feed.xml"), Instant::now()).with_hint("feed"));

    let routes = RouteTable::new().on_hint(
        "page",
        Arc::new(SimpleRoute::new("page", Pipeline::new())),
    );
    let runner = Runner::from_config(Arc::clone(&run), Arc::new(routes), &engine_config(2))
        .expect("Failed to build runner");

    let summary = runner.run().await;

    assert_eq!(summary.dead_lettered, 1);
    let items = run.dead_letters().items();
    assert_eq!(items[0].reason, "no route");
    assert_eq!(items[0].route_id, None);
}

/// Fails every task whose path contains "broken"
struct Flaky;

#[async_trait]
impl Stage for Flaky {
    fn id(&self) -> &str {
        "flaky"
    }

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome> {
        if ctx.task().url().path().contains("broken") {
            anyhow::bail!("refusing {}", ctx.task().url());
        }
        Ok(StageOutcome::Continue)
    }
}

#[tokio::test(start_paused = true)]
async fn test_configured_run_applies_scope_and_retry() {
    let config = parse_config(
        r#"
[engine]
max-in-flight = 2

[retry]
strategy = "linear"
max-attempts = 2
base-delay-ms = 10

[politeness]
minimum-delay-ms = 1

[scope]
max-depth = 1

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
summary-path = "report.md"

[[quality]]
domain = "example.com"
seeds = ["https://example.com/"]
"#,
    )
    .expect("Failed to parse config");

    let run = Arc::new(
        RunContext::from_config(&config, Services::new()).expect("Failed to build run"),
    );
    let seeds = run.seed(
        config
            .quality
            .iter()
            .flat_map(|q| q.seeds.iter().map(String::as_str)),
    );
    assert_eq!(seeds.accepted_count(), 1);

    let routes = RouteTable::new().fallback(Arc::new(SimpleRoute::new(
        "page",
        Pipeline::new().then(Flaky).then(Links {
            links: vec![
                "https://example.com/ok",
                "https://example.com/broken",
                "https://other.org/",
                "https://example.com/ok",
                "https://example.com/too/deep",
            ],
            hint: None,
        }),
    )));
    let runner = Runner::from_config(Arc::clone(&run), Arc::new(routes), &config.engine)
        .expect("Failed to build runner");

    let summary = runner.run().await;

    // The seed, /ok and /too/deep complete; /broken runs three times. Links
    // found at depth 1 sit past max depth and never enter the frontier.
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.retried, 2);
    assert_eq!(summary.dead_lettered, 1);
    assert_eq!(summary.executed, 6);
    assert_eq!(run.seen().discovered_count(), 4);

    let items = run.dead_letters().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url.path(), "/broken");
    assert_eq!(items[0].attempt, 2);
    assert_eq!(items[0].stage_id.as_deref(), Some("flaky"));
    assert!(run.is_idle());
}
