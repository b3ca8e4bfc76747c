//! Routes and route resolution

use crate::crawler::{RunContext, Task};
use crate::pipeline::Pipeline;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A named pipeline
pub trait Route: Send + Sync {
    fn id(&self) -> &str;

    fn pipeline(&self) -> &Pipeline;
}

/// Route made of an id and a pipeline
#[derive(Debug, Clone)]
pub struct SimpleRoute {
    id: String,
    pipeline: Pipeline,
}

impl SimpleRoute {
    pub fn new(id: impl Into<String>, pipeline: Pipeline) -> Self {
        Self {
            id: id.into(),
            pipeline,
        }
    }
}

impl Route for SimpleRoute {
    fn id(&self) -> &str {
        &self.id
    }

    fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }
}

/// Maps tasks to routes
pub trait RouteResolver: Send + Sync {
    /// Picks the route for a task, `None` if the task is unroutable
    fn resolve(&self, task: &Task, run: &RunContext) -> Option<Arc<dyn Route>>;

    /// Looks up the target of a [`PipelineResult::Route`] continuation
    ///
    /// [`PipelineResult::Route`]: crate::pipeline::PipelineResult::Route
    fn by_id(&self, route_id: &str) -> Option<Arc<dyn Route>>;
}

type Predicate = Arc<dyn Fn(&Task) -> bool + Send + Sync>;

/// Ordered list of predicate routes with an id index
///
/// Predicates are checked in registration order; the first match wins and
/// the fallback route, if any, catches everything else. Every registered
/// route is also reachable by id.
///
/// # Examples
///
/// ```
/// use ripple_frontier::pipeline::{Pipeline, RouteTable, SimpleRoute};
/// use std::sync::Arc;
///
/// let table = RouteTable::new()
///     .on_hint("feed", Arc::new(SimpleRoute::new("feed", Pipeline::new())))
///     .fallback(Arc::new(SimpleRoute::new("page", Pipeline::new())));
/// assert_eq!(table.len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<(Predicate, Arc<dyn Route>)>,
    index: HashMap<String, Arc<dyn Route>>,
    fallback: Option<Arc<dyn Route>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a route reachable only by id
    pub fn add(mut self, route: Arc<dyn Route>) -> Self {
        self.index.insert(route.id().to_string(), route);
        self
    }

    /// Registers a route for tasks matching `predicate`
    pub fn route_when<F>(mut self, predicate: F, route: Arc<dyn Route>) -> Self
    where
        F: Fn(&Task) -> bool + Send + Sync + 'static,
    {
        self.index.insert(route.id().to_string(), Arc::clone(&route));
        self.routes.push((Arc::new(predicate), route));
        self
    }

    /// Registers a route for tasks carrying `hint`
    pub fn on_hint(self, hint: &str, route: Arc<dyn Route>) -> Self {
        let hint = hint.to_string();
        self.route_when(move |task| task.hint() == Some(hint.as_str()), route)
    }

    /// Sets the route used when no predicate matches
    pub fn fallback(mut self, route: Arc<dyn Route>) -> Self {
        self.index.insert(route.id().to_string(), Arc::clone(&route));
        self.fallback = Some(route);
        self
    }

    /// Number of distinct route ids
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

impl RouteResolver for RouteTable {
    fn resolve(&self, task: &Task, _run: &RunContext) -> Option<Arc<dyn Route>> {
        self.routes
            .iter()
            .find(|(predicate, _)| predicate(task))
            .map(|(_, route)| Arc::clone(route))
            .or_else(|| self.fallback.clone())
    }

    fn by_id(&self, route_id: &str) -> Option<Arc<dyn Route>> {
        self.index.get(route_id).cloned()
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field(
                "routes",
                &self.routes.iter().map(|(_, r)| r.id()).collect::<Vec<_>>(),
            )
            .field("fallback", &self.fallback.as_ref().map(|r| r.id()))
            .finish()
    }
}
