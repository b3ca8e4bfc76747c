//! Pipelines, routes and the built-in crawl stages
//!
//! A [`Route`] names a [`Pipeline`]: an ordered list of [`Stage`]s run
//! against one task's [`ProcessingContext`](crate::crawler::ProcessingContext).
//! A [`RouteResolver`] picks the route for a task, and looks routes up by id
//! when a pipeline finishes with a [`PipelineResult::Route`] continuation.

mod route;
mod stage;
mod stages;

pub use route::{Route, RouteResolver, RouteTable, SimpleRoute};
pub use stage::{Pipeline, PipelineFailure, PipelineResult, Stage, StageOutcome};
pub use stages::{page_pipeline, FetchStage, FollowLinksStage, ParseStage};
