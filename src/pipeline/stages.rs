//! Built-in crawl stages
//!
//! `FetchStage` -> `ParseStage` -> `FollowLinksStage` is the classic page
//! pipeline. The stages find their collaborators in the run's services:
//! - `Arc<dyn Fetcher>` for [`FetchStage`]
//! - `ParserRegistry` for [`ParseStage`]

use crate::crawler::ProcessingContext;
use crate::fetch::{Document, FetchResponse, Fetcher, ParserRegistry};
use crate::pipeline::{Pipeline, PipelineResult, Stage, StageOutcome};
use crate::CrawlError;
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Fetches the task URL and stores the [`FetchResponse`]
///
/// Any non-2xx status fails the stage with [`CrawlError::HttpStatus`]. On
/// HTTP 429 the host is also throttled for `rate_limit_backoff`.
#[derive(Debug, Clone)]
pub struct FetchStage {
    rate_limit_backoff: Duration,
}

impl FetchStage {
    pub fn new() -> Self {
        Self {
            rate_limit_backoff: Duration::from_secs(60),
        }
    }

    pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }
}

impl Default for FetchStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for FetchStage {
    fn id(&self) -> &str {
        "fetch"
    }

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome> {
        let fetcher = Arc::clone(ctx.run().services().require::<Arc<dyn Fetcher>>()?);
        let url = ctx.task().url().clone();

        let response = fetcher.fetch(&url).await?;

        if response.status == 429 {
            let until = ctx.run().clock().now() + self.rate_limit_backoff;
            tracing::warn!("Rate limited by {}, backing off {:?}", url, self.rate_limit_backoff);
            ctx.run().politeness().throttle(&url, until);
        }

        if !response.is_success() {
            return Err(CrawlError::HttpStatus {
                url: url.to_string(),
                status: response.status,
            }
            .into());
        }

        ctx.insert(response);
        Ok(StageOutcome::Continue)
    }
}

/// Parses the fetched body into a [`Document`]
///
/// Content types without a registered parser finish the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseStage;

#[async_trait]
impl Stage for ParseStage {
    fn id(&self) -> &str {
        "parse"
    }

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome> {
        let document = {
            let response = ctx
                .get::<FetchResponse>()
                .ok_or_else(|| anyhow!("no fetched response for {}", ctx.task().url()))?;
            let registry = ctx.run().services().require::<ParserRegistry>()?;

            match registry.parser_for(&response.content_type) {
                Some(parser) => parser.parse(&response.final_url, &response.body)?,
                None => {
                    tracing::debug!(
                        "No parser for {} ({}), skipping",
                        ctx.task().url(),
                        response.content_type
                    );
                    return Ok(StageOutcome::Finish(PipelineResult::Done));
                }
            }
        };

        ctx.insert(document);
        Ok(StageOutcome::Continue)
    }
}

/// Enqueues every link of the parsed [`Document`]
#[derive(Debug, Clone, Default)]
pub struct FollowLinksStage {
    hint: Option<String>,
}

impl FollowLinksStage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a routing hint to every discovered task
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

#[async_trait]
impl Stage for FollowLinksStage {
    fn id(&self) -> &str {
        "follow-links"
    }

    async fn process(&self, ctx: &mut ProcessingContext) -> anyhow::Result<StageOutcome> {
        let links: Vec<String> = ctx
            .get::<Document>()
            .map(|document| document.links.iter().map(|u| u.to_string()).collect())
            .unwrap_or_default();

        let mut accepted = 0;
        for link in &links {
            if ctx.enqueue(link, self.hint.as_deref()) {
                accepted += 1;
            }
        }

        tracing::debug!(
            "{}: {} link(s), {} new",
            ctx.task().url(),
            links.len(),
            accepted
        );
        Ok(StageOutcome::Continue)
    }
}

/// The fetch, parse and follow-links pipeline
pub fn page_pipeline() -> Pipeline {
    Pipeline::new()
        .then(FetchStage::new())
        .then(ParseStage)
        .then(FollowLinksStage::new())
}
