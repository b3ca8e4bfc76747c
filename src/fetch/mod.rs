//! Fetching and parsing collaborators
//!
//! These are the boundary interfaces the engine consumes:
//! - `Fetcher`: network I/O (`HttpFetcher` binds it to reqwest)
//! - `ParserRegistry`/`Parser`: bytes to `Document` (`HtmlParser` binds it to scraper)

mod fetcher;
mod parser;

pub use fetcher::{build_http_client, FetchResponse, Fetcher, HttpFetcher};
pub use parser::{Document, HtmlParser, Parser, ParserRegistry};
