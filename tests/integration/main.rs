//! Integration tests for Ripple-Frontier

mod crawl_tests;
mod runner_tests;
