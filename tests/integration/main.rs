//! Integration tests for the harvester
//!
//! `crawl_tests` drives full runs against a wiremock server; `fatal_tests`
//! uses an in-process transport to script proxy failures.

mod crawl_tests;
mod fatal_tests;
