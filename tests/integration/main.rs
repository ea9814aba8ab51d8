//! Integration tests for Echo-Mesh
//!
//! These tests use wiremock to stand in for the directory API.

mod crawl_tests;
mod directory_tests;
