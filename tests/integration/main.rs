//! Integration test harness (requires a running server + database)

mod api_tests;
