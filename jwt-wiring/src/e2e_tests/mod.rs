//! End-to-end tests at the registry level.
//!
//! Each test file covers one scenario, wiring a configuration through a
//! registry and checking what downstream consumers observe.

#![cfg(test)]

mod helpers;

mod test_concurrent_materialization;
mod test_default_aliases;
mod test_document_wiring;
mod test_duplicate_binding;
mod test_example_scenario;
mod test_failure_retry;
mod test_issue_and_verify;
mod test_settings_wiring;
mod test_unresolvable_entries;
mod test_verify_token;
