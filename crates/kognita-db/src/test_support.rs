//! Shared test utilities for kognita-db tests.
