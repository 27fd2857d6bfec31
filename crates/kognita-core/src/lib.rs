//! # kognita-core
//!
//! Core types for the Kognita practice/testing engine.
//!
//! This crate provides the foundational types shared across all Kognita crates:
//! - Entity structs for the domain objects (sessions, tasks, results, answers)
//! - Kind and state enums with state machine transitions
//! - The spaced-repetition score evaluator
//! - Multiple-choice answer evaluation (forgiving and unforgiving scoring)
//! - Submission payloads and response/view types for the transport layer
//!
//! Everything here is pure: no I/O, no database access. Persistence lives in
//! `kognita-db`.

pub mod entities;
pub mod enums;
pub mod evaluate;
pub mod responses;
pub mod scoring;
pub mod submit;
