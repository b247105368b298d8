//! Completion-service client implementations.

pub mod anthropic;
