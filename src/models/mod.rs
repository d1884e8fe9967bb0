//! Request and Response models for the HTTP API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{InvalidateRequest, ListQuery, MAX_PAGE_SIZE};
pub use responses::{HealthResponse, RemovedResponse, StatsResponse};
