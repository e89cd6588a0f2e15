// handlers/mod.rs - Handlers grouped by access tier
//
// Public (no credential) → Protected (API key or bearer token, some routes admin-only)

pub mod protected; // {prefix}/users/*, {prefix}/me/*
pub mod public;    // {prefix}/health, /webhooks/*

use serde::{Deserialize, Serialize};

/// Plain confirmation body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub detail: String,
}

impl Status {
    pub fn new(detail: impl Into<String>) -> Self {
        Self { detail: detail.into() }
    }
}
