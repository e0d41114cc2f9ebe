// SPDX-License-Identifier: MIT

//! Business logic services.

pub mod offload;
pub mod orchestrator;
pub mod resume;

pub use orchestrator::{ExecutionResult, ExecutionStatus, Orchestrator};
pub use resume::{ResumeCoordinator, ResumeRequest};
