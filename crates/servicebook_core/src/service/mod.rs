//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into use-case level APIs.
//! - Validate caller input before anything is written.
//! - Run the reminder sweep against an injected delivery collaborator.

pub mod error;
pub mod maintenance_service;
pub mod notification_service;
pub mod vehicle_service;
