//! # Carlog Architecture
//!
//! Carlog is a **UI-agnostic vehicle ledger library**. It keeps fuel, service,
//! purchase and tire records per vehicle, derives fuel economy and maintenance
//! status from them, schedules local reminders, and round-trips everything
//! through a versioned JSON backup.
//!
//! ## The Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (crates/carlog)                                        │
//! │  - Parses arguments, renders results, owns the terminal     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands, fills in configured defaults  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - One module per operation, commits or rolls back          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Domain (fuel, wheels, reminders, backup)                   │
//! │  - Pure rules over model types and the ports below          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Ports (store/, reminders::NotificationCenter)              │
//! │  - DataStore, AttachmentFiles, CooldownStore                │
//! │  - File-backed for production, in-memory for tests          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! From `api.rs` inward nothing writes to stdout or exits the process. The
//! one piece of I/O the core does itself is reading and writing the backup
//! file in `commands::export` and `commands::import`.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade, entry point for all operations
//! - [`commands`]: Business operations returning [`commands::CmdResult`]
//! - [`fuel`]: Fill-to-fill consumption engine
//! - [`wheels`]: Which wheel set a vehicle currently runs on
//! - [`reminders`]: Due status and notification scheduling
//! - [`backup`]: Versioned backup document, export and import
//! - [`store`]: Storage abstraction and implementations
//! - [`model`]: Core record types
//! - [`ordering`]: Canonical entry ordering
//! - [`config`]: Configuration management
//! - [`init`]: Wires config and file-backed ports together
//! - [`error`]: Error types

pub mod api;
pub mod backup;
pub mod commands;
pub mod config;
pub mod error;
pub mod fuel;
pub mod init;
pub mod model;
pub mod ordering;
pub mod reminders;
pub mod store;
pub mod wheels;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
