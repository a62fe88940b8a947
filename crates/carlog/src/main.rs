//! # Carlog CLI
//!
//! The binary is deliberately thin. Everything interesting lives in the
//! `carlogapp` library; this crate parses arguments, opens the ledger in the
//! data directory and prints what the library hands back.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (crates/carlog/src/cli/)                         │
//! │  - clap argument parsing (setup.rs)                         │
//! │  - Context wiring + dispatch (commands.rs)                   │
//! │  - Terminal rendering (render.rs)                           │
//! │  - Notification outbox (outbox.rs)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (crates/carlogapp/src/api.rs)                    │
//! │  - Returns structured `CmdResult` values                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (crates/carlogapp/src/commands/*)            │
//! │  - Ledger rules, fuel engine, scheduler, backup codec       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing below the CLI layer writes to stdout or decides exit codes.
//!
//! ## Testing Approach
//!
//! - **Command layer**: unit tests next to each module, plus integration tests
//!   in `crates/carlogapp/tests/` for the backup round trip and reminders.
//! - **CLI layer**: parsing and rendering unit tests in `src/cli/`, and
//!   end-to-end runs of the built binary in `tests/cli_e2e.rs` against a
//!   temporary data directory.

mod cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = cli::run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
