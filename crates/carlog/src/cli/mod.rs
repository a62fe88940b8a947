//! # CLI Behavior
//!
//! The CLI is one client of the ledger. It is the only place that knows about
//! terminal I/O, exit codes and output formatting.
//!
//! ## Naked Execution
//!
//! Running `carlog` with no arguments shows the maintenance status of every
//! vehicle, the thing you most often want to know.
//!
//! ## Selectors
//!
//! Vehicles, wheel sets and intervals are named on the command line either by
//! id or by a case-insensitive name. A name must match exactly one row.
//!
//! ## Reminders
//!
//! Every command that changes what is due (a fill, a service, an import)
//! re-syncs reminders for the touched vehicle. Reminders land in the
//! `notifications.json` outbox in the data directory; alerts that are due right
//! away are printed after the command's own output.
//!
//! ## Time
//!
//! The hidden `--now` option pins the clock, so scripted runs and tests see a
//! fixed "today".

mod commands;
mod outbox;
mod render;
pub mod setup;

pub use commands::run;
