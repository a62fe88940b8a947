use super::backend::StorageBackend;
use super::Tables;
use crate::error::{CarlogError, Result};
use std::cell::{Cell, RefCell};

/// In-memory storage backend for testing.
///
/// Uses `RefCell` for interior mutability since the store is single-threaded,
/// letting `StorageBackend` keep `&self` on every method.
#[derive(Default)]
pub struct MemBackend {
    tables: RefCell<Tables>,
    saves: Cell<usize>,
    simulate_write_error: Cell<bool>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing record set.
    pub fn with_tables(tables: Tables) -> Self {
        Self {
            tables: RefCell::new(tables),
            ..Self::default()
        }
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.set(simulate);
    }

    /// Number of successful saves, i.e. commits that reached the backend.
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }

    pub fn snapshot(&self) -> Tables {
        self.tables.borrow().clone()
    }
}

impl StorageBackend for MemBackend {
    fn load_tables(&self) -> Result<Tables> {
        Ok(self.tables.borrow().clone())
    }

    fn save_tables(&self, tables: &Tables) -> Result<()> {
        if self.simulate_write_error.get() {
            return Err(CarlogError::Store("Simulated write error".to_string()));
        }
        *self.tables.borrow_mut() = tables.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
