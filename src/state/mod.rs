//! Run-state persistence
//!
//! Loads and atomically commits the `RunState` between runs. Corruption is
//! recovered by backing up the unreadable file and starting fresh; it never
//! fails a run.

mod store;

pub use store::StateStore;
