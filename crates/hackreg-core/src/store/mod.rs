// # Record Store Implementations
//
// The production store lives in its own crate (`hackreg-store-notion`).
// This module holds the in-process store used by tests and local runs.

pub mod memory;

pub use memory::MemoryRecordStore;
