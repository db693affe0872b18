//! Tabular backends for multipath datasets
//!
//! This crate provides three storage backends implementing
//! [`multipath_core::Interface`]: row records, column arrays and lazily
//! evaluated partitioned frames, plus the default registry trying them in
//! that order.

#![warn(missing_docs)]

mod common;

pub mod columns;
pub mod lazy;
pub mod records;

use std::sync::{Arc, OnceLock};

use multipath_core::{Registry, Result};

pub use columns::{ColumnTable, ColumnarInterface, COLUMNS};
pub use lazy::{LazyFrame, LazyFrameInterface, LazyOp, LAZY};
pub use records::{RecordTable, RecordsInterface, RECORDS};

// Re-export core types
pub use multipath_core::{
    DataType, Dimension, Element, Error, MultiConfig, MultiDataset, RawData, Table,
};

static DEFAULT_REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

/// Build a registry holding records, columns and lazy frames, tried in that
/// order
pub fn registry() -> Result<Registry> {
    Registry::builder()
        .register(RecordsInterface)
        .register(ColumnarInterface)
        .register(LazyFrameInterface)
        .build()
}

/// Shared instance of [`registry`], built on first use
pub fn default_registry() -> Result<Arc<Registry>> {
    if let Some(registry) = DEFAULT_REGISTRY.get() {
        return Ok(Arc::clone(registry));
    }
    let registry = Arc::new(registry()?);
    Ok(Arc::clone(DEFAULT_REGISTRY.get_or_init(|| registry)))
}
