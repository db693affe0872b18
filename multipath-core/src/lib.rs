//! Composite data interface over multiple independently backed tabular paths
//!
//! This crate provides the dimension model, the backend capability trait and
//! registry, and [`MultiDataset`], which presents an ordered list of tabular
//! paths as one dataset. Concrete storage lives in backend crates that
//! implement [`Interface`].

#![warn(missing_docs)]

pub mod config;
pub mod dataset;
pub mod element;
pub mod error;
pub mod interface;
pub mod multi;
pub mod registry;
pub mod schema;
pub mod selection;
pub mod table;
pub mod value;

// Re-export key types for convenience
pub use config::MultiConfig;
pub use dataset::Dataset;
pub use element::Element;
pub use error::{Error, Result};
pub use interface::{bind, DimRequest, Extras, Interface, Resolution, Resolve, TableView};
pub use multi::{init, Init, MultiDataset, MultiDatasetBuilder, SplitPart};
pub use registry::{Registry, RegistryBuilder};
pub use schema::{DataType, DimMapping, DimRef, Dimension, Dimensions};
pub use selection::{Constraint, Selection};
pub use table::{Datatype, RawData, Table, TableData};
pub use value::{max_range, Entry, Range, Value, Values};
