//! Composite dataset over an ordered list of independently backed paths
//!
//! A [`MultiDataset`] holds one table per path. Every path may be owned by a
//! different backend; the composite binds each path to its backend in turn and
//! folds the per-path answers. Consecutive paths are conceptually separated by
//! one break row, so lengths and expanded value sequences count `n - 1`
//! separators for `n` paths.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::MultiConfig;
use crate::dataset::Dataset;
use crate::element::Element;
use crate::error::{Error, Result};
use crate::interface::{bind, Extras, TableView};
use crate::registry::Registry;
use crate::schema::{DataType, DimMapping, DimRef, Dimension, Dimensions};
use crate::selection::Selection;
use crate::table::{RawData, Table};
use crate::value::{max_range, Range, Value, Values};

/// Output of [`init`]
#[derive(Debug, Clone)]
pub struct Init {
    /// One resolved table per input, in input order
    pub paths: Vec<Table>,

    /// Dimensions reported by the last resolution
    pub dims: Dimensions,

    /// Extras reported by the last resolution
    pub extras: Extras,
}

/// Resolve every raw input against the registry.
///
/// Inputs are resolved independently, so paths may end up in different
/// backends. All paths are assumed to share one schema: only the last
/// resolution's dimensions and extras are kept. With no inputs, the declared
/// dimensions are returned.
pub fn init(
    registry: &Registry,
    element: &Element,
    data: &[RawData],
    kdims: Option<Vec<Dimension>>,
    vdims: Option<Vec<Dimension>>,
) -> Result<Init> {
    let request = element.request(kdims, vdims);
    let mut dims = request.declared();
    let mut extras = Extras::new();
    let mut paths = Vec::with_capacity(data.len());

    for (index, raw) in data.iter().enumerate() {
        let resolution = registry.resolve(index, raw, &request)?;
        paths.push(resolution.table);
        dims = resolution.dims;
        extras = resolution.extras;
    }

    debug!(element = %element.name, paths = paths.len(), %dims, "initialized multi-path data");
    Ok(Init { paths, dims, extras })
}

/// One piece of a split composite
#[derive(Debug, Clone)]
pub enum SplitPart {
    /// A single path as its own dataset
    Path(Dataset),

    /// The whole composite, for closed shapes that cannot be split
    Whole(MultiDataset),
}

impl SplitPart {
    /// Values of a dimension as one expanded sequence
    pub fn values(&self, dim: impl Into<DimRef>, flat: bool) -> Result<Values> {
        match self {
            SplitPart::Path(dataset) => Ok(Values::join([dataset.values(dim, true, flat)?])),
            SplitPart::Whole(multi) => multi.values(dim, true, flat),
        }
    }
}

/// A dataset made of an ordered list of paths sharing one set of dimensions
#[derive(Debug, Clone)]
pub struct MultiDataset {
    /// Paths in drawing order
    paths: Vec<Table>,

    /// Dimensions shared by all paths
    dims: Dimensions,

    /// Dimensions used when binding a path; value dimensions are dropped
    /// while a level override is active
    template_dims: Dimensions,

    /// Legacy override for the value of the first value dimension
    level: Option<Value>,

    /// Element descriptor the paths were resolved for
    element: Element,

    /// Extras reported during initialization
    extras: Extras,

    /// Backends the paths are bound to
    registry: Arc<Registry>,

    /// Behaviour switches
    config: MultiConfig,
}

impl MultiDataset {
    /// Resolve raw paths for an element using its declared dimensions
    pub fn new(element: Element, data: &[RawData], registry: Arc<Registry>) -> Result<Self> {
        Self::builder(element).registry(registry).build(data)
    }

    /// Start building a composite for an element
    pub fn builder(element: Element) -> MultiDatasetBuilder {
        MultiDatasetBuilder::new(element)
    }

    /// Get the paths
    pub fn paths(&self) -> &[Table] {
        &self.paths
    }

    /// Number of paths
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Check if there are no paths
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Get the dimensions
    pub fn dims(&self) -> &Dimensions {
        &self.dims
    }

    /// Key dimensions
    pub fn kdims(&self) -> &[Dimension] {
        &self.dims.kdims
    }

    /// Value dimensions
    pub fn vdims(&self) -> &[Dimension] {
        &self.dims.vdims
    }

    /// Level override, if any
    pub fn level(&self) -> Option<&Value> {
        self.level.as_ref()
    }

    /// Element descriptor
    pub fn element(&self) -> &Element {
        &self.element
    }

    /// Extras reported during initialization
    pub fn extras(&self) -> &Extras {
        &self.extras
    }

    /// Get the configuration
    pub fn config(&self) -> &MultiConfig {
        &self.config
    }

    /// Get the registry
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Same composite with a level override
    #[must_use]
    pub fn with_level(mut self, level: Option<Value>) -> Self {
        self.level = level;
        self.template_dims = template_dims(&self.dims, self.level.as_ref());
        self
    }

    /// Wrap a new path list with this composite's dimensions and settings.
    ///
    /// Used to re-wrap the lists returned by [`MultiDataset::select`] and
    /// [`MultiDataset::redim`].
    #[must_use]
    pub fn with_paths(&self, paths: Vec<Table>) -> Self {
        Self {
            paths,
            ..self.clone()
        }
    }

    /// Check cross-path consistency.
    ///
    /// A no-op unless [`MultiConfig::validate_schemas`] is set, in which case
    /// every path must expose every dimension.
    pub fn validate(&self) -> Result<()> {
        if !self.config.validate_schemas {
            return Ok(());
        }
        for (index, table) in self.paths.iter().enumerate() {
            let view = bind(&self.registry, &self.dims, table)?;
            for dim in self.dims.all() {
                view.dimension_type(dim).map_err(|err| match err {
                    Error::DimensionNotFound(name) => {
                        Error::SchemaMismatch(format!("path {index} has no dimension '{name}'"))
                    }
                    other => other,
                })?;
            }
        }
        debug!(paths = self.paths.len(), "validated path schemas");
        Ok(())
    }

    /// Bind the first path to the template dimensions.
    ///
    /// An empty composite has no table to bind and returns `None`; the
    /// queries that would use the template answer from the declared
    /// dimensions instead.
    pub fn template(&self) -> Result<Option<TableView<'_>>> {
        self.paths
            .first()
            .map(|table| bind(&self.registry, &self.template_dims, table))
            .transpose()
    }

    /// Run a query on every path, in path order
    fn map_paths<T, F>(&self, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(TableView<'_>) -> Result<T> + Send + Sync,
    {
        let per_path = |table: &Table| f(bind(&self.registry, &self.template_dims, table)?);

        #[cfg(feature = "parallel")]
        {
            let threshold = self.config.parallel_threshold;
            if threshold > 0 && self.paths.len() >= threshold {
                use rayon::prelude::*;
                trace!(paths = self.paths.len(), "dispatching paths on the rayon pool");
                return self.paths.par_iter().map(per_path).collect();
            }
        }

        self.paths.iter().map(per_path).collect()
    }

    /// Data type of a dimension; `Float64` for an empty composite
    pub fn dimension_type(&self, dim: impl Into<DimRef>) -> Result<DataType> {
        let Some(first) = self.paths.first() else {
            return Ok(DataType::Float64);
        };
        let dim = self.dims.get(&dim.into())?;
        bind(&self.registry, &self.template_dims, first)?.dimension_type(dim)
    }

    /// Range of a dimension across all paths
    pub fn range(&self, dim: impl Into<DimRef>) -> Result<Range> {
        if self.paths.is_empty() {
            return Ok(Range::empty());
        }
        let dim = self.dims.get(&dim.into())?;
        if let Some(level) = &self.level {
            if self.dims.is_first_vdim(dim) {
                return Ok(Range::point(level.clone()));
            }
        }
        let ranges = self.map_paths(|view| view.range(dim))?;
        max_range(ranges)
    }

    /// Total rows and column count; separators count as rows
    pub fn shape(&self) -> Result<(usize, usize)> {
        if self.paths.is_empty() {
            return Ok((0, self.dims.len()));
        }
        let shapes = self.map_paths(|view| view.shape())?;
        let rows: usize = shapes.iter().map(|(rows, _)| rows).sum();
        let cols = shapes.last().map_or(self.dims.len(), |(_, cols)| *cols);
        Ok((rows + separators(shapes.len()), cols))
    }

    /// Total rows; separators count as rows
    pub fn length(&self) -> Result<usize> {
        if self.paths.is_empty() {
            return Ok(0);
        }
        let lengths = self.map_paths(|view| view.length())?;
        Ok(lengths.iter().sum::<usize>() + separators(lengths.len()))
    }

    /// Check if the composite has at least one row
    pub fn nonzero(&self) -> Result<bool> {
        Ok(self.length()? > 0)
    }

    /// Filter every path; one filtered table per path, in path order
    pub fn select(&self, selection: &Selection) -> Result<Vec<Table>> {
        self.map_paths(|view| view.select(selection))
    }

    /// Filter every path and re-wrap the result
    pub fn select_into(&self, selection: &Selection) -> Result<Self> {
        Ok(self.with_paths(self.select(selection)?))
    }

    /// Values of a dimension.
    ///
    /// Expanded values form one sequence with a single [`crate::Entry::Break`]
    /// between consecutive paths. Otherwise each path contributes its own
    /// array of unique values.
    pub fn values(&self, dim: impl Into<DimRef>, expanded: bool, flat: bool) -> Result<Values> {
        if self.paths.is_empty() {
            return Ok(if expanded {
                Values::Expanded(Vec::new())
            } else {
                Values::PerPath(Vec::new())
            });
        }
        let dim = self.dims.get(&dim.into())?;
        let per_path = self.map_paths(|view| view.values(dim, expanded, flat))?;
        Ok(if expanded {
            Values::join(per_path)
        } else {
            Values::PerPath(per_path)
        })
    }

    /// Rename or retype dimensions in every path, in path order.
    ///
    /// Fails before touching any path when the mapping would leave two
    /// dimensions with the same name.
    pub fn redim(&self, mapping: &DimMapping) -> Result<Vec<Table>> {
        self.dims.redim(mapping)?;
        if self.paths.is_empty() {
            return Ok(self.paths.clone());
        }
        self.map_paths(|view| view.redim(mapping))
    }

    /// Rename or retype dimensions in every path and in the composite itself
    pub fn redim_into(&self, mapping: &DimMapping) -> Result<Self> {
        let dims = self.dims.redim(mapping)?;
        let paths = self.redim(mapping)?;
        Ok(Self {
            paths,
            template_dims: template_dims(&dims, self.level.as_ref()),
            dims,
            ..self.clone()
        })
    }

    /// Split paths `[start, end)` into single-table datasets.
    ///
    /// Each path is resolved afresh through the registry. Bounds are clamped
    /// to the path count. Closed shapes cannot be split and come back whole.
    pub fn split(&self, start: Option<usize>, end: Option<usize>) -> Result<Vec<SplitPart>> {
        if self.element.closed_shape {
            return Ok(vec![SplitPart::Whole(self.clone())]);
        }
        let end = end.unwrap_or(self.paths.len()).min(self.paths.len());
        let start = start.unwrap_or(0).min(end);
        trace!(start, end, "splitting paths");
        let request = self
            .element
            .request(Some(self.dims.kdims.clone()), Some(self.dims.vdims.clone()));

        self.paths[start..end]
            .iter()
            .enumerate()
            .map(|(offset, table)| {
                let raw = RawData::Table(table.clone());
                let resolution = self.registry.resolve(start + offset, &raw, &request)?;
                Ok(SplitPart::Path(Dataset::from_resolution(
                    resolution,
                    Arc::clone(&self.registry),
                )))
            })
            .collect()
    }

    /// Not supported: paths have no shared row-merging semantic
    pub fn aggregate<F>(&self, _dims: &[DimRef], _function: F) -> Result<Self>
    where
        F: Fn(&[Value]) -> Value,
    {
        Err(Error::unsupported("aggregate"))
    }

    /// Not supported: paths have no shared row-merging semantic
    pub fn groupby(&self, _dims: &[DimRef]) -> Result<Vec<(Vec<Value>, Self)>> {
        Err(Error::unsupported("groupby"))
    }

    /// Not supported: paths have no shared row-merging semantic
    pub fn sample(&self, _samples: &[Vec<Value>]) -> Result<Self> {
        Err(Error::unsupported("sample"))
    }
}

fn separators(path_count: usize) -> usize {
    path_count.saturating_sub(1)
}

fn template_dims(dims: &Dimensions, level: Option<&Value>) -> Dimensions {
    if level.is_some() {
        dims.without_vdims()
    } else {
        dims.clone()
    }
}

/// A builder for creating multi-path datasets
pub struct MultiDatasetBuilder {
    /// Element the paths belong to
    element: Element,

    /// Caller key dimensions
    kdims: Option<Vec<Dimension>>,

    /// Caller value dimensions
    vdims: Option<Vec<Dimension>>,

    /// Level override
    level: Option<Value>,

    /// Registry of backends
    registry: Option<Arc<Registry>>,

    /// Configuration
    config: MultiConfig,
}

impl MultiDatasetBuilder {
    /// Create a new builder for an element
    pub fn new(element: Element) -> Self {
        Self {
            element,
            kdims: None,
            vdims: None,
            level: None,
            registry: None,
            config: MultiConfig::default(),
        }
    }

    /// Set the key dimensions
    #[must_use]
    pub fn kdims(mut self, kdims: Vec<Dimension>) -> Self {
        self.kdims = Some(kdims);
        self
    }

    /// Set the value dimensions
    #[must_use]
    pub fn vdims(mut self, vdims: Vec<Dimension>) -> Self {
        self.vdims = Some(vdims);
        self
    }

    /// Set the level override
    #[must_use]
    pub fn level(mut self, level: impl Into<Value>) -> Self {
        self.level = Some(level.into());
        self
    }

    /// Set the backend registry
    #[must_use]
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the configuration
    #[must_use]
    pub fn config(mut self, config: MultiConfig) -> Self {
        self.config = config;
        self
    }

    /// Resolve the raw paths and build the dataset
    pub fn build(self, data: &[RawData]) -> Result<MultiDataset> {
        let registry = self.registry.ok_or_else(|| {
            Error::InvalidArgument("Registry is required to build a multi-path dataset".into())
        })?;

        let Init { paths, dims, extras } =
            init(&registry, &self.element, data, self.kdims, self.vdims)?;

        let dataset = MultiDataset {
            paths,
            template_dims: template_dims(&dims, self.level.as_ref()),
            dims,
            level: self.level,
            element: self.element,
            extras,
            registry,
            config: self.config,
        };
        dataset.validate()?;
        Ok(dataset)
    }
}
