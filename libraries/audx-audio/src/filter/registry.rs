//! Filter Registry - Factory Pattern for Graph Nodes
//!
//! Maps filter names used in chain text to constructors. The graph looks up
//! every parsed filter here, so adding a node type never touches the graph.

use super::nodes::{
    BiquadKind, BiquadNode, Endpoint, FilterNode, NodeContext, NullNode, ResampleNode, TempoNode,
    VolumeNode,
};
use super::parser::FilterArgs;
use audx_core::Result;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Constructor for one node type
pub type CreateFn =
    Arc<dyn Fn(&FilterArgs, &NodeContext) -> Result<Box<dyn FilterNode>> + Send + Sync>;

/// Factory for a specific node type
#[derive(Clone)]
pub struct FilterFactory {
    /// Name used in chain text
    pub name: &'static str,
    /// One-line description
    pub description: &'static str,
    /// Build a node from parsed arguments
    pub create: CreateFn,
}

impl FilterFactory {
    /// Wrap a constructor closure
    pub fn new<F>(name: &'static str, description: &'static str, create: F) -> Self
    where
        F: Fn(&FilterArgs, &NodeContext) -> Result<Box<dyn FilterNode>> + Send + Sync + 'static,
    {
        Self {
            name,
            description,
            create: Arc::new(create),
        }
    }
}

impl Debug for FilterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterFactory")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

/// Registry of available node types
///
/// # Example
///
/// ```
/// use audx_audio::filter::FilterRegistry;
///
/// let registry = FilterRegistry::with_builtin_filters();
/// assert!(registry.contains("atempo"));
/// assert!(!registry.contains("areverse"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct FilterRegistry {
    factories: HashMap<&'static str, FilterFactory>,
}

impl FilterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Create a registry with every built-in node registered
    pub fn with_builtin_filters() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_filters();
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub fn register(&mut self, factory: FilterFactory) {
        self.factories.insert(factory.name, factory);
    }

    /// Remove a factory
    pub fn unregister(&mut self, name: &str) -> Option<FilterFactory> {
        self.factories.remove(name)
    }

    /// Look up a factory by name
    pub fn get(&self, name: &str) -> Option<&FilterFactory> {
        self.factories.get(name)
    }

    /// Check whether a name is registered
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of registered node types
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    fn register_builtin_filters(&mut self) {
        self.register(FilterFactory::new(Endpoint::SOURCE, "Graph input", |_, _| {
            Ok(Box::new(Endpoint::source()))
        }));

        self.register(FilterFactory::new(Endpoint::SINK, "Graph output", |_, _| {
            Ok(Box::new(Endpoint::sink()))
        }));

        self.register(FilterFactory::new(
            "anull",
            "Pass audio through unchanged",
            |args, _| {
                args.ensure_known(&[], 0)?;
                Ok(Box::new(NullNode))
            },
        ));

        self.register(FilterFactory::new(
            "volume",
            "Change volume by a linear factor or dB",
            |args, _| Ok(Box::new(VolumeNode::from_args(args)?)),
        ));

        self.register(FilterFactory::new(
            "atempo",
            "Change tempo without changing pitch",
            |args, ctx| Ok(Box::new(TempoNode::from_args(args, ctx)?)),
        ));

        self.register(FilterFactory::new(
            "aresample",
            "Change sample rate",
            |args, ctx| Ok(Box::new(ResampleNode::from_args(args, ctx)?)),
        ));

        self.register(FilterFactory::new(
            "lowpass",
            "Second-order low-pass filter",
            |args, ctx| Ok(Box::new(BiquadNode::from_args(BiquadKind::Lowpass, args, ctx)?)),
        ));

        self.register(FilterFactory::new(
            "highpass",
            "Second-order high-pass filter",
            |args, ctx| Ok(Box::new(BiquadNode::from_args(BiquadKind::Highpass, args, ctx)?)),
        ));
    }
}
