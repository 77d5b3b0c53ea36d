//! Route pipeline tables: the per-node, per-method, per-category handler
//! sequences held at each position in the trie.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hyper::Method;

use crate::error::SetupError;
use crate::handler::RouteHandler;

pub mod spec;

/// The six pipeline categories, in the order the executor runs them.
///
/// Hook, filter, handler and fallback run before a response exists; after
/// runs once one does; catcher interposes whenever a handler of any other
/// category fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Pre-processing observers. Responses returned from hooks are ignored.
    Hook,
    /// Gatekeepers that may short-circuit with a response (auth, CORS,
    /// rate limiting live here).
    Filter,
    /// The primary responders.
    Handler,
    /// Runs only when no handler produced a response.
    Fallback,
    /// Error converters, run when a handler in any category fails.
    Catcher,
    /// Post-processing observers of the finalized response.
    After,
}

impl Category {
    pub(crate) const COUNT: usize = 6;

    /// The categories executed before a response exists, in order.
    pub(crate) const PRE_RESPONSE: [Category; 4] = [
        Category::Hook,
        Category::Filter,
        Category::Handler,
        Category::Fallback,
    ];

    pub(crate) const ALL: [Category; 6] = [
        Category::Hook,
        Category::Filter,
        Category::Handler,
        Category::Fallback,
        Category::Catcher,
        Category::After,
    ];

    pub(crate) fn index(self) -> usize {
        match self {
            Category::Hook => 0,
            Category::Filter => 1,
            Category::Handler => 2,
            Category::Fallback => 3,
            Category::Catcher => 4,
            Category::After => 5,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Hook => "hook",
            Category::Filter => "filter",
            Category::Handler => "handler",
            Category::Fallback => "fallback",
            Category::Catcher => "catcher",
            Category::After => "after",
        };
        f.write_str(name)
    }
}

/// An ordered sequence of handlers occupying one `(method, category)` cell.
pub(crate) type HandlerSeq = Vec<Arc<dyn RouteHandler>>;

#[derive(Default)]
struct MethodPipelines {
    cells: [HandlerSeq; Category::COUNT],
}

/// The pipelines registered at a single trie position: method → category →
/// ordered handlers.
#[derive(Default)]
pub(crate) struct PipelineTable {
    methods: HashMap<Method, MethodPipelines>,
}

impl PipelineTable {
    /// Places `handlers` into the `(method, category)` cell. A populated
    /// cell is only replaced when `overwrite` is set.
    pub(crate) fn insert(
        &mut self,
        method: Method,
        category: Category,
        handlers: HandlerSeq,
        overwrite: bool,
        path: &str,
    ) -> Result<(), SetupError> {
        let cell = &mut self
            .methods
            .entry(method.clone())
            .or_default()
            .cells[category.index()];

        if !cell.is_empty() && !overwrite {
            return Err(SetupError::DuplicateRoute {
                method,
                path: path.to_string(),
                category,
            });
        }

        *cell = handlers;
        Ok(())
    }

    pub(crate) fn get(&self, method: &Method, category: Category) -> &[Arc<dyn RouteHandler>] {
        self.methods
            .get(method)
            .map(|pipelines| pipelines.cells[category.index()].as_slice())
            .unwrap_or(&[])
    }

    /// True when any category holds handlers for the method.
    pub(crate) fn has_method(&self, method: &Method) -> bool {
        self.methods
            .get(method)
            .map(|pipelines| pipelines.cells.iter().any(|cell| !cell.is_empty()))
            .unwrap_or(false)
    }

    /// The methods with at least one populated cell.
    pub(crate) fn methods(&self) -> impl Iterator<Item = &Method> {
        self.methods
            .iter()
            .filter(|(_, pipelines)| pipelines.cells.iter().any(|cell| !cell.is_empty()))
            .map(|(method, _)| method)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.methods
            .values()
            .all(|pipelines| pipelines.cells.iter().all(Vec::is_empty))
    }

    /// Invokes `f` for every populated cell.
    pub(crate) fn visit<F>(&self, f: &mut F)
    where
        F: FnMut(&Method, Category, &HandlerSeq),
    {
        for (method, pipelines) in &self.methods {
            for category in Category::ALL.iter() {
                let cell = &pipelines.cells[category.index()];
                if !cell.is_empty() {
                    f(method, *category, cell);
                }
            }
        }
    }
}
