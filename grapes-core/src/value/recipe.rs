//! Recipes
//!
//! A recipe is the callable bound to a standard node. It is invoked with the
//! values of the node's positional and keyword dependencies, packed into
//! [`Arguments`].

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use super::Value;

/// Signature shared by every recipe.
pub type RecipeFn = dyn Fn(&Arguments) -> Result<Value, RecipeError> + Send + Sync;

/// Error returned by a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RecipeError {
    message: String,
}

impl RecipeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Positional and keyword values passed to a recipe.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    positional: Vec<Value>,
    keyword: IndexMap<String, Value>,
}

impl Arguments {
    pub fn new(positional: Vec<Value>, keyword: IndexMap<String, Value>) -> Self {
        Self {
            positional,
            keyword,
        }
    }

    /// Positional values only.
    pub fn positional(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            positional: values.into_iter().collect(),
            keyword: IndexMap::new(),
        }
    }

    /// Get the positional value at `index`.
    pub fn arg(&self, index: usize) -> Result<&Value, RecipeError> {
        self.positional.get(index).ok_or_else(|| {
            RecipeError::new(format!(
                "missing positional argument {} (got {})",
                index,
                self.positional.len()
            ))
        })
    }

    /// Get the keyword value named `name`.
    pub fn kwarg(&self, name: &str) -> Result<&Value, RecipeError> {
        self.keyword
            .get(name)
            .ok_or_else(|| RecipeError::new(format!("missing keyword argument `{}`", name)))
    }

    /// Positional arguments, in call order.
    pub fn args(&self) -> &[Value] {
        &self.positional
    }

    /// Keyword arguments by parameter name.
    pub fn kwargs(&self) -> &IndexMap<String, Value> {
        &self.keyword
    }

    /// Total number of values, positional and keyword.
    pub fn len(&self) -> usize {
        self.positional.len() + self.keyword.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A shareable callable.
///
/// Cloning a recipe is cheap: clones share the same function. Two recipes
/// compare equal only when they share that function. [`Recipe::same_code`]
/// is the weaker test used when merging graphs: it holds when both recipes
/// were built from the same closure definition, whatever they captured.
#[derive(Clone)]
pub struct Recipe {
    name: Option<Arc<str>>,
    parameters: Option<Arc<[String]>>,
    code: TypeId,
    func: Arc<RecipeFn>,
}

impl Recipe {
    /// Create an anonymous recipe with no declared parameter list.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, RecipeError> + Send + Sync + 'static,
    {
        Self {
            name: None,
            parameters: None,
            code: TypeId::of::<F>(),
            func: Arc::new(func),
        }
    }

    /// Create a named recipe with no declared parameter list.
    pub fn named<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, RecipeError> + Send + Sync + 'static,
    {
        let mut recipe = Self::new(func);
        recipe.name = Some(Arc::from(name.into()));
        recipe
    }

    /// Create a recipe that declares the names of its keyword parameters.
    ///
    /// Used by [`Graph::add_step_quick`](crate::Graph::add_step_quick) to
    /// derive dependency nodes. An empty `name` makes the recipe anonymous.
    pub fn with_parameters<F, I, S>(name: impl Into<String>, parameters: I, func: F) -> Self
    where
        F: Fn(&Arguments) -> Result<Value, RecipeError> + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let mut recipe = Self::new(func);
        recipe.name = (!name.is_empty()).then(|| Arc::from(name));
        let parameters: Vec<String> = parameters.into_iter().map(Into::into).collect();
        recipe.parameters = Some(parameters.into());
        recipe
    }

    /// Returns its single argument, positional or keyword.
    pub fn identity() -> Self {
        Self::named("identity", |args: &Arguments| {
            if let Some(first) = args.args().first() {
                return Ok(first.clone());
            }
            match args.kwargs().values().next() {
                Some(value) if args.len() == 1 => Ok(value.clone()),
                _ => Err(RecipeError::new(format!(
                    "identity takes exactly one argument, got {}",
                    args.len()
                ))),
            }
        })
    }

    /// Invoke the recipe.
    pub fn call(&self, args: &Arguments) -> Result<Value, RecipeError> {
        (self.func)(args)
    }

    /// The recipe's name, `None` when anonymous.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared parameter names, if the recipe has a fixed parameter list.
    pub fn parameters(&self) -> Option<&[String]> {
        self.parameters.as_deref()
    }

    /// Whether both recipes were built from the same closure definition.
    pub fn same_code(&self, other: &Recipe) -> bool {
        self.code == other.code
    }

    pub(crate) fn renamed(mut self, name: Option<Arc<str>>) -> Self {
        self.name = name;
        self
    }

    pub(crate) fn shared_name(&self) -> Option<Arc<str>> {
        self.name.clone()
    }
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.func) as *const () == Arc::as_ptr(&other.func) as *const ()
    }
}

impl fmt::Debug for Recipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<recipe {}>", name),
            None => write!(f, "<recipe>"),
        }
    }
}
