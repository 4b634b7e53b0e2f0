//! Recipe composition used when fusing a dependency into its consumer.
//!
//! A fused node keeps only keyword dependencies, each keyed by the name of
//! the node providing it. The composed recipe rebuilds the original call of
//! the outer recipe from those keywords: every argument slot either passes a
//! keyword through unchanged or runs an inlined recipe on keywords first.

use indexmap::IndexMap;

use super::{Arguments, Recipe, RecipeError, Value};

/// Where one argument of the outer call comes from.
#[derive(Debug, Clone)]
pub(crate) enum Slot {
    /// The keyword value named after this dependency node.
    Identity(String),
    /// The result of an inlined recipe applied to keyword values.
    Inline {
        recipe: Recipe,
        args: Vec<String>,
        kwargs: IndexMap<String, String>,
    },
}

impl Slot {
    fn resolve(&self, call: &Arguments) -> Result<Value, RecipeError> {
        match self {
            Slot::Identity(node) => call.kwarg(node).cloned(),
            Slot::Inline {
                recipe,
                args,
                kwargs,
            } => {
                let positional = args
                    .iter()
                    .map(|node| call.kwarg(node).cloned())
                    .collect::<Result<Vec<_>, _>>()?;
                let keyword = kwargs
                    .iter()
                    .map(|(param, node)| Ok((param.clone(), call.kwarg(node)?.clone())))
                    .collect::<Result<IndexMap<_, _>, RecipeError>>()?;
                recipe.call(&Arguments::new(positional, keyword))
            }
        }
    }
}

/// An outer recipe whose arguments are produced by [`Slot`]s.
#[derive(Debug, Clone)]
pub(crate) struct Composition {
    pub outer: Recipe,
    pub args: Vec<Slot>,
    pub kwargs: IndexMap<String, Slot>,
}

impl Composition {
    /// Build the composed callable. It keeps the outer recipe's name.
    pub fn into_recipe(self) -> Recipe {
        let name = self.outer.shared_name();
        Recipe::new(move |call: &Arguments| {
            let positional = self
                .args
                .iter()
                .map(|slot| slot.resolve(call))
                .collect::<Result<Vec<_>, _>>()?;
            let keyword = self
                .kwargs
                .iter()
                .map(|(param, slot)| Ok((param.clone(), slot.resolve(call)?)))
                .collect::<Result<IndexMap<_, _>, RecipeError>>()?;
            self.outer.call(&Arguments::new(positional, keyword))
        })
        .renamed(name)
    }
}
