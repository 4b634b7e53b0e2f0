//! Node Values
//!
//! Every node may cache a [`Value`]. Plain data is carried as a
//! `serde_json::Value` so that graphs can hold numbers, strings, lists and
//! maps without a type parameter; callables used as recipes are carried as
//! [`Recipe`].
//!
//! # Truthiness
//!
//! Conditional nodes pick a branch based on the first condition whose value
//! is "true". Data values follow the usual dynamic-language rules: `null`,
//! `false`, zero, the empty string, the empty list and the empty map are
//! false; everything else is true. Recipes are always true.

mod compose;
mod recipe;

pub(crate) use compose::{Composition, Slot};
pub use recipe::{Arguments, Recipe, RecipeError, RecipeFn};

use std::fmt;

use serde_json::Value as Json;

/// A value cached on a graph node.
#[derive(Clone)]
pub enum Value {
    /// Plain data.
    Data(Json),
    /// A callable used as the recipe of other nodes.
    Recipe(Recipe),
}

impl Value {
    /// The JSON `null` value.
    pub fn null() -> Self {
        Value::Data(Json::Null)
    }

    /// Whether this value counts as true when used as a condition.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Recipe(_) => true,
            Value::Data(json) => match json {
                Json::Null => false,
                Json::Bool(b) => *b,
                Json::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
                Json::String(s) => !s.is_empty(),
                Json::Array(items) => !items.is_empty(),
                Json::Object(map) => !map.is_empty(),
            },
        }
    }

    /// Returns the recipe if this value is callable.
    pub fn as_recipe(&self) -> Option<&Recipe> {
        match self {
            Value::Recipe(recipe) => Some(recipe),
            Value::Data(_) => None,
        }
    }

    /// Returns the data payload if this value is not a recipe.
    pub fn as_data(&self) -> Option<&Json> {
        match self {
            Value::Data(json) => Some(json),
            Value::Recipe(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_data().and_then(Json::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_data().and_then(Json::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_data().and_then(Json::as_bool)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_data().and_then(Json::as_str)
    }

    /// Integer payload, or a [`RecipeError`] suitable for returning from a recipe.
    pub fn try_i64(&self) -> Result<i64, RecipeError> {
        self.as_i64()
            .ok_or_else(|| RecipeError::new(format!("expected an integer, got {:?}", self)))
    }

    /// Float payload, or a [`RecipeError`] suitable for returning from a recipe.
    pub fn try_f64(&self) -> Result<f64, RecipeError> {
        self.as_f64()
            .ok_or_else(|| RecipeError::new(format!("expected a number, got {:?}", self)))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Recipe(a), Value::Recipe(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(json) => write!(f, "{}", json),
            Value::Recipe(recipe) => fmt::Debug::fmt(recipe, f),
        }
    }
}

impl From<Recipe> for Value {
    fn from(recipe: Recipe) -> Self {
        Value::Recipe(recipe)
    }
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::Data(json)
    }
}

macro_rules! impl_from_data {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::Data(Json::from(v))
                }
            }
        )*
    };
}

impl_from_data!(bool, i32, i64, u32, u64, usize, f64, String, &str);

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
