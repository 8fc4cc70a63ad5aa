use serde::{Deserialize, Serialize};
use serde_json::json;

/// A recipe as synthesized by the language model.
///
/// Every field is required and non-empty. Instances only come out of
/// [`Recipe::from_json`], or are built by hand in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum SchemaMismatch {
    #[error("Recipe does not match the expected shape: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Recipe field `{field}` is empty")]
    EmptyField { field: &'static str },
}

impl Recipe {
    /// The skeleton the model is asked to fill in.
    pub fn schema_hint() -> serde_json::Value {
        json!({
            "name": "Recipe name",
            "description": "Brief description",
            "ingredients": ["ingredient 1", "ingredient 2"],
            "instructions": ["step 1", "step 2"],
        })
    }

    /// Decode a model reply, refusing anything partial.
    ///
    /// Missing keys or wrong types fail in serde. Text is trimmed and blank
    /// list entries dropped; anything left empty afterwards is rejected too.
    /// Extra keys are ignored.
    pub fn from_json(value: serde_json::Value) -> Result<Self, SchemaMismatch> {
        let raw: Recipe = serde_json::from_value(value)?;
        let recipe = Recipe {
            name: raw.name.trim().to_string(),
            description: raw.description.trim().to_string(),
            ingredients: clean_list(raw.ingredients),
            instructions: clean_list(raw.instructions),
        };
        recipe.validate()?;
        Ok(recipe)
    }

    fn validate(&self) -> Result<(), SchemaMismatch> {
        for (field, empty) in [
            ("name", self.name.is_empty()),
            ("description", self.description.is_empty()),
            ("ingredients", self.ingredients.is_empty()),
            ("instructions", self.instructions.is_empty()),
        ] {
            if empty {
                return Err(SchemaMismatch::EmptyField { field });
            }
        }
        Ok(())
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}
