use chef::{FoodLabel, IllustrationStyle};

/// Instruction sent alongside each uploaded photo
pub fn identify_food() -> &'static str {
    include_str!("../prompts/identify-food.md").trim()
}

/// Ask for a recipe that uses both foods.
pub fn compose_recipe(food1: &FoodLabel, food2: &FoodLabel) -> String {
    include_str!("../prompts/compose-recipe.md")
        .trim()
        .replace("{food1}", food1.as_str())
        .replace("{food2}", food2.as_str())
}

/// Build the image prompt for one style.
///
/// Only the recipe's own name and description go in, never the labels of the
/// uploaded photos, so both pictures show the dish that was invented.
pub fn illustration(style: IllustrationStyle, name: &str, description: &str) -> String {
    let template = match style {
        IllustrationStyle::Photographic => include_str!("../prompts/photograph.md"),
        IllustrationStyle::Illustrated => include_str!("../prompts/storybook.md"),
    };
    template
        .trim()
        .replace("{name}", name.trim())
        .replace("{description}", &as_sentence(description))
}

/// Descriptions are spliced mid-paragraph, so make sure they end a sentence.
fn as_sentence(text: &str) -> String {
    let text = text.trim();
    if text.ends_with(['.', '!', '?']) {
        text.to_string()
    } else {
        format!("{}.", text)
    }
}
