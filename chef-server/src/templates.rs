use chef::RecipeResult;
use chef_client::PipelineError;
use minijinja::context;

lazy_static::lazy_static! {
    static ref TEMPLATES: minijinja::Environment<'static> = {
        let mut env = minijinja::Environment::new();
        for (name, template) in &[
            ("base.html.jinja", include_str!("../templates/base.html.jinja")),
            ("index.html.jinja", include_str!("../templates/index.html.jinja")),
            ("recipe.html.jinja", include_str!("../templates/recipe.html.jinja")),
            ("recipe-card.html.jinja", include_str!("../templates/recipe-card.html.jinja")),
            ("error.html.jinja", include_str!("../templates/error.html.jinja")),
        ] {
            env.add_template(name, template)
                .expect("Failed to register template");
        }
        env
    };
}

/// The upload page
pub fn render_index() -> Result<String, minijinja::Error> {
    TEMPLATES.get_template("index.html.jinja")?.render(context! {})
}

/// A full page showing one finished recipe.
pub fn render_recipe_page(result: &RecipeResult) -> Result<String, minijinja::Error> {
    TEMPLATES
        .get_template("recipe.html.jinja")?
        .render(context! { result => result })
}

/// Only the recipe card, for swapping into the upload page.
pub fn render_recipe_card(result: &RecipeResult) -> Result<String, minijinja::Error> {
    TEMPLATES
        .get_template("recipe-card.html.jinja")?
        .render(context! { result => result })
}

pub fn render_error_page(err: &PipelineError) -> Result<String, minijinja::Error> {
    TEMPLATES.get_template("error.html.jinja")?.render(context! {
        message => err.user_message(),
        detail => err.to_string(),
        stage => err.stage(),
    })
}
