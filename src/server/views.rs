use crate::core::render::RenderContext;
use minijinja::{Environment, context};
use std::sync::LazyLock;

const TEMPLATES: [(&str, &str); 3] = [
    ("index.html", include_str!("../../templates/index.html")),
    ("result.html", include_str!("../../templates/result.html")),
    ("error.html", include_str!("../../templates/error.html")),
];

static VIEWS: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::error!(template = name, error = %e, "failed to compile template");
        }
    }
    env
});

pub fn render_index() -> Result<String, minijinja::Error> {
    VIEWS.get_template("index.html")?.render(context! {})
}

pub fn render_result(ctx: &RenderContext) -> Result<String, minijinja::Error> {
    VIEWS.get_template("result.html")?.render(context! {
        user => ctx.user.data_uri(),
        style => ctx.style.data_uri(),
        color => ctx.color.data_uri(),
        result => ctx.result.data_uri(),
    })
}

pub fn render_error(
    status: u16,
    message: &str,
    details: Option<&str>,
) -> Result<String, minijinja::Error> {
    VIEWS.get_template("error.html")?.render(context! {
        status => status,
        message => message,
        details => details,
    })
}
