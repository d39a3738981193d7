//! Server-rendered HTML pages.
//!
//! Templates are compiled into the binary and loaded once into a shared
//! minijinja environment. `.html` templates are auto-escaped.

use std::sync::LazyLock;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::{context, Environment, Value};

use crate::error::AppResult;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("welcome.html", include_str!("../templates/welcome.html")),
    ("emails.html", include_str!("../templates/emails.html")),
    ("email_table.html", include_str!("../templates/email_table.html")),
    ("tasks.html", include_str!("../templates/tasks.html")),
    ("task_edit.html", include_str!("../templates/task_edit.html")),
    ("error.html", include_str!("../templates/error.html")),
];

static ENVIRONMENT: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            tracing::error!("Failed to load template {}: {}", name, e);
        }
    }
    env
});

/// Render a template into an HTML body.
pub fn render(name: &str, ctx: Value) -> AppResult<Html<String>> {
    let template = ENVIRONMENT.get_template(name)?;
    Ok(Html(template.render(ctx)?))
}

/// Render the error page, falling back to plain text if that fails too.
pub fn error_page(status: StatusCode, heading: &str, message: &str, retry: Option<&str>) -> Response {
    let ctx = context! {
        status => status.as_u16(),
        heading => heading,
        message => message,
        retry => retry,
    };

    match render("error.html", ctx) {
        Ok(page) => (status, page).into_response(),
        Err(e) => {
            tracing::error!("Failed to render error page: {:?}", e);
            (status, format!("{}: {}", heading, message)).into_response()
        }
    }
}
