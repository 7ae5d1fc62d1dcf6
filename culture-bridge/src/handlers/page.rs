use axum::http::Uri;
use rust_i18n::t;

use crate::utils::{current_culture, current_locale};

/// Render any page in the ambient culture
pub async fn render(uri: Uri) -> String {
    let locale = current_locale();
    let culture = current_culture().map(|c| c.to_string()).unwrap_or_else(|| locale.clone());
    tracing::debug!("Rendering {} in {}", uri.path(), culture);

    t!("page.greeting", locale = &locale, culture = culture).to_string()
}
