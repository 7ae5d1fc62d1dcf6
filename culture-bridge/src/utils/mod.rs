pub mod error;
pub mod i18n;

pub use error::{ApiError, ApiResult};
pub use i18n::{CultureTag, SupportedCultures, current_culture, current_locale, with_culture};
