//! Conversions from third-party errors into [`nishiki_domain::NishikiError`]

mod conversions;

pub use conversions::InfraError;
