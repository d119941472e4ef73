use nishiki_domain::NishikiError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub NishikiError);

impl From<InfraError> for NishikiError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<NishikiError> for InfraError {
    fn from(value: NishikiError) -> Self {
        InfraError(value)
    }
}

trait IntoNishikiError {
    fn into_nishiki(self) -> NishikiError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → NishikiError */
/* -------------------------------------------------------------------------- */

impl IntoNishikiError for HttpError {
    fn into_nishiki(self) -> NishikiError {
        if self.is_timeout() {
            return NishikiError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return NishikiError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => NishikiError::Auth(message),
                404 => NishikiError::NotFound(message),
                429 => NishikiError::Network(message),
                400..=499 => NishikiError::InvalidInput(message),
                _ => NishikiError::Network(message),
            };
        }

        NishikiError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_nishiki())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
