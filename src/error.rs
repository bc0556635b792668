use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::config::Config;

#[derive(Debug, Display)]
pub enum ReportError {
    #[display(fmt = "startDate and endDate are required")]
    MissingRange,

    #[display(fmt = "Invalid date range: {}", _0)]
    InvalidRange(String),

    #[display(fmt = "Invalid format. Use csv | excel | pdf")]
    ExportFormat(String),

    #[display(fmt = "Invalid status. Use present | absent | late")]
    InvalidStatus(String),

    #[display(fmt = "Server error")]
    Store(sqlx::Error),

    #[display(fmt = "Export failed")]
    Render(String),
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for ReportError {
    fn from(e: sqlx::Error) -> Self {
        ReportError::Store(e)
    }
}

impl From<csv::Error> for ReportError {
    fn from(e: csv::Error) -> Self {
        ReportError::Render(format!("csv: {e}"))
    }
}

impl From<rust_xlsxwriter::XlsxError> for ReportError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        ReportError::Render(format!("xlsx: {e}"))
    }
}

impl From<printpdf::Error> for ReportError {
    fn from(e: printpdf::Error) -> Self {
        ReportError::Render(format!("pdf: {e}"))
    }
}

impl ReportError {
    pub fn status(&self) -> StatusCode {
        match self {
            ReportError::MissingRange
            | ReportError::InvalidRange(_)
            | ReportError::ExportFormat(_)
            | ReportError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
            ReportError::Store(_) | ReportError::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> Option<String> {
        match self {
            ReportError::Store(e) => Some(e.to_string()),
            ReportError::Render(cause) => Some(cause.clone()),
            ReportError::ExportFormat(requested) => Some(format!("unsupported format: {requested}")),
            ReportError::InvalidStatus(requested) => Some(format!("unsupported status: {requested}")),
            ReportError::MissingRange | ReportError::InvalidRange(_) => None,
        }
    }

    /// Binds the error to the environment that decides how much of it the
    /// client gets to see.
    pub fn in_env(self, config: &Config) -> ApiError {
        ApiError {
            error: self,
            expose_details: config.expose_error_details(),
        }
    }
}

/// Request-boundary form of [`ReportError`].
#[derive(Debug, Display)]
#[display(fmt = "{}", error)]
pub struct ApiError {
    pub error: ReportError,
    pub expose_details: bool,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.error.status()
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "success": false,
            "message": self.error.to_string(),
        });

        // Client-side mistakes are always safe to echo back.
        let show = self.expose_details || self.error.status().is_client_error();
        if let (true, Some(detail)) = (show, self.error.detail()) {
            body["error"] = json!(detail);
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}
