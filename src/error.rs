use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

/// The service's single error taxonomy, threaded through the core, the worker pool and the
/// HTTP layer alike. Every handler eventually turns one of these into a JSON `{code,msg}` body.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("the service is stopped")]
    ServiceStopped,

    #[error("schema of index `{0}` not found, please create schema first")]
    SchemaNotFound(String),

    #[error("schema of index `{0}` exists already, please remove it first")]
    SchemaExists(String),

    #[error("field `{field}` could not be coerced to {expected}: {value}")]
    SchemaCoercion {
        field: String,
        expected: &'static str,
        value: String,
    },

    #[error("pk field must be specified")]
    MissingPK,

    #[error("document not found")]
    DocNotFound,

    #[error("failed to parse row: {0}")]
    GeneratorParse(String),

    #[error("backend failure: {0}")]
    BackendFailure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid request: {0}")]
    BadRequest(String),

    #[error("missing or invalid admin token")]
    Unauthorized,
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::ServiceStopped => StatusCode::SERVICE_UNAVAILABLE,
            Error::SchemaNotFound(_) => StatusCode::NOT_FOUND,
            Error::SchemaExists(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::SchemaCoercion { .. } => StatusCode::BAD_REQUEST,
            Error::MissingPK => StatusCode::BAD_REQUEST,
            Error::DocNotFound => StatusCode::NOT_FOUND,
            Error::GeneratorParse(_) => StatusCode::BAD_REQUEST,
            Error::BackendFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    msg: String,
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        Error::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let code = self.status_code();
        HttpResponse::build(code).json(ErrorBody {
            code: code.as_u16(),
            msg: self.to_string(),
        })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
