//! Maps pipeline failures onto HTTP responses.
//!
//! Body shape: `{ "message": ..., "kind": ..., "errors": [...]? }`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::{EcommerceError, ErrorKind, FieldError};

#[derive(Debug)]
pub struct ApiError(pub EcommerceError);

impl From<EcommerceError> for ApiError {
    fn from(e: EcommerceError) -> Self { Self(e) }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        let mut fields = Vec::new();
        flatten("", &e, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        Self(EcommerceError::Validation(fields))
    }
}

fn rejected(field: &str, code: &str, message: String) -> ApiError {
    ApiError(EcommerceError::Validation(vec![FieldError::new(field, code, message)]))
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self { rejected("body", "invalid_json", r.body_text()) }
}

impl From<QueryRejection> for ApiError {
    fn from(r: QueryRejection) -> Self { rejected("query", "invalid_query", r.body_text()) }
}

impl From<PathRejection> for ApiError {
    fn from(r: PathRejection) -> Self { rejected("path", "invalid_path", r.body_text()) }
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() { field.to_string() } else { format!("{prefix}.{field}") };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| format!("{path} is invalid"));
                    out.push(FieldError::new(path.clone(), err.code.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

pub fn status_for(err: &EcommerceError) -> StatusCode {
    match (err.kind(), err) {
        (_, EcommerceError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        (_, EcommerceError::Forbidden) => StatusCode::FORBIDDEN,
        (ErrorKind::NotFound, _) => StatusCode::NOT_FOUND,
        (ErrorKind::InvalidInput, _) => StatusCode::BAD_REQUEST,
        (ErrorKind::Conflict, _) => StatusCode::CONFLICT,
        (ErrorKind::Unauthorized, _) => StatusCode::UNAUTHORIZED,
        (ErrorKind::ExternalServiceFailure, _) => StatusCode::BAD_GATEWAY,
        (ErrorKind::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = match self.0.kind() {
            ErrorKind::Internal => {
                error!(error = %self.0, "Internal error occurred");
                "Internal server error".to_string()
            }
            _ => self.0.to_string(),
        };
        let mut body = json!({ "message": message, "kind": self.0.kind() });
        if let Some(fields) = self.0.field_errors() {
            body["errors"] = json!(fields);
        }
        (status, Json(body)).into_response()
    }
}
