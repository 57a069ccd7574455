use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use transit_core::BookingError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),
    #[error("authentication failed: {0}")]
    AuthenticationError(String),
    #[error("forbidden: {0}")]
    AuthorizationError(String),
    #[error("{}", .0.body_text())]
    InvalidBody(#[from] JsonRejection),
    #[error("{}", .0.body_text())]
    InvalidQuery(#[from] QueryRejection),
    #[error("{}", .0.body_text())]
    InvalidPath(#[from] PathRejection),
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, Value) {
        match self {
            AppError::Booking(err) => booking_parts(err),
            AppError::AuthenticationError(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", json!({})),
            AppError::AuthorizationError(_) => (StatusCode::FORBIDDEN, "FORBIDDEN", json!({})),
            AppError::InvalidBody(rejection) => validation_parts(rejection_field(&rejection.body_text(), "body")),
            AppError::InvalidQuery(rejection) => validation_parts(rejection_field(&rejection.body_text(), "query")),
            AppError::InvalidPath(rejection) => validation_parts(rejection_field(&rejection.body_text(), "path")),
        }
    }
}

fn validation_parts(field: String) -> (StatusCode, &'static str, Value) {
    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", json!({ "field": field }))
}

/// Recovers the offending field from an extractor rejection text such as
/// "Failed to deserialize the JSON body into the target type: passenger:
/// missing field `phone` at line 1 column 80". Nested paths are joined with
/// the missing field name (`passenger.phone`); anything unattributable falls
/// back to `fallback`.
fn rejection_field(text: &str, fallback: &str) -> String {
    let detail = text.split_once(": ").map_or(text, |(_, detail)| detail);

    let (path, message) = match detail.split_once(": ") {
        Some((path, message)) if !path.is_empty() && !path.contains(char::is_whitespace) => (Some(path), message),
        _ => (None, detail),
    };

    let missing = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split_once('`'))
        .map(|(name, _)| name);

    match (path, missing) {
        (Some(path), Some(name)) => format!("{}.{}", path, name),
        (Some(path), None) => path.to_string(),
        (None, Some(name)) => name.to_string(),
        (None, None) => fallback.to_string(),
    }
}

fn booking_parts(err: &BookingError) -> (StatusCode, &'static str, Value) {
    match err {
        BookingError::Validation { field, .. } => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", json!({ "field": field }))
        }
        BookingError::InvalidCapacity(capacity) => {
            (StatusCode::BAD_REQUEST, "INVALID_CAPACITY", json!({ "capacity": capacity }))
        }
        BookingError::NotFound { entity, id } => {
            (StatusCode::NOT_FOUND, "NOT_FOUND", json!({ "entity": entity, "id": id }))
        }
        BookingError::SeatConflict { seats } => {
            (StatusCode::CONFLICT, "SEAT_CONFLICT", json!({ "conflictingSeats": seats }))
        }
        BookingError::AssignmentOverlap { existing } => (
            StatusCode::CONFLICT,
            "ASSIGNMENT_OVERLAP",
            json!({ "existingAssignmentId": existing }),
        ),
        BookingError::BookingExpired { booking_id, seats } => (
            StatusCode::GONE,
            "BOOKING_EXPIRED",
            json!({ "bookingId": booking_id, "seats": seats }),
        ),
        BookingError::AmountMismatch { expected, received } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "AMOUNT_MISMATCH",
            json!({ "expected": expected, "received": received }),
        ),
        BookingError::SourceUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SOURCE_UNAVAILABLE", json!({})),
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, details) = self.parts();

        let message = if status.is_server_error() {
            tracing::error!("{} {}: {}", status.as_u16(), code, self);
            match status {
                StatusCode::SERVICE_UNAVAILABLE => "Booking store is unavailable, try again later".to_string(),
                _ => "Internal Server Error".to_string(),
            }
        } else {
            self.to_string()
        };

        let retryable = matches!(&self, AppError::Booking(err) if err.is_retryable());

        let mut body = json!({ "error": code, "message": message });
        if let (Some(map), Value::Object(details)) = (body.as_object_mut(), details) {
            map.extend(details);
            if retryable {
                map.insert("retryable".to_string(), Value::Bool(true));
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_of(err: AppError) -> (StatusCode, Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = vec![
            (BookingError::validation("seatNumbers", "empty"), StatusCode::BAD_REQUEST),
            (BookingError::InvalidCapacity(0), StatusCode::BAD_REQUEST),
            (BookingError::not_found("booking", "x"), StatusCode::NOT_FOUND),
            (BookingError::SeatConflict { seats: vec![12] }, StatusCode::CONFLICT),
            (BookingError::AssignmentOverlap { existing: Uuid::nil() }, StatusCode::CONFLICT),
            (BookingError::BookingExpired { booking_id: Uuid::nil(), seats: vec![1] }, StatusCode::GONE),
            (BookingError::AmountMismatch { expected: 2, received: 1 }, StatusCode::UNPROCESSABLE_ENTITY),
            (BookingError::SourceUnavailable("pool timed out".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];

        for (err, expected) in cases {
            let (status, _) = body_of(AppError::from(err)).await;
            assert_eq!(status, expected);
        }
    }

    #[tokio::test]
    async fn test_conflict_body_lists_seats() {
        let (_, body) = body_of(BookingError::SeatConflict { seats: vec![4, 5] }.into()).await;
        assert_eq!(body["error"], "SEAT_CONFLICT");
        assert_eq!(body["conflictingSeats"], json!([4, 5]));
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn test_only_transient_failures_are_retryable() {
        let (_, body) = body_of(BookingError::SourceUnavailable("pool timed out".into()).into()).await;
        assert_eq!(body["retryable"], true);

        let (_, body) = body_of(BookingError::AmountMismatch { expected: 2, received: 1 }.into()).await;
        assert!(body.get("retryable").is_none());

        let (_, body) = body_of(BookingError::BookingExpired { booking_id: Uuid::nil(), seats: vec![1] }.into()).await;
        assert!(body.get("retryable").is_none());
    }

    #[test]
    fn test_rejection_field_paths() {
        let cases = [
            (
                "Failed to deserialize the JSON body into the target type: passenger: missing field `phone` at line 1 column 80",
                "passenger.phone",
            ),
            (
                "Failed to deserialize the JSON body into the target type: missing field `seatNumbers` at line 1 column 2",
                "seatNumbers",
            ),
            (
                "Failed to deserialize the JSON body into the target type: seatNumbers[0]: invalid type: string \"a\", expected u32 at line 1 column 20",
                "seatNumbers[0]",
            ),
            (
                "Failed to deserialize the JSON body into the target type: invalid type: integer `3`, expected a map at line 1 column 1",
                "body",
            ),
            ("Failed to parse the request body as JSON: EOF while parsing an object at line 1 column 1", "body"),
        ];

        for (text, expected) in cases {
            assert_eq!(rejection_field(text, "body"), expected, "{}", text);
        }
        assert_eq!(rejection_field("Failed to deserialize query string: missing field `email`", "query"), "email");
    }

    #[tokio::test]
    async fn test_unavailable_hides_details() {
        let (_, body) = body_of(BookingError::SourceUnavailable("password auth failed for user".into()).into()).await;
        assert_eq!(body["error"], "SOURCE_UNAVAILABLE");
        assert!(!body["message"].as_str().unwrap().contains("password"));
    }
}
