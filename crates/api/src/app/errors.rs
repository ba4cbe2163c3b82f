use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{json, Value};

use fairmart_auth::AuthzError;
use fairmart_infra::MarketError;

pub fn market_error_to_response(err: MarketError) -> axum::response::Response {
    let message = err.to_string();
    let code = err.code();
    match &err {
        MarketError::InvalidRequest(_) => json_error(StatusCode::BAD_REQUEST, code, message),
        MarketError::PriceOutOfRange(violation) => json_error_with(
            StatusCode::BAD_REQUEST,
            code,
            message,
            json!({
                "bound": violation.bound.as_str(),
                "limit": violation.limit.as_decimal(),
                "price": violation.price.as_decimal(),
            }),
        ),
        MarketError::InsufficientStock {
            available,
            requested,
        } => json_error_with(
            StatusCode::BAD_REQUEST,
            code,
            message,
            json!({ "available": available, "requested": requested }),
        ),
        MarketError::ProductUnavailable | MarketError::OrderNotFound => {
            json_error(StatusCode::NOT_FOUND, code, message)
        }
        MarketError::InvalidTransition(e) => json_error_with(
            StatusCode::BAD_REQUEST,
            code,
            message,
            json!({
                "allowed": e.allowed().iter().map(|s| s.as_str()).collect::<Vec<_>>(),
            }),
        ),
        MarketError::OrderNumberExhausted { .. } | MarketError::TransientFailure(_) => {
            json_error(StatusCode::SERVICE_UNAVAILABLE, code, message)
        }
        MarketError::Storage(_) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            code,
            "internal storage failure",
        ),
    }
}

pub fn forbidden(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
}

pub fn invalid_id(what: &str) -> axum::response::Response {
    json_error(
        StatusCode::BAD_REQUEST,
        "invalid_request",
        format!("invalid {what} id"),
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    json_error_with(status, code, message, Value::Null)
}

/// Error body with extra top-level detail fields merged in.
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: Value,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Value::Object(body), Value::Object(details)) = (&mut body, details) {
        body.extend(details);
    }
    (status, axum::Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairmart_catalog::{PriceBound, PriceViolation};
    use fairmart_core::Money;

    #[test]
    fn business_errors_map_to_client_statuses() {
        let cases = [
            (MarketError::invalid("quantity is required"), StatusCode::BAD_REQUEST),
            (
                MarketError::InsufficientStock {
                    available: 3,
                    requested: 5,
                },
                StatusCode::BAD_REQUEST,
            ),
            (MarketError::ProductUnavailable, StatusCode::NOT_FOUND),
            (MarketError::OrderNotFound, StatusCode::NOT_FOUND),
            (
                MarketError::PriceOutOfRange(PriceViolation {
                    price: Money::new(39),
                    bound: PriceBound::Min,
                    limit: Money::new(40),
                }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(market_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn storage_contention_is_service_unavailable() {
        let res = market_error_to_response(MarketError::TransientFailure("deadlock".into()));
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        let res = market_error_to_response(MarketError::Storage("disk".into()));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
