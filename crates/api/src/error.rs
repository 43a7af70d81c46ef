//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, StorefrontError};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// No caller identity on the request.
    Unauthorized(String),
    /// Caller lacks the required role.
    Forbidden(String),
    /// Checkout or order status error.
    Checkout(CheckoutError),
    /// Cart or catalog error.
    Storefront(StorefrontError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "InvalidRequest", msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "Unauthorized", msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", msg),
            ApiError::Checkout(err) => (checkout_status(&err), err.kind(), err.to_string()),
            ApiError::Storefront(err) => (storefront_status(&err), err.kind(), err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(kind, error = %message, "internal server error");
        }

        let body = serde_json::json!({ "error": message, "kind": kind });
        (status, axum::Json(body)).into_response()
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::InvalidRequest(_)
        | CheckoutError::ItemNotInCart { .. }
        | CheckoutError::InsufficientStock { .. }
        | CheckoutError::InvalidTransition { .. }
        | CheckoutError::NotCancelable(_)
        | CheckoutError::Domain(_) => StatusCode::BAD_REQUEST,
        CheckoutError::ProductNotFound(_) | CheckoutError::OrderNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        CheckoutError::StockUpdateFailed { .. }
        | CheckoutError::OrderCreationFailed(_)
        | CheckoutError::PartialFailure { .. }
        | CheckoutError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn storefront_status(err: &StorefrontError) -> StatusCode {
    match err {
        StorefrontError::ProductNotFound(_) | StorefrontError::NotInCart(_) => StatusCode::NOT_FOUND,
        StorefrontError::QuantityExceedsStock { .. } | StorefrontError::Invalid(_) => {
            StatusCode::BAD_REQUEST
        }
        StorefrontError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Malformed or mistyped request bodies are plain bad requests.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<StorefrontError> for ApiError {
    fn from(err: StorefrontError) -> Self {
        ApiError::Storefront(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{OrderId, ProductId};
    use domain::OrderStatus;
    use store::StoreError;

    #[test]
    fn test_checkout_status_mapping() {
        let cases = [
            (
                CheckoutError::ItemNotInCart {
                    requested: 2,
                    found: 1,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                CheckoutError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Pending,
                },
                StatusCode::BAD_REQUEST,
            ),
            (
                CheckoutError::OrderNotFound(OrderId::new()),
                StatusCode::NOT_FOUND,
            ),
            (
                CheckoutError::StockUpdateFailed {
                    product_id: ProductId::new(),
                    reason: "lost race".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                CheckoutError::Store(StoreError::Unavailable("down".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(checkout_status(&err), expected, "{err}");
        }
    }

    #[test]
    fn test_storefront_status_mapping() {
        assert_eq!(
            storefront_status(&StorefrontError::NotInCart(ProductId::new())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            storefront_status(&StorefrontError::QuantityExceedsStock {
                requested: 3,
                available: 1
            }),
            StatusCode::BAD_REQUEST
        );
    }
}
