//! Unified error codes
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Catalog errors
//! - 8xxx: User errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// Serialized as its `u16` value so the frontend can switch on numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 7,

    // ==================== 1xxx: Auth ====================
    /// Caller did not present a credential
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Specific role required
    RoleRequired = 2002,
    /// Admin role required
    AdminRequired = 2003,
    /// Resource belongs to another librarian
    NotOwner = 2006,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order has already been paid
    OrderAlreadyPaid = 4002,
    /// Order is empty
    OrderEmpty = 4007,
    /// Tracking id could not be allocated
    TrackingIdExhausted = 4008,

    // ==================== 5xxx: Payment ====================
    /// Payment processing failed
    PaymentFailed = 5001,
    /// Checkout session unknown to the gateway
    SessionNotFound = 5006,
    /// Checkout session carries no usable order reference
    SessionMetadataInvalid = 5007,
    /// Webhook signature rejected
    WebhookSignatureInvalid = 5008,

    // ==================== 6xxx: Catalog ====================
    /// Book not found
    BookNotFound = 6001,
    /// Book has invalid price
    BookInvalidPrice = 6002,

    // ==================== 8xxx: User ====================
    /// User not found
    UserNotFound = 8001,
    /// Role name is not recognised
    RoleInvalid = 8101,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Payment gateway unreachable or failing; retryable
    GatewayUnavailable = 9010,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether a client may retry the same request unchanged
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::GatewayUnavailable)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::NotAuthenticated => "Unauthorized access",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",

            // Permission
            ErrorCode::PermissionDenied => "Forbidden access",
            ErrorCode::RoleRequired => "Specific role is required",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::NotOwner => "Resource belongs to another librarian",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderAlreadyPaid => "Order has already been paid",
            ErrorCode::OrderEmpty => "Order has no items",
            ErrorCode::TrackingIdExhausted => "Could not allocate a unique tracking id",

            // Payment
            ErrorCode::PaymentFailed => "Payment processing failed",
            ErrorCode::SessionNotFound => "Checkout session not found",
            ErrorCode::SessionMetadataInvalid => "Checkout session has no valid order reference",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature verification failed",

            // Catalog
            ErrorCode::BookNotFound => "Book not found",
            ErrorCode::BookInvalidPrice => "Book price is invalid",

            // User
            ErrorCode::UserNotFound => "User not found",
            ErrorCode::RoleInvalid => "Role is not recognised",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::GatewayUnavailable => "Payment gateway unavailable, please retry",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when a numeric value does not map to a known [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ErrorCode::Success),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            7 => Ok(ErrorCode::RequiredField),

            1001 => Ok(ErrorCode::NotAuthenticated),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),

            2001 => Ok(ErrorCode::PermissionDenied),
            2002 => Ok(ErrorCode::RoleRequired),
            2003 => Ok(ErrorCode::AdminRequired),
            2006 => Ok(ErrorCode::NotOwner),

            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderAlreadyPaid),
            4007 => Ok(ErrorCode::OrderEmpty),
            4008 => Ok(ErrorCode::TrackingIdExhausted),

            5001 => Ok(ErrorCode::PaymentFailed),
            5006 => Ok(ErrorCode::SessionNotFound),
            5007 => Ok(ErrorCode::SessionMetadataInvalid),
            5008 => Ok(ErrorCode::WebhookSignatureInvalid),

            6001 => Ok(ErrorCode::BookNotFound),
            6002 => Ok(ErrorCode::BookInvalidPrice),

            8001 => Ok(ErrorCode::UserNotFound),
            8101 => Ok(ErrorCode::RoleInvalid),

            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9010 => Ok(ErrorCode::GatewayUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::PermissionDenied.code(), 2001);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::SessionNotFound.code(), 5006);
        assert_eq!(ErrorCode::BookNotFound.code(), 6001);
        assert_eq!(ErrorCode::UserNotFound.code(), 8001);
        assert_eq!(ErrorCode::GatewayUnavailable.code(), 9010);
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(4002), Ok(ErrorCode::OrderAlreadyPaid));
        assert_eq!(ErrorCode::try_from(2006), Ok(ErrorCode::NotOwner));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(4242), Err(InvalidErrorCode(4242)));
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::TokenExpired).unwrap();
        assert_eq!(json, "1003");
        let code: ErrorCode = serde_json::from_str("9010").unwrap();
        assert_eq!(code, ErrorCode::GatewayUnavailable);
        assert!(serde_json::from_str::<ErrorCode>("12345").is_err());
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::GatewayUnavailable.is_retryable());
        assert!(!ErrorCode::PermissionDenied.is_retryable());
        assert!(!ErrorCode::DatabaseError.is_retryable());
    }

    #[test]
    fn test_display() {
        assert_eq!(ErrorCode::BookNotFound.to_string(), "6001");
    }
}
