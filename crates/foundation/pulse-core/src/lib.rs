//! # Pulse Core
//!
//! Domain model for the PropertyPulse rental listing service.
//!
//! ```text
//!   Property ◄──── Review (user, property) unique
//!      ▲  ▲
//!      │  └─────── Message (sender → recipient, replyTo → Message)
//!      │
//!   User.bookmarks
//! ```
//!
//! Nothing in this crate talks to a database, the media host or the
//! session provider. It holds entities, typed identifiers, request types
//! with field validation, and the error taxonomy every other crate speaks.

pub mod ids;
pub mod identity;
pub mod listing;
pub mod message;
pub mod property;
pub mod review;
pub mod user;

pub use identity::{require, Identity};
pub use ids::{MessageId, PropertyId, ReviewId, UserId};
pub use listing::{
    ListQuery, Page, Pagination, PropertyFilter, PropertyListing, RatingSummary, SortBy,
};
pub use message::{InquiryForm, Message, NewMessage};
pub use property::{
    Location, NewProperty, Property, PropertyForm, PropertyPatch, Rates, SellerInfo,
};
pub use review::{
    NewReview, Rating, Review, ReviewAuthor, ReviewForm, ReviewPatch, ReviewUpdateForm,
    ReviewWithAuthor,
};
pub use user::User;

/// Result type for pulse operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by every pulse operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No valid session accompanied the request.
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated, but not the owner or participant of the resource.
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The document store or the media host failed.
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unavailable(msg: impl std::fmt::Display) -> Self {
        Self::DependencyUnavailable(msg.to_string())
    }

    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unauthenticated(_) => "unauthenticated",
            Error::Unauthorized(_) => "unauthorized",
            Error::InvalidArgument(_) => "invalid_argument",
            Error::Conflict(_) => "conflict",
            Error::NotFound(_) => "not_found",
            Error::DependencyUnavailable(_) => "dependency_unavailable",
        }
    }
}

/// Treat blank strings from forms as absent.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
