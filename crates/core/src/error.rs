//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Kind of record a lookup failed to find.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Missing {
    Circle,
    Application,
    Product,
}

impl core::fmt::Display for Missing {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Missing::Circle => "Circle",
            Missing::Application => "Pending application",
            Missing::Product => "Product",
        })
    }
}

/// Domain-level error.
///
/// Every variant is a caller-input or authorization violation. An operation
/// that returns one of these has not mutated any state and has not emitted any
/// notification.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A circle with the supplied id already exists.
    #[error("Circle ID already exists: {0}")]
    DuplicateId(String),

    #[error("{0} not found")]
    NotFound(Missing),

    /// The caller is not the circle owner.
    #[error("Only circle owner can perform this action")]
    NotOwner,

    /// The caller is not the product owner.
    #[error("Only product owner can perform this action")]
    NotProductOwner,

    #[error("Not a member of this circle")]
    NotMember,

    #[error("Already a member of this circle")]
    AlreadyMember,

    /// The circle lost its last member and no longer accepts applications.
    #[error("Circle is disabled, cannot join")]
    CircleDisabled,

    #[error("Owner must transfer ownership before exit if there are other members")]
    OwnerMustTransferFirst,

    /// The product exists but is listed under a different circle.
    #[error("Product does not belong to this circle")]
    WrongCircle,

    /// Only audited products may be put on the shelf.
    #[error("Product must be approved before it can be put on shelf")]
    ProductNotApproved,
}

/// Fieldless mirror of [`DomainError`] for callers branching on the taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    DuplicateId,
    NotFound,
    NotOwner,
    NotProductOwner,
    NotMember,
    AlreadyMember,
    CircleDisabled,
    OwnerMustTransferFirst,
    WrongCircle,
    ProductNotApproved,
}

impl DomainError {
    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId(id.into())
    }

    pub fn not_found(missing: Missing) -> Self {
        Self::NotFound(missing)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::DuplicateId(_) => ErrorKind::DuplicateId,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::NotOwner => ErrorKind::NotOwner,
            DomainError::NotProductOwner => ErrorKind::NotProductOwner,
            DomainError::NotMember => ErrorKind::NotMember,
            DomainError::AlreadyMember => ErrorKind::AlreadyMember,
            DomainError::CircleDisabled => ErrorKind::CircleDisabled,
            DomainError::OwnerMustTransferFirst => ErrorKind::OwnerMustTransferFirst,
            DomainError::WrongCircle => ErrorKind::WrongCircle,
            DomainError::ProductNotApproved => ErrorKind::ProductNotApproved,
        }
    }
}
