//! Circle registry: creation, ownership transfer and the enabled/disabled
//! lifecycle of circles.
//!
//! Pure domain logic; membership lives in `circles-membership`.

pub mod circle;
pub mod registry;

pub use circle::{
    Circle, CircleCommand, CircleCreated, CircleDisabled, CircleEvent, CreateCircle, DisableCircle,
    OwnershipTransferred, TransferOwnership,
};
pub use registry::CircleRegistry;
