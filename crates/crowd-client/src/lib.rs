//! Crowd user management client and data models.
//!
//! Provides typed structures and an asynchronous client for the Crowd
//! user management REST API: user lookup and authentication, user creation,
//! attribute management, group membership listings and directory search.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{CrowdClient, CrowdClientBuilder};
pub use crowd_core::Error;
pub use models::{
    simplify_attributes, Attribute, Attributes, Group, ListingOptions, Membership,
    MembershipKind, User, UserInfo,
};

/// Convenient result alias that reuses the shared Crowd error type.
pub type Result<T> = crowd_core::Result<T>;
