//! Core of the careers portal client: the application-submission workflow
//! and the API access layer it rides on.
//!
//! Listing pages and branding consume [`application`] state and the
//! [`gateway`] read methods but carry no decision logic of their own.

pub mod application;
pub mod config;
pub mod gateway;
pub mod models;
pub mod upload;
