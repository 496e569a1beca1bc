//! Evia client core — form validation and request orchestration for the
//! registration and AI-prompt screens.

pub mod config;
pub mod error;
pub mod flows;
pub mod navigation;
pub mod request;
pub mod storage;
pub mod validation;
