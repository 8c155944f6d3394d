//! Personalized daily eatery picks for campus dining
//!
//! The recommendation engine maintains a deduplicated dish catalog, derives
//! a numeric taste profile per user from onboarding choices and rating
//! history, scores candidate dishes with a hybrid similarity function, and
//! falls back to LLM delegation for users without preference signal. The
//! surrounding daily job (the `campus-picks` binary) feeds it the scraped
//! menu; scraping, email delivery, and the dashboard live elsewhere.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use services::engine::RecommendationEngine;
