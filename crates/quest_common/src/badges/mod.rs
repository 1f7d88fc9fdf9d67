//! Badges: static catalog plus pure evaluation over event counts.

pub mod catalog;
mod defaults;
pub mod evaluator;

pub use catalog::{BadgeCatalog, BadgeCategory, BadgeDefinition, Requirement};
pub use evaluator::{
    closest, evaluate_all, is_earned, progress, progress_details, status, view, views, BadgeStatus,
    BadgeView, RequirementProgress,
};
