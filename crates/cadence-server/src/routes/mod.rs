pub mod ab_tests;
pub mod ai;
pub mod events;
pub mod inbox;
pub mod integrations;
pub mod privacy;
pub mod rules;
pub mod templates;
pub mod workflows;
