//! Affiliation and working group persistence

pub mod affiliations;
pub mod working_groups;
