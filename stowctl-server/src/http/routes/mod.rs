//! Route handlers organized by resource

pub mod children;
pub mod health;
pub mod items;
pub mod labels;
pub mod search;
pub mod states;
pub mod tags;
