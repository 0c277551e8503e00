//! Application of compiled queries to a live graph.
//!
//! Find only annotates. Hide changes what is shown, either by visibility or
//! by removal, and always returns the state needed to undo itself.

pub mod find;
pub mod hide;

pub use find::apply_find;
pub use hide::{Applied, HideApplier, HideOptions, HideState, LayoutOutcome, apply_hide};
