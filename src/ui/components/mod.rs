//! Reusable UI components

pub mod dialog;
