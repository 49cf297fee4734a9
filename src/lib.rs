//! SiteLayers Library
//!
//! Core of a site-analysis map viewer: deterministic categorical styling,
//! concurrent dataset loading with per-dataset timeouts, visibility groups
//! that keep companion layers in step, and a layer control built once every
//! dataset has settled. Drawing is delegated to a [`render::RenderTarget`].

// Module declarations
pub mod cli;
pub mod config;
pub mod constants;
pub mod models;
pub mod render;
pub mod services;
