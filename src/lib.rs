//! Pixelworks Server Library
//!
//! Stateless image endpoints: heuristic background removal, format
//! conversion and an image editor. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `imaging`: raster model, segmenter, codecs and filters
//! - `routes`: HTTP handlers and the application router

pub mod config;
pub mod error;
pub mod imaging;
pub mod routes;
pub mod state;
