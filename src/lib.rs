pub mod config;
pub mod descriptor_writer;
pub mod error;
pub mod gcp;
pub mod io;
pub mod marker_table;
pub mod match_emitter;
pub mod observer;
pub mod pipeline;
pub mod view_catalog;

pub use error::{MarkerError, Result};
