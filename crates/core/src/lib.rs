#![forbid(unsafe_code)]

pub mod assessment;
pub mod baseline;
pub mod error;
pub mod header;
pub mod model;
pub mod path;
pub mod screen;
pub mod time;

pub use error::{LocalStateError, ModelError};
pub use screen::{ScreenOverride, resolve};
