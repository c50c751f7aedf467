//! Test utilities
//!
//! Signal generators, WAV fixture writers and simple level measurements for
//! exercising the pipeline without checked-in media files.

pub mod analysis;
pub mod signals;

pub use analysis::*;
pub use signals::*;
