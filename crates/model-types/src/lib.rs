pub mod constraint;
pub mod geometry;
pub mod sketch;

pub use constraint::*;
pub use geometry::*;
pub use sketch::*;
