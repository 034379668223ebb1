pub mod canvas;
pub mod color;

// Re-export commonly used types at the model level.
pub use canvas::{Canvas, Surface};
pub use color::Color;
