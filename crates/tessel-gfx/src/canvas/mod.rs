//! 2D canvas widget.

mod canvas2d;

pub use canvas2d::{Canvas2D, CanvasElement};
