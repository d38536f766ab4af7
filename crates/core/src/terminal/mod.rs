//! Terminal surface abstraction

mod traits;

pub use traits::{MockSurface, TerminalSurface};
