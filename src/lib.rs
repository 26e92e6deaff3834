#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::{LayoutConfig, load_config};
pub use error::DiagramError;
pub use ir::{Connection, Diagram, Node, NodeKind, Orientation, Side};
pub use layout::{Layout, LayoutOptions, compute_layout};
