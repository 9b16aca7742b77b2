//! Display formatting for models and operation results.
//!
//! Domain types implement [`std::fmt::Display`] directly (see [`models`]);
//! collections and composite results get newtype or wrapper types so that
//! every interface (terminal, MCP) prints the same markdown.
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Domain Models  │    │ Wrappers and    │    │   Markdown      │
//! │ (Step, Tree...) │───▶│ result types    │───▶│   output        │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//! ```
//!
//! ```rust
//! use sitesmith_core::{display::FileListing, models::Step, tree::FileTree};
//!
//! let mut steps = vec![Step::create_file("src/main.ts", "export {}")];
//! let mut tree = FileTree::new();
//! tree.apply_steps(&mut steps);
//!
//! assert_eq!(FileListing(&tree).to_string(), "- src/\n  - main.ts (9 B)\n");
//! ```

pub mod collections;
pub mod datetime;
pub mod models;
pub mod results;
pub mod status;

pub use collections::{FileListing, Steps};
pub use datetime::LocalDateTime;
pub use results::ExportResult;
pub use status::OperationStatus;
