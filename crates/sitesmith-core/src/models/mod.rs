//! Data models for build steps, the file tree and the conversation log.
//!
//! Display implementations for these models live in
//! [`crate::display::models`], keeping data structures and presentation apart.
//!
//! # Examples
//!
//! ```rust
//! use sitesmith_core::models::{Step, StepKind, StepStatus};
//!
//! let mut step = Step::create_file("src/App.tsx", "export default {}");
//! assert_eq!(step.status, StepStatus::Pending);
//! assert!(matches!(step.kind, StepKind::CreateOrUpdateFile { .. }));
//!
//! assert!(step.complete());
//! // Completed is terminal
//! assert!(!step.fail("too late"));
//! println!("{}", step); // Shows ✓ Completed status icon
//! ```

pub mod conversation;
pub mod node;
pub mod status;
pub mod step;


pub use conversation::{Conversation, Message, Part, Role};
pub use node::{FileTreeNode, NodeEntry, NodeKind};
pub use status::StepStatus;
pub use step::{Step, StepKind};
