//! Core library for Sitesmith, a generated-project assembly pipeline.
//!
//! A language model answers build prompts with prose wrapped around an
//! `<artifact>` element of file and shell actions. This crate turns those
//! replies into a project:
//!
//! - [`protocol`] parses replies into ordered [`models::Step`]s.
//! - [`tree`] folds steps into a [`tree::FileTree`].
//! - [`mount`] projects the tree into the sandbox mount format, and
//!   [`sandbox`] hands it to an execution sandbox for a live preview.
//! - [`archive`] exports the tree as a zip.
//! - [`session`] owns the state of one build and drives the model through
//!   [`llm`] and [`templates`].
//!
//! # Display Architecture
//!
//! Models implement [`std::fmt::Display`] as markdown; [`display`] adds
//! wrappers for collections and results. The CLI renders that markdown in
//! the terminal and the MCP server returns it as tool output.
//!
//! # Quick Start
//!
//! ```rust
//! use sitesmith_core::SessionBuilder;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = SessionBuilder::new()
//!     .with_export_path(Some("project.zip"))
//!     .build()
//!     .await?;
//!
//! let outcome = session
//!     .submit_response(
//!         r#"Here you go.
//! <artifact id="hello" title="Hello">
//! <action type="file" filePath="src/index.js">console.log("hi")</action>
//! <action type="shell">node src/index.js</action>
//! </artifact>"#,
//!     )
//!     .await;
//! println!("{outcome}");
//!
//! let zip = session.export().await?;
//! assert!(!zip.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod display;
pub mod error;
pub mod llm;
pub mod models;
pub mod mount;
pub mod params;
pub mod protocol;
pub mod sandbox;
pub mod session;
pub mod templates;
pub mod tree;

// Re-export commonly used types
pub use archive::{export_zip, ExportSummary};
pub use display::{ExportResult, FileListing, LocalDateTime, OperationStatus, Steps};
pub use error::{BuildError, ModelCallKind, Result};
pub use llm::{GeminiClient, GeminiConfig, ModelClient, ModelRequest};
pub use models::{
    Conversation, FileTreeNode, Message, NodeEntry, NodeKind, Role, Step, StepKind, StepStatus,
};
pub use mount::{MountDescriptor, MountEntry};
pub use params::{ExportProject, FollowUp, ListSteps, ShowFile, StartBuild, SubmitResponse};
pub use protocol::{parse_response, ParsedResponse};
pub use sandbox::{LocalSandbox, MountAdapter, PreviewState, Sandbox};
pub use session::{BuildOutcome, Session, SessionBuilder};
pub use templates::Template;
pub use tree::{FileTree, FoldReport};
