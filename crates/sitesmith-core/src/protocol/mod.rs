//! Model response protocol: parsing replies into build steps.

pub mod command;
pub mod parser;

pub use command::{split_command, Invocation};
pub use parser::{
    parse_response, parse_response_lenient, ArtifactInfo, ParsedResponse, ResponseStream,
};
