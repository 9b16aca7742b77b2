//! Parser for the pseudo-XML artifact protocol spoken by the model.
//!
//! ```text
//! <artifact id="..." title="...">
//!   <action type="file" filePath="src/App.tsx">...content...</action>
//!   <action type="shell">npm install</action>
//! </artifact>
//! ```
//!
//! Text outside the artifact is prose and ignored. The `boltArtifact` /
//! `boltAction` spellings are accepted as aliases.

use std::collections::HashMap;
use std::sync::LazyLock;

use log::{debug, warn};
use regex::Regex;

use crate::{
    error::{BuildError, Result},
    models::Step,
};

static ARTIFACT_OPEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(?:artifact|boltArtifact)\b([^>]*)>").expect("artifact open pattern")
});

static ARTIFACT_CLOSE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</(?:artifact|boltArtifact)\s*>").expect("artifact close pattern"));

static ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(?:action|boltAction)\b([^>]*)>(.*?)</(?:action|boltAction)\s*>")
        .expect("action pattern")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w:-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern")
});

/// Metadata of one artifact element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub id: Option<String>,
    pub title: Option<String>,
}

/// Everything extracted from one model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// Artifacts in source order
    pub artifacts: Vec<ArtifactInfo>,
    /// Steps in source order, all `Pending`, numbered from 1
    pub steps: Vec<Step>,
}

impl ParsedResponse {
    /// Title of the first artifact, if any.
    pub fn title(&self) -> Option<&str> {
        self.artifacts.iter().find_map(|a| a.title.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Parses one complete model response into pending steps.
///
/// A response without any artifact yields zero steps. An artifact that is
/// opened but never closed is a [`BuildError::ProtocolParse`]; callers that
/// want the recover-with-zero-steps policy use [`parse_response_lenient`].
pub fn parse_response(text: &str) -> Result<ParsedResponse> {
    let mut parsed = ParsedResponse::default();
    let mut cursor = 0;

    while let Some(open) = ARTIFACT_OPEN.captures_at(text, cursor) {
        let (open_match, attrs) = match (open.get(0), open.get(1)) {
            (Some(m), Some(a)) => (m, a.as_str()),
            _ => break,
        };
        let body_start = open_match.end();
        let close = ARTIFACT_CLOSE.find_at(text, body_start).ok_or_else(|| {
            BuildError::ProtocolParse {
                reason: format!("artifact opened at byte {} is never closed", open_match.start()),
            }
        })?;

        parsed.artifacts.push(artifact_info(attrs));
        let body = &text[body_start..close.start()];
        for caps in ACTION.captures_iter(body) {
            let attrs = caps.get(1).map_or("", |m| m.as_str());
            let inner = caps.get(2).map_or("", |m| m.as_str());
            if let Some(step) = action_to_step(attrs, inner) {
                parsed.steps.push(step);
            }
        }

        cursor = close.end();
    }

    number_steps(&mut parsed.steps);
    debug!(
        "Parsed {} artifact(s) into {} step(s)",
        parsed.artifacts.len(),
        parsed.steps.len()
    );
    Ok(parsed)
}

/// Parses a response, turning a protocol error into an empty result plus a
/// warning so that a garbled reply never disturbs prior build state.
pub fn parse_response_lenient(text: &str) -> (ParsedResponse, Option<BuildError>) {
    match parse_response(text) {
        Ok(parsed) => (parsed, None),
        Err(e) => {
            warn!("Discarding model response: {e}");
            (ParsedResponse::default(), Some(e))
        }
    }
}

/// Incremental parser fed with chunks of a streamed response.
///
/// Steps are emitted as soon as their closing tag arrives. Feeding the
/// chunks of a response and then calling [`ResponseStream::finish`] yields
/// the same steps, in the same order, as [`parse_response`] on the whole
/// text.
#[derive(Debug, Default)]
pub struct ResponseStream {
    buffer: String,
    /// Byte offset in `buffer` from which to look for the next element
    cursor: usize,
    /// Whether an artifact is currently open
    in_artifact: bool,
    artifacts: Vec<ArtifactInfo>,
    emitted: u64,
}

impl ResponseStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns the steps completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<Step> {
        self.buffer.push_str(chunk);
        let mut steps = Vec::new();

        loop {
            if !self.in_artifact {
                let Some(open) = ARTIFACT_OPEN.captures_at(&self.buffer, self.cursor) else {
                    break;
                };
                let (Some(m), Some(attrs)) = (open.get(0), open.get(1)) else {
                    break;
                };
                self.artifacts.push(artifact_info(attrs.as_str()));
                self.cursor = m.end();
                self.in_artifact = true;
            }

            let close = ARTIFACT_CLOSE.find_at(&self.buffer, self.cursor);
            let action = ACTION.captures_at(&self.buffer, self.cursor);

            match (action, close) {
                (Some(caps), close)
                    if close.map_or(true, |c| caps.get(0).map_or(false, |m| m.end() <= c.start())) =>
                {
                    let Some(whole) = caps.get(0) else { break };
                    let attrs = caps.get(1).map_or("", |m| m.as_str());
                    let inner = caps.get(2).map_or("", |m| m.as_str());
                    if let Some(mut step) = action_to_step(attrs, inner) {
                        self.emitted += 1;
                        step.id = self.emitted;
                        steps.push(step);
                    }
                    self.cursor = whole.end();
                }
                (_, Some(close)) => {
                    self.cursor = close.end();
                    self.in_artifact = false;
                }
                (_, None) => break,
            }
        }

        steps
    }

    /// Artifacts opened so far.
    pub fn artifacts(&self) -> &[ArtifactInfo] {
        &self.artifacts
    }

    /// The full text received so far.
    pub fn text(&self) -> &str {
        &self.buffer
    }

    /// Ends the stream. Fails if an artifact is still open.
    pub fn finish(self) -> Result<String> {
        if self.in_artifact {
            return Err(BuildError::ProtocolParse {
                reason: "stream ended inside an artifact".to_string(),
            });
        }
        Ok(self.buffer)
    }
}

fn number_steps(steps: &mut [Step]) {
    for (i, step) in steps.iter_mut().enumerate() {
        step.id = i as u64 + 1;
    }
}

fn attributes(raw: &str) -> HashMap<&str, &str> {
    ATTRIBUTE
        .captures_iter(raw)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((name, value))
        })
        .collect()
}

fn artifact_info(raw_attrs: &str) -> ArtifactInfo {
    let attrs = attributes(raw_attrs);
    ArtifactInfo {
        id: attrs.get("id").map(|s| s.to_string()),
        title: attrs.get("title").map(|s| s.to_string()),
    }
}

fn action_to_step(raw_attrs: &str, inner: &str) -> Option<Step> {
    let attrs = attributes(raw_attrs);
    match attrs.get("type").copied() {
        Some("file") => {
            let Some(path) = attrs.get("filePath") else {
                debug!("Skipping file action without filePath");
                return None;
            };
            Some(Step::create_file(*path, strip_opening_newline(inner)))
        }
        Some("shell") => {
            let command = inner.trim();
            if command.is_empty() {
                debug!("Skipping empty shell action");
                return None;
            }
            Some(Step::run_command(command))
        }
        other => {
            debug!("Skipping action of unknown type {other:?}");
            None
        }
    }
}

/// Drops the single newline that follows the opening tag, keeping all other
/// whitespace.
fn strip_opening_newline(inner: &str) -> &str {
    inner
        .strip_prefix("\r\n")
        .or_else(|| inner.strip_prefix('\n'))
        .unwrap_or(inner)
}
