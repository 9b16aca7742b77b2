//! Splitting shell step text into sandbox invocations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single program invocation handed to [`crate::sandbox::Sandbox::spawn`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Splits a shell command into invocations to run in order.
///
/// `&&` separates invocations; each one is tokenised on whitespace. No
/// quoting, globbing or variable expansion is performed.
///
/// ```rust
/// use sitesmith_core::protocol::split_command;
///
/// let parts = split_command("npm install && npm run dev");
/// assert_eq!(parts.len(), 2);
/// assert_eq!(parts[1].program, "npm");
/// assert_eq!(parts[1].args, vec!["run", "dev"]);
/// ```
pub fn split_command(command: &str) -> Vec<Invocation> {
    command
        .split("&&")
        .filter_map(|segment| {
            let mut tokens = segment.split_whitespace();
            let program = tokens.next()?;
            Some(Invocation::new(program, tokens))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_command() {
        assert_eq!(
            split_command("npm install"),
            vec![Invocation::new("npm", ["install"])]
        );
    }

    #[test]
    fn test_chained_commands_and_blank_segments() {
        let parts = split_command("  cd app &&  && npm   run dev ");
        assert_eq!(
            parts,
            vec![
                Invocation::new("cd", ["app"]),
                Invocation::new("npm", ["run", "dev"]),
            ]
        );
    }

    #[test]
    fn test_empty_command() {
        assert!(split_command("   ").is_empty());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            Invocation::new("npm", ["run", "dev"]).to_string(),
            "npm run dev"
        );
    }
}
