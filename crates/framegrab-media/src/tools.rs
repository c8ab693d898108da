//! External tool discovery.

use std::path::PathBuf;

use crate::error::{MediaError, MediaResult};

/// Resolve a tool binary, either an explicit path or a name looked up in PATH.
pub fn check_tool(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::ToolNotFound(program.to_string()))
}
