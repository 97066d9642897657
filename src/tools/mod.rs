//! The operations behind each MCP tool. Every operation is a function of a
//! [`ToolContext`] and its parameters, and always produces response text:
//! failures are reported in the text rather than returned as errors.

pub mod analyze;
pub mod generate;
pub mod import;
pub mod list;

use crate::runner::{ProcessRunner, RunLimits};
use crate::workspace::{Platform, Workspace};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn default_true() -> bool {
    true
}

fn default_node_tree_name() -> String {
    crate::script::DEFAULT_NODE_TREE_NAME.to_string()
}

/// Collaborators shared by all tools, assembled once at startup.
#[derive(Clone)]
pub struct ToolContext {
    pub workspace: Workspace,
    pub runner: Arc<dyn ProcessRunner>,
    pub clock: Arc<dyn Clock>,
    pub platform: Platform,
    pub limits: RunLimits,
    /// Used when a call does not name an executable itself.
    pub default_blender: Option<PathBuf>,
}
