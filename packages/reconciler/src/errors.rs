use scribe_vdom::{Markers, VNode};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Portal target did not resolve; content skipped until a later pass
    UnresolvedPortalTarget,
    /// Render requested while a pass was in flight
    Reentrant,
    /// Two nodes claimed the same live node; the second was created fresh
    IdentityCollision,
    /// Matched live node was detached from its expected parent
    DetachedReuse,
    /// Live tree operation failed; the subtree was skipped
    LiveTree,
    /// Tree shape that reconciles unstably (dev mode)
    InvalidTree,
}

impl ErrorKind {
    pub fn severity(&self) -> Severity {
        match self {
            ErrorKind::LiveTree => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::UnresolvedPortalTarget => "unresolved-portal-target",
            ErrorKind::Reentrant => "reentrant",
            ErrorKind::IdentityCollision => "identity-collision",
            ErrorKind::DetachedReuse => "detached-reuse",
            ErrorKind::LiveTree => "live-tree",
            ErrorKind::InvalidTree => "invalid-tree",
        };
        f.write_str(name)
    }
}

/// Short description of the virtual node an error is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

const SUMMARY_TEXT_LIMIT: usize = 24;

impl NodeSummary {
    pub fn of(node: &VNode, markers: &Markers) -> Self {
        let text = node.text.as_ref().map(|t| {
            if t.chars().count() > SUMMARY_TEXT_LIMIT {
                let head: String = t.chars().take(SUMMARY_TEXT_LIMIT).collect();
                format!("{}…", head)
            } else {
                t.clone()
            }
        });
        Self {
            tag: node.tag.clone(),
            sid: node.sid(markers),
            key: node.key.clone(),
            text,
        }
    }
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => {
                write!(f, "<{}", tag)?;
                if let Some(key) = &self.key {
                    write!(f, " key={:?}", key)?;
                }
                if let Some(sid) = &self.sid {
                    write!(f, " sid={:?}", sid)?;
                }
                write!(f, ">")
            }
            None => write!(f, "{:?}", self.text.as_deref().unwrap_or_default()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Gate,
    Validate,
    Match,
    Apply,
    Portal,
    Sweep,
}

/// Where in a pass an error was raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PassContext {
    pub pass: u64,
    /// Child indices from the root
    pub path: Vec<usize>,
    pub phase: Phase,
}

impl PassContext {
    pub fn new(pass: u64, phase: Phase) -> Self {
        Self {
            pass,
            path: Vec::new(),
            phase,
        }
    }

    pub fn with_path(mut self, path: Vec<usize>) -> Self {
        self.path = path;
        self
    }
}

impl fmt::Display for PassContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path: Vec<String> = self.path.iter().map(|i| i.to_string()).collect();
        write!(f, "pass {} {:?} at /{}", self.pass, self.phase, path.join("/"))
    }
}

/// Recoverable error raised during a render pass
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct RenderError {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeSummary>,
    pub context: PassContext,
}

impl RenderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, context: PassContext) -> Self {
        Self {
            kind,
            message: message.into(),
            node: None,
            context,
        }
    }

    pub fn with_node(mut self, node: NodeSummary) -> Self {
        self.node = Some(node);
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
