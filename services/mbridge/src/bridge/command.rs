//! Bus commands

use std::fmt;
use std::sync::Arc;

use crate::model::RegisterPoint;

/// One queued bus operation, consumed exactly once by the executor
#[derive(Debug, Clone)]
pub enum Command {
    Read(Arc<RegisterPoint>),
    Write(Arc<RegisterPoint>, u16),
}

impl Command {
    pub fn register(&self) -> &RegisterPoint {
        match self {
            Command::Read(p) | Command::Write(p, _) => p,
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(self, Command::Write(..))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Read(p) => write!(f, "read {}", p.key),
            Command::Write(p, value) => write!(f, "write {} = {}", p.key, value),
        }
    }
}
