use core::fmt::Display;

/// Holds the context for the current operation. Used for prefixing logs.
#[derive(Default, Debug, Clone)]
pub struct Context {
    /// The remote end, e.g. `sftp://backup@example.com:22`.
    pub remote: Option<String>,

    /// The current context
    pub current_context: &'static str,
}

impl Context {
    /// Creates a context for a given remote.
    pub fn for_remote(remote: impl Into<String>) -> Self {
        Self {
            remote: Some(remote.into()),
            current_context: "",
        }
    }
}

impl Display for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if let Some(remote) = &self.remote {
            write!(f, "[{remote}] ")?;
        }

        if !self.current_context.is_empty() {
            write!(f, "[{}] ", self.current_context)?;
        }

        Ok(())
    }
}
