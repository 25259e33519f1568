use std::fmt;

/// Mandatory backend entry points could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEntryPoints {
    pub backend: &'static str,
    pub names: Vec<&'static str>,
}

impl fmt::Display for MissingEntryPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} backend is missing mandatory entry points: {}",
            self.backend,
            self.names.join(", ")
        )
    }
}

impl std::error::Error for MissingEntryPoints {}
