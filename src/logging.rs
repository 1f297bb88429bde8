//! Verbosity gate over the `log` facade.
//!
//! Pouches log through `log` and never install a logger themselves. The
//! application picks the sink; [`set_default_verbosity`] only raises or
//! lowers the global ceiling.

use log::LevelFilter;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Everything, including per-statement debug output
    Trace,
    #[default]
    Info,
    Warn,
    Error,
}

impl Verbosity {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Trace => LevelFilter::Trace,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Warn => LevelFilter::Warn,
            Verbosity::Error => LevelFilter::Error,
        }
    }

    /// Whether a message at `level` passes this verbosity.
    pub fn allows(self, level: log::Level) -> bool {
        level <= self.to_level_filter()
    }
}

impl From<Verbosity> for LevelFilter {
    fn from(v: Verbosity) -> Self {
        v.to_level_filter()
    }
}

/// Set the process-wide log ceiling.
pub fn set_default_verbosity(verbosity: Verbosity) {
    log::set_max_level(verbosity.to_level_filter());
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn test_default_is_info() {
        assert_eq!(Verbosity::default(), Verbosity::Info);
    }

    #[test]
    fn test_level_filters() {
        assert_eq!(Verbosity::Trace.to_level_filter(), LevelFilter::Trace);
        assert_eq!(LevelFilter::from(Verbosity::Error), LevelFilter::Error);
    }

    #[test]
    fn test_allows() {
        assert!(Verbosity::Trace.allows(Level::Debug));
        assert!(!Verbosity::Info.allows(Level::Debug));
        assert!(Verbosity::Warn.allows(Level::Error));
        assert!(!Verbosity::Error.allows(Level::Warn));
    }

    #[test]
    fn test_set_default_verbosity() {
        set_default_verbosity(Verbosity::Warn);
        assert_eq!(log::max_level(), LevelFilter::Warn);
        set_default_verbosity(Verbosity::Trace);
        assert_eq!(log::max_level(), LevelFilter::Trace);
    }
}
