use std::path::PathBuf;

/// Resolved run configuration, built once from [`crate::cli::Args`]
/// before anything downstream touches it.
#[derive(Clone, Debug)]
pub struct Config {
    pub path: PathBuf,
    pub cycles: u32,
    pub stats_json: bool,
    pub verbose: bool,
}

impl From<&crate::cli::Args> for Config {
    fn from(a: &crate::cli::Args) -> Self {
        Self {
            path: a.path.clone(),
            cycles: a.cycles,
            stats_json: a.stats_json,
            verbose: a.verbose,
        }
    }
}
