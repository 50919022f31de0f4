use std::{env, path::PathBuf};

use crate::paths;

pub(crate) const CONFIG_FILE: &str = ".lens-store.toml";

/// Load config file content
///
/// Searches, in order:
/// 1. `.lens-store.toml` in the current working directory
/// 2. `.lens-store.toml` in the home directory
/// 3. `config.toml` in the platform config directory
///
/// Returns the content and the path it was read from.
pub fn load_config_file() -> Option<(String, PathBuf)> {
    candidate_paths().into_iter().find_map(|path| {
        let content = std::fs::read_to_string(&path).ok()?;
        Some((content, path))
    })
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(home_config) = get_home_config_path() {
        paths.push(home_config);
    }
    if let Ok(global) = paths::global_config_path() {
        paths.push(global);
    }
    paths
}

/// Returns ~/.lens-store.toml if HOME environment variable is set.
fn get_home_config_path() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| PathBuf::from(home).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cwd_is_searched_first() {
        let paths = candidate_paths();
        assert_eq!(paths.first(), Some(&PathBuf::from(CONFIG_FILE)));
    }
}
