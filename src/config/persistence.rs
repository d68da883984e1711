use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::config::Configuration;
use crate::error::{Result, TunerError};

/// Load a configuration from a `key=value` text file.
///
/// Each line is split at its first `=`; lines without one are skipped.
/// Keys and values are whitespace-trimmed. Only an unreadable file is an error.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Configuration> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| TunerError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .filter_map(|line| line.trim().split_once('='))
        .collect())
}

/// Save a configuration, one `key=value` line per entry, overwriting `path`.
pub fn save_config<P: AsRef<Path>>(path: P, config: &Configuration) -> Result<()> {
    let mut out = String::new();
    for (key, value) in config.iter() {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{key}={value}");
    }
    fs::write(path, out)?;
    Ok(())
}
