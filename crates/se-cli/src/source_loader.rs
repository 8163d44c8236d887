use std::path::{Path, PathBuf};

use se_core::ScriptEngineError;
use se_runtime::{ScriptEngine, ScriptFile};
use tracing::debug;
use walkdir::WalkDir;

use crate::map_cli_source_path;

const SCRIPT_EXTENSION: &str = "rhai";

pub(crate) fn resolve_scripts_dir(scripts_dir: &str) -> Result<PathBuf, ScriptEngineError> {
    let path = PathBuf::from(scripts_dir);
    let absolute = if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map_err(map_cli_source_path)?
            .join(path)
    };

    if !absolute.exists() {
        return Err(ScriptEngineError::new(
            "CLI_SOURCE_NOT_FOUND",
            format!("scripts-dir does not exist: {}", absolute.display()),
        ));
    }

    if !absolute.is_dir() {
        return Err(ScriptEngineError::new(
            "CLI_SOURCE_NOT_DIR",
            format!("scripts-dir is not a directory: {}", absolute.display()),
        ));
    }

    Ok(absolute)
}

pub(crate) fn find_script_files(scripts_dir: &Path) -> Result<Vec<PathBuf>, ScriptEngineError> {
    let mut scripts = WalkDir::new(scripts_dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|extension| extension == SCRIPT_EXTENSION)
        })
        .collect::<Vec<_>>();
    scripts.sort();

    if scripts.is_empty() {
        return Err(ScriptEngineError::new(
            "CLI_SOURCE_EMPTY",
            format!("No .rhai files under {}", scripts_dir.display()),
        ));
    }

    Ok(scripts)
}

pub(crate) fn load_scripts_dir(
    engine: &mut ScriptEngine,
    scripts_dir: &str,
) -> Result<Vec<ScriptFile>, ScriptEngineError> {
    let root = resolve_scripts_dir(scripts_dir)?;
    let mut files = Vec::new();
    for path in find_script_files(&root)? {
        let file = ScriptFile::load(engine, &path)?;
        debug!(module = file.name(), path = %path.display(), "Loaded script");
        files.push(file);
    }
    Ok(files)
}
