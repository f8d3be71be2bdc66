//! Installation-directory resolution (§6): `TORANOMAKI_DIR`, else the
//! directory containing the running binary, else the current directory.

use std::env;
use std::path::PathBuf;

use crate::error::{DictionaryError, Result};

pub const INSTALL_DIR_ENV_VAR: &str = "TORANOMAKI_DIR";
pub const DATABASE_FILE_NAME: &str = "JMdict.dat";

pub fn locate_install_dir() -> Result<PathBuf> {
    if let Ok(dir) = env::var(INSTALL_DIR_ENV_VAR) {
        let path = PathBuf::from(dir);
        if path.is_dir() {
            return Ok(path);
        }
        return Err(DictionaryError::DirectoryNotFound);
    }

    if let Ok(exe) = env::current_exe() {
        if let Some(dir) = exe.parent() {
            if dir.is_dir() {
                return Ok(dir.to_path_buf());
            }
        }
    }

    let cwd = env::current_dir().map_err(DictionaryError::Io)?;
    if cwd.is_dir() {
        return Ok(cwd);
    }
    Err(DictionaryError::DirectoryNotFound)
}

pub fn database_path() -> Result<PathBuf> {
    Ok(locate_install_dir()?.join(DATABASE_FILE_NAME))
}
