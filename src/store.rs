//! Section-keyed credentials file, loaded once per invocation and saved atomically.

use std::{
    fs,
    path::{Path, PathBuf},
};

use ini::{EscapePolicy, Ini, ParseOption, WriteOption};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{Error, Result};

/// In-memory view of a credentials file.
///
/// Sections and keys keep their file order, and anything this tool does not
/// touch is written back exactly as it was read.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
    ini: Ini,
}

impl CredentialStore {
    /// Load the store from `path`. A missing file is an error, not an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Err(Error::MissingFile(path));
        }

        let ini = Ini::load_from_file_opt(&path, parse_option()).map_err(|source| Error::Load {
            path: path.clone(),
            source,
        })?;
        debug!("Loaded credentials file: {}", path.display());

        Ok(Self { path, ini })
    }

    /// Load `path` if it exists, otherwise start from an empty store bound to it.
    pub fn load_or_empty(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        match Self::load(&path) {
            Err(Error::MissingFile(_)) => Ok(Self::empty(path)),
            other => other,
        }
    }

    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ini: Ini::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.ini.section(Some(section)).is_some()
    }

    pub fn has_option(&self, section: &str, key: &str) -> bool {
        self.ini
            .section(Some(section))
            .is_some_and(|props| props.contains_key(key))
    }

    pub fn get(&self, section: &str, key: &str) -> Result<&str> {
        let props = self
            .ini
            .section(Some(section))
            .ok_or_else(|| Error::MissingSection(section.to_string()))?;

        props.get(key).ok_or_else(|| Error::MissingOption {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// Like [`get`](Self::get) but absence of the section or key is `None`.
    pub fn get_opt(&self, section: &str, key: &str) -> Option<&str> {
        self.ini.section(Some(section)).and_then(|props| props.get(key))
    }

    /// Set `key` in `section`, creating the section at the end of the file if needed.
    pub fn set(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Remove `key` from `section`, returning the old value.
    pub fn remove_option(&mut self, section: &str, key: &str) -> Option<String> {
        self.ini
            .section_mut(Some(section))
            .and_then(|props| props.remove(key))
    }

    /// Names of all named sections in file order.
    pub fn sections(&self) -> Vec<&str> {
        self.ini.sections().flatten().collect()
    }

    /// Key/value pairs of `section` in file order; empty if the section is absent.
    pub fn options(&self, section: &str) -> Vec<(&str, &str)> {
        self.ini
            .section(Some(section))
            .map(|props| props.iter().collect())
            .unwrap_or_default()
    }

    /// Write the whole store back to the path it was loaded from.
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.path)
    }

    /// Write the whole store to `path`.
    ///
    /// Contents go to a temporary file in the target directory which is then
    /// renamed over `path`, so readers see either the old or the new file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let write_err = |source| Error::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        self.ini
            .write_to_opt(&mut tmp, write_option())
            .map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(tmp.path(), fs::Permissions::from_mode(0o600))
                .map_err(write_err)?;
        }

        tmp.persist(path).map_err(|e| write_err(e.error))?;

        debug!("Saved credentials file: {}", path.display());
        Ok(())
    }
}

// Values such as session tokens and device ARNs are stored verbatim: no quote
// stripping on read and no escaping on write.
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn write_option() -> WriteOption {
    WriteOption {
        escape_policy: EscapePolicy::Nothing,
        kv_separator: " = ",
        ..WriteOption::default()
    }
}
