//! TOML file config store.

use super::{ConfigStore, SECTION};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use toml::{Table, Value};
use tracing::{debug, instrument};

/// File permissions for the config file (Unix only): owner read/write.
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Directory permissions (Unix only): owner read/write/execute.
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;

/// TOML file config store.
///
/// Keys live in the `[upwork]` table. Every other table in the file (for
/// example `[logging]`) is carried through writes untouched, though comments
/// are not.
///
/// # Security
/// - The file is written with 0600 permissions on Unix
/// - A missing parent directory is created with 0700 permissions
///
/// # Durability
/// Writes go to `{path}.tmp`, are fsynced, then renamed over the original,
/// so a reader never sees a half-written file.
#[derive(Debug)]
pub struct FileConfigStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileConfigStore {
    /// Create a store backed by the TOML file at `path`.
    ///
    /// The file does not need to exist yet; it is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Get the path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Table> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Table::new()),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read config file '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };

        content.parse::<Table>().map_err(|e| {
            Error::Storage(format!(
                "Failed to parse config file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Apply `edit` to the `[upwork]` table and write the whole document back.
    fn modify_section<F>(&self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Table),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| Error::Storage("config file lock poisoned".to_string()))?;

        let mut document = self.read_document()?;
        let section = document
            .entry(SECTION)
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(section) = section else {
            return Err(Error::Storage(format!(
                "'{}' in '{}' is not a table",
                SECTION,
                self.path.display()
            )));
        };
        edit(section);

        let content = toml::to_string_pretty(&document)
            .map_err(|e| Error::Storage(format!("Failed to serialize config: {}", e)))?;
        self.write_atomic(&content)
    }

    fn ensure_parent_dir(&self) -> Result<()> {
        let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) else {
            return Ok(());
        };
        if dir.exists() {
            return Ok(());
        }

        std::fs::create_dir_all(dir).map_err(|e| {
            Error::Storage(format!(
                "Failed to create config directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(DIR_MODE);
            std::fs::set_permissions(dir, perms).map_err(|e| {
                Error::Storage(format!(
                    "Failed to set directory permissions on '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    fn write_atomic(&self, content: &str) -> Result<()> {
        self.ensure_parent_dir()?;

        let temp_path = self.path.with_extension("tmp");

        // On Unix the temp file is created 0600 so tokens are never
        // readable by other users, even briefly.
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(FILE_MODE)
                .open(&temp_path)
                .map_err(|e| {
                    Error::Storage(format!(
                        "Failed to create temp file '{}': {}",
                        temp_path.display(),
                        e
                    ))
                })?;
            file.write_all(content.as_bytes()).map_err(|e| {
                Error::Storage(format!(
                    "Failed to write temp file '{}': {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.sync_all().map_err(|e| {
                Error::Storage(format!(
                    "Failed to sync temp file '{}': {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        #[cfg(not(unix))]
        {
            std::fs::write(&temp_path, content).map_err(|e| {
                Error::Storage(format!(
                    "Failed to write temp file '{}': {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(Error::Storage(format!(
                "Failed to rename '{}' to '{}': {}",
                temp_path.display(),
                self.path.display(),
                e
            )));
        }

        debug!(path = %self.path.display(), "Config file written");
        Ok(())
    }
}

/// Render a TOML scalar as the string the rest of the crate expects.
fn scalar_to_string(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Integer(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::Boolean(b) => Ok(b.to_string()),
        other => Err(Error::Storage(format!(
            "Key '{}.{}' must be a scalar, found {}",
            SECTION,
            key,
            other.type_str()
        ))),
    }
}

impl ConfigStore for FileConfigStore {
    #[instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let document = self.read_document()?;
        let Some(section) = document.get(SECTION).and_then(Value::as_table) else {
            return Ok(None);
        };
        section
            .get(key)
            .map(|value| scalar_to_string(key, value))
            .transpose()
    }

    #[instrument(skip_all, fields(path = %self.path.display(), count = entries.len()))]
    fn update(&self, entries: &[(&str, String)]) -> Result<()> {
        self.modify_section(|section| {
            for (key, value) in entries {
                section.insert((*key).to_string(), Value::String(value.clone()));
            }
        })
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn remove(&self, keys: &[&str]) -> Result<()> {
        self.modify_section(|section| {
            for key in keys {
                section.remove(*key);
            }
        })
    }

    fn name(&self) -> &str {
        "file"
    }
}
