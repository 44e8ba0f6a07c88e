use crate::world::position::Position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One durable home row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeRecord {
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl HomeRecord {
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            x: position.x,
            y: position.y,
            z: position.z,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// Blocking access to the homes table, keyed by profile user id.
pub trait HomeBackend: Send + 'static {
    fn query(&mut self, user_id: u32) -> Result<Vec<HomeRecord>, String>;
    fn insert(&mut self, user_id: u32, record: &HomeRecord) -> Result<(), String>;
    /// Deletes the first record with `name`; deleting nothing is not an error.
    fn delete(&mut self, user_id: u32, name: &str) -> Result<(), String>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HomeFile {
    user_id: u32,
    #[serde(default)]
    homes: Vec<HomeRecord>,
}

/// One YAML file per user under `save/homes`.
#[derive(Debug, Clone)]
pub struct YamlHomeBackend {
    root: PathBuf,
}

impl YamlHomeBackend {
    pub fn from_root(root: &Path) -> Self {
        Self {
            root: root.join("save").join("homes"),
        }
    }

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn user_path(&self, user_id: u32) -> PathBuf {
        self.root.join(format!("{user_id}.yaml"))
    }

    fn read_file(&self, user_id: u32) -> Result<HomeFile, String> {
        let path = self.user_path(user_id);
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HomeFile {
                    user_id,
                    homes: Vec::new(),
                });
            }
            Err(err) => {
                return Err(format!("home file read failed for {}: {}", path.display(), err));
            }
        };
        let file: HomeFile = serde_yaml::from_str(&data)
            .map_err(|err| format!("home file parse failed for {}: {}", path.display(), err))?;
        if file.user_id != user_id {
            return Err(format!(
                "home file user id mismatch for {}: expected {}, got {}",
                path.display(),
                user_id,
                file.user_id
            ));
        }
        Ok(file)
    }

    fn write_file(&self, file: &HomeFile) -> Result<(), String> {
        fs::create_dir_all(&self.root).map_err(|err| {
            format!("home dir create failed for {}: {}", self.root.display(), err)
        })?;
        let path = self.user_path(file.user_id);
        let tmp_path = path.with_extension("yaml.tmp");
        let data = serde_yaml::to_string(file)
            .map_err(|err| format!("home file encode failed for {}: {}", path.display(), err))?;
        fs::write(&tmp_path, data).map_err(|err| {
            format!("home file write failed for {}: {}", tmp_path.display(), err)
        })?;
        fs::rename(&tmp_path, &path)
            .map_err(|err| format!("home file replace failed for {}: {}", path.display(), err))
    }
}

impl HomeBackend for YamlHomeBackend {
    fn query(&mut self, user_id: u32) -> Result<Vec<HomeRecord>, String> {
        Ok(self.read_file(user_id)?.homes)
    }

    fn insert(&mut self, user_id: u32, record: &HomeRecord) -> Result<(), String> {
        let mut file = self.read_file(user_id)?;
        file.homes.push(record.clone());
        self.write_file(&file)
    }

    fn delete(&mut self, user_id: u32, name: &str) -> Result<(), String> {
        let mut file = self.read_file(user_id)?;
        let Some(index) = file.homes.iter().position(|home| home.name == name) else {
            return Ok(());
        };
        file.homes.remove(index);
        self.write_file(&file)
    }
}

/// In-process table, used by the console `memory` mode and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryHomeBackend {
    rows: HashMap<u32, Vec<HomeRecord>>,
    fail_writes: bool,
}

impl MemoryHomeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(user_id: u32, rows: Vec<HomeRecord>) -> Self {
        let mut backend = Self::default();
        backend.rows.insert(user_id, rows);
        backend
    }

    /// Make every insert and delete fail, reads keep working.
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    pub fn rows(&self, user_id: u32) -> &[HomeRecord] {
        self.rows.get(&user_id).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl HomeBackend for MemoryHomeBackend {
    fn query(&mut self, user_id: u32) -> Result<Vec<HomeRecord>, String> {
        Ok(self.rows(user_id).to_vec())
    }

    fn insert(&mut self, user_id: u32, record: &HomeRecord) -> Result<(), String> {
        if self.fail_writes {
            return Err(format!("insert of home '{}' rejected", record.name));
        }
        self.rows.entry(user_id).or_default().push(record.clone());
        Ok(())
    }

    fn delete(&mut self, user_id: u32, name: &str) -> Result<(), String> {
        if self.fail_writes {
            return Err(format!("delete of home '{}' rejected", name));
        }
        if let Some(rows) = self.rows.get_mut(&user_id) {
            if let Some(index) = rows.iter().position(|row| row.name == name) {
                rows.remove(index);
            }
        }
        Ok(())
    }
}
