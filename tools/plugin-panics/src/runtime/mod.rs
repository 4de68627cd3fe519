use crate::errors::PanicsError;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> Result<String, PanicsError>;
    /// Buffered reader over raw bytes; callers decide how to treat bad UTF-8.
    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>, PanicsError>;
    fn write_string(&self, path: &Path, contents: &str) -> Result<(), PanicsError>;
    fn create_dir_all(&self, path: &Path) -> Result<(), PanicsError>;
}

pub trait Terminal: Send + Sync {
    fn write_line(&self, line: &str) -> Result<(), PanicsError>;
}

pub struct ProductionFileSystem;

impl FileSystem for ProductionFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PanicsError> {
        std::fs::read_to_string(path)
            .map_err(|e| PanicsError::Io(format!("{}: {e}", path.display())))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>, PanicsError> {
        let file = std::fs::File::open(path)
            .map_err(|e| PanicsError::Io(format!("{}: {e}", path.display())))?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), PanicsError> {
        std::fs::write(path, contents)
            .map_err(|e| PanicsError::Io(format!("{}: {e}", path.display())))
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), PanicsError> {
        std::fs::create_dir_all(path).map_err(|e| PanicsError::Io(e.to_string()))
    }
}

pub struct ProductionTerminal;

impl Terminal for ProductionTerminal {
    fn write_line(&self, line: &str) -> Result<(), PanicsError> {
        use std::io::Write;
        let mut out = std::io::stdout();
        writeln!(out, "{line}").map_err(|e| PanicsError::Io(e.to_string()))
    }
}

pub struct ProductionRuntime {
    pub file_system: Arc<dyn FileSystem>,
    pub terminal: Arc<dyn Terminal>,
}

impl ProductionRuntime {
    pub fn new() -> Self {
        Self {
            file_system: Arc::new(ProductionFileSystem),
            terminal: Arc::new(ProductionTerminal),
        }
    }
}

impl Default for ProductionRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone)]
pub struct FakeFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, Vec<u8>>>>,
    dirs: Arc<Mutex<Vec<PathBuf>>>,
    fail_next: Arc<Mutex<Option<PanicsError>>>,
}

impl FakeFileSystem {
    pub fn with_file(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let fs = Self::default();
        fs.write_bytes(path, contents.into().into_bytes());
        fs
    }

    /// Seeds a file with arbitrary bytes, including invalid UTF-8.
    pub fn write_bytes(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files
            .lock()
            .expect("files lock")
            .insert(path.into(), contents.into());
    }

    pub fn has_file(&self, path: &Path) -> bool {
        self.files.lock().expect("files lock").contains_key(path)
    }

    pub fn set_fail_next(&self, error: PanicsError) {
        *self.fail_next.lock().expect("fail lock") = Some(error);
    }

    pub fn created_dirs(&self) -> Vec<PathBuf> {
        self.dirs.lock().expect("dirs lock").clone()
    }

    fn read_bytes(&self, path: &Path) -> Result<Vec<u8>, PanicsError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .get(path)
            .cloned()
            .ok_or_else(|| PanicsError::Io(format!("missing file {}", path.display())))
    }

    fn maybe_fail(&self) -> Result<(), PanicsError> {
        if let Some(err) = self.fail_next.lock().expect("fail lock").take() {
            return Err(err);
        }
        Ok(())
    }
}

impl FileSystem for FakeFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String, PanicsError> {
        let bytes = self.read_bytes(path)?;
        String::from_utf8(bytes)
            .map_err(|e| PanicsError::Io(format!("{}: {e}", path.display())))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn BufRead + Send>, PanicsError> {
        let bytes = self.read_bytes(path)?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn write_string(&self, path: &Path, contents: &str) -> Result<(), PanicsError> {
        self.maybe_fail()?;
        self.files
            .lock()
            .expect("files lock")
            .insert(path.to_path_buf(), contents.as_bytes().to_vec());
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<(), PanicsError> {
        self.maybe_fail()?;
        self.dirs
            .lock()
            .expect("dirs lock")
            .push(path.to_path_buf());
        Ok(())
    }
}

#[derive(Default, Clone)]
pub struct FakeTerminal {
    writes: Arc<Mutex<Vec<String>>>,
}

impl FakeTerminal {
    pub fn written_lines(&self) -> Vec<String> {
        self.writes.lock().expect("writes lock").clone()
    }
}

impl Terminal for FakeTerminal {
    fn write_line(&self, line: &str) -> Result<(), PanicsError> {
        self.writes
            .lock()
            .expect("writes lock")
            .push(line.to_string());
        Ok(())
    }
}
