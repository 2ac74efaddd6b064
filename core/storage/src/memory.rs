//! In-memory target for testing.

use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use crate::target::{Staging, Target};
use cryptoshred_common::{Error, Result};

type SharedContent = Arc<Mutex<Option<Vec<u8>>>>;

/// An in-memory target.
///
/// Never staging-capable, so it exercises the in-place overwrite path
/// the way an opaque content handle would. All data is lost on drop.
pub struct MemoryTarget {
    label: String,
    content: SharedContent,
}

impl MemoryTarget {
    /// Create a target holding the given initial content.
    pub fn new(label: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            content: Arc::new(Mutex::new(Some(content))),
        }
    }

    /// Snapshot of the current content, or `None` after deletion.
    pub fn content(&self) -> Option<Vec<u8>> {
        self.content.lock().unwrap().clone()
    }
}

impl Target for MemoryTarget {
    fn display_name(&self) -> String {
        self.label.clone()
    }

    fn size(&self) -> Result<u64> {
        match self.content.lock().unwrap().as_ref() {
            Some(data) => Ok(data.len() as u64),
            None => Err(Error::NotFound(format!("target deleted: {}", self.label))),
        }
    }

    fn open_read(&self) -> Result<Box<dyn Read + Send>> {
        match self.content.lock().unwrap().as_ref() {
            Some(data) => Ok(Box::new(Cursor::new(data.clone()))),
            None => Err(Error::NotFound(format!("target deleted: {}", self.label))),
        }
    }

    fn open_write(&self, truncate: bool) -> Result<Box<dyn Write + Send>> {
        let guard = self.content.lock().unwrap();
        let base = match guard.as_ref() {
            Some(data) if !truncate => data.clone(),
            Some(_) => Vec::new(),
            None => return Err(Error::NotFound(format!("target deleted: {}", self.label))),
        };
        Ok(Box::new(MemoryWriter {
            content: Arc::clone(&self.content),
            base,
            buf: Vec::new(),
        }))
    }

    fn delete(&self) -> Result<()> {
        let mut guard = self.content.lock().unwrap();
        if guard.is_none() {
            return Err(Error::NotFound(format!("target deleted: {}", self.label)));
        }
        *guard = None;
        Ok(())
    }

    fn begin_staging(&self) -> Result<Option<Box<dyn Staging>>> {
        Ok(None)
    }
}

/// Writer that commits accumulated bytes back into the shared content.
///
/// Commit happens on flush and again on drop; both are idempotent since
/// the full output is rebuilt from the captured base each time.
struct MemoryWriter {
    content: SharedContent,
    base: Vec<u8>,
    buf: Vec<u8>,
}

impl MemoryWriter {
    fn commit(&self) {
        let mut out = self.base.clone();
        out.extend_from_slice(&self.buf);
        *self.content.lock().unwrap() = Some(out);
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.commit();
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        self.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_truncate() {
        let target = MemoryTarget::new("mem", b"before".to_vec());
        assert_eq!(target.size().unwrap(), 6);

        let mut writer = target.open_write(true).unwrap();
        writer.write_all(b"after").unwrap();
        drop(writer);

        let mut content = Vec::new();
        target.open_read().unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, b"after");
    }

    #[test]
    fn test_delete_makes_target_unavailable() {
        let target = MemoryTarget::new("mem", b"data".to_vec());
        target.delete().unwrap();

        assert!(matches!(target.size(), Err(Error::NotFound(_))));
        assert!(matches!(target.delete(), Err(Error::NotFound(_))));
        assert_eq!(target.content(), None);
    }

    #[test]
    fn test_never_staging_capable() {
        let target = MemoryTarget::new("mem", Vec::new());
        assert!(target.begin_staging().unwrap().is_none());
    }
}
