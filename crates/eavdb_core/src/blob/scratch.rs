//! Temporary file holding a value that is edited out of order.

use parking_lot::Mutex;
use std::fs::File;
use std::io;
use tempfile::NamedTempFile;

/// Owns at most one scratch file. Release is idempotent.
#[derive(Debug, Default)]
pub(crate) struct Scratch {
    file: Mutex<Option<NamedTempFile>>,
}

impl Scratch {
    pub(crate) fn is_active(&self) -> bool {
        self.file.lock().is_some()
    }

    /// Creates the scratch file and fills it with `contents`.
    pub(crate) fn activate(&self, contents: &[u8]) -> io::Result<()> {
        use std::io::Write;

        let mut file = NamedTempFile::new()?;
        file.write_all(contents)?;
        *self.file.lock() = Some(file);
        Ok(())
    }

    /// Runs `f` on the open scratch file.
    ///
    /// Fails with `NotFound` if no scratch file exists.
    pub(crate) fn with_file<R>(&self, f: impl FnOnce(&mut File) -> io::Result<R>) -> io::Result<R> {
        let mut guard = self.file.lock();
        match guard.as_mut() {
            Some(file) => f(file.as_file_mut()),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "no scratch file")),
        }
    }

    pub(crate) fn len(&self) -> io::Result<u64> {
        self.with_file(|file| Ok(file.metadata()?.len()))
    }

    /// Deletes the scratch file. Returns true if a file was deleted.
    pub(crate) fn release(&self) -> io::Result<bool> {
        match self.file.lock().take() {
            Some(file) => {
                file.close()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek, SeekFrom};

    #[test]
    fn activate_then_release_once() {
        let scratch = Scratch::default();
        assert!(!scratch.is_active());
        scratch.activate(b"hello").unwrap();
        assert!(scratch.is_active());
        assert_eq!(scratch.len().unwrap(), 5);

        let text = scratch
            .with_file(|f| {
                let mut s = String::new();
                f.seek(SeekFrom::Start(0))?;
                f.read_to_string(&mut s)?;
                Ok(s)
            })
            .unwrap();
        assert_eq!(text, "hello");

        assert!(scratch.release().unwrap());
        assert!(!scratch.release().unwrap());
        assert!(scratch.with_file(|_| Ok(())).is_err());
    }
}
