//! Seekable stream over one stored binary value.

use crate::blob::chunks::{self, BlobRow};
use crate::blob::scratch::Scratch;
use crate::error::{StoreError, StoreResult};
use crate::object::store;
use crate::transaction::TransactionManager;
use eavdb_codec::BlobHandle;
use std::io::{self, Read, Seek, SeekFrom, Write};
use tracing::{debug, warn};

enum Target {
    /// No row exists yet; the first write creates it.
    Pending { object_id: i64, name: String },
    /// Row exists. `replace` clears it on the first write.
    Row { row: BlobRow, replace: bool },
}

/// Read/write access to a binary value stored out of line.
///
/// Appends go straight to the store. Writing anywhere other than the end
/// copies the value into a scratch file; [`BlobStream::flush`] writes the
/// scratch back as a full replacement. Dropping the stream flushes too,
/// logging any failure; call [`BlobStream::release`] first to discard
/// pending edits instead.
///
/// Every round trip to the store runs in its own transaction bracket, so
/// an enclosing [`Database::begin`](crate::Database::begin) makes a whole
/// session atomic.
pub struct BlobStream<'db> {
    txn: &'db mut TransactionManager,
    target: Target,
    chunk_size: usize,
    position: u64,
    /// Length known locally after this handle modified the value.
    local_len: Option<u64>,
    scratch: Scratch,
    unflushed: bool,
}

impl<'db> BlobStream<'db> {
    /// Opens an existing value.
    pub(crate) fn open(txn: &'db mut TransactionManager, handle: BlobHandle, chunk_size: usize) -> StoreResult<Self> {
        let row = txn.run(|conn| chunks::load(conn, handle.id))?;
        Ok(Self::with_target(txn, Target::Row { row, replace: false }, chunk_size, None))
    }

    /// Starts a new value for an object property, replacing any previous one
    /// on the first write.
    pub(crate) fn create(
        txn: &'db mut TransactionManager,
        object_id: i64,
        name: &str,
        chunk_size: usize,
    ) -> StoreResult<Self> {
        let existing = txn.run(|conn| chunks::find(conn, object_id, name))?;
        let target = match existing {
            Some(row) => Target::Row { row, replace: true },
            None => Target::Pending {
                object_id,
                name: name.to_string(),
            },
        };
        Ok(Self::with_target(txn, target, chunk_size, Some(0)))
    }

    fn with_target(txn: &'db mut TransactionManager, target: Target, chunk_size: usize, local_len: Option<u64>) -> Self {
        Self {
            txn,
            target,
            chunk_size,
            position: 0,
            local_len,
            scratch: Scratch::default(),
            unflushed: false,
        }
    }

    /// Returns the handle of the backing value, once it exists.
    #[must_use]
    pub fn handle(&self) -> Option<BlobHandle> {
        match &self.target {
            Target::Row { row, .. } => {
                let len = self.local_len.unwrap_or(row.length);
                Some(BlobHandle::new(row.id, i64::try_from(len).unwrap_or(i64::MAX)))
            }
            Target::Pending { .. } => None,
        }
    }

    /// Returns the current position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the value's length.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub fn len(&mut self) -> StoreResult<u64> {
        if self.scratch.is_active() {
            return Ok(self.scratch.len()?);
        }
        if let Some(len) = self.local_len {
            return Ok(len);
        }
        match &self.target {
            Target::Pending { .. } => Ok(0),
            Target::Row { row, .. } => {
                let id = row.id;
                let fresh = self.txn.run(|conn| chunks::load(conn, id))?;
                Ok(fresh.length)
            }
        }
    }

    /// Returns true if the value holds no bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub fn is_empty(&mut self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Reads up to `buf.len()` bytes at `position` without moving the
    /// stream position.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the scratch file cannot be read.
    pub fn read_at(&mut self, position: u64, buf: &mut [u8]) -> StoreResult<usize> {
        if self.scratch.is_active() {
            let n = self.scratch.with_file(|file| {
                file.seek(SeekFrom::Start(position))?;
                read_full(file, buf)
            })?;
            return Ok(n);
        }
        let Target::Row { row, replace } = &mut self.target else {
            return Ok(0);
        };
        if *replace {
            return Ok(0);
        }
        let id = row.id;
        let current = self.txn.run(|conn| {
            let current = chunks::load(conn, id)?;
            let n = chunks::read_at(conn, &current, position, buf)?;
            Ok((current, n))
        })?;
        *row = current.0;
        Ok(current.1)
    }

    /// Appends `data` at the current position, which must be the end.
    fn append(&mut self, data: &[u8]) -> StoreResult<()> {
        let chunk_size = self.chunk_size;
        let target = &mut self.target;
        let new_row = self.txn.run(|conn| match target {
            Target::Pending { object_id, name } => {
                store::delete_scalar(conn, *object_id, name)?;
                let mut row = chunks::create(conn, *object_id, name, chunk_size)?;
                chunks::append(conn, &mut row, data)?;
                Ok(Some(row))
            }
            Target::Row { row, replace } => {
                if *replace {
                    store::delete_scalar(conn, row.object_id, &row.name)?;
                    chunks::truncate(conn, row, chunk_size)?;
                } else {
                    *row = chunks::load(conn, row.id)?;
                }
                chunks::append(conn, row, data)?;
                Ok(None)
            }
        })?;
        if let Some(row) = new_row {
            self.target = Target::Row { row, replace: false };
        }
        if let Target::Row { row, replace } = &mut self.target {
            *replace = false;
            self.local_len = Some(row.length);
            debug!(id = row.id, length = row.length, "appended to binary value");
        }
        self.position += data.len() as u64;
        Ok(())
    }

    /// Moves the value into the scratch file.
    fn enter_scratch(&mut self) -> StoreResult<()> {
        let contents = match &self.target {
            Target::Row { row, replace: false } => {
                let id = row.id;
                self.txn.run(|conn| {
                    let current = chunks::load(conn, id)?;
                    chunks::read_all(conn, &current)
                })?
            }
            _ => Vec::new(),
        };
        self.scratch.activate(&contents)?;
        debug!(length = contents.len(), "binary value moved to scratch file");
        Ok(())
    }

    fn write_scratch(&mut self, data: &[u8]) -> StoreResult<()> {
        let position = self.position;
        self.scratch.with_file(|file| {
            file.seek(SeekFrom::Start(position))?;
            file.write_all(data)
        })?;
        self.position += data.len() as u64;
        self.unflushed = true;
        Ok(())
    }

    /// Writes `data` at the current position.
    ///
    /// # Errors
    ///
    /// Returns an error if the store or the scratch file cannot be written.
    pub fn write_bytes(&mut self, data: &[u8]) -> StoreResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        if !self.scratch.is_active() {
            if self.position == self.len()? {
                return self.append(data);
            }
            self.enter_scratch()?;
        }
        self.write_scratch(data)
    }

    /// Writes the scratch file back as a full replacement of the value.
    ///
    /// Does nothing unless the stream holds unflushed out-of-order edits.
    ///
    /// # Errors
    ///
    /// Returns an error if the scratch file cannot be read or the store
    /// cannot be written.
    pub fn flush_to_store(&mut self) -> StoreResult<()> {
        if !self.scratch.is_active() {
            return Ok(());
        }
        if self.unflushed {
            let contents = self.scratch.with_file(|file| {
                let mut contents = Vec::new();
                file.seek(SeekFrom::Start(0))?;
                file.read_to_end(&mut contents)?;
                Ok(contents)
            })?;
            let chunk_size = self.chunk_size;
            let (object_id, name) = match &self.target {
                Target::Pending { object_id, name } => (*object_id, name.clone()),
                Target::Row { row, .. } => (row.object_id, row.name.clone()),
            };
            let handle = self.txn.run(|conn| {
                store::delete_scalar(conn, object_id, &name)?;
                chunks::write_all(conn, object_id, &name, chunk_size, &contents)
            })?;
            let row = self.txn.run(|conn| chunks::load(conn, handle.id))?;
            self.local_len = Some(row.length);
            self.target = Target::Row { row, replace: false };
            self.unflushed = false;
            debug!(id = handle.id, length = handle.length, "scratch file written back");
        }
        self.release()
    }

    /// Deletes the scratch file, discarding unflushed edits. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be removed.
    pub fn release(&mut self) -> StoreResult<()> {
        self.unflushed = false;
        self.scratch.release()?;
        Ok(())
    }

    /// Flushes and releases the stream, returning the final handle.
    ///
    /// # Errors
    ///
    /// Returns the error of [`BlobStream::flush_to_store`].
    pub fn close(mut self) -> StoreResult<Option<BlobHandle>> {
        self.flush_to_store()?;
        Ok(self.handle())
    }
}

fn read_full(file: &mut std::fs::File, buf: &mut [u8]) -> io::Result<usize> {
    let mut done = 0;
    while done < buf.len() {
        match file.read(&mut buf[done..])? {
            0 => break,
            n => done += n,
        }
    }
    Ok(done)
}

fn to_io(err: StoreError) -> io::Error {
    match err {
        StoreError::Io(e) => e,
        StoreError::NotFound { .. } => io::Error::new(io::ErrorKind::NotFound, err),
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}

impl Read for BlobStream<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.read_at(self.position, buf).map_err(to_io)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl Write for BlobStream<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(to_io)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_to_store().map_err(to_io)
    }
}

impl Seek for BlobStream<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, offset) = match pos {
            SeekFrom::Start(n) => {
                self.position = n;
                return Ok(n);
            }
            SeekFrom::Current(delta) => (self.position, delta),
            SeekFrom::End(delta) => (self.len().map_err(to_io)?, delta),
        };
        let next = base
            .checked_add_signed(offset)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "seek before start of value"))?;
        self.position = next;
        Ok(next)
    }
}

impl Drop for BlobStream<'_> {
    fn drop(&mut self) {
        if self.unflushed {
            if let Err(e) = self.flush_to_store() {
                warn!(error = %e, "binary stream dropped with edits that could not be written back");
            }
        }
        if let Err(e) = self.scratch.release() {
            warn!(error = %e, "failed to delete scratch file");
        }
    }
}

impl std::fmt::Debug for BlobStream<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStream")
            .field("handle", &self.handle())
            .field("position", &self.position)
            .field("scratch", &self.scratch.is_active())
            .finish_non_exhaustive()
    }
}
