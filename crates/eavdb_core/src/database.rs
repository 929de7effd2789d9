//! Database facade.

use crate::blob::BlobStream;
use crate::collaborator::{HeaderFactory, IdentityCache, NoCache, ObjectFactory};
use crate::config::Config;
use crate::criteria::{Criteria, OrderBy};
use crate::error::{StoreError, StoreResult};
use crate::object::{store, Links, Properties, RetrieveResult, SaveResult};
use crate::search::{self, SearchResult};
use crate::transaction::TransactionManager;
use crate::types::ObjectHeader;
use eavdb_codec::BlobHandle;
use eavdb_storage::{Connection, SqliteConnection};
use std::path::Path;

/// The main database handle.
///
/// `Database` owns one physical connection and takes `&mut self` for every
/// operation, so two logical transactions never interleave on it.
/// Concurrent callers open separate `Database` values over the same store.
///
/// Each operation opens an implicit transaction bracket. Wrap several in
/// [`Database::begin`]/[`Database::commit`] (or [`Database::transaction`])
/// to make them atomic:
///
/// ```
/// use eavdb_core::{Database, ObjectHeader, Properties};
///
/// let mut db = Database::open_in_memory().unwrap();
/// let props = Properties::builder().added("City", "Oslo").unwrap().build();
///
/// let saved = db
///     .transaction(|db| db.save(&ObjectHeader::new("Customer", "Acme"), None, &props))
///     .unwrap();
/// assert!(saved.header.id > 0);
///
/// let fetched = db.retrieve(&ObjectHeader { stamp: Default::default(), ..saved.header }).unwrap();
/// assert_eq!(fetched.properties.value("City").and_then(|v| v.as_str()), Some("Oslo"));
/// ```
pub struct Database {
    config: Config,
    txn: TransactionManager,
    factory: Box<dyn ObjectFactory>,
    cache: Box<dyn IdentityCache>,
}

impl Database {
    /// Creates a database over a closed connection.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the configuration is unusable.
    pub fn new(conn: Box<dyn Connection>, config: Config) -> StoreResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            txn: TransactionManager::new(conn),
            factory: Box::new(HeaderFactory),
            cache: Box::new(NoCache),
        })
    }

    /// Opens a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the default configuration is rejected.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::new(Box::new(SqliteConnection::memory()), Config::default())
    }

    /// Opens a store file, creating it if missing.
    ///
    /// The file is touched lazily, on the first operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the default configuration is rejected.
    pub fn open_file(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_file_with_config(path, Config::default())
    }

    /// Opens a store file with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the configuration is unusable.
    pub fn open_file_with_config(path: impl AsRef<Path>, config: Config) -> StoreResult<Self> {
        Self::new(Box::new(SqliteConnection::file(path)), config)
    }

    /// Replaces the object factory used to materialize linked objects.
    #[must_use]
    pub fn with_factory(mut self, factory: impl ObjectFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    /// Replaces the identity cache consulted before the factory.
    #[must_use]
    pub fn with_cache(mut self, cache: impl IdentityCache + 'static) -> Self {
        self.cache = Box::new(cache);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the current transaction nesting depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.txn.depth()
    }

    /// Opens a transaction bracket.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the store cannot be reached.
    pub fn begin(&mut self) -> StoreResult<()> {
        self.txn.begin()
    }

    /// Closes a transaction bracket.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::commit`].
    pub fn commit(&mut self) -> StoreResult<()> {
        self.txn.commit()
    }

    /// Closes a transaction bracket and dooms the enclosing nest.
    ///
    /// # Errors
    ///
    /// See [`TransactionManager::rollback`].
    pub fn rollback(&mut self) -> StoreResult<()> {
        self.txn.rollback()
    }

    /// Runs `f` inside a bracket, committing on `Ok` and rolling back on
    /// `Err`.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or of the bracket itself.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&mut Self) -> StoreResult<T>) -> StoreResult<T> {
        self.begin()?;
        match f(self) {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.rollback();
                Err(e)
            }
        }
    }

    /// Saves an object.
    ///
    /// `links` is `None` when the link set is not dirty.
    ///
    /// # Errors
    ///
    /// - `Conflict` if the store holds a newer version
    /// - `NotFound` if a saved object's row is gone
    /// - `InvalidArgument` for an empty type name or an unsaved link target
    pub fn save(&mut self, header: &ObjectHeader, links: Option<&Links>, properties: &Properties) -> StoreResult<SaveResult> {
        let config = &self.config;
        self.txn
            .run(|conn| store::save(conn, config, header, links, properties))
    }

    /// Retrieves an object.
    ///
    /// Returns only the refreshed header when the caller's stamp is current.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the object does not exist.
    pub fn retrieve(&mut self, header: &ObjectHeader) -> StoreResult<RetrieveResult> {
        let config = &self.config;
        let factory = self.factory.as_ref();
        let cache = self.cache.as_ref();
        self.txn
            .run(|conn| store::retrieve(conn, config, factory, cache, header))
    }

    /// Deletes an object with its properties, binaries and links.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` or `NotFound` as for [`Database::save`].
    pub fn delete(&mut self, header: &ObjectHeader) -> StoreResult<()> {
        self.txn.run(|conn| store::delete(conn, header))
    }

    /// Returns true if an object with `id` exists.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the store cannot be queried.
    pub fn exists(&mut self, id: i64) -> StoreResult<bool> {
        self.txn.run(|conn| store::exists(conn, id))
    }

    /// Reads the stored header of `id`.
    ///
    /// # Errors
    ///
    /// Returns `Backend` if the store cannot be queried.
    pub fn header(&mut self, id: i64) -> StoreResult<Option<ObjectHeader>> {
        self.txn.run(|conn| store::read_header(conn, id))
    }

    /// Finds objects of `type_name` matching `criteria`.
    ///
    /// The count and the page run in one transaction.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a negative window or an empty type name
    /// - `InvalidCriteria` if the tree cannot be compiled; nothing is issued
    pub fn search(
        &mut self,
        type_name: &str,
        criteria: Option<&Criteria>,
        order: Option<&OrderBy>,
        skip: i64,
        take: i64,
    ) -> StoreResult<SearchResult> {
        let query = search::prepare(type_name, criteria, order, skip, take, self.config.timestamp_precision)?;
        self.txn.run(|conn| search::execute(conn, &query, skip, take))
    }

    /// Opens a stream over a stored binary value.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the handle does not resolve.
    pub fn open_blob(&mut self, handle: BlobHandle) -> StoreResult<BlobStream<'_>> {
        let chunk_size = self.config.chunk_size;
        BlobStream::open(&mut self.txn, handle, chunk_size)
    }

    /// Starts writing the binary property `name` of a saved object.
    ///
    /// An existing value is replaced when the stream is first written.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an unsaved header or an empty name and
    /// `NotFound` if the object does not exist.
    pub fn create_blob(&mut self, header: &ObjectHeader, name: &str) -> StoreResult<BlobStream<'_>> {
        if header.is_new() {
            return Err(StoreError::invalid_argument("object must be saved before streaming"));
        }
        if name.is_empty() {
            return Err(StoreError::invalid_argument("property name must not be empty"));
        }
        let id = header.id;
        if !self.txn.run(|conn| store::exists(conn, id))? {
            return Err(StoreError::not_found(format!("object {id}")));
        }
        let chunk_size = self.config.chunk_size;
        BlobStream::create(&mut self.txn, id, name, chunk_size)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("txn", &self.txn)
            .finish_non_exhaustive()
    }
}
