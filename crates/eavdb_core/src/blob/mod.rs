//! Chunked storage and streaming of large binary values.
//!
//! A large binary property is one `Binaries` row plus a run of
//! `BinaryChunks` rows, each holding `ChunkSize` bytes except the last.
//! The chunk size is recorded per value, so changing
//! [`Config::chunk_size`](crate::Config::chunk_size) never invalidates
//! values written earlier.
//!
//! [`BlobStream`] exposes one value through `std::io::{Read, Write, Seek}`.

pub(crate) mod chunks;
mod scratch;
mod stream;

pub use stream::BlobStream;
