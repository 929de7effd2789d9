//! Relational schema of the EAV layout.
//!
//! | Table | Holds |
//! |-------|-------|
//! | `Objects` | one header row per object (`ID`, `Type`, `Name`, `Stamp`) |
//! | `Properties` | scalar and small inline binary property values |
//! | `Binaries` | one row per large binary property value, with its chunk size |
//! | `BinaryChunks` | fixed-size chunks of a `Binaries` value |
//! | `Links` | directed edges between objects |
//!
//! Removal of an object's properties, binaries, chunks and links is left to
//! the `ON DELETE CASCADE` foreign keys; the object layer only deletes the
//! header row.

/// Header table name.
pub const OBJECTS: &str = "Objects";
/// Scalar property table name.
pub const PROPERTIES: &str = "Properties";
/// Binary property table name.
pub const BINARIES: &str = "Binaries";
/// Binary chunk table name.
pub const BINARY_CHUNKS: &str = "BinaryChunks";
/// Edge table name.
pub const LINKS: &str = "Links";

/// Idempotent DDL for the whole schema.
pub const DDL: &str = "
CREATE TABLE IF NOT EXISTS Objects (
    ID    INTEGER PRIMARY KEY AUTOINCREMENT,
    Type  TEXT    NOT NULL,
    Name  TEXT    NOT NULL DEFAULT '',
    Stamp INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS IX_Objects_Type ON Objects (Type);

CREATE TABLE IF NOT EXISTS Properties (
    ObjectID INTEGER NOT NULL REFERENCES Objects (ID) ON DELETE CASCADE,
    Name     TEXT    NOT NULL,
    Kind     INTEGER NOT NULL,
    Value,
    PRIMARY KEY (ObjectID, Name)
);
CREATE INDEX IF NOT EXISTS IX_Properties_Name_Value ON Properties (Name, Value);

CREATE TABLE IF NOT EXISTS Binaries (
    ID         INTEGER PRIMARY KEY AUTOINCREMENT,
    ObjectID   INTEGER NOT NULL REFERENCES Objects (ID) ON DELETE CASCADE,
    Name       TEXT    NOT NULL,
    Length     INTEGER NOT NULL DEFAULT 0,
    Generation INTEGER NOT NULL DEFAULT 0,
    ChunkSize  INTEGER NOT NULL DEFAULT 65536,
    UNIQUE (ObjectID, Name)
);

CREATE TABLE IF NOT EXISTS BinaryChunks (
    BinaryID INTEGER NOT NULL REFERENCES Binaries (ID) ON DELETE CASCADE,
    Seq      INTEGER NOT NULL,
    Data     BLOB    NOT NULL,
    PRIMARY KEY (BinaryID, Seq)
);

CREATE TABLE IF NOT EXISTS Links (
    ObjectID   INTEGER NOT NULL REFERENCES Objects (ID) ON DELETE CASCADE,
    TargetID   INTEGER NOT NULL REFERENCES Objects (ID) ON DELETE CASCADE,
    TargetType TEXT    NOT NULL,
    PRIMARY KEY (ObjectID, TargetID)
);
CREATE INDEX IF NOT EXISTS IX_Links_TargetID ON Links (TargetID);
";
