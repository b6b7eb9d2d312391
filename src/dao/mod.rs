/// Local JSON copy of the active match.
pub mod local_snapshot;
/// Live mirror and history storage for matches.
pub mod match_store;
/// Database model definitions.
pub mod models;
/// Read-only player directory.
pub mod players;
/// Storage abstraction layer for database operations.
pub mod storage;
