//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error, also an operation that makes no sense for the given nodes
pub const USAGE: i32 = 64;

/// Data format error: stored ranges break an invariant
pub const DATAERR: i32 = 65;

/// Cannot open input: tree or node does not exist
pub const NOINPUT: i32 = 66;

/// Internal software error
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Temporary failure, retry may succeed (lock contention)
pub const TEMPFAIL: i32 = 75;

/// Configuration error
pub const CONFIG: i32 = 78;
