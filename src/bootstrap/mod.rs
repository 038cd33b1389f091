//! Process bootstrap helpers used by `main` before the server starts.

pub mod logger;
