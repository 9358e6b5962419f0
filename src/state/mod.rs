/// State management module
///
/// This module handles all application state, including:
/// - Database connections and queries (library.rs)
/// - Shared data structures (data.rs)
/// - Admin form sessions and their update loop (session.rs)

pub mod data;
pub mod library;
pub mod session;
