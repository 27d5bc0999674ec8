pub mod chat;
pub mod resolve;
pub mod run;
pub mod scan;

// Re-export command functions for convenience
pub use resolve::resolve;
pub use run::run;
pub use scan::scan;
