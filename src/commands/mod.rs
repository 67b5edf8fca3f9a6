// Command handlers module
pub mod config;
pub mod notify;
pub mod run;

// Re-exports for cleaner imports
pub use config::execute as config;
pub use notify::execute as notify;
pub use run::execute as run;
