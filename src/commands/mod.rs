// Command handlers module
pub mod serve;

// Re-exports for cleaner imports
pub use serve::execute as serve;
