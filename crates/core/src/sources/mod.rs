pub mod traits;

// Adapter implementations
pub mod json_lines;
pub mod memory;
