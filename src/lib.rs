pub mod cli;
pub mod disk;
pub mod fs;
pub mod ops;
pub mod shell;
pub mod utils;

pub use fs::{FileSystem, FileSystemError, Result};
pub use ops::Operations;
