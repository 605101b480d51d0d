pub mod errors;
pub mod fs;

pub use errors::{GameError, GameResult};
pub use fs::{read_json_or_default, write_json_atomic};
