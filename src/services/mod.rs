pub mod buffered_logger;

pub use buffered_logger::{log_file_path, BufferedLogger};
