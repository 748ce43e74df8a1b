pub mod toml_loader;

pub use toml_loader::{collect_drawings, load_job, scan_drawing_folder};
