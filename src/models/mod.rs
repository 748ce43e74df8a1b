pub mod batch_queue;
pub mod drawing_result;
pub mod job;
pub mod loaders;

pub use batch_queue::BatchQueue;
pub use drawing_result::{DrawingResult, ERROR_STATUS};
pub use job::BatchJob;
pub use loaders::{collect_drawings, load_job, scan_drawing_folder};
