pub mod context;

pub use context::{build_worker_context, WorkerContext};
