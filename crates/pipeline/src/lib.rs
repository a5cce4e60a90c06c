//! `batchrun-pipeline`: jobs and the chunk-oriented processing loop.
//!
//! - [`Job`] / [`run_job`]: job logic and the lifecycle driver around it
//! - capability traits consumed by the pipeline (reader, processor, writer, ...)
//! - [`ChunkPipelineJob`]: bounded-memory read → process → write

pub mod capability;
pub mod chunk;
pub mod job;

pub use capability::{
    Component, ExecutionAware, Flushable, FnProcessor, Initializable, ItemProcessor, ItemReader,
    ItemStream, ItemWriter, IterReader, PassThrough,
};
pub use chunk::{ChunkPipelineJob, counters};
pub use job::{ExecutionScope, Job, JobOutcome, run_job};
