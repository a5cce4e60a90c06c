//! Chunk-oriented read → process → write job.

use batchrun_core::{BatchError, BatchResult, ExecutionLogger, LogLevel};
use serde_json::{Map, Value as JsonValue};
use tracing::trace;

use crate::capability::{Component, ItemProcessor, ItemReader, ItemWriter, PassThrough};
use crate::job::{ExecutionScope, Job, JobOutcome};

/// Summary counter keys maintained by the pipeline.
pub mod counters {
    pub const READ: &str = "read";
    pub const PROCESSED: &str = "processed";
    pub const SKIPPED: &str = "skipped";
    pub const WRITTEN: &str = "written";
}

/// Drives a reader, an optional processor and a writer in bounded batches.
///
/// - Bring-up: reader, processor, writer are initialized in that order; the first
///   failing `initialize` aborts the run before any read.
/// - Loop: items are pulled lazily; at most `chunk_size` processed items are held
///   before the writer receives them in a single `write` call.
/// - Teardown: every component that came up is flushed exactly once, whether the
///   loop succeeded or not.
pub struct ChunkPipelineJob<R, W, P = PassThrough<<R as ItemReader>::Item>>
where
    R: ItemReader,
{
    reader: R,
    processor: P,
    writer: W,
    chunk_size: usize,
    has_processor: bool,
}

impl<R, W> ChunkPipelineJob<R, W>
where
    R: ItemReader,
    W: ItemWriter<Item = R::Item>,
{
    /// Pipeline without a processor: items go from reader to writer unchanged.
    pub fn new(reader: R, writer: W, chunk_size: usize) -> BatchResult<Self> {
        check_chunk_size(chunk_size)?;
        Ok(Self {
            reader,
            processor: PassThrough::default(),
            writer,
            chunk_size,
            has_processor: false,
        })
    }
}

impl<R, W, P> ChunkPipelineJob<R, W, P>
where
    R: ItemReader,
    P: ItemProcessor<Input = R::Item>,
    W: ItemWriter<Item = P::Output>,
{
    pub fn with_processor(reader: R, processor: P, writer: W, chunk_size: usize) -> BatchResult<Self> {
        check_chunk_size(chunk_size)?;
        Ok(Self {
            reader,
            processor,
            writer,
            chunk_size,
            has_processor: true,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_parts(self) -> (R, P, W) {
        (self.reader, self.processor, self.writer)
    }
}

fn check_chunk_size(chunk_size: usize) -> BatchResult<()> {
    if chunk_size == 0 {
        return Err(BatchError::configuration("chunk size must be at least 1"));
    }
    Ok(())
}

/// Which components finished bring-up and are owed a flush.
#[derive(Debug, Default)]
struct Up {
    reader: bool,
    processor: bool,
    writer: bool,
}

fn bind_logger(component: &mut dyn Component, logger: &ExecutionLogger) {
    if let Some(aware) = component.execution_aware() {
        aware.set_logger(logger.clone());
    }
}

fn bring_up(component: &mut dyn Component) -> BatchResult<()> {
    match component.initializable() {
        Some(init) => init.initialize(),
        None => Ok(()),
    }
}

fn flush(component: &mut dyn Component, role: &str, logger: &ExecutionLogger) -> BatchResult<()> {
    let Some(flushable) = component.flushable() else {
        return Ok(());
    };
    flushable.flush().inspect_err(|err| {
        let mut context = Map::new();
        context.insert("component".to_string(), JsonValue::from(role));
        context.insert("error".to_string(), JsonValue::from(err.to_string()));
        logger.log(LogLevel::Warn, "flush failed", context);
    })
}

impl<R, W, P> ChunkPipelineJob<R, W, P>
where
    R: ItemReader,
    P: ItemProcessor<Input = R::Item>,
    W: ItemWriter<Item = P::Output>,
{
    fn bring_up_all(&mut self, up: &mut Up) -> BatchResult<()> {
        bring_up(&mut self.reader)?;
        up.reader = true;
        bring_up(&mut self.processor)?;
        up.processor = true;
        bring_up(&mut self.writer)?;
        up.writer = true;
        Ok(())
    }

    /// Flush in bring-up order. Every component is attempted; the first error wins.
    fn flush_all(&mut self, up: &Up, logger: &ExecutionLogger) -> BatchResult<()> {
        let mut first_err = None;
        if up.reader {
            first_err = flush(&mut self.reader, "reader", logger).err();
        }
        if up.processor {
            if let Err(err) = flush(&mut self.processor, "processor", logger) {
                first_err.get_or_insert(err);
            }
        }
        if up.writer {
            if let Err(err) = flush(&mut self.writer, "writer", logger) {
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn pump(&mut self, scope: &mut ExecutionScope<'_>) -> BatchResult<()> {
        let chunk_size = self.chunk_size;
        let has_processor = self.has_processor;
        let processor = &mut self.processor;
        let writer = &mut self.writer;

        let mut batch = Vec::with_capacity(chunk_size);
        let mut chunks = 0usize;

        for item in self.reader.read()? {
            let item = item?;
            let summary = scope.summary_mut()?;
            summary.increment(counters::READ, 1)?;

            match processor.process(item)? {
                Some(out) => {
                    if has_processor {
                        summary.increment(counters::PROCESSED, 1)?;
                    }
                    batch.push(out);
                }
                None => {
                    summary.increment(counters::SKIPPED, 1)?;
                }
            }

            if batch.len() == chunk_size {
                let full = std::mem::replace(&mut batch, Vec::with_capacity(chunk_size));
                write_chunk(writer, full, scope)?;
                chunks += 1;
            }
        }

        if !batch.is_empty() {
            write_chunk(writer, batch, scope)?;
            chunks += 1;
        }

        trace!(chunks, "reader exhausted");
        Ok(())
    }
}

fn write_chunk<W: ItemWriter>(
    writer: &mut W,
    batch: Vec<W::Item>,
    scope: &mut ExecutionScope<'_>,
) -> BatchResult<()> {
    let len = batch.len();
    writer.write(batch)?;
    scope
        .summary_mut()?
        .increment(counters::WRITTEN, len as i64)?;
    trace!(size = len, "chunk written");
    Ok(())
}

impl<R, W, P> Job for ChunkPipelineJob<R, W, P>
where
    R: ItemReader,
    P: ItemProcessor<Input = R::Item>,
    W: ItemWriter<Item = P::Output>,
{
    fn run(&mut self, scope: &mut ExecutionScope<'_>) -> BatchResult<JobOutcome> {
        let logger = scope.logger();
        bind_logger(&mut self.reader, &logger);
        bind_logger(&mut self.processor, &logger);
        bind_logger(&mut self.writer, &logger);

        {
            let summary = scope.summary_mut()?;
            summary.set(counters::READ, 0);
            if self.has_processor {
                summary.set(counters::PROCESSED, 0);
            }
            summary.set(counters::SKIPPED, 0);
            summary.set(counters::WRITTEN, 0);
        }

        let mut up = Up::default();
        let result = self
            .bring_up_all(&mut up)
            .and_then(|()| self.pump(scope));
        let flushed = self.flush_all(&up, &logger);

        let result = match (result, flushed) {
            (Err(err), _) => Err(err),
            (Ok(()), flushed) => flushed,
        };
        result?;

        let summary = scope.execution().summary();
        logger.info(format!(
            "pipeline finished: read={} written={} skipped={}",
            summary.counter(counters::READ).unwrap_or(0),
            summary.counter(counters::WRITTEN).unwrap_or(0),
            summary.counter(counters::SKIPPED).unwrap_or(0),
        ));
        Ok(JobOutcome::Completed)
    }
}
