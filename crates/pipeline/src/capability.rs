//! Capability interfaces implemented by pipeline collaborators.
//!
//! Readers, processors and writers are all [`Component`]s. Optional capabilities
//! (initialization, flushing, access to the execution logger) are discovered
//! through the accessor methods on `Component`, which default to "not supported".

use core::marker::PhantomData;

use batchrun_core::{BatchResult, ExecutionLogger};

/// Lazy, finite, single-pass sequence of items. Restarting requires a new reader.
pub type ItemStream<'a, T> = Box<dyn Iterator<Item = BatchResult<T>> + 'a>;

/// One-time setup before the first read. Called at most once per run.
pub trait Initializable {
    fn initialize(&mut self) -> BatchResult<()>;
}

/// One-time teardown after the loop ends, on success or failure.
///
/// Only called when the component came up successfully.
pub trait Flushable {
    fn flush(&mut self) -> BatchResult<()>;
}

/// Receives the logger of the execution the component is about to serve.
///
/// Implementors keep the logger in an owned field and log through it.
pub trait ExecutionAware {
    fn set_logger(&mut self, logger: ExecutionLogger);
}

/// Common supertrait of readers, processors and writers.
pub trait Component {
    fn initializable(&mut self) -> Option<&mut dyn Initializable> {
        None
    }

    fn flushable(&mut self) -> Option<&mut dyn Flushable> {
        None
    }

    fn execution_aware(&mut self) -> Option<&mut dyn ExecutionAware> {
        None
    }
}

pub trait ItemReader: Component {
    type Item;

    fn read(&mut self) -> BatchResult<ItemStream<'_, Self::Item>>;
}

pub trait ItemProcessor: Component {
    type Input;
    type Output;

    /// Transform one item. `None` drops the item from the batch.
    fn process(&mut self, item: Self::Input) -> BatchResult<Option<Self::Output>>;
}

pub trait ItemWriter: Component {
    type Item;

    /// Write one chunk as a single unit.
    fn write(&mut self, batch: Vec<Self::Item>) -> BatchResult<()>;
}

/// Processor slot used when a pipeline has no processor.
#[derive(Debug)]
pub struct PassThrough<T>(PhantomData<fn(T) -> T>);

impl<T> Default for PassThrough<T> {
    fn default() -> Self {
        Self(PhantomData)
    }
}

impl<T> Component for PassThrough<T> {}

impl<T> ItemProcessor for PassThrough<T> {
    type Input = T;
    type Output = T;

    fn process(&mut self, item: T) -> BatchResult<Option<T>> {
        Ok(Some(item))
    }
}

/// Reader over any in-memory iterator of items.
///
/// Single pass: a second `read` yields nothing.
#[derive(Debug)]
pub struct IterReader<I> {
    source: Option<I>,
}

impl<I> IterReader<I> {
    pub fn new(source: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            source: Some(source.into_iter()),
        }
    }
}

impl<I> Component for IterReader<I> {}

impl<I: Iterator> ItemReader for IterReader<I> {
    type Item = I::Item;

    fn read(&mut self) -> BatchResult<ItemStream<'_, I::Item>> {
        match self.source.take() {
            Some(iter) => Ok(Box::new(iter.map(Ok))),
            None => Ok(Box::new(core::iter::empty())),
        }
    }
}

/// Processor backed by a closure.
pub struct FnProcessor<F, In, Out> {
    func: F,
    _marker: PhantomData<fn(In) -> Out>,
}

impl<F, In, Out> FnProcessor<F, In, Out>
where
    F: FnMut(In) -> BatchResult<Option<Out>>,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<F, In, Out> Component for FnProcessor<F, In, Out> {}

impl<F, In, Out> ItemProcessor for FnProcessor<F, In, Out>
where
    F: FnMut(In) -> BatchResult<Option<Out>>,
{
    type Input = In;
    type Output = Out;

    fn process(&mut self, item: In) -> BatchResult<Option<Out>> {
        (self.func)(item)
    }
}
