//! Processor module for the content migrator.
//!
//! Maps source records and block trees onto destination components and
//! converts markup into the shapes the destination field types expect.

pub mod blocks;
pub mod mapper;
pub mod markup;
pub mod richtext;

pub use blocks::{BlockMapping, BlockRegistry, BlockTransformer};
pub use mapper::FieldMapper;
