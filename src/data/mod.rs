//! Data loading
//!
//! Readers for the on-disk formats the command line tool accepts.

pub mod sequence;

pub use self::sequence::{write_label_sequences, SequenceDataset};
