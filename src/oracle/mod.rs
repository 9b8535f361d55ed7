//! Structured oracle implementations

pub mod multiclass;
pub mod sequence;

pub use self::multiclass::MulticlassOracle;
pub use self::sequence::{hamming_loss, LabeledSequence, SequenceOracle};
