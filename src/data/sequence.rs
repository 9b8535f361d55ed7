//! Labeled sequence file format
//!
//! One position per line, sequences separated by blank lines:
//!
//! ```text
//! # label f1 f2 ...
//! 0 0.5 1.2
//! 1 -0.3 0.8
//!
//! 1 2.0 0.1
//! ```
//!
//! Labels are zero-based state indices. Every position carries the same
//! number of features.

use crate::core::{Result, SSVMError};
use crate::oracle::{LabeledSequence, SequenceOracle};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Sequences loaded from a labeled sequence file
#[derive(Debug, Clone)]
pub struct SequenceDataset {
    sequences: Vec<LabeledSequence>,
    n_features: usize,
}

impl SequenceDataset {
    /// Load a dataset from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SSVMError::IoError)?;
        let reader = BufReader::new(file);
        Self::from_reader(reader)
    }

    /// Load a dataset from a reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut sequences = Vec::new();
        let mut current = LabeledSequence::new(Vec::new(), Vec::new());
        let mut n_features: Option<usize> = None;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(SSVMError::IoError)?;
            let line = line.trim();

            if line.starts_with('#') {
                continue;
            }
            if line.is_empty() {
                if !current.is_empty() {
                    sequences.push(std::mem::replace(
                        &mut current,
                        LabeledSequence::new(Vec::new(), Vec::new()),
                    ));
                }
                continue;
            }

            let (label, features) = Self::parse_line(line).map_err(|e| {
                SSVMError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;

            match n_features {
                None => n_features = Some(features.len()),
                Some(expected) if expected != features.len() => {
                    return Err(SSVMError::ParseError(format!(
                        "Error parsing line {}: expected {} features, found {}",
                        line_num + 1,
                        expected,
                        features.len()
                    )));
                }
                Some(_) => {}
            }

            current.labels.push(label);
            current.features.push(features);
        }
        if !current.is_empty() {
            sequences.push(current);
        }

        let n_features = n_features.ok_or(SSVMError::EmptyDataset)?;
        Ok(Self {
            sequences,
            n_features,
        })
    }

    /// Parse `label f1 f2 ...`
    fn parse_line(line: &str) -> std::result::Result<(usize, Vec<f64>), String> {
        let mut parts = line.split_whitespace();
        let label_str = parts.next().ok_or_else(|| "Empty line".to_string())?;
        let label = label_str
            .parse::<usize>()
            .map_err(|_| format!("Invalid label: {label_str}"))?;

        let features = parts
            .map(|value| {
                value
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| format!("Invalid feature value: {value}"))
            })
            .collect::<std::result::Result<Vec<f64>, String>>()?;

        Ok((label, features))
    }

    /// Number of sequences
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Check if the dataset holds no sequence
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Number of features per position
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Total number of positions
    pub fn n_positions(&self) -> usize {
        self.sequences.iter().map(LabeledSequence::len).sum()
    }

    /// Smallest state count covering every label in the file
    pub fn n_states(&self) -> usize {
        self.sequences
            .iter()
            .flat_map(|seq| seq.labels.iter())
            .max()
            .map_or(0, |&label| label + 1)
    }

    /// The loaded sequences
    pub fn sequences(&self) -> &[LabeledSequence] {
        &self.sequences
    }

    /// Build a sequence oracle; `n_states` defaults to [`Self::n_states`]
    pub fn into_oracle(self, n_states: Option<usize>) -> Result<SequenceOracle> {
        let n_states = n_states.unwrap_or_else(|| self.n_states());
        SequenceOracle::with_features(self.sequences, n_states, self.n_features)
    }
}

/// Write label sequences, one label per line and a blank line after each sequence
pub fn write_label_sequences<W: Write>(writer: &mut W, sequences: &[Vec<usize>]) -> Result<()> {
    for labels in sequences {
        for label in labels {
            writeln!(writer, "{label}")?;
        }
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_sequences() {
        let data = "# two sequences\n0 1.0 0.5\n1 -1.0 0.2\n\n\n1 0.0 1.0\n";
        let dataset = SequenceDataset::from_reader(Cursor::new(data)).expect("Valid data");

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.n_features(), 2);
        assert_eq!(dataset.n_positions(), 3);
        assert_eq!(dataset.n_states(), 2);
        assert_eq!(dataset.sequences()[0].labels, vec![0, 1]);
        assert_eq!(dataset.sequences()[1].features, vec![vec![0.0, 1.0]]);
    }

    #[test]
    fn test_parse_errors_report_line() {
        let data = "0 1.0\n1 abc\n";
        let err = SequenceDataset::from_reader(Cursor::new(data)).unwrap_err();
        match err {
            SSVMError::ParseError(msg) => assert!(msg.contains("line 2")),
            other => panic!("Unexpected error: {other:?}"),
        }

        let data = "-1 1.0\n";
        assert!(matches!(
            SequenceDataset::from_reader(Cursor::new(data)),
            Err(SSVMError::ParseError(_))
        ));
    }

    #[test]
    fn test_inconsistent_widths() {
        let data = "0 1.0 2.0\n\n1 1.0\n";
        let err = SequenceDataset::from_reader(Cursor::new(data)).unwrap_err();
        match err {
            SSVMError::ParseError(msg) => assert!(msg.contains("line 3")),
            other => panic!("Unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let data = "# nothing here\n\n";
        assert!(matches!(
            SequenceDataset::from_reader(Cursor::new(data)),
            Err(SSVMError::EmptyDataset)
        ));
    }

    #[test]
    fn test_into_oracle() {
        let data = "0 1.0\n1 2.0\n\n0 3.0\n";
        let dataset = SequenceDataset::from_reader(Cursor::new(data)).expect("Valid data");
        let oracle = dataset.clone().into_oracle(None).expect("Valid oracle");
        assert_eq!(oracle.n_states(), 2);
        assert_eq!(oracle.n_features(), 1);

        let wider = dataset.clone().into_oracle(Some(3)).expect("Valid oracle");
        assert_eq!(wider.n_states(), 3);

        assert!(dataset.into_oracle(Some(1)).is_err());
    }

    #[test]
    fn test_write_label_sequences() {
        let mut out = Vec::new();
        write_label_sequences(&mut out, &[vec![0, 1], vec![2]]).expect("Write should succeed");
        assert_eq!(String::from_utf8(out).expect("utf8"), "0\n1\n\n2\n\n");
    }
}
