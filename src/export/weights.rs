//! Plain text weight files.
//!
//! One section per non-output layer, in topological order:
//!
//! ```text
//! layer 0 4 30
//! 0.1 -0.2 ...
//! ...
//! ```
//!
//! The header carries the layer index and the shape of the bias-augmented
//! matrix `[W ; b]` (`(n + 1) x m`); the rows that follow are that matrix in
//! row-major order, the bias row last. Floats use Rust's shortest round-trip
//! formatting, so a save followed by a load restores identical bits.

use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{FlagforgeError, Result};
use crate::network::Network;

const SECTION_TAG: &str = "layer";

/// Write every non-output layer's augmented weight matrix to `path`.
pub fn save_weights<P: AsRef<Path>>(network: &Network, path: P) -> Result<()> {
    let mut out = BufWriter::new(File::create(path.as_ref())?);
    let last = network.layers.len() - 1;

    for (index, layer) in network.layers.iter().take(last).enumerate() {
        let augmented = layer.augmented_weights()?;
        writeln!(out, "{} {} {} {}", SECTION_TAG, index, augmented.nrows(), augmented.ncols())?;
        for row in augmented.rows() {
            let line = row.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
            writeln!(out, "{}", line)?;
        }
    }

    out.flush()?;
    log::debug!("saved weights for {} layers to {}", last, path.as_ref().display());
    Ok(())
}

/// Read a weight file into `network`.
///
/// Fails with `DimensionMismatch` when the file's section count or any stored
/// shape differs from the destination, leaving the network untouched.
pub fn load_weights<P: AsRef<Path>>(network: &mut Network, path: P) -> Result<()> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let last = network.layers.len() - 1;
    let expected: Vec<(usize, usize)> = network
        .layers
        .iter()
        .take(last)
        .map(|layer| layer.augmented_shape().unwrap_or((0, 0)))
        .collect();
    let sections = parse_sections(&text, &expected)?;

    for (layer, matrix) in network.layers.iter_mut().zip(sections.iter()) {
        layer.set_augmented_weights(matrix)?;
    }

    log::debug!("loaded weights for {} layers from {}", last, path.as_ref().display());
    Ok(())
}

/// Parse every section, checking each header against `expected` before any
/// of its rows are read.
fn parse_sections(text: &str, expected: &[(usize, usize)]) -> Result<Vec<Array2<f32>>> {
    let mut sections = Vec::new();
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    while let Some(header) = lines.next() {
        let fields: Vec<&str> = header.split_whitespace().collect();
        if fields.len() != 4 || fields[0] != SECTION_TAG {
            return Err(FlagforgeError::Parse(format!("expected section header, found '{}'", header)));
        }

        let index: usize = fields[1].parse()?;
        if index != sections.len() {
            return Err(FlagforgeError::Parse(format!(
                "section {} out of order, expected {}",
                index,
                sections.len()
            )));
        }
        let rows: usize = fields[2].parse()?;
        let cols: usize = fields[3].parse()?;

        let (want_rows, want_cols) = *expected.get(index).ok_or_else(|| {
            FlagforgeError::dimension_mismatch(
                format!("{} weight sections", expected.len()),
                format!("section {}", index),
            )
        })?;
        if (rows, cols) != (want_rows, want_cols) {
            return Err(FlagforgeError::dimension_mismatch(
                format!("layer {} of shape {}x{}", index, want_rows, want_cols),
                format!("{}x{}", rows, cols),
            ));
        }

        let mut values = Vec::with_capacity(want_rows * want_cols);
        for r in 0..rows {
            let line = lines
                .next()
                .ok_or_else(|| FlagforgeError::Parse(format!("layer {} ends after {} of {} rows", index, r, rows)))?;
            let row = line
                .split_whitespace()
                .map(str::parse::<f32>)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            if row.len() != cols {
                return Err(FlagforgeError::dimension_mismatch(
                    format!("layer {} row {} with {} values", index, r, cols),
                    format!("{} values", row.len()),
                ));
            }
            values.extend(row);
        }

        let matrix = Array2::from_shape_vec((rows, cols), values)
            .map_err(|e| FlagforgeError::Parse(e.to_string()))?;
        sections.push(matrix);
    }

    if sections.len() != expected.len() {
        return Err(FlagforgeError::dimension_mismatch(
            format!("{} weight sections", expected.len()),
            format!("{} weight sections", sections.len()),
        ));
    }
    Ok(sections)
}
