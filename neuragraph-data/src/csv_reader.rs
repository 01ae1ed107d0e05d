use neuragraph_core::{block_map, BlockMap, BlockRef, NeuraGraphError, Op, TensorBlock, Volume};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::cell::RefCell;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

const DELIMITER: char = ',';

/// Position of a [`CsvReader`] in its current pass over the file.
struct Cursor {
    order: Vec<usize>,
    position: usize,
    rng: Option<StdRng>,
}

impl Cursor {
    fn new(lines: usize, rng: Option<StdRng>) -> Self {
        let mut cursor = Cursor {
            order: (0..lines).collect(),
            position: 0,
            rng,
        };
        cursor.shuffle();
        cursor
    }

    fn shuffle(&mut self) {
        if let Some(rng) = self.rng.as_mut() {
            self.order.shuffle(rng);
        }
    }

    /// Index of the line to load next; starts a new pass at the end.
    fn advance(&mut self) -> (usize, bool) {
        let wrapped = self.position == self.order.len();
        if wrapped {
            self.position = 0;
            self.shuffle();
        }
        let line = self.order[self.position];
        self.position += 1;
        (line, wrapped)
    }
}

/// Computation node reading numeric records from a comma-separated file.
///
/// Every line of the file holds the same number `K` of `f32` records; the
/// node owns one output block `"<name>_out"` of shape `(1, 1, K)`. Each
/// `forward()` loads the next line into it and starts over from the first
/// line once the file is exhausted. The reader has no inputs, so `backward()`
/// does nothing.
///
/// The whole file is validated and loaded at construction.
pub struct CsvReader {
    name: String,
    path: PathBuf,
    lines: Vec<Vec<f32>>,
    output: BlockRef,
    cursor: RefCell<Cursor>,
}

impl CsvReader {
    /// Creates a reader loading the lines in file order.
    ///
    /// # Arguments
    /// * `name` - Name of the node.
    /// * `path` - Path of the CSV file.
    ///
    /// # Errors
    /// Returns `NeuraGraphError::Input` if the file cannot be read, is empty,
    /// has lines with differing record counts or a record that is not a
    /// number.
    pub fn new(name: &str, path: impl AsRef<Path>) -> Result<Self, NeuraGraphError> {
        CsvReader::build(name, path.as_ref(), None)
    }

    /// Creates a reader visiting the lines in a new random order on every
    /// pass, drawn from an RNG seeded with `seed`.
    ///
    /// # Errors
    /// Same as [`CsvReader::new`].
    pub fn shuffled(name: &str, path: impl AsRef<Path>, seed: u64) -> Result<Self, NeuraGraphError> {
        CsvReader::build(name, path.as_ref(), Some(StdRng::seed_from_u64(seed)))
    }

    fn build(name: &str, path: &Path, rng: Option<StdRng>) -> Result<Self, NeuraGraphError> {
        let text = fs::read_to_string(path).map_err(|e| {
            NeuraGraphError::Input(format!("cannot read csv file '{}': {}", path.display(), e))
        })?;
        let lines = parse_lines(&text)
            .map_err(|msg| NeuraGraphError::Input(format!("csv file '{}': {}", path.display(), msg)))?;
        let records = lines[0].len();
        log::debug!(
            "CsvReader '{}': {} lines of {} records from '{}'",
            name,
            lines.len(),
            records,
            path.display()
        );
        Ok(CsvReader {
            name: name.to_string(),
            path: path.to_path_buf(),
            output: TensorBlock::new(format!("{}_out", name), 1, 1, records),
            cursor: RefCell::new(Cursor::new(lines.len(), rng)),
            lines,
        })
    }

    pub fn output(&self) -> &BlockRef {
        &self.output
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of data lines in the file.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Number of records on every line.
    pub fn record_count(&self) -> usize {
        self.output.len()
    }
}

/// Parses every non-empty line into a vector of records.
fn parse_lines(text: &str) -> Result<Vec<Vec<f32>>, String> {
    let mut lines: Vec<Vec<f32>> = Vec::new();
    for (number, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            // a trailing blank line ends the data
            if text.lines().skip(number).all(|l| l.trim().is_empty()) {
                break;
            }
            return Err(format!("line {} is empty", number + 1));
        }
        let records = line
            .split(DELIMITER)
            .map(|record| {
                record.trim().parse::<f32>().map_err(|_| {
                    format!("line {}: '{}' is not a number", number + 1, record.trim())
                })
            })
            .collect::<Result<Vec<f32>, String>>()?;
        if let Some(first) = lines.first() {
            if first.len() != records.len() {
                return Err(format!(
                    "line {} has {} records, expected {}",
                    number + 1,
                    records.len(),
                    first.len()
                ));
            }
        }
        lines.push(records);
    }
    if lines.is_empty() {
        return Err("file holds no data".to_string());
    }
    Ok(lines)
}

impl Op for CsvReader {
    fn name(&self) -> &str {
        &self.name
    }

    fn forward(&self) -> Result<(), NeuraGraphError> {
        let (line, wrapped) = self.cursor.borrow_mut().advance();
        if wrapped {
            log::debug!("CsvReader '{}': end of '{}', starting over", self.name, self.path.display());
        }
        let value = Volume::from_vec([1, 1, self.record_count()], self.lines[line].clone())?;
        self.output.set_value(&value)
    }

    fn backward(&self) -> Result<(), NeuraGraphError> {
        Ok(())
    }

    fn inputs(&self) -> BlockMap {
        BlockMap::new()
    }

    fn outputs(&self) -> BlockMap {
        block_map([&self.output])
    }
}

impl fmt::Debug for CsvReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvReader")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("lines", &self.lines.len())
            .field("records", &self.record_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "csv_reader_test.rs"]
mod tests;
