use std::{fs::File, io::{BufWriter, Write}, path::Path};

use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;

use located_error::LocatedError;

pub mod error;
pub use error::WriterError;

/// Field separator emitted when a pretty-printed `Display` line is rewritten
/// for file output.
pub const WRITER_SEPARATOR: &str = "\t";

lazy_static! {
    // ` - ` column separators of the pretty-print Display impls.
    static ref PRETTY_SEPARATOR: Regex = Regex::new(r"[ ]+-[ ]+").expect("hardcoded regex");
}

/// A generic line writer over either a file or stdout.
pub struct GenericWriter<'a> {
    source: BufWriter<Box<dyn Write + 'a>>,
}

impl<'a> GenericWriter<'a> {
    /// Open a writer on `path`, or on stdout when `path` is `None`.
    ///
    /// # Errors
    /// When the file cannot be created at `path`.
    pub fn new(path: Option<impl AsRef<Path>>) -> Result<GenericWriter<'a>> {
        use WriterError::IOError;
        Ok(GenericWriter { source: match path {
            Some(path) => {
                let file = File::create(path).map_err(IOError).loc("While creating output file")?;
                BufWriter::new(Box::new(file))
            }
            None => BufWriter::new(Box::new(std::io::stdout())),
        }})
    }

    /// Write one line per item, converting pretty-print ` - ` separators
    /// into the tabular separator.
    ///
    /// # Errors
    /// When any line fails to be written or the final flush fails.
    pub fn write_iter<T, I>(&mut self, iter: T) -> Result<()>
    where
        T: IntoIterator<Item = I>,
        I: std::fmt::Display,
    {
        for item in iter {
            let line = PRETTY_SEPARATOR.replace_all(&format!("{item}\n"), WRITER_SEPARATOR).into_owned();
            self.source.write_all(line.as_bytes())
                .map_err(WriterError::IOError)
                .loc("While writing contents into file")?;
        }
        self.source.flush().loc("While flushing buffer contents of Writer")
    }

    /// Write raw text verbatim (used by the prose report).
    ///
    /// # Errors
    /// When the write or the flush fails.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.source.write_all(text.as_bytes())
            .map_err(WriterError::IOError)
            .loc("While writing contents into file")?;
        self.source.flush().loc("While flushing buffer contents of Writer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn pretty_print_becomes_tabular() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.tsv");

        let mut writer = GenericWriter::new(Some(&path))?;
        writer.write_iter(["a   -   b - c", "1 - 2 - 3"])?;

        let written = fs::read_to_string(&path)?;
        assert_eq!(written, "a\tb\tc\n1\t2\t3\n");
        Ok(())
    }

    #[test]
    fn raw_text_is_untouched() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.txt");

        let mut writer = GenericWriter::new(Some(&path))?;
        writer.write_raw("kept - as - is\n")?;

        assert_eq!(fs::read_to_string(&path)?, "kept - as - is\n");
        Ok(())
    }
}
