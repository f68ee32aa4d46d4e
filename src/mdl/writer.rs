//! Indented block writer with declared-count checking.

use crate::error::{MdlError, Result};
use std::fmt::{Display, Write};

#[derive(Debug)]
struct Block {
    header: String,
    /// Count stated in the header, checked against emitted children on close
    declared: Option<usize>,
    emitted: usize,
}

/// Builds MDL text one line at a time. Blocks opened with a declared count
/// must receive exactly that many children before they are closed.
#[derive(Debug, Default)]
pub struct MdlWriter {
    out: String,
    stack: Vec<Block>,
}

impl MdlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn indent(&mut self) {
        for _ in 0..self.stack.len() {
            self.out.push('\t');
        }
    }

    fn count_child(&mut self) {
        if let Some(parent) = self.stack.last_mut() {
            parent.emitted += 1;
        }
    }

    /// Writes one line at the current depth.
    pub fn line(&mut self, text: impl Display) -> Result<()> {
        self.indent();
        writeln!(self.out, "{text}")?;
        Ok(())
    }

    /// `Name value,`
    pub fn field(&mut self, name: &str, value: impl Display) -> Result<()> {
        self.line(format_args!("{name} {value},"))
    }

    /// `Name,`
    pub fn flag(&mut self, name: &str) -> Result<()> {
        self.line(format_args!("{name},"))
    }

    /// A line that counts as one child of the enclosing counted block.
    pub fn item(&mut self, text: impl Display) -> Result<()> {
        self.line(text)?;
        self.count_child();
        Ok(())
    }

    /// Opens `header {`.
    pub fn open(&mut self, header: impl Display) -> Result<()> {
        let header = header.to_string();
        self.line(format_args!("{header} {{"))?;
        self.count_child();
        self.stack.push(Block {
            header,
            declared: None,
            emitted: 0,
        });
        Ok(())
    }

    /// Opens `keyword count {` and expects `count` children.
    pub fn open_counted(&mut self, keyword: &str, count: usize) -> Result<()> {
        self.open_declared(format_args!("{keyword} {count}"), count)
    }

    /// Opens `header {` and expects `count` children, for headers that state
    /// more than one number.
    pub fn open_declared(&mut self, header: impl Display, count: usize) -> Result<()> {
        self.open(header)?;
        if let Some(block) = self.stack.last_mut() {
            block.declared = Some(count);
        }
        Ok(())
    }

    /// Closes the innermost block.
    pub fn close(&mut self) -> Result<()> {
        self.close_with("")
    }

    /// Closes the innermost block as `}` followed by `suffix`.
    pub fn close_with(&mut self, suffix: &str) -> Result<()> {
        let block = self
            .stack
            .pop()
            .ok_or_else(|| MdlError::invariant("close without an open block"))?;
        if let Some(declared) = block.declared {
            if declared != block.emitted {
                return Err(MdlError::invariant(format!(
                    "'{}' declares {declared} entries but {} were written",
                    block.header, block.emitted
                )));
            }
        }
        self.indent();
        writeln!(self.out, "}}{suffix}")?;
        Ok(())
    }

    /// Returns the text once every block is closed.
    pub fn finish(self) -> Result<String> {
        match self.stack.last() {
            Some(block) => Err(MdlError::invariant(format!(
                "block '{}' left open",
                block.header
            ))),
            None => Ok(self.out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counted_blocks_nest_with_tabs() {
        let mut w = MdlWriter::new();
        w.open_counted("Sequences", 1).unwrap();
        w.open("Anim \"Stand\"").unwrap();
        w.field("Interval", "{0, 3333}").unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert_eq!(
            w.finish().unwrap(),
            "Sequences 1 {\n\tAnim \"Stand\" {\n\t\tInterval {0, 3333},\n\t}\n}\n"
        );
    }

    #[test]
    fn count_mismatch_is_an_invariant_violation() {
        let mut w = MdlWriter::new();
        w.open_counted("GlobalSequences", 2).unwrap();
        w.item("Duration 270,").unwrap();
        let err = w.close().unwrap_err();
        assert!(matches!(err, MdlError::InvariantViolation(_)));
    }

    #[test]
    fn unclosed_block_is_reported() {
        let mut w = MdlWriter::new();
        w.open("Model \"x\"").unwrap();
        assert!(w.finish().is_err());
    }
}
