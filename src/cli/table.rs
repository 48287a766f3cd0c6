//! Table output for list-style commands

use console::style;
use tabled::{builder::Builder, settings::Style};

/// A markdown-style table built row by row
pub struct Table {
    builder: Builder,
    rows: usize,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut builder = Builder::default();
        builder.push_record(headers.into_iter().map(Into::into));
        Self { builder, rows: 0 }
    }

    pub fn push<I, S>(&mut self, row: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builder.push_record(row.into_iter().map(Into::into));
        self.rows += 1;
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn render(self) -> String {
        self.builder.build().with(Style::markdown()).to_string()
    }

    /// Print the table followed by a count line, or `empty` if no rows
    pub fn print(self, noun: &str, empty: &str, quiet: bool) {
        if self.is_empty() {
            if !quiet {
                println!("{}", empty);
            }
            return;
        }
        let count = self.rows;
        println!("{}", self.render());
        if !quiet {
            println!();
            println!("{} {}(s)", style(count).cyan(), noun);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renders_markdown() {
        let mut table = Table::new(["ID", "STOCK"]);
        table.push(["PART-1", "4"]);
        assert_eq!(table.len(), 1);
        let out = table.render();
        assert!(out.contains("| ID"));
        assert!(out.contains("PART-1"));
        assert!(out.lines().nth(1).unwrap().contains("---"));
    }
}
