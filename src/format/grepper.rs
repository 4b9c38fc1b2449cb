//! Row-per-match formatter
use crate::error::Result;
use crate::format::{DedupFilter, FormatterModifiers};
use crate::output::{Printable, RowList};
use crate::search::cursor::{MatchCursor, MatchView};

/// One output column: a header and the group feeding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    header: String,
    /// `None` takes the whole match.
    group: Option<String>,
}

impl ColumnSpec {
    pub fn group(header: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            group: Some(group.into()),
        }
    }

    pub fn whole_match(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            group: None,
        }
    }

    /// Parse `HEADER=group`; a bare `HEADER` takes the whole match.
    pub fn parse(text: &str) -> Self {
        match text.split_once('=') {
            Some((header, group)) if !group.is_empty() => Self::group(header, group),
            Some((header, _)) => Self::whole_match(header),
            None => Self::whole_match(text),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub fn group_name(&self) -> Option<&str> {
        self.group.as_deref()
    }

    fn extract(&self, found: &MatchView<'_>) -> Result<String> {
        match &self.group {
            Some(group) => found.group(group),
            None => Ok(found.text()),
        }
    }
}

/// Emits the configured columns of every kept match as one row.
#[derive(Debug, Clone)]
pub struct Grepper {
    columns: Vec<ColumnSpec>,
    modifiers: FormatterModifiers,
}

impl Grepper {
    pub fn new(columns: Vec<ColumnSpec>, modifiers: FormatterModifiers) -> Self {
        Self { columns, modifiers }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn modifiers(&self) -> &FormatterModifiers {
        &self.modifiers
    }

    pub(crate) fn groups(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(ColumnSpec::group_name)
    }

    pub(crate) fn format(&self, cursors: &mut [MatchCursor]) -> Result<Printable> {
        let mut filter = DedupFilter::new(self.modifiers.key.as_deref());

        if self.modifiers.separate {
            let mut blocks = Vec::with_capacity(cursors.len());
            for cursor in cursors.iter_mut() {
                filter.clear();
                let mut rows = self.row_list()?;
                self.collect(cursor, &mut filter, &mut rows)?;
                blocks.push(Printable::Rows(rows));
            }
            return Ok(Printable::Composed(blocks));
        }

        let mut rows = self.row_list()?;
        for cursor in cursors.iter_mut() {
            self.collect(cursor, &mut filter, &mut rows)?;
        }
        Ok(Printable::Rows(rows))
    }

    fn row_list(&self) -> Result<RowList> {
        RowList::new(self.columns.iter().map(|c| c.header.clone()).collect())
    }

    fn collect(
        &self,
        cursor: &mut MatchCursor,
        filter: &mut DedupFilter<'_>,
        rows: &mut RowList,
    ) -> Result<()> {
        while let Some(found) = cursor.next_match() {
            if !filter.admit(&found)? {
                continue;
            }
            let row = self
                .columns
                .iter()
                .map(|column| column.extract(&found))
                .collect::<Result<Vec<_>>>()?;
            rows.add_row(row)?;
        }
        Ok(())
    }
}
