//! Summing formatter
use crate::error::{BundleGrepError, Result};
use crate::format::{DedupFilter, FormatterModifiers};
use crate::output::{Printable, RowList};
use crate::search::cursor::{MatchCursor, MatchView};
use std::fmt;

pub type Extractor = Box<dyn Fn(&MatchView<'_>) -> Result<Vec<i64>> + Send + Sync>;
pub type Finalizer = Box<dyn Fn(&[i64]) -> Vec<String> + Send + Sync>;

/// How a [`Counter`] reads numbers out of a match and how it presents the
/// totals.
pub struct CounterFunction {
    header: String,
    groups: Vec<String>,
    extractor: Extractor,
    finalizer: Finalizer,
}

impl CounterFunction {
    /// `groups` lists every named group `extractor` reads, so patterns can
    /// be checked before formatting starts.
    pub fn new(
        header: impl Into<String>,
        groups: Vec<String>,
        extractor: Extractor,
        finalizer: Finalizer,
    ) -> Self {
        Self {
            header: header.into(),
            groups,
            extractor,
            finalizer,
        }
    }

    /// Sum each `(group, label)` pair separately, printing one
    /// `label: total` row per pair.
    pub fn sum_of_groups(header: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        let groups: Vec<String> = fields.iter().map(|(group, _)| group.clone()).collect();
        let labels: Vec<String> = fields.into_iter().map(|(_, label)| label).collect();

        let extracted = groups.clone();
        let extractor: Extractor = Box::new(move |found: &MatchView<'_>| {
            extracted
                .iter()
                .map(|group| parse_number(group, &found.group(group)?))
                .collect()
        });
        let finalizer: Finalizer = Box::new(move |totals: &[i64]| {
            labels
                .iter()
                .zip(totals)
                .map(|(label, total)| format!("{label}: {total}"))
                .collect()
        });
        Self::new(header, groups, extractor, finalizer)
    }

    pub fn sum_of_group(
        header: impl Into<String>,
        group: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self::sum_of_groups(header, vec![(group.into(), label.into())])
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    pub(crate) fn groups(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(String::as_str)
    }

    fn extract(&self, found: &MatchView<'_>) -> Result<Vec<i64>> {
        (self.extractor)(found)
    }

    fn finalize(&self, totals: &[i64]) -> Vec<String> {
        (self.finalizer)(totals)
    }
}

impl fmt::Debug for CounterFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CounterFunction")
            .field("header", &self.header)
            .field("groups", &self.groups)
            .finish_non_exhaustive()
    }
}

fn parse_number(group: &str, value: &str) -> Result<i64> {
    value
        .trim()
        .parse()
        .map_err(|_| BundleGrepError::InvalidNumber {
            group: group.to_string(),
            value: value.to_string(),
        })
}

/// Running element-wise sum. Stays `None` until the first kept match.
#[derive(Debug, Default)]
struct Accumulator {
    totals: Option<Vec<i64>>,
}

impl Accumulator {
    /// Fails without changing the totals if any element would overflow.
    fn add(&mut self, values: Vec<i64>) -> Result<()> {
        let Some(totals) = &mut self.totals else {
            self.totals = Some(values);
            return Ok(());
        };

        let mut summed = totals.clone();
        if summed.len() < values.len() {
            summed.resize(values.len(), 0);
        }
        for (index, (total, value)) in summed.iter_mut().zip(values).enumerate() {
            *total = total
                .checked_add(value)
                .ok_or(BundleGrepError::CountOverflow { index })?;
        }
        *totals = summed;
        Ok(())
    }
}

/// Accumulates numbers extracted from kept matches and reports the totals.
#[derive(Debug)]
pub struct Counter {
    function: CounterFunction,
    modifiers: FormatterModifiers,
}

impl Counter {
    pub fn new(function: CounterFunction, modifiers: FormatterModifiers) -> Self {
        Self {
            function,
            modifiers,
        }
    }

    pub fn function(&self) -> &CounterFunction {
        &self.function
    }

    pub fn modifiers(&self) -> &FormatterModifiers {
        &self.modifiers
    }

    pub(crate) fn format(&self, cursors: &mut [MatchCursor]) -> Result<Printable> {
        let mut filter = DedupFilter::new(self.modifiers.key.as_deref());

        if self.modifiers.separate {
            let mut blocks = Vec::with_capacity(cursors.len());
            for cursor in cursors.iter_mut() {
                filter.clear();
                let mut accumulator = Accumulator::default();
                self.accumulate(cursor, &mut filter, &mut accumulator)?;
                blocks.push(Printable::Rows(self.rows(accumulator)?));
            }
            return Ok(Printable::Composed(blocks));
        }

        let mut accumulator = Accumulator::default();
        for cursor in cursors.iter_mut() {
            self.accumulate(cursor, &mut filter, &mut accumulator)?;
        }
        Ok(Printable::Rows(self.rows(accumulator)?))
    }

    fn accumulate(
        &self,
        cursor: &mut MatchCursor,
        filter: &mut DedupFilter<'_>,
        accumulator: &mut Accumulator,
    ) -> Result<()> {
        while let Some(found) = cursor.next_match() {
            if filter.admit(&found)? {
                accumulator.add(self.function.extract(&found)?)?;
            }
        }
        Ok(())
    }

    fn rows(&self, accumulator: Accumulator) -> Result<RowList> {
        let mut rows = RowList::new(vec![self.function.header.clone()])?;
        // Nothing was kept, so there is nothing to finalize.
        if let Some(totals) = accumulator.totals {
            for line in self.function.finalize(&totals) {
                rows.add_cell(line)?;
            }
        }
        Ok(rows)
    }
}
