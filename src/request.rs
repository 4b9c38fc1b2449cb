//! Executable units: a query paired with the formatter that presents it
use crate::error::Result;
use crate::format::Formatter;
use crate::output::Printable;
use crate::search::engine::SearchEngine;
use crate::search::query::Query;
use log::debug;

/// Anything that can run against an engine and produce output.
pub trait Request {
    fn execute(&self, engine: &SearchEngine) -> Result<Printable>;
}

/// One query formatted by one formatter.
#[derive(Debug)]
pub struct SearchRequest {
    query: Query,
    formatter: Formatter,
}

impl SearchRequest {
    pub fn new(query: Query, formatter: impl Into<Formatter>) -> Self {
        Self {
            query,
            formatter: formatter.into(),
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }
}

impl Request for SearchRequest {
    fn execute(&self, engine: &SearchEngine) -> Result<Printable> {
        debug!("Executing {:?}", self.query.pattern());
        // Checked up front so a query with no sources still reports it.
        self.formatter.validate_pattern(self.query.pattern())?;
        let mut cursors = engine.create_matchers(&self.query)?;
        self.formatter.format(&mut cursors)
    }
}

/// Several requests run in order, their outputs shown one after another.
#[derive(Default)]
pub struct ComposedRequest {
    parts: Vec<Box<dyn Request + Send + Sync>>,
}

impl ComposedRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, request: impl Request + Send + Sync + 'static) -> Self {
        self.parts.push(Box::new(request));
        self
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl Request for ComposedRequest {
    fn execute(&self, engine: &SearchEngine) -> Result<Printable> {
        let printables = self
            .parts
            .iter()
            .map(|part| part.execute(engine))
            .collect::<Result<Vec<_>>>()?;
        Ok(Printable::Composed(printables))
    }
}
