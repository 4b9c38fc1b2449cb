use crate::error::Result;
use crate::format::{ColumnSpec, Counter, CounterFunction, Formatter, FormatterModifiers, Grepper};
use crate::request::SearchRequest;
use crate::search::pattern::PatternCache;
use crate::search::query::Query;
use clap::Parser;
use std::path::PathBuf;

const WHOLE_LINE_HEADER: &str = "MATCHING LINES IN LOGS";

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Root of the extracted bundle
    pub bundle: PathBuf,

    /// Regular expression, optionally with named groups
    pub pattern: String,

    /// Search the primary category's logs
    #[clap(long, value_parser, default_value_t = false)]
    pub primary: bool,

    /// Search the secondary category's logs
    #[clap(long, value_parser, default_value_t = false)]
    pub secondary: bool,

    /// Match the pattern against file names instead of contents
    #[clap(long, value_parser, default_value_t = false)]
    pub file_names: bool,

    /// Output column as HEADER=GROUP, or HEADER for the whole match
    #[clap(long = "column", value_parser)]
    pub columns: Vec<String>,

    /// Keep only the first match for each value of this group
    #[clap(long, value_parser)]
    pub key: Option<String>,

    /// One output block per source file
    #[clap(long, value_parser, default_value_t = false)]
    pub separate: bool,

    /// Sum the integer values of this group instead of listing matches
    #[clap(long, value_parser, conflicts_with = "columns")]
    pub count: Option<String>,

    #[clap(long, value_parser, default_value_t = false)]
    pub json: bool,

    /// Empty the query cache before searching
    #[clap(long, value_parser, default_value_t = false)]
    pub clear_cache: bool,

    #[clap(long, value_parser)]
    pub log: Option<PathBuf>,

    #[clap(long, value_parser)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn modifiers(&self) -> FormatterModifiers {
        FormatterModifiers {
            key: self.key.clone(),
            separate: self.separate,
        }
    }

    pub fn formatter(&self) -> Formatter {
        if let Some(group) = &self.count {
            let function = CounterFunction::sum_of_group("TOTAL", group.as_str(), group.as_str());
            return Counter::new(function, self.modifiers()).into();
        }

        let columns = if self.columns.is_empty() {
            vec![ColumnSpec::whole_match(WHOLE_LINE_HEADER)]
        } else {
            self.columns.iter().map(|c| ColumnSpec::parse(c)).collect()
        };
        Grepper::new(columns, self.modifiers()).into()
    }

    /// Compile the pattern and pair the query with its formatter. Without
    /// any category flag both log categories are searched.
    pub fn to_request(&self, patterns: &PatternCache) -> Result<SearchRequest> {
        let mut builder = Query::builder(patterns.get_or_compile(&self.pattern)?);
        let any_category = self.primary || self.secondary || self.file_names;
        if self.primary || !any_category {
            builder = builder.primary();
        }
        if self.secondary || !any_category {
            builder = builder.secondary();
        }
        if self.file_names {
            builder = builder.file_names();
        }
        Ok(SearchRequest::new(builder.build(), self.formatter()))
    }
}
