//! Typed filter-graph representation.
//!
//! Graphs are assembled as records of `{inputs, filters, outputs}` and only
//! turned into the engine's textual grammar by [`FilterGraph::render`]:
//!
//! ```text
//! [0:v]scale=640:360:force_original_aspect_ratio=decrease,setsar=1[in0];[in0]...[cat]
//! ```
//!
//! Stages inside one chain are comma separated, chains are semicolon
//! separated, stream labels are bracketed. All quoting and escaping of
//! user-provided values happens here.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use reelsmith_common::error::ReelsmithError;

/// Name of an intermediate stream produced inside the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamLabel(String);

impl StreamLabel {
    /// Labels are restricted to `[A-Za-z0-9_]` so they never need escaping.
    pub fn new(name: impl Into<String>) -> Result<Self, GraphError> {
        let name = name.into();
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            return Err(GraphError::InvalidLabel(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// Media type of an engine input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(self) -> &'static str {
        match self {
            StreamKind::Video => "v",
            StreamKind::Audio => "a",
        }
    }
}

/// Something a chain can consume: an engine input stream or a graph label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamRef {
    Input { index: usize, kind: StreamKind },
    Label(StreamLabel),
}

impl StreamRef {
    pub fn video_input(index: usize) -> Self {
        StreamRef::Input {
            index,
            kind: StreamKind::Video,
        }
    }
}

impl From<StreamLabel> for StreamRef {
    fn from(label: StreamLabel) -> Self {
        StreamRef::Label(label)
    }
}

impl From<&StreamLabel> for StreamRef {
    fn from(label: &StreamLabel) -> Self {
        StreamRef::Label(label.clone())
    }
}

impl fmt::Display for StreamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRef::Input { index, kind } => write!(f, "[{index}:{}]", kind.specifier()),
            StreamRef::Label(label) => fmt::Display::fmt(label, f),
        }
    }
}

/// A filter option value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Bare token emitted as-is: numbers, colour names, simple expressions
    /// without separators such as `(ow-iw)/2`.
    Raw(String),
    /// Per-frame expression that may contain commas; single-quoted.
    Expr(String),
    /// Free text (captions); quoted and escaped.
    Text(String),
    /// Filesystem path; quoted and escaped.
    Path(PathBuf),
}

impl FilterValue {
    pub fn raw(value: impl ToString) -> Self {
        FilterValue::Raw(value.to_string())
    }

    pub fn expr(value: impl Into<String>) -> Self {
        FilterValue::Expr(value.into())
    }

    fn render(&self) -> String {
        match self {
            FilterValue::Raw(v) => v.clone(),
            FilterValue::Expr(v) => format!("'{v}'"),
            FilterValue::Text(v) => quote_for_graph(&escape_text(v)),
            FilterValue::Path(p) => quote_for_graph(&escape_path(p)),
        }
    }
}

/// One filter stage, e.g. `scale=640:360:force_original_aspect_ratio=decrease`.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    name: String,
    args: Vec<(Option<String>, FilterValue)>,
}

impl Filter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Positional argument.
    pub fn pos(mut self, value: impl ToString) -> Self {
        self.args.push((None, FilterValue::raw(value)));
        self
    }

    /// Named argument with a bare value.
    pub fn opt(self, key: &str, value: impl ToString) -> Self {
        self.with(key, FilterValue::raw(value))
    }

    /// Named argument with an explicit value kind.
    pub fn with(mut self, key: &str, value: FilterValue) -> Self {
        self.args.push((Some(key.to_string()), value));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of a named argument, if present.
    pub fn get(&self, key: &str) -> Option<&FilterValue> {
        self.args
            .iter()
            .find(|(k, _)| k.as_deref() == Some(key))
            .map(|(_, v)| v)
    }

    pub fn render(&self) -> String {
        if self.args.is_empty() {
            return self.name.clone();
        }
        let args = self
            .args
            .iter()
            .map(|(key, value)| match key {
                Some(key) => format!("{key}={}", value.render()),
                None => value.render(),
            })
            .collect::<Vec<_>>()
            .join(":");
        format!("{}={args}", self.name)
    }
}

/// Inputs, a linear run of filters, and the labels it produces.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    pub inputs: Vec<StreamRef>,
    pub filters: Vec<Filter>,
    pub outputs: Vec<StreamLabel>,
}

impl FilterChain {
    pub fn new(inputs: Vec<StreamRef>, filters: Vec<Filter>, output: StreamLabel) -> Self {
        Self {
            inputs,
            filters,
            outputs: vec![output],
        }
    }

    pub fn render(&self) -> String {
        let inputs: String = self.inputs.iter().map(ToString::to_string).collect();
        let filters = self
            .filters
            .iter()
            .map(Filter::render)
            .collect::<Vec<_>>()
            .join(",");
        let outputs: String = self.outputs.iter().map(ToString::to_string).collect();
        format!("{inputs}{filters}{outputs}")
    }
}

/// Builder defects detected while assembling a graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    #[error("invalid stream label {0:?}")]
    InvalidLabel(String),

    #[error("label [{0}] is produced twice")]
    DuplicateLabel(String),

    #[error("label [{0}] is consumed before it is produced")]
    UnknownLabel(String),

    #[error("label [{0}] is consumed twice")]
    ConsumedTwice(String),

    #[error("chain has no filters")]
    EmptyChain,

    #[error("expected exactly one unconsumed label, found {0:?}")]
    Terminal(Vec<String>),
}

impl From<GraphError> for ReelsmithError {
    fn from(err: GraphError) -> Self {
        ReelsmithError::graph(err.to_string())
    }
}

/// Ordered filter chains with label bookkeeping.
///
/// Every chain is checked on insertion: consumed labels must already exist
/// and be unconsumed, produced labels must be new.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    chains: Vec<FilterChain>,
    produced: HashSet<StreamLabel>,
    consumed: HashSet<StreamLabel>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chain: FilterChain) -> Result<(), GraphError> {
        if chain.filters.is_empty() {
            return Err(GraphError::EmptyChain);
        }

        let mut newly_consumed = Vec::new();
        for input in &chain.inputs {
            if let StreamRef::Label(label) = input {
                if !self.produced.contains(label) {
                    return Err(GraphError::UnknownLabel(label.as_str().to_string()));
                }
                if self.consumed.contains(label) || newly_consumed.contains(&label) {
                    return Err(GraphError::ConsumedTwice(label.as_str().to_string()));
                }
                newly_consumed.push(label);
            }
        }

        let mut newly_produced = HashSet::new();
        for output in &chain.outputs {
            if self.produced.contains(output) || !newly_produced.insert(output.clone()) {
                return Err(GraphError::DuplicateLabel(output.as_str().to_string()));
            }
        }

        self.consumed.extend(newly_consumed.into_iter().cloned());
        self.produced.extend(newly_produced);
        self.chains.push(chain);
        Ok(())
    }

    pub fn chains(&self) -> &[FilterChain] {
        &self.chains
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    /// Labels in the order they were produced.
    pub fn produced_labels(&self) -> Vec<&StreamLabel> {
        self.chains.iter().flat_map(|c| c.outputs.iter()).collect()
    }

    /// The single label nothing consumes.
    pub fn terminal(&self) -> Result<&StreamLabel, GraphError> {
        let open: Vec<&StreamLabel> = self
            .produced_labels()
            .into_iter()
            .filter(|l| !self.consumed.contains(*l))
            .collect();
        match open.as_slice() {
            [single] => Ok(single),
            _ => Err(GraphError::Terminal(
                open.iter().map(|l| l.as_str().to_string()).collect(),
            )),
        }
    }

    /// One textual expression per chain.
    pub fn expressions(&self) -> Vec<String> {
        self.chains.iter().map(FilterChain::render).collect()
    }

    /// The full `-filter_complex` argument.
    pub fn render(&self) -> String {
        self.expressions().join(";")
    }
}

/// Escape caption text down to the option level.
///
/// The engine unescapes a caption three times: the graph parser, then the
/// filter option parser, then drawtext's own `%{...}` expansion. This covers
/// the last two; rendering a [`FilterValue::Text`] adds the graph-level
/// quoting.
pub fn escape_text(text: &str) -> String {
    let expanded = text.replace('\\', "\\\\").replace('%', "\\%");
    escape_option(&expanded)
}

/// Escape a filesystem path down to the option level.
pub fn escape_path(path: &Path) -> String {
    escape_option(&path.to_string_lossy())
}

/// Backslash-escape the characters the option parser splits or unquotes on.
fn escape_option(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Single-quote a value for the graph parser. Inside quotes nothing is
/// special except `'`, which closes the quote, emits an escaped quote and
/// reopens.
fn quote_for_graph(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}
