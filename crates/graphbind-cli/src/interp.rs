//! Line-oriented command interpreter over a [`Session`].
//!
//! Each line is `[var =] command arg...`. Words are split on whitespace;
//! double quotes group a word and `\` escapes inside quotes. An unquoted word
//! `$name` is replaced by the words stored in variable `name`. Lines starting
//! with `#` are comments.
//!
//! Besides the global commands `graph`, `echo` and `commands`, every live
//! handle token is itself a command: `node0_1 setattributes color red`.

use std::collections::HashMap;
use std::fmt;

use graphbind_core::{AttrKind, CoreError, GraphKind, ObjectKind, Session};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Errors raised while evaluating a line.
#[derive(Debug, Error)]
pub enum InterpError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("invalid command name \"{0}\"")]
    UnknownCommand(String),

    #[error("bad option \"{method}\" for {kind} handle")]
    UnknownMethod { kind: ObjectKind, method: String },

    #[error("wrong # args: should be \"{0}\"")]
    Usage(String),

    #[error("can't read \"{0}\": no such variable")]
    UndefinedVariable(String),

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        source: Box<InterpError>,
    },
}

/// The value a command produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Empty,
    Text(String),
    List(Vec<String>),
    Pairs(Vec<(String, String)>),
}

impl Reply {
    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Empty)
    }

    /// The reply as the words a variable would hold.
    pub fn words(&self) -> Vec<String> {
        match self {
            Reply::Empty => Vec::new(),
            Reply::Text(text) => vec![text.clone()],
            Reply::List(items) => items.clone(),
            Reply::Pairs(pairs) => pairs
                .iter()
                .flat_map(|(n, v)| [n.clone(), v.clone()])
                .collect(),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Empty => Ok(()),
            Reply::Text(text) => f.write_str(text),
            Reply::List(_) | Reply::Pairs(_) => {
                let words: Vec<String> = self.words().iter().map(|w| quote(w)).collect();
                f.write_str(&words.join(" "))
            }
        }
    }
}

// Quotes a list element so it reads back as one word.
fn quote(word: &str) -> String {
    if !word.is_empty() && !word.contains(|c: char| c.is_whitespace() || c == '"') {
        return word.to_string();
    }
    let escaped = word.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

const GRAPH_METHODS: &[(&str, &str)] = &[
    ("addsubgraph", "name ?attr value ...?"),
    ("addnode", "name ?attr value ...?"),
    ("addedge", "tail head ?key?"),
    ("findnode", "name"),
    ("findsubgraph", "name"),
    ("listnodes", ""),
    ("listedges", ""),
    ("listsubgraphs", ""),
    ("setattributes", "attr value ?attr value ...?"),
    ("setnodeattributes", "attr value ?attr value ...?"),
    ("setedgeattributes", "attr value ?attr value ...?"),
    ("queryattributes", "attr ?attr ...?"),
    ("queryattributevalues", "attr ?attr ...?"),
    ("listattributes", ""),
    ("listnodeattributes", ""),
    ("listedgeattributes", ""),
    ("layout", "?engine?"),
    ("showname", ""),
    ("delete", ""),
];

const NODE_METHODS: &[(&str, &str)] = &[
    ("listedges", ""),
    ("setattributes", "attr value ?attr value ...?"),
    ("queryattributes", "attr ?attr ...?"),
    ("queryattributevalues", "attr ?attr ...?"),
    ("showname", ""),
    ("position", ""),
    ("delete", ""),
];

const EDGE_METHODS: &[(&str, &str)] = &[
    ("listnodes", ""),
    ("setattributes", "attr value ?attr value ...?"),
    ("queryattributes", "attr ?attr ...?"),
    ("queryattributevalues", "attr ?attr ...?"),
    ("showname", ""),
    ("delete", ""),
];

/// Error for a method that is unknown, or known but called with the wrong
/// arguments.
fn bad_method(
    kind: ObjectKind,
    methods: &[(&str, &str)],
    token: &str,
    method: &str,
) -> InterpError {
    match methods.iter().find(|(name, _)| *name == method) {
        Some((name, usage)) => {
            InterpError::Usage(format!("{token} {name} {usage}").trim_end().to_string())
        }
        None => InterpError::UnknownMethod {
            kind,
            method: method.to_string(),
        },
    }
}

fn pairs(args: &[String]) -> Vec<(&str, &str)> {
    args.chunks_exact(2)
        .map(|p| (p[0].as_str(), p[1].as_str()))
        .collect()
}

struct Word {
    text: String,
    quoted: bool,
}

fn tokenize(line: &str) -> Result<Vec<Word>, InterpError> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.next_if(|c| c.is_whitespace()).is_some() {}
        let Some(&first) = chars.peek() else {
            break;
        };
        let mut text = String::new();
        if first == '"' {
            chars.next();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some('\\') => match chars.next() {
                        Some(c) => text.push(c),
                        None => return Err(InterpError::Syntax("missing close-quote".into())),
                    },
                    Some(c) => text.push(c),
                    None => return Err(InterpError::Syntax("missing close-quote".into())),
                }
            }
            words.push(Word { text, quoted: true });
        } else {
            while let Some(c) = chars.next_if(|c| !c.is_whitespace()) {
                text.push(c);
            }
            words.push(Word {
                text,
                quoted: false,
            });
        }
    }
    Ok(words)
}

/// Evaluates command lines against one [`Session`].
#[derive(Debug, Default)]
pub struct Interpreter {
    session: Session,
    vars: HashMap<String, Vec<String>>,
    default_engine: String,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses `engine` when `layout` is called without one. An empty name
    /// picks by graph direction.
    pub fn with_default_engine(engine: impl Into<String>) -> Self {
        Interpreter {
            default_engine: engine.into(),
            ..Self::default()
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn var(&self, name: &str) -> Option<&[String]> {
        self.vars.get(name).map(Vec::as_slice)
    }

    /// Evaluates every line of `script`, passing each non-empty reply to
    /// `on_reply`. Stops at the first error.
    pub fn eval_script(
        &mut self,
        script: &str,
        mut on_reply: impl FnMut(&Reply),
    ) -> Result<(), InterpError> {
        for (i, line) in script.lines().enumerate() {
            let reply = self.eval_line(line).map_err(|err| InterpError::AtLine {
                line: i + 1,
                source: Box::new(err),
            })?;
            if !reply.is_empty() {
                on_reply(&reply);
            }
        }
        Ok(())
    }

    /// Evaluates one line. An assignment stores the reply and yields
    /// [`Reply::Empty`].
    pub fn eval_line(&mut self, line: &str) -> Result<Reply, InterpError> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(Reply::Empty);
        }

        let mut words = tokenize(line)?;
        let target = match words.as_slice() {
            [var, eq, ..] if !var.quoted && !eq.quoted && eq.text == "=" => {
                let name = var.text.clone();
                words.drain(..2);
                Some(name)
            }
            _ => None,
        };

        let args = self.expand(words)?;
        let reply = match args.split_first() {
            Some((command, rest)) => self.dispatch(command, rest)?,
            None => Reply::Empty,
        };

        match target {
            Some(name) => {
                self.vars.insert(name, reply.words());
                Ok(Reply::Empty)
            }
            None => Ok(reply),
        }
    }

    fn expand(&self, words: Vec<Word>) -> Result<Vec<String>, InterpError> {
        let mut out = Vec::with_capacity(words.len());
        for word in words {
            match word.text.strip_prefix('$') {
                Some(name) if !word.quoted && !name.is_empty() => {
                    let values = self
                        .vars
                        .get(name)
                        .ok_or_else(|| InterpError::UndefinedVariable(name.to_string()))?;
                    out.extend(values.iter().cloned());
                }
                _ => out.push(word.text),
            }
        }
        Ok(out)
    }

    fn dispatch(&mut self, command: &str, args: &[String]) -> Result<Reply, InterpError> {
        debug!(command, args = args.len(), "dispatch");
        match command {
            "graph" => self.new_graph(args),
            "echo" => Ok(Reply::Text(args.join(" "))),
            "commands" => Ok(Reply::List(
                self.session.commands().names().map(str::to_string).collect(),
            )),
            _ => {
                let kind = self
                    .session
                    .commands()
                    .kind_of(command)
                    .ok_or_else(|| InterpError::UnknownCommand(command.to_string()))?;
                let (method, rest) = args
                    .split_first()
                    .ok_or_else(|| InterpError::Usage(format!("{command} option ?arg ...?")))?;
                match kind {
                    ObjectKind::Graph => self.graph_method(command, method, rest),
                    ObjectKind::Node => self.node_method(command, method, rest),
                    ObjectKind::Edge => self.edge_method(command, method, rest),
                }
            }
        }
    }

    fn new_graph(&mut self, args: &[String]) -> Result<Reply, InterpError> {
        const USAGE: &str = "graph name ?directed|undirected? ?strict?";
        let (name, flags) = args
            .split_first()
            .ok_or_else(|| InterpError::Usage(USAGE.into()))?;
        let mut kind = GraphKind::Directed;
        let mut strict = false;
        for flag in flags {
            match flag.as_str() {
                "directed" | "digraph" => kind = GraphKind::Directed,
                "undirected" => kind = GraphKind::Undirected,
                "strict" => strict = true,
                _ => return Err(InterpError::Usage(USAGE.into())),
            }
        }
        Ok(Reply::Text(self.session.new_graph(name, kind, strict)))
    }

    fn graph_method(
        &mut self,
        token: &str,
        method: &str,
        args: &[String],
    ) -> Result<Reply, InterpError> {
        let s = &mut self.session;
        let reply = match (method, args) {
            ("addsubgraph", [name, attrs @ ..]) if attrs.len() % 2 == 0 => {
                let sub = s.add_subgraph(token, name)?;
                s.set_attributes(&sub, &pairs(attrs))?;
                Reply::Text(sub)
            }
            ("addnode", [name, attrs @ ..]) if attrs.len() % 2 == 0 => {
                let node = s.add_node(token, name)?;
                s.set_attributes(&node, &pairs(attrs))?;
                Reply::Text(node)
            }
            ("addedge", [tail, head]) => Reply::Text(s.add_edge(token, tail, head, None)?),
            ("addedge", [tail, head, key]) => {
                Reply::Text(s.add_edge(token, tail, head, Some(key.as_str()))?)
            }
            ("findnode", [name]) => s.find_node(token, name)?.map_or(Reply::Empty, Reply::Text),
            ("findsubgraph", [name]) => s
                .find_subgraph(token, name)?
                .map_or(Reply::Empty, Reply::Text),
            ("listnodes", []) => Reply::List(s.list_nodes(token)?),
            ("listedges", []) => Reply::List(s.list_edges(token)?),
            ("listsubgraphs", []) => Reply::List(s.list_subgraphs(token)?),
            ("setattributes", attrs) if !attrs.is_empty() && attrs.len() % 2 == 0 => {
                s.set_attributes(token, &pairs(attrs))?;
                Reply::Empty
            }
            ("setnodeattributes", attrs) if !attrs.is_empty() && attrs.len() % 2 == 0 => {
                s.set_default_attributes(token, AttrKind::Node, &pairs(attrs))?;
                Reply::Empty
            }
            ("setedgeattributes", attrs) if !attrs.is_empty() && attrs.len() % 2 == 0 => {
                s.set_default_attributes(token, AttrKind::Edge, &pairs(attrs))?;
                Reply::Empty
            }
            ("queryattributes", names) if !names.is_empty() => {
                Reply::Pairs(s.query_attributes(token, names)?)
            }
            ("queryattributevalues", names) if !names.is_empty() => {
                Reply::List(s.query_attribute_values(token, names)?)
            }
            ("listattributes", []) => Reply::List(s.list_attributes(token, AttrKind::Graph)?),
            ("listnodeattributes", []) => Reply::List(s.list_attributes(token, AttrKind::Node)?),
            ("listedgeattributes", []) => Reply::List(s.list_attributes(token, AttrKind::Edge)?),
            ("layout", []) => Reply::Text(s.layout(token, &self.default_engine)?.bb),
            ("layout", [engine]) => Reply::Text(s.layout(token, engine)?.bb),
            ("showname", []) => Reply::Text(s.object_name(token)?),
            ("delete", []) => {
                s.delete(token)?;
                Reply::Empty
            }
            _ => return Err(bad_method(ObjectKind::Graph, GRAPH_METHODS, token, method)),
        };
        Ok(reply)
    }

    fn node_method(
        &mut self,
        token: &str,
        method: &str,
        args: &[String],
    ) -> Result<Reply, InterpError> {
        let s = &mut self.session;
        let reply = match (method, args) {
            ("listedges", []) => Reply::List(s.list_edges(token)?),
            ("setattributes", attrs) if !attrs.is_empty() && attrs.len() % 2 == 0 => {
                s.set_attributes(token, &pairs(attrs))?;
                Reply::Empty
            }
            ("queryattributes", names) if !names.is_empty() => {
                Reply::Pairs(s.query_attributes(token, names)?)
            }
            ("queryattributevalues", names) if !names.is_empty() => {
                Reply::List(s.query_attribute_values(token, names)?)
            }
            ("showname", []) => Reply::Text(s.object_name(token)?),
            ("position", []) => s.node_position(token)?.map_or(Reply::Empty, |p| {
                Reply::Text(format!("{},{}", p.x.round() as i64, p.y.round() as i64))
            }),
            ("delete", []) => {
                s.delete(token)?;
                Reply::Empty
            }
            _ => return Err(bad_method(ObjectKind::Node, NODE_METHODS, token, method)),
        };
        Ok(reply)
    }

    fn edge_method(
        &mut self,
        token: &str,
        method: &str,
        args: &[String],
    ) -> Result<Reply, InterpError> {
        let s = &mut self.session;
        let reply = match (method, args) {
            ("listnodes", []) => Reply::List(s.list_nodes(token)?),
            ("setattributes", attrs) if !attrs.is_empty() && attrs.len() % 2 == 0 => {
                s.set_attributes(token, &pairs(attrs))?;
                Reply::Empty
            }
            ("queryattributes", names) if !names.is_empty() => {
                Reply::Pairs(s.query_attributes(token, names)?)
            }
            ("queryattributevalues", names) if !names.is_empty() => {
                Reply::List(s.query_attribute_values(token, names)?)
            }
            ("showname", []) => Reply::Text(s.object_name(token)?),
            ("delete", []) => {
                s.delete(token)?;
                Reply::Empty
            }
            _ => return Err(bad_method(ObjectKind::Edge, EDGE_METHODS, token, method)),
        };
        Ok(reply)
    }
}
