//! Command front end for graphbind: a small line-oriented language in which
//! every graph, node and edge handle is itself a command.

pub mod interp;

pub use interp::{InterpError, Interpreter, Reply};
