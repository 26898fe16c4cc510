//! Program IR
//!
//! A deliberately small statement language: just enough structure to express
//! handle creation, aliasing, handle operations, calls, branches, loops and
//! returns. Everything else a front-end sees lowers to `Expr::Opaque` or
//! `Expr::Literal`.
//!
//! # JSON shape
//! ```json
//! {
//!   "name": "aes_cbc",
//!   "functions": [{
//!     "name": "main",
//!     "params": [],
//!     "body": [
//!       {"kind": "let", "var": "enc", "value": {"kind": "new", "protocol": "Cipher"},
//!        "loc": {"line": 3, "column": 5}},
//!       {"kind": "method_call", "receiver": "enc", "method": "set_key",
//!        "loc": {"line": 4, "column": 5}}
//!     ]
//!   }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::Location;
use crate::errors::Result;

/// One analysis unit (typically a translation unit)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Unit name used in reports (file name, test id, ...)
    #[serde(default)]
    pub name: String,

    pub functions: Vec<Function>,

    /// Functions to start from. Empty = call graph roots.
    #[serde(default)]
    pub entry_points: Vec<String>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            entry_points: Vec::new(),
        }
    }

    /// Add a function (builder style)
    pub fn with_function(mut self, function: Function) -> Self {
        self.functions.push(function);
        self
    }

    /// Add an explicit entry point (builder style)
    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_points.push(name.into());
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Parse program IR from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load program IR from a JSON file
    ///
    /// An empty `name` is replaced by the file stem.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut program = Self::from_json(&text)?;
        if program.name.is_empty() {
            program.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(program)
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,

    #[serde(default)]
    pub params: Vec<Param>,

    pub body: Vec<Stmt>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<Param>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params,
            body,
        }
    }
}

/// Formal parameter
///
/// `protocol` is the declared handle type, if the front-end knows it. Only
/// root functions use it: their handle parameters start in an unknown state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,

    #[serde(default)]
    pub protocol: Option<String>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: None,
        }
    }

    pub fn handle(name: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            protocol: Some(protocol.into()),
        }
    }
}

/// Statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    /// Block-scoped declaration (`Cipher c = ...;` / `Cipher c;`)
    Let {
        var: String,
        #[serde(default)]
        value: Option<Expr>,
        #[serde(default)]
        loc: Location,
    },

    /// Assignment to an existing (or undeclared, function-scoped) variable
    Assign {
        target: String,
        value: Expr,
        #[serde(default)]
        loc: Location,
    },

    /// `receiver.method(...)`; a handle operation if `receiver` is bound to a handle
    MethodCall {
        receiver: String,
        method: String,
        #[serde(default)]
        loc: Location,
    },

    /// Free function call whose result is discarded
    Call {
        function: String,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        loc: Location,
    },

    If {
        #[serde(default)]
        then_branch: Vec<Stmt>,
        #[serde(default)]
        else_branch: Vec<Stmt>,
        #[serde(default)]
        loc: Location,
    },

    /// Loop body executed zero or more times
    Loop {
        body: Vec<Stmt>,
        #[serde(default)]
        loc: Location,
    },

    Block {
        body: Vec<Stmt>,
    },

    Return {
        #[serde(default)]
        value: Option<Expr>,
        #[serde(default)]
        loc: Location,
    },
}

impl Stmt {
    pub fn let_(var: impl Into<String>, value: Expr, line: u32) -> Self {
        Stmt::Let {
            var: var.into(),
            value: Some(value),
            loc: Location::new(line, 1),
        }
    }

    pub fn declare(var: impl Into<String>, line: u32) -> Self {
        Stmt::Let {
            var: var.into(),
            value: None,
            loc: Location::new(line, 1),
        }
    }

    pub fn assign(target: impl Into<String>, value: Expr, line: u32) -> Self {
        Stmt::Assign {
            target: target.into(),
            value,
            loc: Location::new(line, 1),
        }
    }

    pub fn method_call(receiver: impl Into<String>, method: impl Into<String>, line: u32) -> Self {
        Stmt::MethodCall {
            receiver: receiver.into(),
            method: method.into(),
            loc: Location::new(line, 1),
        }
    }

    pub fn call(function: impl Into<String>, args: Vec<Expr>, line: u32) -> Self {
        Stmt::Call {
            function: function.into(),
            args,
            loc: Location::new(line, 1),
        }
    }

    pub fn if_else(then_branch: Vec<Stmt>, else_branch: Vec<Stmt>, line: u32) -> Self {
        Stmt::If {
            then_branch,
            else_branch,
            loc: Location::new(line, 1),
        }
    }

    pub fn loop_(body: Vec<Stmt>, line: u32) -> Self {
        Stmt::Loop {
            body,
            loc: Location::new(line, 1),
        }
    }

    pub fn ret(value: Option<Expr>, line: u32) -> Self {
        Stmt::Return {
            value,
            loc: Location::new(line, 1),
        }
    }
}

/// Expression (only the parts that can yield a handle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// Handle creation (`Cipher_Mode::create(...)`, `EVP_CIPHER_CTX_new()`)
    New { protocol: String },

    Var { name: String },

    Call {
        function: String,
        #[serde(default)]
        args: Vec<Expr>,
    },

    /// Value whose aliasing cannot be determined (pointer arithmetic, casts, ...)
    Opaque {
        #[serde(default)]
        operands: Vec<String>,
    },

    /// Anything that is certainly not a handle
    Literal,
}

impl Expr {
    pub fn new_handle(protocol: impl Into<String>) -> Self {
        Expr::New {
            protocol: protocol.into(),
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn call(function: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            function: function.into(),
            args,
        }
    }

    pub fn opaque(operands: &[&str]) -> Self {
        Expr::Opaque {
            operands: operands.iter().map(|s| s.to_string()).collect(),
        }
    }
}
