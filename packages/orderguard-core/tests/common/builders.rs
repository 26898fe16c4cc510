//! Test data builders
//!
//! `BodyBuilder` hands out one source line per statement, in the order the
//! statements are written (branch bodies included), so tests can predict
//! violation lines.

use orderguard_core::{
    Expr, Function, Param, Program, ProtocolRegistry, Stmt, TypestateAnalyzer, TypestateResult,
    VerifierConfig,
};

/// Builder for a statement list
#[derive(Debug)]
pub struct BodyBuilder {
    stmts: Vec<Stmt>,
    line: u32,
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyBuilder {
    /// Create a builder starting at line 1
    pub fn new() -> Self {
        Self::at(1)
    }

    fn at(line: u32) -> Self {
        Self {
            stmts: Vec::new(),
            line,
        }
    }

    /// Line the next statement will get
    pub fn next_line(&self) -> u32 {
        self.line
    }

    fn push(mut self, stmt: Stmt) -> Self {
        self.stmts.push(stmt);
        self.line += 1;
        self
    }

    /// `let var = new Protocol()`
    pub fn create(self, var: &str, protocol: &str) -> Self {
        let line = self.line;
        self.push(Stmt::let_(var, Expr::new_handle(protocol), line))
    }

    /// `let var = new Cipher()`
    pub fn cipher(self, var: &str) -> Self {
        self.create(var, "Cipher")
    }

    /// `var.method()`
    pub fn op(self, var: &str, method: &str) -> Self {
        let line = self.line;
        self.push(Stmt::method_call(var, method, line))
    }

    /// Several operations on one receiver
    pub fn ops(mut self, var: &str, methods: &[&str]) -> Self {
        for method in methods {
            self = self.op(var, method);
        }
        self
    }

    /// `let to = from`
    pub fn alias(self, to: &str, from: &str) -> Self {
        let line = self.line;
        self.push(Stmt::let_(to, Expr::var(from), line))
    }

    /// `target = expr`
    pub fn assign(self, target: &str, value: Expr) -> Self {
        let line = self.line;
        self.push(Stmt::assign(target, value, line))
    }

    /// `function(args...)` as a statement
    pub fn call(self, function: &str, args: &[&str]) -> Self {
        let line = self.line;
        let args = args.iter().map(|a| Expr::var(*a)).collect();
        self.push(Stmt::call(function, args, line))
    }

    /// `if (..) { then } else { otherwise }`
    pub fn if_else(
        mut self,
        then: impl FnOnce(BodyBuilder) -> BodyBuilder,
        otherwise: impl FnOnce(BodyBuilder) -> BodyBuilder,
    ) -> Self {
        let line = self.line;
        let then_body = then(BodyBuilder::at(line + 1));
        let else_body = otherwise(BodyBuilder::at(then_body.line));
        self.line = else_body.line;
        self.stmts.push(Stmt::if_else(
            then_body.stmts,
            else_body.stmts,
            line,
        ));
        self
    }

    /// `if (..) { then }`
    pub fn if_then(self, then: impl FnOnce(BodyBuilder) -> BodyBuilder) -> Self {
        self.if_else(then, |b| b)
    }

    /// `while (..) { body }`
    pub fn repeat(mut self, body: impl FnOnce(BodyBuilder) -> BodyBuilder) -> Self {
        let line = self.line;
        let inner = body(BodyBuilder::at(line + 1));
        self.line = inner.line;
        self.stmts.push(Stmt::loop_(inner.stmts, line));
        self
    }

    /// `{ body }`
    pub fn block(mut self, body: impl FnOnce(BodyBuilder) -> BodyBuilder) -> Self {
        let inner = body(BodyBuilder::at(self.line));
        self.line = inner.line;
        self.stmts
            .push(Stmt::Block { body: inner.stmts });
        self
    }

    /// `return var;` / `return;`
    pub fn ret(self, var: Option<&str>) -> Self {
        let line = self.line;
        self.push(Stmt::ret(var.map(Expr::var), line))
    }

    pub fn build(self) -> Vec<Stmt> {
        self.stmts
    }
}

/// Function without parameters
pub fn function(name: &str, body: BodyBuilder) -> Function {
    Function::new(name, vec![], body.build())
}

/// Function with untyped parameters
pub fn function_with_params(name: &str, params: &[&str], body: BodyBuilder) -> Function {
    Function::new(
        name,
        params.iter().map(|p| Param::new(*p)).collect(),
        body.build(),
    )
}

/// Program with `main` as its only function
pub fn main_program(body: BodyBuilder) -> Program {
    Program::new("test").with_function(function("main", body))
}

/// Analyze with the built-in protocols and default configuration
pub fn analyze(program: &Program) -> TypestateResult {
    analyze_with(program, VerifierConfig::default())
}

pub fn analyze_with(program: &Program, config: VerifierConfig) -> TypestateResult {
    let registry = ProtocolRegistry::with_builtin();
    TypestateAnalyzer::new(&registry, config).analyze(program)
}
