/*
 * Order Expressions
 *
 * Compiles a regular call-order rule into a protocol:
 *
 *   init, (start, process*, finish)+, reset?
 *
 * Syntax:
 * - `a, b`   sequence
 * - `a | b`  alternation (binds weaker than `,`)
 * - `a*`     zero or more
 * - `a+`     one or more
 * - `a?`     optional
 * - `( .. )` grouping
 *
 * Pipeline: tokens → syntax tree → ε-NFA (Thompson) → DFA (subset
 * construction over ε-closures). Only the reachable part of the NFA is
 * converted. DFA states are named S0..Sn in discovery order; S0 is the
 * initial state and every state whose closure holds the NFA accept state is
 * final.
 *
 * # Time Complexity
 * O(2^n) worst case for n NFA states; rules in practice are tiny.
 */

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::ParseError;
use crate::features::typestate::domain::{Action, Protocol, State};

/// Syntax tree of an order expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderNode {
    Op(String),
    Sequence(Vec<OrderNode>),
    Alternative(Vec<OrderNode>),
    ZeroOrMore(Box<OrderNode>),
    OneOrMore(Box<OrderNode>),
    Optional(Box<OrderNode>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Comma,
    Bar,
    Star,
    Plus,
    Question,
    LParen,
    RParen,
}

/// Parsed order expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderExpression {
    pub source: String,
    pub root: OrderNode,
}

impl OrderExpression {
    /// Parse an order expression
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let tokens = tokenize(source)?;
        if tokens.is_empty() {
            return Err(ParseError::SyntaxError("empty order expression".to_string()));
        }
        let mut parser = OrderParser { tokens, pos: 0 };
        let root = parser.alternative()?;
        if let Some(token) = parser.peek() {
            return Err(ParseError::SyntaxError(format!(
                "unexpected token {:?} at position {}",
                token, parser.pos
            )));
        }
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    /// Compile to a deterministic protocol named `name`
    pub fn compile(&self, name: &str) -> Result<Protocol, ParseError> {
        let mut nfa = Nfa::default();
        let (start, accept) = nfa.build(&self.root);
        let protocol = nfa.to_protocol(name, start, accept);
        protocol.validate().map_err(ParseError::ValidationError)?;
        Ok(protocol)
    }

    /// Parse and compile in one step
    pub fn compile_str(name: &str, source: &str) -> Result<Protocol, ParseError> {
        Self::parse(source)?.compile(name)
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            ',' => tokens.push(Token::Comma),
            '|' => tokens.push(Token::Bar),
            '*' => tokens.push(Token::Star),
            '+' => tokens.push(Token::Plus),
            '?' => tokens.push(Token::Question),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = c.to_string();
                while let Some(&(_, next)) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        ident.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            other => {
                return Err(ParseError::SyntaxError(format!(
                    "unexpected character '{}' at offset {}",
                    other, idx
                )))
            }
        }
    }
    Ok(tokens)
}

/// Recursive-descent parser
struct OrderParser {
    tokens: Vec<Token>,
    pos: usize,
}

impl OrderParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn alternative(&mut self) -> Result<OrderNode, ParseError> {
        let mut branches = vec![self.sequence()?];
        while self.eat(&Token::Bar) {
            branches.push(self.sequence()?);
        }
        Ok(if branches.len() == 1 {
            branches.remove(0)
        } else {
            OrderNode::Alternative(branches)
        })
    }

    fn sequence(&mut self) -> Result<OrderNode, ParseError> {
        let mut items = vec![self.postfix()?];
        while self.eat(&Token::Comma) {
            items.push(self.postfix()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            OrderNode::Sequence(items)
        })
    }

    fn postfix(&mut self) -> Result<OrderNode, ParseError> {
        let mut node = self.atom()?;
        loop {
            node = match self.peek() {
                Some(Token::Star) => OrderNode::ZeroOrMore(Box::new(node)),
                Some(Token::Plus) => OrderNode::OneOrMore(Box::new(node)),
                Some(Token::Question) => OrderNode::Optional(Box::new(node)),
                _ => return Ok(node),
            };
            self.pos += 1;
        }
    }

    fn atom(&mut self) -> Result<OrderNode, ParseError> {
        match self.tokens.get(self.pos).cloned() {
            Some(Token::Ident(name)) => {
                self.pos += 1;
                Ok(OrderNode::Op(name))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.alternative()?;
                if !self.eat(&Token::RParen) {
                    return Err(ParseError::SyntaxError(format!(
                        "missing ')' at position {}",
                        self.pos
                    )));
                }
                Ok(inner)
            }
            Some(token) => Err(ParseError::SyntaxError(format!(
                "expected operation or '(' but found {:?} at position {}",
                token, self.pos
            ))),
            None => Err(ParseError::SyntaxError(
                "unexpected end of order expression".to_string(),
            )),
        }
    }
}

/// ε-NFA; `None` labels are ε-edges
#[derive(Debug, Default)]
struct Nfa {
    edges: Vec<Vec<(Option<String>, usize)>>,
}

impl Nfa {
    fn add_state(&mut self) -> usize {
        self.edges.push(Vec::new());
        self.edges.len() - 1
    }

    fn add_edge(&mut self, from: usize, label: Option<String>, to: usize) {
        self.edges[from].push((label, to));
    }

    /// Thompson construction; returns (start, accept) of the fragment
    fn build(&mut self, node: &OrderNode) -> (usize, usize) {
        match node {
            OrderNode::Op(name) => {
                let start = self.add_state();
                let accept = self.add_state();
                self.add_edge(start, Some(name.clone()), accept);
                (start, accept)
            }
            OrderNode::Sequence(items) => {
                let mut fragments = items.iter().map(|item| self.build(item)).collect::<Vec<_>>();
                let (start, mut accept) = fragments.remove(0);
                for (next_start, next_accept) in fragments {
                    self.add_edge(accept, None, next_start);
                    accept = next_accept;
                }
                (start, accept)
            }
            OrderNode::Alternative(branches) => {
                let start = self.add_state();
                let accept = self.add_state();
                for branch in branches {
                    let (s, a) = self.build(branch);
                    self.add_edge(start, None, s);
                    self.add_edge(a, None, accept);
                }
                (start, accept)
            }
            OrderNode::ZeroOrMore(inner) => {
                let start = self.add_state();
                let accept = self.add_state();
                let (s, a) = self.build(inner);
                self.add_edge(start, None, s);
                self.add_edge(start, None, accept);
                self.add_edge(a, None, s);
                self.add_edge(a, None, accept);
                (start, accept)
            }
            OrderNode::OneOrMore(inner) => {
                let start = self.add_state();
                let accept = self.add_state();
                let (s, a) = self.build(inner);
                self.add_edge(start, None, s);
                self.add_edge(a, None, s);
                self.add_edge(a, None, accept);
                (start, accept)
            }
            OrderNode::Optional(inner) => {
                let start = self.add_state();
                let accept = self.add_state();
                let (s, a) = self.build(inner);
                self.add_edge(start, None, s);
                self.add_edge(start, None, accept);
                self.add_edge(a, None, accept);
                (start, accept)
            }
        }
    }

    fn epsilon_closure(&self, seeds: impl IntoIterator<Item = usize>) -> BTreeSet<usize> {
        let mut closure: BTreeSet<usize> = BTreeSet::new();
        let mut stack: Vec<usize> = seeds.into_iter().collect();
        while let Some(state) = stack.pop() {
            if !closure.insert(state) {
                continue;
            }
            for (label, to) in &self.edges[state] {
                if label.is_none() && !closure.contains(to) {
                    stack.push(*to);
                }
            }
        }
        closure
    }

    /// Powerset construction straight into a protocol
    fn to_protocol(&self, name: &str, start: usize, accept: usize) -> Protocol {
        let state_name = |idx: usize| State::new(format!("S{}", idx));

        let mut protocol = Protocol::new(name);
        let mut known: BTreeMap<BTreeSet<usize>, usize> = BTreeMap::new();
        let mut queue: VecDeque<(usize, BTreeSet<usize>)> = VecDeque::new();

        let initial = self.epsilon_closure([start]);
        protocol.set_initial_state(state_name(0));
        if initial.contains(&accept) {
            protocol.add_final_state(state_name(0));
        }
        known.insert(initial.clone(), 0);
        queue.push_back((0, initial));

        while let Some((dfa_state, closure)) = queue.pop_front() {
            // group labelled edges by operation, deterministic order
            let mut moves: BTreeMap<&str, BTreeSet<usize>> = BTreeMap::new();
            for &nfa_state in &closure {
                for (label, to) in &self.edges[nfa_state] {
                    if let Some(op) = label {
                        moves.entry(op.as_str()).or_default().insert(*to);
                    }
                }
            }

            for (op, targets) in moves {
                let target_closure = self.epsilon_closure(targets);
                let target = match known.get(&target_closure) {
                    Some(&idx) => idx,
                    None => {
                        let idx = known.len();
                        if target_closure.contains(&accept) {
                            protocol.add_final_state(state_name(idx));
                        }
                        known.insert(target_closure.clone(), idx);
                        queue.push_back((idx, target_closure));
                        idx
                    }
                };
                protocol.add_transition(state_name(dfa_state), Action::new(op), state_name(target));
            }
        }

        protocol
    }
}
