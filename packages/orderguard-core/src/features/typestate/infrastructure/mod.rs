/*
 * Typestate Infrastructure
 *
 * Protocol sources (built-ins, YAML/JSON, order expressions), the protocol
 * registry, and the union-find behind alias classes.
 */

mod built_in;
mod order_expr;
mod protocol_parser;
mod registry;
mod union_find;

pub use built_in::CipherProtocol;
pub use order_expr::{OrderExpression, OrderNode};
pub use protocol_parser::{
    ParseError, ProtocolBuilder, ProtocolConfig, ProtocolParser, TransitionConfig,
};
pub use registry::ProtocolRegistry;
pub use union_find::UnionFind;
