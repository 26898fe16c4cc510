/*
 * Protocol Registry
 *
 * Name → protocol lookup used when a program creates a handle
 * (`Expr::New { protocol }`). Read-only during analysis, so one registry
 * can be shared by every batch worker.
 */

use rustc_hash::FxHashMap;

use super::{CipherProtocol, OrderExpression, ParseError, ProtocolParser};
use crate::errors::{OrderguardError, Result};
use crate::features::typestate::domain::Protocol;
use crate::features::typestate::ports::ProtocolDefinition;

#[derive(Debug, Clone, Default)]
pub struct ProtocolRegistry {
    protocols: FxHashMap<String, Protocol>,
}

impl ProtocolRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in protocols (`Cipher`)
    pub fn with_builtin() -> Self {
        let mut protocols = FxHashMap::default();
        protocols.insert(
            CipherProtocol::NAME.to_string(),
            <CipherProtocol as ProtocolDefinition>::define(),
        );
        Self { protocols }
    }

    /// Add a protocol
    ///
    /// Fails if the protocol is malformed or the name is taken.
    pub fn register(&mut self, protocol: Protocol) -> Result<()> {
        protocol.validate().map_err(OrderguardError::protocol)?;
        if self.protocols.contains_key(&protocol.name) {
            return Err(OrderguardError::protocol(format!(
                "Protocol '{}' is already registered",
                protocol.name
            )));
        }
        self.protocols.insert(protocol.name.clone(), protocol);
        Ok(())
    }

    /// Add a protocol defined in code
    pub fn register_definition<D: ProtocolDefinition>(&mut self) -> Result<()> {
        self.register(D::define())
    }

    /// Compile and add an order rule (`init, (start, process*, finish)+`)
    pub fn register_order(&mut self, name: &str, order: &str) -> Result<()> {
        let protocol = OrderExpression::compile_str(name, order)?;
        self.register(protocol)
    }

    /// Add every protocol from a YAML document (single mapping or sequence)
    pub fn load_yaml(&mut self, yaml: &str) -> Result<usize> {
        let document: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| ParseError::SyntaxError(format!("YAML parse error: {}", e)))?;
        let protocols = if document.is_sequence() {
            ProtocolParser::from_yaml_list(yaml)?
        } else {
            vec![ProtocolParser::from_yaml(yaml)?]
        };
        let count = protocols.len();
        for protocol in protocols {
            self.register(protocol)?;
        }
        Ok(count)
    }

    pub fn get(&self, name: &str) -> Option<&Protocol> {
        self.protocols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.protocols.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.protocols.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.protocols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.protocols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::typestate::domain::State;

    #[test]
    fn test_builtin_registry() {
        let registry = ProtocolRegistry::with_builtin();

        assert_eq!(registry.names(), vec!["Cipher"]);
        let cipher = registry.get("Cipher").unwrap();
        assert_eq!(cipher.initial_state(), State::new("Created"));
        assert!(registry.get("Digest").is_none());
    }

    #[test]
    fn test_register_duplicate_rejected() {
        let mut registry = ProtocolRegistry::with_builtin();

        let err = registry.register(CipherProtocol::define()).unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_register_definition() {
        struct Session;

        impl ProtocolDefinition for Session {
            fn define() -> Protocol {
                let mut protocol = Protocol::new("Session");
                protocol.set_initial_state(State::new("Closed"));
                protocol.add_transition(
                    State::new("Closed"),
                    crate::features::typestate::domain::Action::new("open"),
                    State::new("Open"),
                );
                protocol
            }
        }

        let mut registry = ProtocolRegistry::new();
        registry.register_definition::<Session>().unwrap();

        assert_eq!(registry.get("Session").unwrap().initial_state(), State::new("Closed"));
        assert!(registry.register_definition::<Session>().is_err());
    }

    #[test]
    fn test_register_order() {
        let mut registry = ProtocolRegistry::new();
        registry.register_order("Lock", "acquire, release").unwrap();

        assert!(registry.contains("Lock"));
        assert!(registry.register_order("Bad", "acquire,").is_err());
    }

    #[test]
    fn test_load_yaml_single_and_list() {
        let mut registry = ProtocolRegistry::new();

        let single = "protocol: A\norder: \"open, close\"\n";
        assert_eq!(registry.load_yaml(single).unwrap(), 1);

        let list = "- protocol: B\n  order: \"x*\"\n- protocol: C\n  order: \"y+\"\n";
        assert_eq!(registry.load_yaml(list).unwrap(), 2);
        assert_eq!(registry.names(), vec!["A", "B", "C"]);
    }
}
