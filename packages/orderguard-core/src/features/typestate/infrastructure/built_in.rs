/*
 * Built-in Protocols
 *
 * Standard protocol definitions usable without configuration:
 * - CipherProtocol: cipher-mode handle lifecycle
 *   create → init → (start → process* → finish)+ → reset?
 */

use crate::features::typestate::domain::{Action, Protocol, State};
use crate::features::typestate::ports::ProtocolDefinition;

/// Cipher-mode protocol
///
/// States: Created → Initialized → Started ⇄ Finished
///
/// Transitions:
/// - Created     --init()-->    Initialized
/// - Initialized --start()-->   Started
/// - Started     --process()--> Started
/// - Started     --finish()-->  Finished
/// - Finished    --start()-->   Started   (next message)
/// - Finished    --reset()-->   Created
///
/// Final states: {Finished, Created}
///
/// Method aliases (Botan `Cipher_Mode` names):
/// - set_key → init, start_msg → start, update → process, clear → reset
///
/// Violations:
/// - finish()/process() without start()
/// - start() twice without finish()
/// - start() before the key is set
pub struct CipherProtocol;

impl CipherProtocol {
    /// Registry name
    pub const NAME: &'static str = "Cipher";

    /// Define cipher protocol
    ///
    /// # Example
    /// ```ignore
    /// let protocol = CipherProtocol::define();
    /// assert_eq!(protocol.initial_state(), State::new("Created"));
    /// assert!(protocol.can_transition(
    ///     &State::new("Created"),
    ///     &Action::new("init"),
    ///     &State::new("Initialized")
    /// ));
    /// ```
    pub fn define() -> Protocol {
        let mut protocol = Protocol::new(Self::NAME);

        let created = State::new("Created");
        let initialized = State::new("Initialized");
        let started = State::new("Started");
        let finished = State::new("Finished");

        protocol.set_initial_state(created.clone());
        protocol.add_final_state(finished.clone());
        protocol.add_final_state(created.clone()); // after reset()

        // Transitions
        protocol.add_transition(created.clone(), Action::new("init"), initialized.clone());
        protocol.add_transition(initialized.clone(), Action::new("start"), started.clone());
        protocol.add_transition(started.clone(), Action::new("process"), started.clone());
        protocol.add_transition(started.clone(), Action::new("finish"), finished.clone());
        protocol.add_transition(finished.clone(), Action::new("start"), started.clone());
        protocol.add_transition(finished.clone(), Action::new("reset"), created.clone());

        // Aliases
        protocol.add_alias("set_key", "init");
        protocol.add_alias("start_msg", "start");
        protocol.add_alias("update", "process");
        protocol.add_alias("clear", "reset");

        protocol
    }
}

impl ProtocolDefinition for CipherProtocol {
    fn define() -> Protocol {
        CipherProtocol::define()
    }
}
