//! Feature modules

pub mod typestate;
