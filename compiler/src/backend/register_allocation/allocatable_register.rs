// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{fmt::{Debug, Display}, hash::Hash};

pub trait AllocatableRegister: Debug + Display + Clone + Copy + PartialEq + Eq + Hash + 'static {
    /// The registers variables may live in, in the order they are handed
    /// out. Registers used for passing syscall arguments and the return
    /// value are never part of it.
    #[must_use]
    fn allocation_pool() -> &'static [Self];

    #[must_use]
    fn callee_saved_registers() -> &'static [Self];

    #[must_use]
    fn caller_saved_registers() -> &'static [Self];

    #[must_use]
    fn is_caller_saved(&self) -> bool {
        Self::caller_saved_registers().contains(self)
    }

    #[must_use]
    fn is_callee_saved(&self) -> bool {
        Self::callee_saved_registers().contains(self)
    }
}
