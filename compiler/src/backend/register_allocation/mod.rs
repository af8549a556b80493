// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::collections::{HashMap, VecDeque};

use log::debug;

mod allocatable_register;

pub use self::allocatable_register::AllocatableRegister;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation<R: AllocatableRegister> {
    Register(R),

    /// The pool was exhausted; the variable has to live in memory.
    Spilled,
}

impl<R: AllocatableRegister> Allocation<R> {
    #[must_use]
    pub fn register(&self) -> Option<R> {
        match self {
            Self::Register(register) => Some(*register),
            Self::Spilled => None,
        }
    }
}

/// Hands out physical registers to variables by name. Every variable gets at
/// most one register, and a register is either used or available, never
/// both.
#[derive(Debug)]
pub struct RegisterAllocator<R: AllocatableRegister> {
    available: VecDeque<R>,
    used: Vec<R>,
    assignments: HashMap<String, R>,
    scopes: Vec<Vec<R>>,
}

impl<R: AllocatableRegister> Default for RegisterAllocator<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AllocatableRegister> RegisterAllocator<R> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_pool(R::allocation_pool().iter().copied())
    }

    #[must_use]
    pub fn with_pool(pool: impl IntoIterator<Item = R>) -> Self {
        let mut available = VecDeque::new();
        for register in pool {
            if !available.contains(&register) {
                available.push_back(register);
            }
        }

        Self {
            available,
            used: Vec::new(),
            assignments: HashMap::new(),
            scopes: Vec::new(),
        }
    }

    /// Returns the register of `name`, assigning one first if it doesn't
    /// have one yet.
    pub fn allocate(&mut self, name: &str) -> Allocation<R> {
        if let Some(register) = self.assignments.get(name) {
            return Allocation::Register(*register);
        }

        let Some(register) = self.available.pop_front() else {
            debug!("No register left for `{name}`");
            return Allocation::Spilled;
        };

        debug!("Variable `{name}` is mapped to {register}");
        self.used.push(register);
        self.assignments.insert(name.to_string(), register);

        if let Some(scope) = self.scopes.last_mut() {
            scope.push(register);
        }

        Allocation::Register(register)
    }

    /// Returns the register to the pool. Freeing a register that isn't in use
    /// does nothing.
    pub fn free(&mut self, register: R) {
        let Some(index) = self.used.iter().position(|used| *used == register) else {
            return;
        };

        self.used.remove(index);
        self.assignments.retain(|_, assigned| *assigned != register);
        self.available.push_back(register);
    }

    #[must_use]
    pub fn register_of(&self, name: &str) -> Option<R> {
        self.assignments.get(name).copied()
    }

    #[must_use]
    pub fn is_used(&self, register: R) -> bool {
        self.used.contains(&register)
    }

    #[must_use]
    pub fn is_available(&self, register: R) -> bool {
        self.available.contains(&register)
    }

    /// The registers currently in use, in the order they were allocated.
    #[must_use]
    pub fn used_registers(&self) -> &[R] {
        &self.used
    }

    #[must_use]
    pub fn available_count(&self) -> usize {
        self.available.len()
    }

    #[must_use]
    pub fn callee_saved_used(&self) -> Vec<R> {
        self.used.iter().copied().filter(R::is_callee_saved).collect()
    }

    #[must_use]
    pub fn caller_saved_used(&self) -> Vec<R> {
        self.used.iter().copied().filter(R::is_caller_saved).collect()
    }

    /// Starts tracking the registers allocated from now on, e.g. for the body
    /// of a function.
    pub fn begin_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Frees every register that was allocated since the matching
    /// [`Self::begin_scope`], and returns them in allocation order.
    pub fn end_scope(&mut self) -> Vec<R> {
        let registers = self.scopes.pop().unwrap_or_default();

        for register in &registers {
            self.free(*register);
        }

        registers
    }

    pub fn dump_mappings(&self) {
        debug!("Register mappings:");
        let mut assignments: Vec<_> = self.assignments.iter().collect();
        assignments.sort_by(|a, b| a.0.cmp(b.0));
        for (name, register) in assignments {
            debug!("    {name} is mapped to {register}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt::Display;

    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum TestRegister {
        A,
        B,
        C,
        Ret,
    }

    impl Display for TestRegister {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl AllocatableRegister for TestRegister {
        fn allocation_pool() -> &'static [Self] {
            &[Self::A, Self::B, Self::C]
        }

        fn callee_saved_registers() -> &'static [Self] {
            &[Self::A, Self::B]
        }

        fn caller_saved_registers() -> &'static [Self] {
            &[Self::C, Self::Ret]
        }
    }

    fn assert_invariant(allocator: &RegisterAllocator<TestRegister>) {
        for register in TestRegister::allocation_pool() {
            assert!(
                !(allocator.is_used(*register) && allocator.is_available(*register)),
                "{register} is both used and available"
            );
        }
    }

    #[test]
    fn allocate_is_idempotent_per_name() {
        let mut allocator = RegisterAllocator::<TestRegister>::new();

        let first = allocator.allocate("x");
        let second = allocator.allocate("x");

        assert_eq!(first, Allocation::Register(TestRegister::A));
        assert_eq!(first, second);
        assert_eq!(allocator.available_count(), 2);
    }

    #[test]
    fn distinct_names_get_distinct_registers() {
        let mut allocator = RegisterAllocator::<TestRegister>::new();

        let x = allocator.allocate("x").register();
        let y = allocator.allocate("y").register();
        let z = allocator.allocate("z").register();

        assert_eq!([x, y, z], [Some(TestRegister::A), Some(TestRegister::B), Some(TestRegister::C)]);
        assert_invariant(&allocator);
    }

    #[test]
    fn exhausted_pool_spills() {
        let mut allocator = RegisterAllocator::<TestRegister>::new();
        for name in ["a", "b", "c"] {
            assert!(allocator.allocate(name).register().is_some());
        }

        assert_eq!(allocator.allocate("d"), Allocation::Spilled);
        assert_eq!(allocator.allocate("e"), Allocation::Spilled);
        assert_eq!(allocator.register_of("d"), None);
    }

    #[test]
    fn free_makes_register_available_again() {
        let mut allocator = RegisterAllocator::<TestRegister>::new();
        let Allocation::Register(register) = allocator.allocate("x") else {
            panic!("pool should not be empty");
        };

        allocator.free(register);

        assert!(allocator.is_available(register));
        assert!(!allocator.is_used(register));
        assert_eq!(allocator.register_of("x"), None);
        assert_invariant(&allocator);
    }

    #[rstest]
    #[case(&["a", "b", "-a", "c", "d", "-b", "e"])]
    #[case(&["a", "-a", "-a", "a", "a"])]
    #[case(&["a", "b", "c", "d", "-c", "d", "-d"])]
    fn used_and_available_never_overlap(#[case] script: &[&str]) {
        let mut allocator = RegisterAllocator::<TestRegister>::new();

        for step in script {
            if let Some(name) = step.strip_prefix('-') {
                if let Some(register) = allocator.register_of(name) {
                    allocator.free(register);
                }
            } else {
                allocator.allocate(step);
            }

            assert_invariant(&allocator);
            assert_eq!(allocator.used_registers().len() + allocator.available_count(), 3);
        }
    }

    #[test]
    fn saved_register_classification() {
        let mut allocator = RegisterAllocator::<TestRegister>::new();
        allocator.allocate("a");
        allocator.allocate("b");
        allocator.allocate("c");

        assert_eq!(allocator.callee_saved_used(), vec![TestRegister::A, TestRegister::B]);
        assert_eq!(allocator.caller_saved_used(), vec![TestRegister::C]);
    }

    #[test]
    fn end_scope_frees_only_the_scope() {
        let mut allocator = RegisterAllocator::<TestRegister>::new();
        allocator.allocate("global");

        allocator.begin_scope();
        allocator.allocate("local");
        allocator.allocate("global");
        let freed = allocator.end_scope();

        assert_eq!(freed, vec![TestRegister::B]);
        assert_eq!(allocator.register_of("global"), Some(TestRegister::A));
        assert_eq!(allocator.register_of("local"), None);
        assert_invariant(&allocator);
    }

    #[test]
    fn custom_pool_drops_duplicates() {
        let allocator = RegisterAllocator::with_pool([TestRegister::C, TestRegister::C, TestRegister::A]);
        assert_eq!(allocator.available_count(), 2);
    }
}
