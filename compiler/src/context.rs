// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::{collections::{HashMap, HashSet}, fmt::Write};

use log::{debug, warn};

use crate::{
    backend::Amd64Register,
    rtl::VarType,
    Allocation,
    OptimizationLevel,
    RegisterAllocator,
};

/// Where the value of an operand can be found at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Immediate(i64),
    Register(Amd64Register),
    Memory(String),
}

impl Location {
    /// The operand as written in a 32-bit instruction.
    #[must_use]
    pub fn long(&self) -> String {
        match self {
            Self::Immediate(value) => value.to_string(),
            Self::Register(register) => register.name32().to_string(),
            Self::Memory(name) => format!("dword [{name}]"),
        }
    }
}

/// The state threaded through instruction selection: the section buffers,
/// the label counters and everything known about variables.
///
/// One instance serves exactly one compilation. Labels are only unique within
/// the instance that minted them.
#[derive(Debug)]
pub struct CodeGenContext {
    data_section: String,
    bss_section: String,
    next_label_id: usize,
    next_string_id: usize,
    variable_types: HashMap<String, VarType>,
    variable_registers: HashMap<String, Amd64Register>,
    register_allocator: RegisterAllocator<Amd64Register>,
    declared_symbols: HashSet<String>,
    in_function: bool,
    current_function: Option<String>,
    returns_early: bool,
    saved_registers: Vec<Amd64Register>,
    region_depth: usize,
    optimization_level: OptimizationLevel,
}

impl Default for CodeGenContext {
    fn default() -> Self {
        Self::new(OptimizationLevel::default())
    }
}

impl CodeGenContext {
    #[must_use]
    pub fn new(optimization_level: OptimizationLevel) -> Self {
        Self {
            data_section: String::new(),
            bss_section: String::new(),
            next_label_id: 0,
            next_string_id: 0,
            variable_types: HashMap::new(),
            variable_registers: HashMap::new(),
            register_allocator: RegisterAllocator::new(),
            declared_symbols: HashSet::new(),
            in_function: false,
            current_function: None,
            returns_early: false,
            saved_registers: Vec::new(),
            region_depth: 0,
            optimization_level,
        }
    }

    #[must_use]
    pub fn with_register_allocator(mut self, register_allocator: RegisterAllocator<Amd64Register>) -> Self {
        self.register_allocator = register_allocator;
        self
    }

    #[must_use]
    pub fn optimization_level(&self) -> OptimizationLevel {
        self.optimization_level
    }

    /// Returns `prefix` followed by a number that was never handed out
    /// before by this context.
    pub fn new_label(&mut self, prefix: &str) -> String {
        let id = self.next_label_id;
        self.next_label_id += 1;
        format!("{prefix}{id}")
    }

    pub fn new_string_label(&mut self) -> String {
        let id = self.next_string_id;
        self.next_string_id += 1;
        format!("str{id}")
    }

    /// Appends `label: directive` to the data section. Emitting the same
    /// label twice produces a duplicate symbol; callers check
    /// [`Self::is_declared`] first.
    pub fn emit_data(&mut self, label: &str, directive: &str) {
        _ = writeln!(self.data_section, "{label}: {directive}");
        self.declared_symbols.insert(label.to_string());
    }

    pub fn emit_bss(&mut self, label: &str, directive: &str) {
        _ = writeln!(self.bss_section, "{label}: {directive}");
        self.declared_symbols.insert(label.to_string());
    }

    #[must_use]
    pub fn data_section(&self) -> &str {
        &self.data_section
    }

    #[must_use]
    pub fn bss_section(&self) -> &str {
        &self.bss_section
    }

    #[must_use]
    pub fn is_declared(&self, symbol: &str) -> bool {
        self.declared_symbols.contains(symbol)
    }

    #[must_use]
    pub fn variable_type(&self, name: &str) -> Option<VarType> {
        self.variable_types.get(name).copied()
    }

    pub fn set_variable_type(&mut self, name: &str, var_type: VarType) {
        self.variable_types.insert(name.to_string(), var_type);
    }

    #[must_use]
    pub fn register_of(&self, name: &str) -> Option<Amd64Register> {
        self.variable_registers.get(name).copied()
    }

    #[must_use]
    pub fn register_allocator(&self) -> &RegisterAllocator<Amd64Register> {
        &self.register_allocator
    }

    /// Tries to give `name` a register. Returns `None` when variables live
    /// in memory at this optimization level, or when the pool is exhausted.
    pub fn allocate_variable(&mut self, name: &str) -> Option<Amd64Register> {
        if !self.optimization_level.allocates_registers() {
            return None;
        }

        match self.register_allocator.allocate(name) {
            Allocation::Register(register) => {
                self.variable_registers.insert(name.to_string(), register);
                Some(register)
            }

            Allocation::Spilled => {
                warn!("Register pool exhausted, `{name}` is stored in memory");
                None
            }
        }
    }

    /// Resolves an RTL operand: an integer literal, a physical register
    /// name, or a variable.
    #[must_use]
    pub fn location_of(&self, operand: &str) -> Location {
        if let Ok(value) = operand.parse() {
            return Location::Immediate(value);
        }

        if let Some(register) = self.register_of(operand) {
            return Location::Register(register);
        }

        if let Some(register) = Amd64Register::from_name(operand) {
            return Location::Register(register);
        }

        Location::Memory(operand.to_string())
    }

    /// Writes the cheapest instruction that loads `source` into
    /// `destination`.
    pub fn optimal_mov(&self, out: &mut String, destination: &str, source: &str) -> std::fmt::Result {
        if source == "0" {
            writeln!(out, "    xor {destination}, {destination}")
        } else {
            writeln!(out, "    mov {destination}, {source}")
        }
    }

    #[must_use]
    pub fn in_function(&self) -> bool {
        self.in_function
    }

    #[must_use]
    pub fn current_function(&self) -> Option<&str> {
        self.current_function.as_deref()
    }

    pub fn enter_function(&mut self, name: &str) {
        debug!("Entering function `{name}`");
        self.in_function = true;
        self.current_function = Some(name.to_string());
        self.returns_early = false;
        self.register_allocator.begin_scope();
    }

    /// Frees the registers of the function's variables, and returns the
    /// callee-saved ones among them. These are also kept around until the
    /// next function ends, see [`Self::saved_registers`].
    pub fn leave_function(&mut self) -> Vec<Amd64Register> {
        self.register_allocator.dump_mappings();

        let callee_saved = self.register_allocator.callee_saved_used();
        let freed = self.register_allocator.end_scope();
        self.variable_registers.retain(|_, register| !freed.contains(register));

        self.saved_registers = callee_saved.into_iter()
            .filter(|register| freed.contains(register))
            .collect();

        self.in_function = false;
        self.current_function = None;
        self.saved_registers.clone()
    }

    /// The callee-saved registers the most recently finished function used.
    #[must_use]
    pub fn saved_registers(&self) -> &[Amd64Register] {
        &self.saved_registers
    }

    /// Called at the start of a branch or loop.
    pub fn enter_region(&mut self) {
        self.region_depth += 1;
    }

    pub fn leave_region(&mut self) {
        self.region_depth = self.region_depth.saturating_sub(1);
    }

    /// Whether the code generated now runs exactly once, in program order.
    /// Only then can a variable's initial value be put in the data section.
    #[must_use]
    pub fn is_straight_line(&self) -> bool {
        !self.in_function && self.region_depth == 0
    }

    pub fn mark_early_return(&mut self) {
        self.returns_early = true;
    }

    #[must_use]
    pub fn returns_early(&self) -> bool {
        self.returns_early
    }
}
