// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

use std::fmt::Display;

use strum::{EnumIter, EnumString, IntoEnumIterator};

use crate::AllocatableRegister;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum Amd64Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
}

impl Amd64Register {
    #[must_use]
    pub const fn name64(&self) -> &'static str {
        self.name(Amd64RegisterNameMode::Quad)
    }

    #[must_use]
    pub const fn name32(&self) -> &'static str {
        self.name(Amd64RegisterNameMode::Long)
    }

    #[must_use]
    pub const fn name(&self, mode: Amd64RegisterNameMode) -> &'static str {
        match (mode, self) {
            (Amd64RegisterNameMode::Quad, Self::Rax) => "rax",
            (Amd64RegisterNameMode::Long, Self::Rax) => "eax",
            (Amd64RegisterNameMode::Quad, Self::Rbx) => "rbx",
            (Amd64RegisterNameMode::Long, Self::Rbx) => "ebx",
            (Amd64RegisterNameMode::Quad, Self::Rcx) => "rcx",
            (Amd64RegisterNameMode::Long, Self::Rcx) => "ecx",
            (Amd64RegisterNameMode::Quad, Self::Rdx) => "rdx",
            (Amd64RegisterNameMode::Long, Self::Rdx) => "edx",
            (Amd64RegisterNameMode::Quad, Self::Rsi) => "rsi",
            (Amd64RegisterNameMode::Long, Self::Rsi) => "esi",
            (Amd64RegisterNameMode::Quad, Self::Rdi) => "rdi",
            (Amd64RegisterNameMode::Long, Self::Rdi) => "edi",
            (Amd64RegisterNameMode::Quad, Self::Rbp) => "rbp",
            (Amd64RegisterNameMode::Long, Self::Rbp) => "ebp",
            (Amd64RegisterNameMode::Quad, Self::Rsp) => "rsp",
            (Amd64RegisterNameMode::Long, Self::Rsp) => "esp",
            (Amd64RegisterNameMode::Quad, Self::R8) => "r8",
            (Amd64RegisterNameMode::Long, Self::R8) => "r8d",
            (Amd64RegisterNameMode::Quad, Self::R9) => "r9",
            (Amd64RegisterNameMode::Long, Self::R9) => "r9d",
            (Amd64RegisterNameMode::Quad, Self::R10) => "r10",
            (Amd64RegisterNameMode::Long, Self::R10) => "r10d",
            (Amd64RegisterNameMode::Quad, Self::R11) => "r11",
            (Amd64RegisterNameMode::Long, Self::R11) => "r11d",
            (Amd64RegisterNameMode::Quad, Self::R12) => "r12",
            (Amd64RegisterNameMode::Long, Self::R12) => "r12d",
            (Amd64RegisterNameMode::Quad, Self::R13) => "r13",
            (Amd64RegisterNameMode::Long, Self::R13) => "r13d",
            (Amd64RegisterNameMode::Quad, Self::R14) => "r14",
            (Amd64RegisterNameMode::Long, Self::R14) => "r14d",
            (Amd64RegisterNameMode::Quad, Self::R15) => "r15",
            (Amd64RegisterNameMode::Long, Self::R15) => "r15d",
        }
    }

    /// Parses a 64-bit register name such as `rbx` or `r12`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    /// Whether `name` is the 64- or 32-bit name of a register.
    #[must_use]
    pub fn is_register_name(name: &str) -> bool {
        Self::iter().any(|register| register.name64() == name || register.name32() == name)
    }
}

impl AllocatableRegister for Amd64Register {
    fn allocation_pool() -> &'static [Amd64Register] {
        // rax, rdi, rsi and rdx carry syscall numbers, arguments and return
        // values, so variables never live there.
        const REGISTERS: &[Amd64Register] = &[
            Amd64Register::Rbx,
            Amd64Register::R12,
            Amd64Register::R13,
            Amd64Register::R14,
            Amd64Register::R15,
        ];

        REGISTERS
    }

    fn callee_saved_registers() -> &'static [Amd64Register] {
        const REGISTERS: &[Amd64Register] = &[
            Amd64Register::Rbx,
            Amd64Register::Rbp,
            Amd64Register::R12,
            Amd64Register::R13,
            Amd64Register::R14,
            Amd64Register::R15,
        ];

        REGISTERS
    }

    fn caller_saved_registers() -> &'static [Amd64Register] {
        const REGISTERS: &[Amd64Register] = &[
            Amd64Register::Rax,
            Amd64Register::Rcx,
            Amd64Register::Rdx,
            Amd64Register::Rsi,
            Amd64Register::Rdi,
            Amd64Register::R8,
            Amd64Register::R9,
            Amd64Register::R10,
            Amd64Register::R11,
        ];

        REGISTERS
    }
}

impl Display for Amd64Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name(Amd64RegisterNameMode::Quad))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amd64RegisterNameMode {
    Quad,
    Long,
}
