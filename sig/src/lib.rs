// Copyright (C) 2024 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! The statement tree handed to the code generator. The front end produces
//! it, the module resolver flattens it, and the backend only ever reads it.

#![deny(elided_lifetimes_in_paths)]

mod expression;
mod statement;

pub use self::{
    expression::{Atom, Condition, Expression, Literal},
    statement::{
        AsmStatement,
        AssignStatement,
        CallStatement,
        DeclareStatement,
        ElifClause,
        ForStatement,
        FunctionStatement,
        IfStatement,
        PrintStatement,
        PrintVariableStatement,
        ReturnStatement,
        Statement,
        WhileStatement,
    },
};
