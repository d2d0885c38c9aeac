//! Structural well-formedness checks for a finished module.
//!
//! Checked per defined function:
//!   - every block ends in a terminator
//!   - branch targets exist
//!   - `ret` operands match the declared return type
//!   - callees are declared and non-variadic calls pass the right count
//!   - phi incoming blocks are predecessors of the phi's block
//!   - a store into an `alloca` or `getelementptr` address writes a value
//!     of the addressed type
//!
//! Unreachable blocks are reported at debug level only; they are legal.

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Dfs;
use thiserror::Error;

use super::{BlockId, Function, Instr, Module, Reg, Terminator, Type, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("block '{block}' in @{func} has no terminator")]
    NoTerminator { func: String, block: String },

    #[error("block '{block}' in @{func} branches to unknown block {target}")]
    UnknownTarget {
        func: String,
        block: String,
        target: BlockId,
    },

    #[error("@{func} returns {found} but is declared to return {expected}")]
    ReturnTypeMismatch {
        func: String,
        expected: Type,
        found: String,
    },

    #[error("@{func} calls undeclared function @{callee}")]
    UnknownCallee { func: String, callee: String },

    #[error("@{func} calls @{callee} with {found} arguments, expected {expected}")]
    ArgCount {
        func: String,
        callee: String,
        expected: usize,
        found: usize,
    },

    #[error("store in block '{block}' of @{func} writes {found} into a {expected} slot")]
    StoreTypeMismatch {
        func: String,
        block: String,
        expected: Type,
        found: Type,
    },

    #[error("phi in block '{block}' of @{func} names non-predecessor '{incoming}'")]
    PhiPredecessor {
        func: String,
        block: String,
        incoming: String,
    },
}

/// Verify every defined function in the module.
pub fn verify_module(module: &Module) -> Result<(), Vec<VerifyError>> {
    let mut errors = Vec::new();
    for func in module.functions.iter().filter(|f| !f.is_declaration()) {
        verify_function(module, func, &mut errors);
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn verify_function(module: &Module, func: &Function, errors: &mut Vec<VerifyError>) {
    let ids: BTreeSet<BlockId> = func.blocks.iter().map(|b| b.id).collect();
    let preds = predecessors(func);
    let slots = slot_types(module, func);

    for block in &func.blocks {
        match &block.term {
            None => errors.push(VerifyError::NoTerminator {
                func: func.name.clone(),
                block: block.label.clone(),
            }),
            Some(term) => {
                for target in term.successors() {
                    if !ids.contains(&target) {
                        errors.push(VerifyError::UnknownTarget {
                            func: func.name.clone(),
                            block: block.label.clone(),
                            target,
                        });
                    }
                }
                if let Terminator::Ret(value) = term {
                    let found = value.as_ref().map(|v| v.ty.clone()).unwrap_or(Type::VOID);
                    if found != func.ret {
                        errors.push(VerifyError::ReturnTypeMismatch {
                            func: func.name.clone(),
                            expected: func.ret.clone(),
                            found: found.to_string(),
                        });
                    }
                }
            }
        }

        for instr in &block.instrs {
            match instr {
                Instr::Call { callee, args, .. } => match module.function(callee) {
                    None => errors.push(VerifyError::UnknownCallee {
                        func: func.name.clone(),
                        callee: callee.clone(),
                    }),
                    Some(target) => {
                        let arity_ok = if target.variadic {
                            args.len() >= target.params.len()
                        } else {
                            args.len() == target.params.len()
                        };
                        if !arity_ok {
                            errors.push(VerifyError::ArgCount {
                                func: func.name.clone(),
                                callee: callee.clone(),
                                expected: target.params.len(),
                                found: args.len(),
                            });
                        }
                    }
                },
                Instr::Store { value, ptr } => {
                    let expected = ptr.as_reg().and_then(|r| slots.get(&r));
                    if let Some(expected) = expected {
                        if *expected != value.ty {
                            errors.push(VerifyError::StoreTypeMismatch {
                                func: func.name.clone(),
                                block: block.label.clone(),
                                expected: expected.clone(),
                                found: value.ty.clone(),
                            });
                        }
                    }
                }
                Instr::Phi { incoming, .. } => {
                    let block_preds = preds.get(&block.id);
                    for (_, from) in incoming {
                        if !block_preds.is_some_and(|p| p.contains(from)) {
                            errors.push(VerifyError::PhiPredecessor {
                                func: func.name.clone(),
                                block: block.label.clone(),
                                incoming: func.label_of(*from),
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }

    let reachable = reachable_blocks(func);
    for block in &func.blocks {
        if !reachable.contains(&block.id) {
            log::debug!("@{}: block '{}' is unreachable", func.name, block.label);
        }
    }
}

/// Pointee type of every address whose origin is known: `alloca` results
/// and `getelementptr` results walked through arrays and struct fields.
fn slot_types(module: &Module, func: &Function) -> BTreeMap<Reg, Type> {
    let mut slots = BTreeMap::new();
    for instr in func.instrs() {
        match instr {
            Instr::Alloca { dst, ty } => {
                slots.insert(*dst, ty.clone());
            }
            Instr::Gep {
                dst,
                base_ty,
                indices,
                ..
            } => {
                if let Some(ty) = gep_target(module, base_ty, indices.get(1..).unwrap_or(&[])) {
                    slots.insert(*dst, ty);
                }
            }
            _ => {}
        }
    }
    slots
}

fn gep_target(module: &Module, base: &Type, path: &[Value]) -> Option<Type> {
    let mut ty = base.clone();
    for idx in path {
        ty = match ty {
            Type::Array(elem, _) => *elem,
            Type::Struct(name) => {
                let field = usize::try_from(idx.as_const_int()?).ok()?;
                module.struct_type(&name)?.fields.get(field)?.clone()
            }
            _ => return None,
        };
    }
    Some(ty)
}

fn predecessors(func: &Function) -> BTreeMap<BlockId, BTreeSet<BlockId>> {
    let mut preds: BTreeMap<BlockId, BTreeSet<BlockId>> = BTreeMap::new();
    for block in &func.blocks {
        if let Some(term) = &block.term {
            for succ in term.successors() {
                preds.entry(succ).or_default().insert(block.id);
            }
        }
    }
    preds
}

/// Control-flow graph of a function, one node per block.
pub fn cfg(func: &Function) -> DiGraphMap<BlockId, ()> {
    let mut graph = DiGraphMap::new();
    for block in &func.blocks {
        graph.add_node(block.id);
        if let Some(term) = &block.term {
            for succ in term.successors() {
                graph.add_edge(block.id, succ, ());
            }
        }
    }
    graph
}

/// Blocks reachable from the entry block.
pub fn reachable_blocks(func: &Function) -> BTreeSet<BlockId> {
    let mut seen = BTreeSet::new();
    let Some(entry) = func.entry() else {
        return seen;
    };
    let graph = cfg(func);
    let mut dfs = Dfs::new(&graph, entry);
    while let Some(id) = dfs.next(&graph) {
        seen.insert(id);
    }
    seen
}
