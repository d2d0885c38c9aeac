//! Guards and structured control flow.
//!
//! Conditions of `if`/`while`/`for` go through `build_condition`, which
//! short-circuits `&&` and `||` with an `i1` phi at the merge block.

use crate::ast::{BinOp, Block, Expr, IfBranch, Stmt, UnaryOp};
use crate::diagnostic::Diagnostic;
use crate::ir::{BlockId, Type, Value};
use crate::span::{Span, Spanned};

use super::{CodeGen, GenResult};

impl<'b> CodeGen<'b> {
    // ── Condition path ────────────────────────────────────────────

    /// Lower a guard to an `i1`.
    pub(crate) fn build_condition(&mut self, expr: &Spanned<Expr>) -> GenResult<Value> {
        match &expr.node {
            Expr::Paren(inner) => self.build_condition(inner),
            Expr::BinOp {
                op: op @ (BinOp::And | BinOp::Or),
                lhs,
                rhs,
            } => self.short_circuit(*op, lhs, rhs),
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let b = self.build_condition(operand)?;
                Ok(self.ir.not(b))
            }
            _ => {
                let v = self.build_expr(expr)?;
                self.to_bool(v, expr.span)
            }
        }
    }

    /// `a && b`: evaluate `b` only when `a` holds; `a || b`: only when it
    /// does not. The skipped edge contributes the constant outcome.
    fn short_circuit(
        &mut self,
        op: BinOp,
        lhs: &Spanned<Expr>,
        rhs: &Spanned<Expr>,
    ) -> GenResult<Value> {
        let is_and = op == BinOp::And;
        let (rhs_label, end_label) = if is_and {
            ("land.rhs", "land.end")
        } else {
            ("lor.rhs", "lor.end")
        };
        let l = self.build_condition(lhs)?;
        let lhs_end = self.current_block()?;
        let rhs_bb = self.ir.append_block(rhs_label);
        let end_bb = self.ir.append_block(end_label);
        if is_and {
            self.ir.cond_br(l, rhs_bb, end_bb);
        } else {
            self.ir.cond_br(l, end_bb, rhs_bb);
        }

        self.ir.position_at_end(rhs_bb);
        let r = self.build_condition(rhs)?;
        let rhs_end = self.current_block()?;
        self.ir.br(end_bb);

        self.ir.move_block_to_end(end_bb);
        self.ir.position_at_end(end_bb);
        let skipped = self.ir.const_bool(!is_and);
        Ok(self.ir.phi(Type::I1, vec![(skipped, lhs_end), (r, rhs_end)]))
    }

    fn current_block(&self) -> GenResult<BlockId> {
        self.ir
            .current_block()
            .ok_or_else(|| Diagnostic::error("Condition evaluated outside of a block", Span::dummy()))
    }

    // ── If ────────────────────────────────────────────────────────

    /// One condition block and one body block per branch, an optional
    /// `else`, and a shared `ifcont` merge block that is dropped when no
    /// edge reaches it.
    pub(crate) fn build_if(
        &mut self,
        branches: &[IfBranch],
        else_block: Option<&Spanned<Block>>,
    ) -> GenResult<()> {
        let mut arms = Vec::with_capacity(branches.len());
        for i in 0..branches.len() {
            let cond = self.ir.append_block(&format!("cond{}", i));
            let body = self.ir.append_block(&format!("body{}", i));
            arms.push((cond, body));
        }
        let else_bb = else_block.map(|_| self.ir.append_block("else"));
        let merge = self.ir.append_block("ifcont");
        let mut merge_used = else_bb.is_none();

        if let Some((first, _)) = arms.first() {
            self.ir.br(*first);
        }
        for (i, (branch, (cond_bb, body_bb))) in branches.iter().zip(&arms).enumerate() {
            self.ir.position_at_end(*cond_bb);
            let c = self.build_condition(&branch.cond)?;
            let next = match arms.get(i + 1) {
                Some((next_cond, _)) => *next_cond,
                None => else_bb.unwrap_or(merge),
            };
            self.ir.cond_br(c, *body_bb, next);

            self.ir.position_at_end(*body_bb);
            self.build_block(&branch.body)?;
            if !self.ir.is_terminated() {
                self.ir.br(merge);
                merge_used = true;
            }
        }
        if let (Some(else_bb), Some(block)) = (else_bb, else_block) {
            self.ir.position_at_end(else_bb);
            self.build_block(block)?;
            if !self.ir.is_terminated() {
                self.ir.br(merge);
                merge_used = true;
            }
        }

        if merge_used {
            self.ir.move_block_to_end(merge);
            self.ir.position_at_end(merge);
        } else {
            log::trace!("every branch terminates, dropping merge block");
            self.ir.erase_block(merge);
        }
        Ok(())
    }

    // ── Loops ─────────────────────────────────────────────────────

    pub(crate) fn build_while(&mut self, cond: &Spanned<Expr>, body: &Spanned<Block>) -> GenResult<()> {
        let header = self.ir.append_block("while.header");
        let body_bb = self.ir.append_block("while.body");
        let exit = self.ir.append_block("while.exit");
        self.ir.br(header);

        self.ir.position_at_end(header);
        let c = self.build_condition(cond)?;
        self.ir.cond_br(c, body_bb, exit);

        self.ir.position_at_end(body_bb);
        self.build_loop_body(body, exit)?;
        self.ir.br(header);

        self.ir.move_block_to_end(exit);
        self.ir.position_at_end(exit);
        Ok(())
    }

    /// The loop variable lives in its own frame spanning init, condition,
    /// body and step.
    pub(crate) fn build_for(
        &mut self,
        init: Option<&Spanned<Stmt>>,
        cond: Option<&Spanned<Expr>>,
        step: Option<&Spanned<Expr>>,
        body: &Spanned<Block>,
    ) -> GenResult<()> {
        let mut scope = self.enter_scope();
        if let Some(init) = init {
            scope.build_stmt(init)?;
        }
        let header = scope.ir.append_block("for.header");
        let body_bb = scope.ir.append_block("for.body");
        let increment = scope.ir.append_block("for.increment");
        let exit = scope.ir.append_block("for.exit");
        scope.ir.br(header);

        scope.ir.position_at_end(header);
        match cond {
            Some(cond) => {
                let c = scope.build_condition(cond)?;
                scope.ir.cond_br(c, body_bb, exit);
            }
            None => scope.ir.br(body_bb),
        }

        scope.ir.position_at_end(body_bb);
        scope.build_loop_body(body, exit)?;
        scope.ir.br(increment);

        scope.ir.move_block_to_end(increment);
        scope.ir.position_at_end(increment);
        if let Some(step) = step {
            scope.build_expr(step)?;
        }
        scope.ir.br(header);

        scope.ir.move_block_to_end(exit);
        scope.ir.position_at_end(exit);
        Ok(())
    }

    fn build_loop_body(&mut self, body: &Spanned<Block>, exit: BlockId) -> GenResult<()> {
        self.loop_exits.push(exit);
        let result = self.build_block(body);
        self.loop_exits.pop();
        result
    }
}
