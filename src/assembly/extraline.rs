//! Lines rendered in front of an instruction.
//!
//! Labels, `.catch` directives, debug directives and branch destination labels are attached to
//! the instruction at their address. Each kind has a fixed sort order which decides where it
//! appears relative to the others in front of the same instruction:
//!
//! ```text
//!     :try_end_10                                   TRY_END
//!     .catch Ljava/lang/Exception; {...} :catch_20  EXCEPTION_HANDLER
//!     .line 12                                      DEBUG
//!     :catch_20                                     CATCH
//!     :cond_10                                      TARGET
//!     :try_start_10                                 TRY_START
//! ```

use crate::{
    debug::DebugProgram,
    method::{Label, LabelRole, TargetLabel},
    Result,
};

/// Sort order of try end labels.
pub const TRY_END: u8 = 0;
/// Sort order of `.catch` / `.catchall` directives.
pub const EXCEPTION_HANDLER: u8 = 1;
/// Sort order of debug directives.
pub const DEBUG: u8 = 2;
/// Sort order of catch labels.
pub const CATCH: u8 = 3;
/// Sort order of branch destination labels.
pub const TARGET: u8 = 4;
/// Sort order of try start labels.
pub const TRY_START: u8 = 5;

/// A line attached to an instruction.
#[derive(Debug, Clone)]
pub enum ExtraLine {
    /// An exception label or handler directive
    Label(Label),
    /// The debug row at this index of the method's program
    Debug(usize),
    /// A branch destination label
    Target(TargetLabel),
}

impl ExtraLine {
    /// Fixed position of this line among the lines of one instruction.
    #[must_use]
    pub fn sort_order(&self) -> u8 {
        match self {
            ExtraLine::Label(label) => match label.role {
                LabelRole::TryStart => TRY_START,
                LabelRole::TryEnd => TRY_END,
                LabelRole::Handler => EXCEPTION_HANDLER,
                LabelRole::Catch => CATCH,
            },
            ExtraLine::Debug(_) => DEBUG,
            ExtraLine::Target(_) => TARGET,
        }
    }

    /// Address the line currently points at. Debug lines read 0 without a program.
    #[must_use]
    pub fn target_address(&self, debug: Option<&DebugProgram>) -> u32 {
        match self {
            ExtraLine::Label(label) => label.address(),
            ExtraLine::Debug(index) => debug
                .and_then(|program| program.row(*index))
                .map_or(0, |row| row.address()),
            ExtraLine::Target(label) => label.address(),
        }
    }

    /// Moves whatever the line points at.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if a try end would precede its start.
    pub fn set_target_address(&self, address: u32, debug: Option<&mut DebugProgram>) -> Result<()> {
        match self {
            ExtraLine::Label(label) => label.set_address(address)?,
            ExtraLine::Debug(index) => {
                if let Some(program) = debug {
                    program.set_target_address(*index, address);
                }
            }
            ExtraLine::Target(label) => label.set_address(address),
        }
        Ok(())
    }

    /// Whether both lines would render identically in sequence.
    #[must_use]
    pub fn equals_as_line(&self, other: &ExtraLine) -> bool {
        match (self, other) {
            (ExtraLine::Label(a), ExtraLine::Label(b)) => a.equals_as_line(b),
            (ExtraLine::Debug(a), ExtraLine::Debug(b)) => a == b,
            (ExtraLine::Target(a), ExtraLine::Target(b)) => a.equals_as_line(b),
            _ => false,
        }
    }

    /// Returns `true` for `.catch` / `.catchall` directives.
    #[must_use]
    pub fn is_handler(&self) -> bool {
        matches!(self, ExtraLine::Label(label) if label.role == LabelRole::Handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        assembly::{TargetKind, TargetRef},
        debug::DebugRow,
        method::TryItem,
    };

    #[test]
    fn reads_and_writes_dispatch_by_variant() {
        let mut program = DebugProgram::new(1);
        program.push(DebugRow::special(2, 0).unwrap()).unwrap();

        let debug = ExtraLine::Debug(0);
        assert_eq!(debug.target_address(Some(&program)), 2);
        assert_eq!(debug.target_address(None), 0);
        debug.set_target_address(6, Some(&mut program)).unwrap();
        assert_eq!(program.rows()[0].address(), 6);

        let target = TargetRef::new(4);
        let line = ExtraLine::Target(TargetLabel::new(TargetKind::Goto, target.clone()));
        line.set_target_address(8, None).unwrap();
        assert_eq!(target.get(), 8);
    }

    #[test]
    fn sort_orders() {
        let item = TryItem::new(0, 2, [(None, 2)]);
        let orders: Vec<u8> = Label::all(&item.handlers()[0])
            .into_iter()
            .map(ExtraLine::Label)
            .map(|line| line.sort_order())
            .collect();
        assert_eq!(orders, vec![TRY_START, TRY_END, EXCEPTION_HANDLER, CATCH]);
        assert!(ExtraLine::Label(Label::new(LabelRole::Handler, item.handlers()[0].clone())).is_handler());
        assert!(!ExtraLine::Debug(0).equals_as_line(&ExtraLine::Debug(1)));
    }
}
