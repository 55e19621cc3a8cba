//! Address-bearing markers rendered between instructions.
//!
//! A [`Label`] is a view onto an [`ExceptionHandler`] in one of four roles. It stores no address
//! of its own: every read and write goes through the handler and its try item, so moving a try
//! range moves all four labels at once. A [`TargetLabel`] does the same for branch destinations
//! through a shared [`TargetRef`].
//!
//! | role | reads | writes |
//! |------|-------|--------|
//! | try start | try item start | try item start |
//! | try end | start + length | length |
//! | handler | start + length | length |
//! | catch | handler catch address | handler catch address |

use std::sync::Arc;

use strum::Display;

use crate::{
    assembly::{TargetKind, TargetRef},
    identifiers::{display_type, IdentifierStore},
    method::ExceptionHandlerRc,
    utils::hex_address,
    Result,
};

/// The role a [`Label`] plays for its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum LabelRole {
    /// First instruction of the try range
    TryStart,
    /// First instruction after the try range
    TryEnd,
    /// The `.catch` directive, placed at the end of the try range
    Handler,
    /// First instruction of the handler code
    Catch,
}

/// An exception label: a handler seen in one [`LabelRole`].
#[derive(Debug, Clone)]
pub struct Label {
    /// Role of this view
    pub role: LabelRole,
    /// The handler the label reads and writes through
    pub handler: ExceptionHandlerRc,
}

impl Label {
    /// Creates a view of `handler` in `role`.
    #[must_use]
    pub fn new(role: LabelRole, handler: ExceptionHandlerRc) -> Self {
        Label { role, handler }
    }

    /// The four labels of a handler.
    #[must_use]
    pub fn all(handler: &ExceptionHandlerRc) -> [Label; 4] {
        [
            Label::new(LabelRole::TryStart, handler.clone()),
            Label::new(LabelRole::TryEnd, handler.clone()),
            Label::new(LabelRole::Handler, handler.clone()),
            Label::new(LabelRole::Catch, handler.clone()),
        ]
    }

    /// Current address; 0 when the handler is orphaned.
    #[must_use]
    pub fn address(&self) -> u32 {
        if self.handler.is_orphaned() {
            return 0;
        }

        match self.role {
            LabelRole::TryStart => self.handler.start_address(),
            LabelRole::TryEnd | LabelRole::Handler => self.handler.end_address(),
            LabelRole::Catch => self.handler.catch_address(),
        }
    }

    /// Moves the label. Ignored when the handler is orphaned.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if an end would precede its start.
    pub fn set_address(&self, address: u32) -> Result<()> {
        if self.handler.is_orphaned() {
            return Ok(());
        }

        match self.role {
            LabelRole::TryStart => self.handler.set_start_address(address),
            LabelRole::TryEnd | LabelRole::Handler => self.handler.set_end_address(address)?,
            LabelRole::Catch => self.handler.set_catch_address(address),
        }
        Ok(())
    }

    /// Label name without the leading colon, e.g. `try_start_1a` or `catchall_30`.
    #[must_use]
    pub fn name(&self) -> String {
        match self.role {
            LabelRole::TryStart => format!("try_start_{}", hex_address(self.address())),
            LabelRole::TryEnd => format!("try_end_{}", hex_address(self.address())),
            LabelRole::Handler | LabelRole::Catch => format!(
                "{}_{}",
                self.catch_keyword(),
                hex_address(self.handler.catch_address())
            ),
        }
    }

    fn catch_keyword(&self) -> &'static str {
        if self.handler.is_catch_all() {
            "catchall"
        } else {
            "catch"
        }
    }

    /// The text line for this label.
    #[must_use]
    pub fn render(&self, ids: &dyn IdentifierStore) -> String {
        match self.role {
            LabelRole::Handler => {
                let start = Label::new(LabelRole::TryStart, self.handler.clone());
                let end = Label::new(LabelRole::TryEnd, self.handler.clone());
                let mut line = format!(".{} ", self.catch_keyword());
                if let Some(type_ref) = self.handler.type_ref {
                    line.push_str(&display_type(ids, Some(type_ref)));
                    line.push(' ');
                }
                line.push_str(&format!("{{:{} .. :{}}} :{}", start.name(), end.name(), self.name()));
                line
            }
            _ => format!(":{}", self.name()),
        }
    }

    /// Whether two labels render as the same line.
    ///
    /// Handler directives are only equal for the same handler. The other roles are equal for
    /// the same role and either the same handler or the same address. Catch labels also have
    /// to agree on the catch-all flag, since `:catch_N` and `:catchall_N` are different names.
    #[must_use]
    pub fn equals_as_line(&self, other: &Label) -> bool {
        if self.role != other.role {
            return false;
        }
        if Arc::ptr_eq(&self.handler, &other.handler) {
            return true;
        }

        match self.role {
            LabelRole::Handler => false,
            LabelRole::Catch => {
                self.address() == other.address()
                    && self.handler.is_catch_all() == other.handler.is_catch_all()
            }
            LabelRole::TryStart | LabelRole::TryEnd => self.address() == other.address(),
        }
    }
}

/// A branch destination label such as `:cond_1c` or `:pswitch_data_40`.
#[derive(Debug, Clone)]
pub struct TargetLabel {
    /// Prefix of the label
    pub kind: TargetKind,
    /// Destination cell shared with the branching instruction
    pub target: TargetRef,
}

impl TargetLabel {
    /// Creates a label for `target`.
    #[must_use]
    pub fn new(kind: TargetKind, target: TargetRef) -> Self {
        TargetLabel { kind, target }
    }

    /// Current destination address.
    #[must_use]
    pub fn address(&self) -> u32 {
        self.target.get()
    }

    /// Moves the destination and with it the branch.
    pub fn set_address(&self, address: u32) {
        self.target.set(address);
    }

    /// Label name without the leading colon.
    #[must_use]
    pub fn name(&self) -> String {
        label_name(self.kind, self.address())
    }

    /// Labels are equal as lines when kind and address match.
    #[must_use]
    pub fn equals_as_line(&self, other: &TargetLabel) -> bool {
        self.kind == other.kind && self.address() == other.address()
    }
}

/// Name of a branch destination label of `kind` at `address`.
#[must_use]
pub fn label_name(kind: TargetKind, address: u32) -> String {
    format!("{}_{}", kind, hex_address(address))
}
