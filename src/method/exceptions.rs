//! Try items and exception handlers.
//!
//! A [`TryItem`] covers a byte range of the code and owns the handlers that catch exceptions
//! thrown inside it. Every [`ExceptionHandler`] keeps a weak reference back to its try item, so
//! the boundary labels derived from a handler always read and write the try item's current
//! range. Dropping a try item orphans its handlers: their range reads as zero and writes are
//! ignored.
//!
//! # Binary layout
//!
//! ```text
//! try_item              { start_addr: u32, insn_count: u16, handler_off: u16 }   (code units)
//! encoded_catch_handler_list { size: uleb128, list: encoded_catch_handler[size] }
//! encoded_catch_handler { size: sleb128, handlers: (type_idx: uleb128, addr: uleb128)[|size|],
//!                         catch_all_addr: uleb128 (only if size <= 0) }
//! ```
//!
//! `handler_off` is the byte offset of a try's handler from the start of the handler list.
//! Identical handlers are shared by several try items.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Weak,
    },
};

use log::trace;

use crate::{
    assembly::InstructionSequence,
    file::{io::write_le, parser::Parser},
    utils::leb128::{write_sleb128, write_uleb128},
    Result,
};

/// Reference-counted try item
pub type TryItemRc = Arc<TryItem>;
/// Reference-counted exception handler
pub type ExceptionHandlerRc = Arc<ExceptionHandler>;

/// One entry of the try table.
#[derive(Debug)]
pub struct TryItem {
    start_address: AtomicU32,
    try_length: AtomicU32,
    /// Offset of the handler list entry this try item was decoded from. Informational only;
    /// encoding computes fresh offsets.
    pub handler_offset: u16,
    handlers: Vec<ExceptionHandlerRc>,
}

impl TryItem {
    /// Creates a try item covering `[start_address, start_address + try_length)` with one
    /// handler per `(type_ref, catch_address)` pair. A `None` type is a catch-all.
    #[must_use]
    pub fn new(
        start_address: u32,
        try_length: u32,
        handlers: impl IntoIterator<Item = (Option<u32>, u32)>,
    ) -> TryItemRc {
        Self::with_offset(start_address, try_length, 0, handlers)
    }

    fn with_offset(
        start_address: u32,
        try_length: u32,
        handler_offset: u16,
        handlers: impl IntoIterator<Item = (Option<u32>, u32)>,
    ) -> TryItemRc {
        Arc::new_cyclic(|owner| TryItem {
            start_address: AtomicU32::new(start_address),
            try_length: AtomicU32::new(try_length),
            handler_offset,
            handlers: handlers
                .into_iter()
                .map(|(type_ref, catch_address)| {
                    Arc::new(ExceptionHandler {
                        catch_address: AtomicU32::new(catch_address),
                        type_ref,
                        try_item: owner.clone(),
                    })
                })
                .collect(),
        })
    }

    /// First covered byte address.
    #[must_use]
    pub fn start_address(&self) -> u32 {
        self.start_address.load(Ordering::Relaxed)
    }

    /// Moves the start of the range. The length is kept, so the end moves too.
    pub fn set_start_address(&self, address: u32) {
        self.start_address.store(address, Ordering::Relaxed);
    }

    /// Length of the covered range in bytes.
    #[must_use]
    pub fn try_length(&self) -> u32 {
        self.try_length.load(Ordering::Relaxed)
    }

    /// Changes the length of the covered range.
    pub fn set_try_length(&self, length: u32) {
        self.try_length.store(length, Ordering::Relaxed);
    }

    /// First byte address past the covered range.
    #[must_use]
    pub fn end_address(&self) -> u32 {
        self.start_address().saturating_add(self.try_length())
    }

    /// Moves the end of the range by adjusting the length.
    ///
    /// # Errors
    /// Returns [`crate::Error::ValueRange`] if `address` precedes the start.
    pub fn set_end_address(&self, address: u32) -> Result<()> {
        let start = self.start_address();
        let Some(length) = address.checked_sub(start) else {
            return Err(value_range_error!("try end address", address, start, u32::MAX));
        };
        self.set_try_length(length);
        Ok(())
    }

    /// Handlers in catch order.
    #[must_use]
    pub fn handlers(&self) -> &[ExceptionHandlerRc] {
        &self.handlers
    }
}

/// One handler of a try item.
#[derive(Debug)]
pub struct ExceptionHandler {
    catch_address: AtomicU32,
    /// Type key of the caught exception, `None` for a catch-all.
    pub type_ref: Option<u32>,
    try_item: Weak<TryItem>,
}

impl ExceptionHandler {
    /// The owning try item, unless it was dropped.
    #[must_use]
    pub fn try_item(&self) -> Option<TryItemRc> {
        self.try_item.upgrade()
    }

    /// Returns `true` if the owning try item no longer exists.
    #[must_use]
    pub fn is_orphaned(&self) -> bool {
        self.try_item.strong_count() == 0
    }

    /// Returns `true` for a catch-all handler.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.type_ref.is_none()
    }

    /// Start of the covered range, 0 when orphaned.
    #[must_use]
    pub fn start_address(&self) -> u32 {
        self.try_item().map_or(0, |item| item.start_address())
    }

    /// End of the covered range, 0 when orphaned.
    #[must_use]
    pub fn end_address(&self) -> u32 {
        self.try_item().map_or(0, |item| item.end_address())
    }

    /// Address the rendered handler directive is attached to. Equal to the end address.
    #[must_use]
    pub fn handler_address(&self) -> u32 {
        self.end_address()
    }

    /// Moves the start of the owning try item. Ignored when orphaned.
    pub fn set_start_address(&self, address: u32) {
        if let Some(item) = self.try_item() {
            item.set_start_address(address);
        }
    }

    /// Moves the end of the owning try item. Ignored when orphaned.
    ///
    /// # Errors
    /// See [`TryItem::set_end_address`].
    pub fn set_end_address(&self, address: u32) -> Result<()> {
        match self.try_item() {
            Some(item) => item.set_end_address(address),
            None => Ok(()),
        }
    }

    /// First byte address of the handler code.
    #[must_use]
    pub fn catch_address(&self) -> u32 {
        self.catch_address.load(Ordering::Relaxed)
    }

    /// Moves the handler code.
    pub fn set_catch_address(&self, address: u32) {
        self.catch_address.store(address, Ordering::Relaxed);
    }

    /// Indices of the instructions covered by the owning try item.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidOperation`] when orphaned and
    /// [`crate::Error::AddressNotFound`] if a range boundary is not an instruction boundary.
    pub fn try_instructions(&self, code: &InstructionSequence) -> Result<std::ops::Range<usize>> {
        let Some(item) = self.try_item() else {
            return Err(invalid_operation_error!(
                "Handler for {:?} has no try item",
                self.type_ref
            ));
        };
        code.iter_by_address(item.start_address(), item.try_length())
    }
}

/// Decodes `tries_size` try items followed by the encoded catch handler list.
///
/// On return the parser is positioned after the last handler read.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] for truncated data and [`crate::Error::Malformed`] for
/// a handler offset outside the list or an address that overflows.
pub fn read_tries(parser: &mut Parser, tries_size: u16) -> Result<Vec<TryItemRc>> {
    let mut raw = Vec::with_capacity(usize::from(tries_size));
    for _ in 0..tries_size {
        let start = parser.read_le::<u32>()?;
        let count = parser.read_le::<u16>()?;
        let handler_offset = parser.read_le::<u16>()?;
        raw.push((start, count, handler_offset));
    }

    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let list_start = parser.pos();
    let list_size = parser.read_uleb128()?;
    let mut list_end = parser.pos();
    let mut cache: HashMap<u16, Vec<(Option<u32>, u32)>> = HashMap::new();
    let mut tries = Vec::with_capacity(raw.len());

    for (start, count, handler_offset) in raw {
        let start_address = start
            .checked_mul(2)
            .ok_or_else(|| malformed_error!("Try start 0x{:x} overflows", start))?;
        if start_address.checked_add(u32::from(count) * 2).is_none() {
            return Err(malformed_error!(
                "Try range at 0x{:x} with {} code units overflows",
                start_address,
                count
            ));
        }

        let handlers = if let Some(handlers) = cache.get(&handler_offset) {
            handlers.clone()
        } else {
            parser.seek(list_start + usize::from(handler_offset))?;
            let handlers = read_handler(parser)?;
            list_end = list_end.max(parser.pos());
            cache.insert(handler_offset, handlers.clone());
            handlers
        };

        trace!(
            "try 0x{:x}..0x{:x}: {} handlers",
            start_address,
            start_address + u32::from(count) * 2,
            handlers.len()
        );
        tries.push(TryItem::with_offset(
            start_address,
            u32::from(count) * 2,
            handler_offset,
            handlers,
        ));
    }

    if cache.len() > list_size as usize {
        return Err(malformed_error!(
            "Try items reference {} handlers but the list holds {}",
            cache.len(),
            list_size
        ));
    }

    parser.seek(list_end)?;
    Ok(tries)
}

fn read_handler(parser: &mut Parser) -> Result<Vec<(Option<u32>, u32)>> {
    let size = parser.read_sleb128()?;
    let typed = size.unsigned_abs();
    if typed as usize > parser.remaining() {
        return Err(malformed_error!(
            "Catch handler declares {} entries but only {} bytes remain",
            typed,
            parser.remaining()
        ));
    }

    let mut handlers = Vec::with_capacity(typed as usize + 1);
    for _ in 0..typed {
        let type_ref = parser.read_uleb128()?;
        let address = catch_address(parser.read_uleb128()?)?;
        handlers.push((Some(type_ref), address));
    }
    if size <= 0 {
        handlers.push((None, catch_address(parser.read_uleb128()?)?));
    }
    Ok(handlers)
}

fn catch_address(units: u32) -> Result<u32> {
    units
        .checked_mul(2)
        .ok_or_else(|| malformed_error!("Catch address 0x{:x} overflows", units))
}

/// Encodes the try table followed by the catch handler list.
///
/// # Errors
/// Returns [`crate::Error::InvalidOperation`] for an empty try item, a try item without
/// handlers, or a catch-all that is not the last handler, and [`crate::Error::ValueRange`] for
/// odd addresses or values that do not fit their fields.
pub fn write_tries(buffer: &mut Vec<u8>, tries: &[TryItemRc]) -> Result<()> {
    if tries.is_empty() {
        return Ok(());
    }

    let mut lists: Vec<Vec<u8>> = Vec::new();
    let mut list_index: HashMap<Vec<u8>, usize> = HashMap::new();
    let mut try_lists = Vec::with_capacity(tries.len());

    for item in tries {
        let encoded = encode_handler(item)?;
        let index = *list_index.entry(encoded.clone()).or_insert_with(|| {
            lists.push(encoded);
            lists.len() - 1
        });
        try_lists.push(index);
    }

    let mut header = Vec::new();
    write_uleb128(&mut header, lists.len() as u32);
    let mut offsets = Vec::with_capacity(lists.len());
    let mut offset = header.len();
    for list in &lists {
        offsets.push(offset);
        offset += list.len();
    }

    for (item, list) in tries.iter().zip(try_lists) {
        let start = item.start_address();
        let length = item.try_length();
        if length == 0 {
            return Err(invalid_operation_error!(
                "Try item at 0x{:x} covers no code",
                start
            ));
        }
        if start % 2 != 0 || length % 2 != 0 {
            return Err(value_range_error!(
                "try range alignment",
                if start % 2 != 0 { start } else { length },
                0u32,
                u32::MAX - 1
            ));
        }

        let count = u16::try_from(length / 2)
            .map_err(|_| value_range_error!("try length in code units", length / 2, 1u16, u16::MAX))?;
        let handler_offset = u16::try_from(offsets[list]).map_err(|_| {
            value_range_error!(
                "handler offset",
                offsets[list] as u32,
                0u16,
                u16::MAX
            )
        })?;

        write_le(buffer, start / 2);
        write_le(buffer, count);
        write_le(buffer, handler_offset);
    }

    buffer.extend_from_slice(&header);
    for list in lists {
        buffer.extend_from_slice(&list);
    }
    Ok(())
}

fn encode_handler(item: &TryItem) -> Result<Vec<u8>> {
    let handlers = item.handlers();
    if handlers.is_empty() {
        return Err(invalid_operation_error!(
            "Try item at 0x{:x} has no handlers",
            item.start_address()
        ));
    }

    let catch_all = handlers.iter().position(|h| h.is_catch_all());
    if let Some(position) = catch_all {
        if position != handlers.len() - 1 {
            return Err(invalid_operation_error!(
                "Catch-all handler of the try item at 0x{:x} is not the last handler",
                item.start_address()
            ));
        }
    }

    let typed = handlers.len() - usize::from(catch_all.is_some());
    let typed = i32::try_from(typed)
        .map_err(|_| value_range_error!("handler count", typed as u32, 0, i32::MAX))?;

    let mut encoded = Vec::new();
    write_sleb128(&mut encoded, if catch_all.is_some() { -typed } else { typed });
    for handler in handlers {
        let address = handler.catch_address();
        if address % 2 != 0 {
            return Err(value_range_error!("catch address", address, 0u32, u32::MAX - 1));
        }
        if let Some(type_ref) = handler.type_ref {
            write_uleb128(&mut encoded, type_ref);
        }
        write_uleb128(&mut encoded, address / 2);
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn handler_follows_try_item() {
        let item = TryItem::new(4, 8, [(Some(1), 20), (None, 24)]);
        let handler = item.handlers()[0].clone();

        handler.set_start_address(0x20);
        item.set_try_length(6);
        assert_eq!(handler.end_address(), 0x26);
        assert_eq!(handler.handler_address(), 0x26);

        handler.set_end_address(0x30).unwrap();
        assert_eq!(item.try_length(), 0x10);
        assert!(matches!(
            handler.set_end_address(0x10),
            Err(Error::ValueRange { .. })
        ));
    }

    #[test]
    fn orphaned_handler() {
        let item = TryItem::new(4, 8, [(None, 20)]);
        let handler = item.handlers()[0].clone();
        drop(item);

        assert!(handler.is_orphaned());
        assert_eq!(handler.start_address(), 0);
        assert_eq!(handler.end_address(), 0);
        handler.set_start_address(8);
        handler.set_end_address(12).unwrap();
        assert_eq!(handler.start_address(), 0);
        assert_eq!(handler.catch_address(), 20);

        let code = InstructionSequence::new();
        assert!(matches!(
            handler.try_instructions(&code),
            Err(Error::InvalidOperation(_))
        ));
    }

    #[test]
    fn tries_round_trip_shares_lists() {
        let tries = vec![
            TryItem::new(0, 4, [(Some(3), 8), (None, 12)]),
            TryItem::new(4, 2, [(Some(3), 8), (None, 12)]),
            TryItem::new(6, 2, [(Some(1), 8)]),
        ];
        let mut buffer = Vec::new();
        write_tries(&mut buffer, &tries).unwrap();

        // three try items, then a list of two distinct handlers
        assert_eq!(buffer.len(), 3 * 8 + 1 + 4 + 3);
        assert_eq!(&buffer[24..], &[0x02, 0x7F, 0x03, 0x04, 0x06, 0x01, 0x01, 0x04]);

        let mut parser = Parser::new(&buffer);
        let decoded = read_tries(&mut parser, 3).unwrap();
        assert!(!parser.has_more_data());
        assert_eq!(decoded[0].handler_offset, decoded[1].handler_offset);
        assert_eq!(decoded[1].start_address(), 4);
        assert_eq!(decoded[1].try_length(), 2);
        assert_eq!(decoded[0].handlers()[1].catch_address(), 12);
        assert!(decoded[0].handlers()[1].is_catch_all());
        assert_eq!(decoded[2].handlers()[0].type_ref, Some(1));
    }

    #[test]
    fn write_rejects_bad_items() {
        let mut buffer = Vec::new();
        assert!(matches!(
            write_tries(&mut buffer, &[TryItem::new(0, 0, [(None, 2)])]),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            write_tries(&mut buffer, &[TryItem::new(0, 2, [(None, 2), (Some(1), 4)])]),
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            write_tries(&mut buffer, &[TryItem::new(1, 2, [(None, 2)])]),
            Err(Error::ValueRange { .. })
        ));
    }
}
