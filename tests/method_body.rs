//! Integration tests for decoding, editing and re-encoding complete method bodies.
//!
//! These tests build `code_item` and `debug_info_item` bytes by hand, run them through
//! [`MethodBody`], and check that addresses of branches, try items, handlers and debug rows
//! follow the instructions they are attached to.

use dexscope::{prelude::*, Result};

/// Serializes a `code_item` with `units` and an already encoded try table.
fn code_item(registers: u16, units: &[u16], tries_size: u16, tries: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend(registers.to_le_bytes());
    data.extend(0u16.to_le_bytes());
    data.extend(0u16.to_le_bytes());
    data.extend(tries_size.to_le_bytes());
    data.extend(0u32.to_le_bytes());
    data.extend((units.len() as u32).to_le_bytes());
    for unit in units {
        data.extend(unit.to_le_bytes());
    }
    if tries_size != 0 && units.len() % 2 != 0 {
        data.extend([0, 0]);
    }
    data.extend(tries);
    data
}

/// const/4 v0, 0 ; nop ; const/16 v1, 5 ; return-void
fn four_instructions() -> Vec<u16> {
    vec![0x0012, 0x0000, 0x0113, 0x0005, 0x000e]
}

fn addresses(body: &MethodBody) -> Vec<u32> {
    body.code().iter().map(Instruction::address).collect()
}

#[test]
fn test_layout_is_prefix_sum_of_sizes() -> Result<()> {
    let data = code_item(2, &four_instructions(), 0, &[]);
    let mut body = MethodBody::from(&data, None, BodyConfig::default())?;
    assert_eq!(addresses(&body), vec![0, 2, 4, 8]);

    body.insert_after(1, Instruction::new(vec![0x0000])?)?;
    body.refresh()?;
    assert_eq!(addresses(&body), vec![0, 2, 4, 6, 10]);

    body.refresh()?;
    assert_eq!(addresses(&body), vec![0, 2, 4, 6, 10]);

    let mut expected = 0;
    for instruction in body.code() {
        assert_eq!(instruction.address(), expected);
        expected += instruction.byte_size();
    }
    assert_eq!(body.code().end_address(), expected);
    Ok(())
}

#[test]
fn test_decode_encode_identity_with_tries_and_debug() -> Result<()> {
    // nop ; nop ; return-void ; const/4 v0, 0 ; return-void
    let units = [0x0000, 0x0000, 0x000e, 0x0012, 0x000e];
    // one try over [1, 2) units, handler list at offset 1: one catch-all at unit 3
    let tries = [1, 0, 0, 0, 1, 0, 1, 0, 1, 0x00, 3];
    let data = code_item(1, &units, 1, &tries);

    // line_start 5, no parameters: advance(2, +1), prologue, end
    let debug = [5, 0, 9 + 5 + 15, 6, 0];
    let mut body = MethodBody::from(&data, Some(&debug), BodyConfig::default())?;

    assert_eq!(body.tries().len(), 1);
    assert_eq!(body.tries()[0].start_address(), 2);
    assert_eq!(body.tries()[0].end_address(), 4);
    assert_eq!(body.tries()[0].handlers()[0].catch_address(), 6);

    assert_eq!(body.encode()?, data);
    assert_eq!(body.encode_debug_info()?, Some(debug.to_vec()));
    Ok(())
}

#[test]
fn test_insert_inside_try_grows_range() -> Result<()> {
    let mut body = MethodBody::new(1, 0, 0, BodyConfig::default());
    for _ in 0..3 {
        body.push(Instruction::new(vec![0x0000])?)?;
    }
    body.push(Instruction::new(vec![0x000e])?)?;
    body.refresh()?;
    body.tries_mut()?.push(TryItem::new(2, 4, [(None, 6)]));

    body.insert(2, Instruction::new(vec![0x0012])?)?;
    body.refresh()?;

    let item = &body.tries()[0];
    assert_eq!((item.start_address(), item.end_address()), (2, 8));
    assert_eq!(item.handlers()[0].catch_address(), 8);
    Ok(())
}

#[test]
fn test_try_start_moves_while_end_stays() -> Result<()> {
    let mut body = MethodBody::new(1, 0, 0, BodyConfig::default());
    for _ in 0..5 {
        body.push(Instruction::new(vec![0x0000])?)?;
    }
    body.refresh()?;
    body.tries_mut()?.push(TryItem::new(2, 4, [(None, 8)]));

    // a wider instruction in front of the try, and one nop less inside it
    body.replace(0, Instruction::new(vec![0x0013, 0x0001])?)?;
    body.remove(2)?;
    body.refresh()?;

    assert_eq!(addresses(&body), vec![0, 4, 6, 8]);
    let item = &body.tries()[0];
    assert_eq!((item.start_address(), item.end_address()), (4, 6));
    assert_eq!(item.handlers()[0].handler_address(), 6);
    assert_eq!(item.handlers()[0].catch_address(), 8);

    let ids = Identifiers::new();
    let text = body.render(&ids)?;
    assert!(text.contains(".catchall {:try_start_4 .. :try_end_6} :catchall_8\n"));
    Ok(())
}

#[test]
fn test_lonely_instruction_in_try() -> Result<()> {
    let mut body = MethodBody::new(1, 0, 0, BodyConfig::default());
    for _ in 0..3 {
        body.push(Instruction::new(vec![0x0000])?)?;
    }
    body.refresh()?;
    body.tries_mut()?.push(TryItem::new(2, 2, [(None, 4)]));

    assert!(!body.is_lonely_in_try(0)?);
    assert!(body.is_lonely_in_try(1)?);
    assert!(!body.is_lonely_in_try(2)?);

    body.insert_after(1, Instruction::new(vec![0x0000])?)?;
    assert!(!body.is_lonely_in_try(1)?);
    assert!(matches!(
        body.is_lonely_in_try(9),
        Err(Error::InvalidOperation(_))
    ));
    Ok(())
}

#[test]
fn test_debug_lines_per_instruction() -> Result<()> {
    // nop ; nop ; return-void with .line 1 on the second nop and .line 2 on return-void
    let data = code_item(1, &[0x0000, 0x0000, 0x000e], 0, &[]);
    let debug = [1, 0, 9 + 4 + 15, 9 + 5 + 15, 0];
    let mut body = MethodBody::from(&data, Some(&debug), BodyConfig::default())?;

    assert_eq!(body.debug_lines(0)?, Vec::<u32>::new());
    assert_eq!(body.debug_lines(1)?, vec![1]);
    assert_eq!(body.debug_lines(2)?, vec![2]);

    body.insert(0, Instruction::new(vec![0x0000])?)?;
    assert_eq!(body.debug_lines(2)?, vec![1]);
    Ok(())
}

#[test]
fn test_branch_offsets_follow_edits() -> Result<()> {
    // if-eqz v0, +3 ; nop ; return-void
    let data = code_item(1, &[0x0038, 0x0003, 0x0000, 0x000e], 0, &[]);
    let mut body = MethodBody::from(&data, None, BodyConfig::default())?;

    body.insert_after(1, Instruction::new(vec![0x0000])?)?;
    let encoded = body.encode()?;
    assert_eq!(&encoded[16..], &[0x38, 0x00, 0x04, 0x00, 0, 0, 0, 0, 0x0e, 0x00]);

    body.remove(1)?;
    let encoded = body.encode()?;
    assert_eq!(&encoded[16..], &[0x38, 0x00, 0x03, 0x00, 0, 0, 0x0e, 0x00]);
    Ok(())
}

#[test]
fn test_handler_consistency() -> Result<()> {
    let item = TryItem::new(0, 2, [(None, 2)]);
    item.set_start_address(0x10);
    item.set_try_length(0x06);
    assert_eq!(item.end_address(), 0x16);

    let handler = item.handlers()[0].clone();
    assert_eq!(handler.end_address(), 0x16);
    assert_eq!(handler.handler_address(), 0x16);

    let label = Label::new(LabelRole::TryEnd, handler.clone());
    assert_eq!(label.name(), "try_end_16");

    let ids = Identifiers::new();
    let directive = Label::new(LabelRole::Handler, handler).render(&ids);
    assert_eq!(directive, ".catchall {:try_start_10 .. :try_end_16} :catchall_2");
    Ok(())
}

#[test]
fn test_orphaned_handler_reads_zero() {
    let handler = {
        let item = TryItem::new(4, 4, [(None, 8)]);
        item.handlers()[0].clone()
    };
    assert!(handler.is_orphaned());

    let label = Label::new(LabelRole::TryStart, handler);
    assert_eq!(label.address(), 0);
    assert!(label.set_address(12).is_ok());
    assert_eq!(label.address(), 0);
}

#[test]
fn test_shared_try_start_renders_once() -> Result<()> {
    let mut ids = Identifiers::new();
    let io = ids.intern_type("Ljava/io/IOException;");

    let mut body = MethodBody::new(1, 0, 0, BodyConfig::default());
    for _ in 0..0x14 {
        body.push(Instruction::new(vec![0x0000])?)?;
    }
    body.refresh()?;
    let tries = body.tries_mut()?;
    tries.push(TryItem::new(0x20, 0x04, [(Some(io), 0x24)]));
    tries.push(TryItem::new(0x20, 0x06, [(None, 0x26)]));

    let text = body.render(&ids)?;
    let definitions: Vec<&str> = text
        .lines()
        .filter(|line| line.trim() == ":try_start_20")
        .collect();
    assert_eq!(definitions.len(), 1);
    assert_eq!(text.matches(".catch Ljava/io/IOException;").count(), 1);
    assert_eq!(text.matches(".catchall {").count(), 1);
    Ok(())
}

#[test]
fn test_unaligned_try_is_rejected() {
    // const/16 v0, 1 ; return-void, try starting inside const/16
    let tries = [1, 0, 0, 0, 1, 0, 1, 0, 1, 0x00, 2];
    let data = code_item(1, &[0x0013, 0x0001, 0x000e], 1, &tries);
    assert!(matches!(
        MethodBody::from(&data, None, BodyConfig::default()),
        Err(Error::AddressNotFound(2))
    ));
    assert!(MethodBody::from(&data, None, BodyConfig::lenient()).is_ok());
}

#[test]
fn test_debug_rows_follow_instructions() -> Result<()> {
    // nop ; nop ; return-void with .line rows on the second nop and on return-void
    let data = code_item(1, &[0x0000, 0x0000, 0x000e], 0, &[]);
    let debug = [1, 0, 9 + 4 + 15, 9 + 5 + 15, 0];
    let mut body = MethodBody::from(&data, Some(&debug), BodyConfig::default())?;

    body.insert(1, Instruction::new(vec![0x0013, 0x0000])?)?;
    body.refresh()?;

    let rows: Vec<_> = body
        .debug()
        .map(|program| program.rows().iter().map(|r| (r.address(), r.line())).collect())
        .unwrap_or_default();
    assert_eq!(rows, vec![(6, 1), (8, 2)]);

    let code = body.encode()?;
    let debug = body.encode_debug_info()?;
    let reparsed = MethodBody::from(&code, debug.as_deref(), BodyConfig::default())?;
    let rows: Vec<_> = reparsed
        .debug()
        .map(|program| program.rows().iter().map(|r| (r.address(), r.line())).collect())
        .unwrap_or_default();
    assert_eq!(rows, vec![(6, 1), (8, 2)]);
    Ok(())
}
