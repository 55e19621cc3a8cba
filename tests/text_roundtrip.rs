//! Integration tests for the assembly text form: rendering, assembling, and the binary form in
//! between.

use dexscope::{prelude::*, Result};

const LISTING: &str = "\
.registers 3
.ins 1
.outs 0
.debug 20
.param \"value\"

    .line 21
    .local v2, \"count\":I
    :try_start_0
    const/4 0x02
    if-eqz 0x02, :cond_c
    packed-switch 0x02, :pswitch_data_10
    :try_end_c
    .catch Ljava/lang/Exception; {:try_start_0 .. :try_end_c} :catch_c
    .catchall {:try_start_0 .. :try_end_c} :catchall_e
    .line 25
    :catch_c
    :cond_c

    nop
    :catchall_e
    :pswitch_e
    return-void
    :pswitch_data_10
    .packed-switch 0x1
        :pswitch_e
    .end packed-switch
";

fn expected_code_item() -> Vec<u8> {
    let units: [u16; 14] = [
        0x0212, // const/4 v2, 0
        0x0238, 0x0005, // if-eqz v2, +5
        0x022b, 0x0005, 0x0000, // packed-switch v2, +5
        0x0000, // nop
        0x000e, // return-void
        0x0100, 0x0001, 0x0001, 0x0000, 0x0004, 0x0000, // payload: first key 1, case +4
    ];

    let mut data = vec![3, 0, 1, 0, 0, 0, 1, 0, 0, 0, 0, 0, 14, 0, 0, 0];
    for unit in units {
        data.extend(unit.to_le_bytes());
    }
    data.extend([0, 0, 0, 0, 6, 0, 1, 0]);
    data.extend([1, 0x7f, 1, 6, 7]);
    data
}

#[test]
fn test_parse_then_render_reproduces_text() -> Result<()> {
    let mut ids = Identifiers::new();
    let mut body = MethodBody::parse(LISTING, &mut ids, BodyConfig::default())?;
    assert_eq!(body.render(&ids)?, LISTING);
    Ok(())
}

#[test]
fn test_parsed_text_encodes_to_code_item() -> Result<()> {
    let mut ids = Identifiers::new();
    let mut body = MethodBody::parse(LISTING, &mut ids, BodyConfig::default())?;
    assert_eq!(body.encode()?, expected_code_item());

    let program = body.debug().map(|p| (p.line_start, p.parameter_names.clone()));
    assert_eq!(program, Some((20, vec![Some(0)])));
    assert_eq!(ids.string(1), Some("count"));
    assert_eq!(ids.type_name(1), Some("Ljava/lang/Exception;"));
    Ok(())
}

#[test]
fn test_binary_to_text_and_back() -> Result<()> {
    let mut ids = Identifiers::new();
    let mut parsed = MethodBody::parse(LISTING, &mut ids, BodyConfig::default())?;
    let code = parsed.encode()?;
    let debug = parsed.encode_debug_info()?;

    let mut decoded = MethodBody::from(&code, debug.as_deref(), BodyConfig::default())?;
    let text = decoded.render(&ids)?;
    assert_eq!(text, LISTING);

    let mut reparsed = MethodBody::parse(&text, &mut ids, BodyConfig::default())?;
    assert_eq!(reparsed.encode()?, code);
    assert_eq!(reparsed.encode_debug_info()?, debug);
    Ok(())
}

#[test]
fn test_edit_after_parse_moves_labels() -> Result<()> {
    let mut ids = Identifiers::new();
    let mut body = MethodBody::parse(LISTING, &mut ids, BodyConfig::default())?;

    // a nop in front of the first instruction; the lines stay with const/4
    body.insert(0, Instruction::new(vec![0x0000])?)?;
    let text = body.render(&ids)?;

    assert!(text.contains(
        "\n\n    nop\n    .line 21\n    .local v2, \"count\":I\n    :try_start_2\n    const/4 0x02\n"
    ));
    assert!(text.contains("    if-eqz 0x02, :cond_e\n"));
    assert!(text.contains("    packed-switch 0x02, :pswitch_data_12\n"));
    assert!(text.contains(".catch Ljava/lang/Exception; {:try_start_2 .. :try_end_e} :catch_e\n"));
    assert!(text.contains("    :catchall_10\n    :pswitch_10\n    return-void\n"));
    Ok(())
}

#[test]
fn test_unknown_names_fall_back_to_keys() -> Result<()> {
    let text = "\
.registers 1
.ins 0
.outs 0
.debug 1
.param string@7

    .local v0, string@3:type@9
    return-void
";
    let mut ids = Identifiers::new();
    let mut body = MethodBody::parse(text, &mut ids, BodyConfig::default())?;
    assert_eq!(ids.string_count(), 0);
    assert_eq!(body.render(&ids)?, text);
    Ok(())
}

#[test]
fn test_errors_report_line_and_column() {
    let cases: [(&str, (usize, usize)); 4] = [
        (".registers 70000\n", (1, 12)),
        ("    nop\n    goto :nowhere\n", (2, 10)),
        ("    return-void\n    .catchall {:a .. :b} :c\n", (2, 16)),
        ("    const/4 0x100\n", (1, 13)),
    ];

    for (text, expected) in cases {
        match MethodBody::parse(text, &mut Identifiers::new(), BodyConfig::default()) {
            Err(Error::Parse { line, column, .. }) => assert_eq!((line, column), expected, "{text}"),
            other => panic!("{text}: expected a parse error, got {other:?}"),
        }
    }
}
