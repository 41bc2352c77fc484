use std::sync::Arc;

use bitpacket::{Error, FieldSpec, Record, Schema, SchemaBuilder, Value};

fn test_packet() -> Arc<Schema> {
    let element = FieldSpec::composite("")
        .with_field(FieldSpec::pad(3))
        .and_then(|cf| cf.with_field(FieldSpec::unsigned("cnt", 5)))
        .and_then(|cf| cf.with_field(FieldSpec::signed("num", 32)))
        .unwrap();

    let mut builder = SchemaBuilder::new("TestPacket");
    builder
        .add_field(FieldSpec::char("chr", 5 * 8).description("character data"))
        .unwrap()
        .add_field(
            FieldSpec::array("ary", 3)
                .description("an array of composites")
                .with_field(element)
                .unwrap(),
        )
        .unwrap()
        .add_field(FieldSpec::float("flt", 32).description("floating point data"))
        .unwrap()
        .add_field(FieldSpec::text("txt", 10 * 8).description("a wee bit o text"))
        .unwrap()
        .add_field(FieldSpec::pad(16))
        .unwrap()
        .add_field(FieldSpec::rest("payload").description("the rest of the packet"))
        .unwrap();
    builder.finish().unwrap()
}

fn filled() -> Record {
    let mut p = Record::new(test_packet());
    p.set("chr", "123").unwrap();
    {
        let mut ary = p.array_mut("ary").unwrap();
        for i in 0..3 {
            let mut cmp = ary.composite_mut(i).unwrap();
            cmp.set("cnt", i + 1).unwrap();
            cmp.set("num", -(i as i64) - 1).unwrap();
        }
    }
    p.set("flt", 1.0).unwrap();
    p.set("txt", "hi mom").unwrap();
    p
}

#[test]
fn test_length() {
    let schema = test_packet();
    assert_eq!(schema.bit_length(), 288);
    assert_eq!(schema.byte_length(), 36);
    assert_eq!(
        schema.layout(),
        "char5 bits1 u32be bits1 u32be bits1 u32be f32be text10 skip2 rest"
    );
}

#[test]
fn test_describe() {
    let expected = vec![
        "byte   : type       name            [ size] description",
        "----------------------------------------------------------------------",
        "@0     : Char       chr             [  40b] character data",
        "       : Array      ary             [   3 ] an array of composites",
        "       : Composite  ary[0]          [     ] ",
        "@5     : Pad                        [   3b] ",
        "@5     : Unsigned   ary[0].cnt      [   5b] ",
        "@6     : Signed     ary[0].num      [  32b] ",
        "       : Composite  ary[1]          [     ] ",
        "@10    : Pad                        [   3b] ",
        "@10    : Unsigned   ary[1].cnt      [   5b] ",
        "@11    : Signed     ary[1].num      [  32b] ",
        "       : Composite  ary[2]          [     ] ",
        "@15    : Pad                        [   3b] ",
        "@15    : Unsigned   ary[2].cnt      [   5b] ",
        "@16    : Signed     ary[2].num      [  32b] ",
        "@20    : Float      flt             [  32b] floating point data",
        "@24    : Text       txt             [  80b] a wee bit o text",
        "@34    : Pad                        [  16b] ",
        "@36    : Rest       payload         [  var] the rest of the packet",
    ];
    let schema = test_packet();
    assert_eq!(schema.describe(false), expected);
    assert_eq!(schema.describe(true), expected[2..].to_vec());
}

#[test]
fn test_display() {
    assert_eq!(
        filled().to_string(),
        "TestPacket chr=\"123\", ary=[{cnt=1, num=-1}, {cnt=2, num=-2}, {cnt=3, num=-3}], \
         flt=1.0, txt=\"hi mom\", payload=\"\""
    );
}

#[test]
fn test_access_by_path() {
    let mut p = filled();
    assert_eq!(p.get_path("chr").unwrap(), Value::from("123"));
    for i in 0..3i64 {
        assert_eq!(p.get_path(&format!("ary[{i}].cnt")).unwrap(), Value::Unsigned(i as u64 + 1));
        assert_eq!(p.get_path(&format!("ary[{i}].num")).unwrap(), Value::Signed(-i - 1));
    }
    assert_eq!(p.get_path("flt").unwrap(), Value::Float(1.0));
    assert_eq!(p.get_path("txt").unwrap(), Value::from("hi mom"));
    assert_eq!(p.get_path("payload").unwrap(), Value::from(""));

    p.set_path("chr", b"\x00\x53abc").unwrap();
    p.set_path("ary[0].cnt", 10).unwrap();
    p.set_path("ary[1].cnt", 20).unwrap();
    p.set_path("ary[2].cnt", 30).unwrap();
    p.set_path("ary[0].num", -10).unwrap();
    p.set_path("ary[1].num", -20).unwrap();
    p.set_path("ary[2].num", -30).unwrap();
    p.set_path("flt", 3.14159).unwrap();
    p.set_path("txt", "hello").unwrap();
    p.set_path("payload", "12345").unwrap();

    assert_eq!(p.get("chr").unwrap(), Value::from(b"\x00\x53abc"));
    let ary = p.array("ary").unwrap();
    assert_eq!(ary.composite(0).unwrap().get("cnt").unwrap(), Value::Unsigned(10));
    assert_eq!(ary.composite(2).unwrap().get("num").unwrap(), Value::Signed(-30));
    assert_eq!(p.get("flt").unwrap(), Value::Float(f64::from(3.14159f32)));
    assert_eq!(p.get("txt").unwrap(), Value::from("hello"));
    assert_eq!(p.get("payload").unwrap(), Value::from("12345"));
}

#[test]
fn test_bad_paths() {
    let mut p = filled();
    assert!(matches!(p.get_path("ary[3].cnt"), Err(Error::Index(_))));
    assert!(matches!(p.get_path("ary[0]"), Err(Error::Argument(_))));
    assert!(matches!(p.get_path("flt.x"), Err(Error::Argument(_))));
    assert!(matches!(p.get_path("ary.cnt"), Err(Error::Argument(_))));
    assert!(matches!(p.set_path("nope", 1), Err(Error::Argument(_))));
}

#[test]
fn test_serialize_and_parse() {
    let p = filled();
    let mut expected = b"123\0\0".to_vec();
    expected.extend([0x01, 0xff, 0xff, 0xff, 0xff]);
    expected.extend([0x02, 0xff, 0xff, 0xff, 0xfe]);
    expected.extend([0x03, 0xff, 0xff, 0xff, 0xfd]);
    expected.extend(1.0f32.to_be_bytes());
    expected.extend(b"hi mom    ");
    expected.extend([0, 0]);
    expected.extend(b"trailing");

    let mut with_rest = p.clone();
    with_rest.set("payload", "trailing").unwrap();
    assert_eq!(with_rest.to_bytes(), expected);

    let parsed = Record::from_bytes(test_packet(), &expected).unwrap();
    assert_eq!(parsed.get("chr").unwrap(), Value::from(b"123\0\0"));
    assert_eq!(parsed.get("txt").unwrap(), Value::from("hi mom"));
    assert_eq!(parsed.get("payload").unwrap(), Value::from("trailing"));
    assert_eq!(parsed.get_path("ary[2].num").unwrap(), Value::Signed(-3));
    assert_eq!(parsed.to_bytes(), expected);

    assert!(matches!(
        Record::from_bytes(test_packet(), &expected[..35]),
        Err(Error::Range(_))
    ));
}

#[test]
fn test_elements_are_independent() {
    let mut p = Record::new(test_packet());
    p.set_path("ary[1].num", 77).unwrap();
    assert_eq!(p.get_path("ary[0].num").unwrap(), Value::Signed(0));
    assert_eq!(p.get_path("ary[1].num").unwrap(), Value::Signed(77));
    assert_eq!(p.get_path("ary[2].num").unwrap(), Value::Signed(0));
}

#[test]
fn test_setting_array_resets_elements() {
    let mut p = filled();
    p.set("ary", Value::Empty).unwrap();
    for i in 0..3 {
        assert_eq!(p.get_path(&format!("ary[{i}].cnt")).unwrap(), Value::Unsigned(0));
    }
    assert_eq!(p.get("txt").unwrap(), Value::from("hi mom"));
}

#[test]
fn test_pad_placeholder_is_inert() {
    let mut p = filled();
    assert_eq!(p.get("pad").unwrap(), Value::Empty);
    p.set("pad", 12).unwrap();
    assert_eq!(p.to_bytes(), filled().to_bytes());
}

#[test]
fn test_derived_schema() {
    let mut child = test_packet().derive("Child");
    assert!(matches!(
        child.add_field(FieldSpec::unsigned("extra", 8)),
        Err(Error::Schema(_))
    ));
    let mut base = SchemaBuilder::new("Base");
    base.add_field(FieldSpec::unsigned("a", 8)).unwrap();
    let mut child = base.derive("Child");
    child.add_field(FieldSpec::unsigned("b", 8)).unwrap();
    let child = child.finish().unwrap();
    assert_eq!(child.name(), "Child");
    assert_eq!(child.fields().len(), 2);
    assert_eq!(base.finish().unwrap().fields().len(), 1);
}
