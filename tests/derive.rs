/*
World-Schema DEFINITIONS IMPLICIT TAGS ::=
BEGIN
Request ::= SEQUENCE {
  num INTEGER
}
Response ::= SEQUENCE {
  ret INTEGER
}
BODY ::= CHOICE {
  request [3000] EXPLICIT  Request,
  response [3001] EXPLICIT  Response
}
Message ::= SEQUENCE {
  id INTEGER,
  body BODY
}
END

value Message ::= {
  id 1,
  body request : {
    num 1
  }
}
*/
use asn1_codec::{
    marshal, unmarshal, AsnType, Error, Mode, SequenceOf, Tag, TypeDescriptor, Value,
};

#[derive(AsnType, Debug, PartialEq)]
struct Message {
    seq: i32,
    body: Body,
}

#[derive(AsnType, Debug, PartialEq)]
enum Body {
    #[asn1(tag = 3000, explicit)]
    Request(Request),

    #[asn1(tag = 3001, explicit)]
    Response(Response),
}

#[derive(AsnType, Debug, PartialEq)]
struct Request {
    num: i32,
}

#[derive(AsnType, Debug, PartialEq)]
struct Response {
    ret: i32,
}

#[test]
fn it_works() {
    let message = Message {
        seq: 1,
        body: Body::Request(Request { num: 1 }),
    };
    let bytes = marshal(&message, Mode::Der).unwrap();
    assert_eq!(
        bytes,
        vec![0x30, 0x0C, 0x02, 0x01, 0x01, 0xBF, 0x97, 0x38, 0x05, 0x30, 0x03, 0x02, 0x01, 0x01]
    );

    let (decoded, rest) = unmarshal::<Message>(&bytes, Mode::Der).unwrap();
    assert_eq!(decoded, message);
    assert!(rest.is_empty());

    let response = Message {
        seq: 2,
        body: Body::Response(Response { ret: -1 }),
    };
    let bytes = marshal(&response, Mode::Ber).unwrap();
    assert_eq!(unmarshal::<Message>(&bytes, Mode::Ber).unwrap().0, response);
}

#[test]
fn value_tree() {
    let message = Message {
        seq: 7,
        body: Body::Response(Response { ret: 0 }),
    };
    assert_eq!(
        message.to_value(),
        Value::sequence(vec![
            ("seq", Value::from(7)),
            (
                "body",
                Value::choice("Response", Value::sequence(vec![("ret", Value::from(0))]))
            ),
        ])
    );
    assert!(matches!(
        Body::from_value(Value::choice("Other", Value::Null)),
        Err(Error::TypeMismatch { .. })
    ));
    assert!(matches!(
        Message::from_value(Value::Null),
        Err(Error::TypeMismatch { .. })
    ));
}

/*
Record ::= [APPLICATION 5] IMPLICIT SET {
  name [0] UTF8String,
  age [1] INTEGER (0..255) OPTIONAL,
  scores [2] SEQUENCE OF INTEGER
}
*/
#[derive(AsnType, Debug, PartialEq)]
#[asn1(set, tag = 5, application)]
struct Record {
    #[asn1(tag = 0)]
    name: String,
    #[asn1(tag = 1)]
    age: Option<u8>,
    #[asn1(tag = 2)]
    scores: SequenceOf<i64>,
}

#[test]
fn sets_and_optional_fields() {
    let descriptor = Record::descriptor();
    assert_eq!(descriptor.tags().outermost(), Some(&Tag::application(5).constructed()));

    let record = Record {
        name: "ann".to_string(),
        age: None,
        scores: SequenceOf(vec![3]),
    };
    let bytes = marshal(&record, Mode::Der).unwrap();
    assert_eq!(
        bytes,
        vec![
            0x65, 0x0a, 0x80, 0x03, b'a', b'n', b'n', 0xa2, 0x03, 0x02, 0x01, 0x03
        ]
    );
    assert_eq!(unmarshal::<Record>(&bytes, Mode::Der).unwrap().0, record);

    let record = Record {
        age: Some(200),
        ..record
    };
    let bytes = marshal(&record, Mode::Cer).unwrap();
    assert_eq!(unmarshal::<Record>(&bytes, Mode::Cer).unwrap().0, record);

    // 300 is outside u8
    let value = Value::Set(vec![
        ("name".to_string(), Value::from("x")),
        ("age".to_string(), Value::from(300)),
        ("scores".to_string(), Value::SequenceOf(vec![])),
    ]);
    assert!(matches!(
        asn1_codec::encode(&value, &descriptor, Mode::Der),
        Err(Error::ConstraintViolation { .. })
    ));
}

#[derive(AsnType, Debug, PartialEq)]
struct Pair(bool, #[asn1(tag = 0, explicit)] Vec<u8>);

#[test]
fn tuple_structs() {
    let pair = Pair(true, vec![0xab]);
    let bytes = marshal(&pair, Mode::Der).unwrap();
    assert_eq!(
        bytes,
        vec![0x30, 0x08, 0x01, 0x01, 0xff, 0xa0, 0x03, 0x04, 0x01, 0xab]
    );
    assert_eq!(unmarshal::<Pair>(&bytes, Mode::Der).unwrap().0, pair);
    assert_eq!(pair.to_value().get("field1"), Some(&Value::OctetString(vec![0xab])));
}

#[test]
fn descriptors_are_checked() {
    let result = TypeDescriptor::try_set(vec![
        asn1_codec::ComponentType::required("a", TypeDescriptor::integer()),
        asn1_codec::ComponentType::required("b", TypeDescriptor::integer()),
    ]);
    assert!(matches!(result, Err(Error::InvalidSchema(_))));
}
