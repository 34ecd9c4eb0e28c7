/*
World-Schema DEFINITIONS IMPLICIT TAGS ::=
BEGIN
Request ::= SEQUENCE {
  num INTEGER,
  tag [0] UTF8String OPTIONAL
}
BODY ::= CHOICE {
  request [3000] EXPLICIT  Request,
  raw [3001] OCTET STRING
}
Message ::= SEQUENCE {
  id INTEGER,
  body BODY
}
END
*/
use asn1_codec::{decode_untyped, marshal, unmarshal, AsnType, Mode, SequenceOf};

#[derive(Debug, AsnType)]
struct Message {
    id: i32,
    body: Body,
}

#[derive(Debug, AsnType)]
enum Body {
    #[asn1(tag = 3000, explicit)]
    Request(Request),

    #[asn1(tag = 3001)]
    Raw(Vec<u8>),
}

#[derive(Debug, AsnType)]
struct Request {
    num: i32,
    #[asn1(tag = 0)]
    tag: Option<String>,
}

fn main() -> asn1_codec::Result<()> {
    let messages = vec![
        Message {
            id: 1,
            body: Body::Request(Request {
                num: 1,
                tag: Some("hello".to_string()),
            }),
        },
        Message {
            id: 2,
            body: Body::Raw(vec![0xca, 0xfe]),
        },
    ];

    for message in messages.iter() {
        for mode in [Mode::Ber, Mode::Cer, Mode::Der].iter() {
            let bytes = marshal(message, *mode)?;
            println!("{}: {:02x?}", mode, bytes);

            let (decoded, _) = unmarshal::<Message>(&bytes, *mode)?;
            println!("{}: {:?}", mode, decoded);
        }
    }

    let bytes = marshal(&SequenceOf(vec![1i32, 2, 3]), Mode::Der)?;
    let (value, _) = decode_untyped(&bytes, Mode::Der)?;
    println!("untyped: {}", value);
    Ok(())
}
