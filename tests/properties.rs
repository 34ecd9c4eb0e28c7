use asn1_codec::{
    decode, encode, encode_with_options, ComponentType, DecodeErrorKind, EncodeOptions, Mode,
    ObjectIdentifier, Tag, TypeDescriptor, Value,
};
use bit_vec::BitVec;
use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROUNDS: usize = 200;

/*
Record ::= SEQUENCE {
  id INTEGER,
  flag BOOLEAN,
  name UTF8String,
  data OCTET STRING,
  note [0] IA5String OPTIONAL,
  list SEQUENCE OF INTEGER,
  bits BIT STRING,
  oid OBJECT IDENTIFIER,
  pick CHOICE {
    num [1] INTEGER,
    text [2] EXPLICIT PrintableString
  }
}
*/
fn record() -> TypeDescriptor {
    TypeDescriptor::sequence(vec![
        ComponentType::required("id", TypeDescriptor::integer()),
        ComponentType::required("flag", TypeDescriptor::boolean()),
        ComponentType::required("name", TypeDescriptor::utf8_string()),
        ComponentType::required("data", TypeDescriptor::octet_string()),
        ComponentType::optional(
            "note",
            TypeDescriptor::ia5_string().tagged_implicitly(Tag::context(0)),
        ),
        ComponentType::required("list", TypeDescriptor::sequence_of(TypeDescriptor::integer())),
        ComponentType::required("bits", TypeDescriptor::bit_string()),
        ComponentType::required("oid", TypeDescriptor::object_identifier()),
        ComponentType::required(
            "pick",
            TypeDescriptor::choice(vec![
                ComponentType::required(
                    "num",
                    TypeDescriptor::integer().tagged_implicitly(Tag::context(1)),
                ),
                ComponentType::required(
                    "text",
                    TypeDescriptor::printable_string().tagged_explicitly(Tag::context(2)),
                ),
            ]),
        ),
    ])
}

fn integer(rng: &mut StdRng) -> Value {
    let big = BigInt::from(rng.gen::<i64>()) * BigInt::from(rng.gen::<i32>());
    Value::Integer(match rng.gen_range(0..3) {
        0 => BigInt::from(rng.gen_range(-300..300)),
        1 => BigInt::from(rng.gen::<i64>()),
        _ => big,
    })
}

fn text(rng: &mut StdRng, alphabet: &[char], max: usize) -> String {
    let len = rng.gen_range(0..max);
    (0..len)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

fn random_record(rng: &mut StdRng) -> Value {
    let printable: Vec<char> = ('a'..='z').chain('0'..='9').chain(" '()+,-./:=?".chars()).collect();
    let unicode: Vec<char> = printable.iter().cloned().chain("é€ü日本".chars()).collect();

    let mut components = vec![
        ("id", integer(rng)),
        ("flag", Value::Boolean(rng.gen())),
        ("name", Value::String(text(rng, &unicode, 20))),
        (
            "data",
            Value::OctetString((0..rng.gen_range(0..300)).map(|_| rng.gen()).collect()),
        ),
    ];
    if rng.gen() {
        components.push(("note", Value::String(text(rng, &printable, 10))));
    }
    components.push((
        "list",
        Value::SequenceOf((0..rng.gen_range(0..5)).map(|_| integer(rng)).collect()),
    ));
    components.push((
        "bits",
        Value::BitString((0..rng.gen_range(0..40)).map(|_| rng.gen::<bool>()).collect::<BitVec>()),
    ));
    let mut arcs = vec![rng.gen_range(0..2), rng.gen_range(0..40)];
    arcs.extend((0..rng.gen_range(0..4)).map(|_| rng.gen::<u32>() as u64));
    components.push(("oid", Value::ObjectIdentifier(ObjectIdentifier::new(arcs))));
    components.push((
        "pick",
        if rng.gen() {
            Value::choice("num", integer(rng))
        } else {
            Value::choice("text", text(rng, &printable, 12))
        },
    ));
    Value::sequence(components)
}

#[test]
fn round_trip() {
    let mut rng = StdRng::seed_from_u64(0x6173_6e31);
    let descriptor = record();
    for _ in 0..ROUNDS {
        let value = random_record(&mut rng);
        for mode in [Mode::Ber, Mode::Cer, Mode::Der].iter() {
            let bytes = encode(&value, &descriptor, *mode).unwrap();
            let (decoded, consumed) = decode(&bytes, &descriptor, *mode).unwrap();
            assert_eq!(consumed, bytes.len());
            assert_eq!(decoded, value, "{} round trip of {}", mode, value);
        }
    }
}

#[test]
fn der_is_a_fixed_point() {
    let mut rng = StdRng::seed_from_u64(7);
    let descriptor = record();
    for _ in 0..ROUNDS {
        let value = random_record(&mut rng);
        let bytes = encode(&value, &descriptor, Mode::Der).unwrap();
        let (decoded, _) = decode(&bytes, &descriptor, Mode::Der).unwrap();
        assert_eq!(encode(&decoded, &descriptor, Mode::Der).unwrap(), bytes);
    }
}

#[test]
fn integers_are_minimal() {
    let mut rng = StdRng::seed_from_u64(42);
    let descriptor = TypeDescriptor::integer();
    for _ in 0..ROUNDS * 5 {
        let value = integer(&mut rng);
        for mode in [Mode::Cer, Mode::Der].iter() {
            let bytes = encode(&value, &descriptor, *mode).unwrap();
            assert_eq!(bytes[0], 0x02);
            let content = &bytes[2..];
            assert_eq!(usize::from(bytes[1]), content.len());
            if content.len() > 1 {
                let redundant = (content[0] == 0x00 && content[1] & 0x80 == 0)
                    || (content[0] == 0xff && content[1] & 0x80 != 0);
                assert!(!redundant, "{:02x?}", bytes);
            }
        }
    }
}

#[test]
fn prefixes_are_truncated() {
    let mut rng = StdRng::seed_from_u64(1);
    let descriptor = record();
    let indefinite = EncodeOptions {
        indefinite_length: true,
        ..EncodeOptions::default()
    };
    for _ in 0..ROUNDS / 4 {
        let value = random_record(&mut rng);
        let encodings = vec![
            (Mode::Der, encode(&value, &descriptor, Mode::Der).unwrap()),
            (
                Mode::Ber,
                encode_with_options(&value, &descriptor, Mode::Ber, &indefinite).unwrap(),
            ),
        ];
        for (mode, bytes) in encodings {
            for end in 0..bytes.len() {
                let err = decode(&bytes[..end], &descriptor, mode).unwrap_err();
                assert!(
                    matches!(err.decode_kind(), Some(DecodeErrorKind::Truncated { .. })),
                    "{} prefix of {} bytes: {}",
                    mode,
                    end,
                    err
                );
            }
        }
    }
}

#[test]
fn foreign_tags_are_rejected() {
    let mut rng = StdRng::seed_from_u64(3);
    let descriptor = record();
    for _ in 0..ROUNDS {
        let value = random_record(&mut rng);
        let mut bytes = encode(&value, &descriptor, Mode::Der).unwrap();
        // SEQUENCE becomes SET
        bytes[0] = 0x31;
        let err = decode(&bytes, &descriptor, Mode::Der).unwrap_err();
        assert!(matches!(
            err.decode_kind(),
            Some(DecodeErrorKind::UnknownTag(_))
        ));
    }
}
