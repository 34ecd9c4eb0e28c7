/// Knobs for a single encode call.
#[derive(Clone, Copy, Debug)]
pub struct EncodeOptions {
    /// Use indefinite length for constructed values. BER only; CER always
    /// does, DER refuses.
    pub indefinite_length: bool,
    /// Split string values into constructed segments of at most this many
    /// octets. BER only; CER always segments at 1000 octets.
    pub chunk_size: Option<usize>,
    /// Check attached constraints before writing anything.
    pub check_constraints: bool,
}

impl Default for EncodeOptions {
    fn default() -> EncodeOptions {
        EncodeOptions {
            indefinite_length: false,
            chunk_size: None,
            check_constraints: true,
        }
    }
}

/// Knobs for a single decode call.
#[derive(Clone, Copy, Debug)]
pub struct DecodeOptions {
    /// Deepest nesting of constructed encodings accepted.
    pub max_depth: usize,
    pub check_constraints: bool,
}

impl Default for DecodeOptions {
    fn default() -> DecodeOptions {
        DecodeOptions {
            max_depth: 64,
            check_constraints: true,
        }
    }
}
