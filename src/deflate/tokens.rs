use std::fmt;

/// Represents a single token in the LZ77 stream
///
/// LZSS style: a repeat carries no trailing literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Token {
    /// A literal byte
    Literal(u8),
    /// A back-reference: copy `length` bytes from `distance` bytes back
    Repeat { distance: u32, length: u32 },
}

impl Token {
    pub fn repeat(distance: u32, length: u32) -> Self {
        Token::Repeat { distance, length }
    }

    /// Returns the uncompressed size this token represents
    pub fn uncompressed_size(&self) -> usize {
        match self {
            Token::Literal(_) => 1,
            Token::Repeat { length, .. } => *length as usize,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Token::Literal(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(byte) if byte.is_ascii_graphic() || *byte == b' ' => {
                write!(f, "{}", *byte as char)
            }
            Token::Literal(byte) => write!(f, "\\x{:02x}", byte),
            Token::Repeat { distance, length } => write!(f, "({},{})", distance, length),
        }
    }
}

/// Expand a token stream back into bytes.
///
/// Returns `None` if a repeat reaches before the start of the output.
pub fn expand(tokens: &[Token]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(tokens.iter().map(Token::uncompressed_size).sum());
    for token in tokens {
        match *token {
            Token::Literal(byte) => out.push(byte),
            Token::Repeat { distance, length } => {
                let distance = distance as usize;
                if distance == 0 || distance > out.len() {
                    return None;
                }
                let start = out.len() - distance;
                // byte at a time: the source may overlap what is being written
                for i in 0..length as usize {
                    out.push(out[start + i]);
                }
            }
        }
    }
    Some(out)
}
