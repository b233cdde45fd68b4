use std::fmt;

/// Text encodings offered for importing and exporting plain-text formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextCodec {
    Utf8,
    Latin1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    InvalidUtf8 { offset: usize },
    Unrepresentable(char),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::InvalidUtf8 { offset } => write!(f, "the data is not valid UTF-8 (at byte {})", offset),
            CodecError::Unrepresentable(c) => write!(f, "the character '{}' cannot be written in this encoding", c),
        }
    }
}

impl std::error::Error for CodecError {}

impl TextCodec {
    /// Looks up a codec by any of its common names, ignoring case.
    pub fn for_name(name: &str) -> Option<TextCodec> {
        match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(TextCodec::Utf8),
            "iso-8859-1" | "iso8859-1" | "latin1" | "latin-1" => Some(TextCodec::Latin1),
            _ => None,
        }
    }

    /// Like [TextCodec::for_name], falling back to UTF-8 for unknown names.
    pub fn for_name_or_default(name: &str) -> TextCodec {
        TextCodec::for_name(name).unwrap_or(TextCodec::Utf8)
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextCodec::Utf8 => "UTF-8",
            TextCodec::Latin1 => "ISO-8859-1",
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String, CodecError> {
        match self {
            TextCodec::Utf8 => {
                let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
                std::str::from_utf8(bytes)
                    .map(str::to_string)
                    .map_err(|e| CodecError::InvalidUtf8 { offset: e.valid_up_to() })
            },
            TextCodec::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>, CodecError> {
        match self {
            TextCodec::Utf8 => Ok(text.as_bytes().to_vec()),
            TextCodec::Latin1 => text.chars().map(|c| {
                u8::try_from(u32::from(c)).map_err(|_| CodecError::Unrepresentable(c))
            }).collect(),
        }
    }
}

impl Default for TextCodec {
    fn default() -> Self {
        TextCodec::Utf8
    }
}
