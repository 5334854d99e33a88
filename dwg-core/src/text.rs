//! Wire text encodings used by SMS and USSD bodies.
//!
//! Two forms exist on the wire:
//! - **UCS-2**: every UTF-16 code unit as two big-endian bytes.
//! - **GSM 7-bit**: one byte per character index into the GSM 03.38
//!   basic table, or an escape byte (27) followed by an index into the
//!   extension table. Indices are stored one per byte, not bit-packed.

use crate::error::DwgError;

// ── Tables ───────────────────────────────────────────────────────

/// Index of the escape character in the basic table.
pub const GSM7_ESCAPE: u8 = 27;

/// GSM 03.38 basic character set.
#[rustfmt::skip]
const BASIC: [char; 128] = [
    '@', '£', '$', '¥', 'è', 'é', 'ù', 'ì', 'ò', 'Ç', '\n', 'Ø', 'ø', '\r', 'Å', 'å',
    'Δ', '_', 'Φ', 'Γ', 'Λ', 'Ω', 'Π', 'Ψ', 'Σ', 'Θ', 'Ξ', '\x1b', 'Æ', 'æ', 'ß', 'É',
    ' ', '!', '"', '#', '¤', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '¡', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'Ä', 'Ö', 'Ñ', 'Ü', '§',
    '¿', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', 'ä', 'ö', 'ñ', 'ü', 'à',
];

/// GSM 03.38 basic character set extension (reached through the escape).
const EXTENSION: [(u8, char); 10] = [
    (0x0A, '\x0c'),
    (0x14, '^'),
    (0x28, '{'),
    (0x29, '}'),
    (0x2F, '\\'),
    (0x3C, '['),
    (0x3D, '~'),
    (0x3E, ']'),
    (0x40, '|'),
    (0x65, '€'),
];

fn basic_index(c: char) -> Option<u8> {
    // ESC itself is never a printable character.
    if c == '\x1b' {
        return None;
    }
    BASIC.iter().position(|&b| b == c).map(|i| i as u8)
}

fn extension_index(c: char) -> Option<u8> {
    EXTENSION.iter().find(|(_, e)| *e == c).map(|(i, _)| *i)
}

fn extension_char(index: u8) -> Option<char> {
    EXTENSION.iter().find(|(i, _)| *i == index).map(|(_, c)| *c)
}

// ── GSM 7-bit ────────────────────────────────────────────────────

/// Encode `text` into GSM 7-bit indices.
pub fn encode_gsm7(text: &str) -> Result<Vec<u8>, DwgError> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        if let Some(index) = basic_index(c) {
            out.push(index);
        } else if let Some(index) = extension_index(c) {
            out.push(GSM7_ESCAPE);
            out.push(index);
        } else {
            return Err(DwgError::UnsupportedCharacter(c));
        }
    }
    Ok(out)
}

/// Decode GSM 7-bit indices back into text.
pub fn decode_gsm7(bytes: &[u8]) -> Result<String, DwgError> {
    let mut out = String::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();
    while let Some(b) = iter.next() {
        if b == GSM7_ESCAPE {
            let ext = iter
                .next()
                .ok_or(DwgError::MalformedText("escape at end of input"))?;
            let c = extension_char(ext)
                .ok_or(DwgError::MalformedText("unmapped extension index"))?;
            out.push(c);
        } else {
            let c = BASIC
                .get(b as usize)
                .ok_or(DwgError::MalformedText("index outside the basic table"))?;
            out.push(*c);
        }
    }
    Ok(out)
}

/// Number of bytes `text` occupies in GSM 7-bit form.
pub fn gsm7_len(text: &str) -> Result<usize, DwgError> {
    text.chars().try_fold(0usize, |len, c| {
        if basic_index(c).is_some() {
            Ok(len + 1)
        } else if extension_index(c).is_some() {
            Ok(len + 2)
        } else {
            Err(DwgError::UnsupportedCharacter(c))
        }
    })
}

/// Upper bound on the GSM 7-bit size of `char_count` characters.
pub fn gsm7_max_len(char_count: usize) -> usize {
    char_count * 2
}

// ── UCS-2 ────────────────────────────────────────────────────────

/// Encode `text` as big-endian UTF-16 code units.
pub fn encode_ucs2(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(u16::to_be_bytes).collect()
}

/// Decode big-endian UTF-16 code units.
pub fn decode_ucs2(bytes: &[u8]) -> Result<String, DwgError> {
    if bytes.len() % 2 != 0 {
        return Err(DwgError::MalformedText("odd byte count in 16-bit text"));
    }
    let units = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| DwgError::MalformedText("unpaired surrogate in 16-bit text"))
}

/// Number of bytes `text` occupies in UCS-2 form.
pub fn ucs2_len(text: &str) -> usize {
    text.encode_utf16().count() * 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_consistent() {
        assert_eq!(BASIC[GSM7_ESCAPE as usize], '\x1b');
        for (index, c) in EXTENSION {
            assert!((index as usize) < 128);
            assert!(basic_index(c).is_none(), "{c:?} is in both tables");
        }
    }

    #[test]
    fn gsm7_basic_roundtrip() {
        let text = "Hello @ world! £5 ÄÖÑÜ§¿ äöñüà\r\nΔΦΓΛΩΠΨΣΘΞ";
        let bytes = encode_gsm7(text).unwrap();
        assert_eq!(bytes.len(), text.chars().count());
        assert_eq!(decode_gsm7(&bytes).unwrap(), text);
    }

    #[test]
    fn gsm7_extension_roundtrip() {
        let text = "{[~]} ^ \\ | €10";
        let bytes = encode_gsm7(text).unwrap();
        assert_eq!(decode_gsm7(&bytes).unwrap(), text);
        assert_eq!(bytes.len(), gsm7_len(text).unwrap());
    }

    #[test]
    fn gsm7_known_indices() {
        assert_eq!(encode_gsm7("@A").unwrap(), vec![0x00, 0x41]);
        assert_eq!(encode_gsm7("€").unwrap(), vec![GSM7_ESCAPE, 0x65]);
        assert_eq!(encode_gsm7("{").unwrap(), vec![GSM7_ESCAPE, 0x28]);
    }

    #[test]
    fn gsm7_unsupported_character() {
        let err = encode_gsm7("Привет").unwrap_err();
        assert!(matches!(err, DwgError::UnsupportedCharacter('П')));
        assert!(gsm7_len("日本").is_err());
        assert!(matches!(
            encode_gsm7("\x1b"),
            Err(DwgError::UnsupportedCharacter('\x1b'))
        ));
    }

    #[test]
    fn gsm7_malformed_input() {
        assert!(matches!(
            decode_gsm7(&[0x80]),
            Err(DwgError::MalformedText(_))
        ));
        assert!(matches!(
            decode_gsm7(&[0x41, GSM7_ESCAPE]),
            Err(DwgError::MalformedText(_))
        ));
        assert!(matches!(
            decode_gsm7(&[GSM7_ESCAPE, 0x41]),
            Err(DwgError::MalformedText(_))
        ));
    }

    #[test]
    fn gsm7_worst_case_bound() {
        let text = "€€€";
        assert_eq!(gsm7_len(text).unwrap(), gsm7_max_len(3));
    }

    #[test]
    fn ucs2_roundtrip() {
        let text = "Привет, мир! 😀";
        let bytes = encode_ucs2(text);
        assert_eq!(bytes.len(), ucs2_len(text));
        assert_eq!(decode_ucs2(&bytes).unwrap(), text);
    }

    #[test]
    fn ucs2_is_big_endian() {
        assert_eq!(encode_ucs2("A"), vec![0x00, 0x41]);
        assert_eq!(encode_ucs2("Ж"), vec![0x04, 0x16]);
    }

    #[test]
    fn ucs2_malformed_input() {
        assert!(decode_ucs2(&[0x00]).is_err());
        // Lone high surrogate.
        assert!(decode_ucs2(&[0xD8, 0x3D]).is_err());
    }
}
