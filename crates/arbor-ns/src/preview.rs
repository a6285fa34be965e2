//! Short renderings of byte payloads for debug logs.

use std::fmt;

const FULL_LIMIT: usize = 20;
const HEAD_LEN: usize = 12;

/// Displays a byte payload as an escaped byte string, cut down to its first
/// 12 bytes plus the total length once it is longer than 20 bytes.
///
/// ```
/// use arbor_ns::preview::Preview;
///
/// assert_eq!(Preview(b"hi").to_string(), r#"b"hi""#);
/// assert_eq!(
///     Preview(&[b'x'; 30]).to_string(),
///     r#"b"xxxxxxxxxxxx"[...(len=30)]"#
/// );
/// ```
pub struct Preview<'a>(pub &'a [u8]);

fn write_escaped(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("b\"")?;
    for byte in bytes {
        write!(f, "{}", std::ascii::escape_default(*byte))?;
    }
    f.write_str("\"")
}

impl fmt::Display for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() > FULL_LIMIT {
            write_escaped(f, &self.0[..HEAD_LEN])?;
            write!(f, "[...(len={})]", self.0.len())
        } else {
            write_escaped(f, self.0)
        }
    }
}

impl fmt::Debug for Preview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
