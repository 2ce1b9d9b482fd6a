mod escape;
mod utf16;

pub use self::escape::{LINE_BREAK_PATTERN, minify, unescape_entities};
pub use self::utf16::{decode_string_body, decode_utf16le_lossy};
