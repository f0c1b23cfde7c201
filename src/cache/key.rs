//! Cache Key Module
//!
//! Derives deterministic string keys from ordered sequences of typed arguments.
//!
//! Each argument contributes its runtime type identity and a canonical text
//! representation to an accumulating buffer, which is reduced to a fixed-size
//! 64-bit fingerprint. The fingerprint is stable within a process run;
//! stability across restarts is not guaranteed.

use std::fmt;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Token written for an absent (`None`) argument.
///
/// Contains a NUL byte so it cannot collide with any present value, including
/// a present-but-empty string.
const NIL_TOKEN: &str = "\u{0}nil\u{0}";

// == Cache Key ==
/// Opaque, deterministic fingerprint of an ordered, typed argument list.
///
/// Two builders fed identical (type, value) sequences always produce equal
/// keys; sequences differing in any element, type, or order produce different
/// keys with overwhelming probability. The fingerprint is collision-resistant,
/// not cryptographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Starts a new [`KeyBuilder`].
    pub fn builder() -> KeyBuilder {
        KeyBuilder::new()
    }

    /// Wraps an externally produced string as a key.
    ///
    /// Callers that already hold a unique identifier (a file path, a UUID)
    /// can skip fingerprinting entirely.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the key text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// == Key Segment ==
/// A single typed argument of a key fingerprint.
///
/// Implementations contribute a type tag and a canonical text representation.
/// The tag keeps value-equal arguments of different types from colliding, so
/// callers can key by `(T, values...)` without cross-type cache poisoning.
pub trait KeySegment {
    /// Runtime type identity of this segment.
    fn type_tag(&self) -> &'static str;

    /// Writes the canonical text representation into `buf`.
    fn write_canonical(&self, buf: &mut String);
}

macro_rules! impl_key_segment {
    ($($ty:ty),* $(,)?) => {
        $(
            impl KeySegment for $ty {
                fn type_tag(&self) -> &'static str {
                    std::any::type_name::<$ty>()
                }

                fn write_canonical(&self, buf: &mut String) {
                    let _ = write!(buf, "{}", self);
                }
            }
        )*
    };
}

impl_key_segment!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64, bool, char,
);

// String-like segments all share the `str` tag, so `"a"`, `String::from("a")`
// and `&"a"` fingerprint identically.
impl KeySegment for str {
    fn type_tag(&self) -> &'static str {
        "str"
    }

    fn write_canonical(&self, buf: &mut String) {
        buf.push_str(self);
    }
}

impl KeySegment for &str {
    fn type_tag(&self) -> &'static str {
        "str"
    }

    fn write_canonical(&self, buf: &mut String) {
        buf.push_str(self);
    }
}

impl KeySegment for String {
    fn type_tag(&self) -> &'static str {
        "str"
    }

    fn write_canonical(&self, buf: &mut String) {
        buf.push_str(self);
    }
}

impl<T: KeySegment> KeySegment for Option<T> {
    fn type_tag(&self) -> &'static str {
        std::any::type_name::<Option<T>>()
    }

    fn write_canonical(&self, buf: &mut String) {
        match self {
            Some(value) => value.write_canonical(buf),
            None => buf.push_str(NIL_TOKEN),
        }
    }
}

// == Key Builder ==
/// Accumulates typed segments and reduces them to a [`CacheKey`].
///
/// Every segment is framed as `tag=len:text|`; the length prefix keeps a
/// value containing the delimiter from forging a segment boundary. An empty
/// builder is valid and yields a fixed key distinct from any non-empty
/// sequence's key.
#[derive(Debug, Default)]
pub struct KeyBuilder {
    buf: String,
    segments: usize,
}

impl KeyBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one typed segment.
    pub fn push<S: KeySegment + ?Sized>(mut self, segment: &S) -> Self {
        let mut text = String::new();
        segment.write_canonical(&mut text);
        let _ = write!(self.buf, "{}={}:{}|", segment.type_tag(), text.len(), text);
        self.segments += 1;
        self
    }

    /// Reduces the accumulated segments to a key. Never fails.
    pub fn finish(self) -> CacheKey {
        let mut hasher = FxHasher::default();
        self.segments.hash(&mut hasher);
        self.buf.hash(&mut hasher);
        CacheKey(format!("{:016x}", hasher.finish()))
    }
}

// == Convenience Macro ==
/// Builds a [`CacheKey`](crate::cache::CacheKey) from a list of segment expressions.
///
/// ```
/// use memocache::cache_key;
///
/// let key = cache_key!("user", 42_u64);
/// assert_eq!(key, cache_key!("user", 42_u64));
/// ```
#[macro_export]
macro_rules! cache_key {
    ($($segment:expr),* $(,)?) => {{
        let builder = $crate::cache::KeyBuilder::new();
        $(let builder = builder.push(&$segment);)*
        builder.finish()
    }};
}
