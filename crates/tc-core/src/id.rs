use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for tool IDs — fast comparisons, low memory.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// A lightweight, interned identifier for tool instances on the canvas.
/// Internally a `Spur` index — 4 bytes, Copy, Eq, Hash in O(1).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToolId(Spur);

impl ToolId {
    /// Intern a string as a ToolId, or return existing if already interned.
    pub fn intern(s: &str) -> Self {
        ToolId(INTERNER.get_or_intern(s))
    }

    /// The id for `s` if it was ever interned. Unknown strings cannot
    /// name an existing tool, so this avoids growing the interner.
    pub fn lookup(s: &str) -> Option<Self> {
        INTERNER.get(s).map(ToolId)
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a fresh random ID.
    ///
    /// Random rather than counter-based: restored tools carry IDs from
    /// earlier sessions, and a counter restarting at zero would collide.
    pub fn generate() -> Self {
        Self::intern(&uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Debug for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ToolId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ToolId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ToolId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ToolId::intern("weather-1");
        let b = ToolId::intern("weather-1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "weather-1");
    }

    #[test]
    fn lookup_does_not_intern() {
        assert_eq!(ToolId::lookup("never-seen-9f2c"), None);
        let id = ToolId::intern("seen-9f2c");
        assert_eq!(ToolId::lookup("seen-9f2c"), Some(id));
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = ToolId::generate();
        let b = ToolId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ToolId::intern("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: ToolId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}
