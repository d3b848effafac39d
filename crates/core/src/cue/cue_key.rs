use std::fmt;

/// Separator between a cue token and a trailing console label, e.g. `5.0_Preshow`.
pub const LABEL_SEPARATOR: char = '_';

/// Normalised cue identifier.
///
/// Consoles send the same cue in several shapes (`5`, `5.0`, `5.0_label`). The
/// canonical key is the token as received with any label removed; the alternate key
/// additionally drops `.0` so a cue fired as `5.0` still finds a table entry keyed `5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CueKey {
    canonical: String,
    alternate: Option<String>,
}

impl CueKey {
    pub fn parse(raw: &str) -> Self {
        let token = match raw.find(LABEL_SEPARATOR) {
            Some(idx) => &raw[..idx],
            None => raw,
        };
        let canonical = token.trim().to_string();

        let stripped = canonical.replace(".0", "");
        let alternate = if stripped != canonical && !stripped.is_empty() {
            Some(stripped)
        } else {
            None
        };

        Self {
            canonical,
            alternate,
        }
    }

    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn alternate(&self) -> Option<&str> {
        self.alternate.as_deref()
    }

    /// Keys to try, in lookup order.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical.as_str()).chain(self.alternate.as_deref())
    }

    pub fn as_number(&self) -> Option<f64> {
        self.canonical.parse::<f64>().ok().filter(|n| n.is_finite())
    }

    pub fn is_empty(&self) -> bool {
        self.canonical.is_empty()
    }
}

impl fmt::Display for CueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

impl From<&str> for CueKey {
    fn from(raw: &str) -> Self {
        CueKey::parse(raw)
    }
}
