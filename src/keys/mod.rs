//! Parsing and serialization of `authorized_keys` files.
//!
//! A file is decoded line by line into [`Line`]s, lines that do not parse
//! (including those that are not UTF-8) are kept byte for byte at their
//! position so that rewriting a file never alters them.

mod error;
pub use error::Error;

pub mod remote;

/// The key type used when the operator does not specify one.
pub const DEFAULT_KEY_TYPE: &str = "ssh-rsa";

/// A single `[#]<key_type> <key_material> [comment]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub enabled: bool,
    pub key_type: String,
    pub key_material: String,
    pub comment: String,
}

impl Entry {
    /// Create an enabled entry.
    pub fn new(
        key_type: impl Into<String>,
        key_material: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            enabled: true,
            key_type: key_type.into(),
            key_material: key_material.into(),
            comment: comment.into(),
        }
    }

    /// Ensure the key type and material form a valid OpenSSH public key,
    /// and that the comment fits on its line.
    pub fn validate(&self) -> Result<(), Error> {
        openssh_keys::PublicKey::parse(&format!("{} {}", self.key_type, self.key_material))
            .map_err(|err| Error::InvalidKey(err.to_string()))?;

        if self.comment.chars().any(char::is_control) {
            return Err(Error::InvalidComment(self.comment.clone()));
        }

        Ok(())
    }

    /// A shortened version of the key material for display,
    /// the first and last 10 characters joined by an ellipsis.
    pub fn short_key(&self) -> String {
        let chars: Vec<char> = self.key_material.chars().collect();

        if chars.len() <= 20 {
            return self.key_material.clone();
        }

        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 10..].iter().collect();

        format!("{head}...{tail}")
    }

    fn parse(line: &str) -> Result<Self, &'static str> {
        let line = line.trim();
        let (enabled, rest) = match line.strip_prefix('#') {
            Some(rest) => (false, rest.trim_start()),
            None => (true, line),
        };

        if rest.is_empty() {
            return Err("empty entry");
        }

        let (key_type, rest) = rest
            .split_once(char::is_whitespace)
            .ok_or("missing key material")?;
        let rest = rest.trim_start();
        let (key_material, comment) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));

        Ok(Self {
            enabled,
            key_type: key_type.into(),
            key_material: key_material.into(),
            comment: comment.trim().into(),
        })
    }
}

impl std::str::FromStr for Entry {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).map_err(|reason| Error::MalformedEntry { line: 1, reason })
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.enabled {
            f.write_str("#")?;
        }
        write!(f, "{} {}", self.key_type, self.key_material)?;
        if !self.comment.is_empty() {
            write!(f, " {}", self.comment)?;
        }

        Ok(())
    }
}

/// A non-blank line of an `authorized_keys` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Entry(Entry),

    /// A line that could not be parsed, preserved as-is.
    Malformed(Vec<u8>),
}

/// The decoded content of an `authorized_keys` file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizedKeys {
    lines: Vec<Line>,
}

impl AuthorizedKeys {
    /// Decode the `raw` file content, blank lines are dropped and
    /// every line that does not parse is reported and kept verbatim.
    pub fn decode(raw: &[u8]) -> (Self, Vec<Error>) {
        let mut errors = Vec::new();
        let lines = raw
            .split(|&byte| byte == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .enumerate()
            .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
            .map(|(idx, line)| {
                match std::str::from_utf8(line)
                    .map_err(|_| "not valid UTF-8")
                    .and_then(Entry::parse)
                {
                    Ok(entry) => Line::Entry(entry),
                    Err(reason) => {
                        errors.push(Error::MalformedEntry {
                            line: idx + 1,
                            reason,
                        });

                        Line::Malformed(line.to_vec())
                    }
                }
            })
            .collect();

        (Self { lines }, errors)
    }

    /// Encode back to the file format, one newline-terminated line per entry.
    pub fn encode(&self) -> Vec<u8> {
        let mut raw = Vec::new();

        for line in &self.lines {
            match line {
                Line::Entry(entry) => raw.extend_from_slice(entry.to_string().as_bytes()),
                Line::Malformed(line) => raw.extend_from_slice(line),
            }
            raw.push(b'\n');
        }

        raw
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Iterate over the parsed entries, skipping malformed lines.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.lines.iter().filter_map(|line| match line {
            Line::Entry(entry) => Some(entry),
            Line::Malformed(_) => None,
        })
    }

    /// Append an entry at the end of the file.
    pub fn push(&mut self, entry: Entry) {
        self.lines.push(Line::Entry(entry));
    }

    /// Remove every entry whose comment is exactly `comment`,
    /// returning how many were removed.
    pub fn remove(&mut self, comment: &str) -> usize {
        let before = self.lines.len();

        self.lines.retain(|line| match line {
            Line::Entry(entry) => entry.comment != comment,
            Line::Malformed(_) => true,
        });

        before - self.lines.len()
    }
}

impl FromIterator<Entry> for AuthorizedKeys {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        Self {
            lines: iter.into_iter().map(Line::Entry).collect(),
        }
    }
}
