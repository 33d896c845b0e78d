use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::UnknownDialect;

/// Source dialect, fixed for the whole of one tokenize/parse call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Css,
    Scss,
    Less,
}

impl Dialect {
    /// Pick a dialect from a file extension, falling back to plain CSS.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "scss" | "sass" => Dialect::Scss,
            "less" => Dialect::Less,
            "css" => Dialect::Css,
            other => {
                tracing::warn!(extension = other, "unknown stylesheet extension, using css");
                Dialect::Css
            }
        }
    }

    /// Pick a dialect from the embedding document's mime type.
    pub fn from_mime_type(mime: &str) -> Self {
        match mime.to_ascii_lowercase().as_str() {
            "text/x-scss" | "text/scss" | "text/x-sass" => Dialect::Scss,
            "text/x-less" | "text/less" => Dialect::Less,
            "text/css" => Dialect::Css,
            other => {
                tracing::warn!(mime = other, "unknown stylesheet mime type, using css");
                Dialect::Css
            }
        }
    }

    /// Whether the dialect is a CSS preprocessor language.
    pub fn is_preprocessor(self) -> bool {
        !matches!(self, Dialect::Css)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Css => "css",
            Dialect::Scss => "scss",
            Dialect::Less => "less",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = UnknownDialect;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "css" => Ok(Dialect::Css),
            "scss" | "sass" => Ok(Dialect::Scss),
            "less" => Ok(Dialect::Less),
            _ => Err(UnknownDialect {
                name: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_extension() {
        assert_eq!(Dialect::from_extension("scss"), Dialect::Scss);
        assert_eq!(Dialect::from_extension("LESS"), Dialect::Less);
        assert_eq!(Dialect::from_extension("css"), Dialect::Css);
        assert_eq!(Dialect::from_extension("txt"), Dialect::Css);
    }

    #[test]
    fn test_from_mime_type() {
        assert_eq!(Dialect::from_mime_type("text/x-scss"), Dialect::Scss);
        assert_eq!(Dialect::from_mime_type("text/x-less"), Dialect::Less);
        assert_eq!(Dialect::from_mime_type("text/html"), Dialect::Css);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("Scss".parse::<Dialect>(), Ok(Dialect::Scss));
        let err = "stylus".parse::<Dialect>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown dialect 'stylus', expected css, scss or less");
    }

    #[test]
    fn test_display_round_trip() {
        for dialect in [Dialect::Css, Dialect::Scss, Dialect::Less] {
            assert_eq!(dialect.to_string().parse::<Dialect>(), Ok(dialect));
        }
    }
}
