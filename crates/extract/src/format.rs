//! Container detection from magic bytes.

use derive_more::Display;

/// An image container that can carry an EXIF block.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Hash)]
#[display("{}", self.name())]
pub enum Format {
    Jpeg,
    /// TIFF, and the RAW formats built on it (DNG, NEF, CR2, ARW, ...).
    Tiff,
    Png,
    Webp,
    /// ISO base media file format images (HEIC, HEIF, AVIF).
    Heif,
}

impl Format {
    /// Detect the container from the first few bytes of a file.
    ///
    /// # Examples
    ///
    /// ```
    /// use glean_extract::Format;
    /// assert_eq!(Format::from_magic_bytes(b"\xFF\xD8\xFF\xE1"), Some(Format::Jpeg));
    /// assert_eq!(Format::from_magic_bytes(b"II*\0"), Some(Format::Tiff));
    /// assert_eq!(Format::from_magic_bytes(b"GIF89a"), None);
    /// ```
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [0xFF, 0xD8, 0xFF, ..] => Some(Self::Jpeg),
            [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => Some(Self::Tiff),
            [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some(Self::Png),
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some(Self::Webp),
            [_, _, _, _, b'f', b't', b'y', b'p', ..] => Some(Self::Heif),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Tiff => "TIFF",
            Self::Png => "PNG",
            Self::Webp => "WebP",
            Self::Heif => "HEIF",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(b"\xFF\xD8\xFF\xE0\x00\x10JFIF", Some(Format::Jpeg))]
    #[case(b"II*\0\x08\0\0\0", Some(Format::Tiff))]
    #[case(b"MM\0*\0\0\0\x08", Some(Format::Tiff))]
    #[case(b"\x89PNG\r\n\x1a\n", Some(Format::Png))]
    #[case(b"RIFF\x24\0\0\0WEBPVP8 ", Some(Format::Webp))]
    #[case(b"\0\0\0\x18ftypheic", Some(Format::Heif))]
    #[case(b"RIFF\x24\0\0\0WAVEfmt ", None)]
    #[case(b"GIF89a", None)]
    #[case(b"\xFF\xD8", None)]
    #[case(b"", None)]
    fn test_from_magic_bytes(#[case] bytes: &[u8], #[case] expected: Option<Format>) {
        assert_eq!(Format::from_magic_bytes(bytes), expected);
    }
}
