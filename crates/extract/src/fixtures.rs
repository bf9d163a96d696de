//! Synthetic images with hand-assembled EXIF blocks.
//!
//! Not behind `#[cfg(test)]` so that other crates' tests can build realistic
//! object payloads (enable the `fixtures` feature).

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;

pub const TAG_MAKE: u16 = 0x010F;
pub const TAG_MODEL: u16 = 0x0110;
pub const TAG_ORIENTATION: u16 = 0x0112;
pub const TAG_X_RESOLUTION: u16 = 0x011A;
pub const TAG_DATE_TIME: u16 = 0x0132;

struct Entry {
    tag: u16,
    kind: u16,
    count: u32,
    data: Vec<u8>,
}

/// Builds a big-endian TIFF structure with a single IFD0.
#[derive(Default)]
pub struct ExifBuilder {
    entries: Vec<Entry>,
}

impl ExifBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ascii(mut self, tag: u16, value: &str) -> Self {
        let mut data = value.as_bytes().to_vec();
        data.push(0);
        self.entries.push(Entry { tag, kind: TYPE_ASCII, count: data.len() as u32, data });
        self
    }

    pub fn short(mut self, tag: u16, value: u16) -> Self {
        self.entries.push(Entry { tag, kind: TYPE_SHORT, count: 1, data: value.to_be_bytes().to_vec() });
        self
    }

    pub fn long(mut self, tag: u16, value: u32) -> Self {
        self.entries.push(Entry { tag, kind: TYPE_LONG, count: 1, data: value.to_be_bytes().to_vec() });
        self
    }

    pub fn rational(mut self, tag: u16, numerator: u32, denominator: u32) -> Self {
        let mut data = numerator.to_be_bytes().to_vec();
        data.extend_from_slice(&denominator.to_be_bytes());
        self.entries.push(Entry { tag, kind: TYPE_RATIONAL, count: 1, data });
        self
    }

    /// The raw TIFF bytes, also a valid standalone `.tif` payload.
    pub fn tiff(mut self) -> Vec<u8> {
        self.entries.sort_by_key(|entry| entry.tag);
        let ifd_len = 2 + 12 * self.entries.len() + 4;
        let mut data_offset = 8 + ifd_len;

        let mut out = b"MM\x00\x2A".to_vec();
        out.extend_from_slice(&8u32.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u16).to_be_bytes());
        let mut overflow = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(&entry.tag.to_be_bytes());
            out.extend_from_slice(&entry.kind.to_be_bytes());
            out.extend_from_slice(&entry.count.to_be_bytes());
            if entry.data.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..entry.data.len()].copy_from_slice(&entry.data);
                out.extend_from_slice(&inline);
            } else {
                out.extend_from_slice(&(data_offset as u32).to_be_bytes());
                overflow.extend_from_slice(&entry.data);
                if entry.data.len() % 2 == 1 {
                    overflow.push(0);
                }
                data_offset = 8 + ifd_len + overflow.len();
            }
        }
        // No IFD1.
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&overflow);
        out
    }

    /// A JPEG carrying the TIFF structure in an APP1 segment, padded with
    /// `trailing` filler bytes of "image data".
    pub fn jpeg(self, trailing: usize) -> Vec<u8> {
        let tiff = self.tiff();
        let mut out = vec![0xFF, 0xD8, 0xFF, 0xE1];
        out.extend_from_slice(&((2 + 6 + tiff.len()) as u16).to_be_bytes());
        out.extend_from_slice(b"Exif\0\0");
        out.extend_from_slice(&tiff);
        out.extend(std::iter::repeat_n(0x00, trailing));
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }
}

/// A typical camera JPEG: make, model, orientation, and resolution.
pub fn camera_jpeg(make: &str, model: &str, orientation: u16) -> Vec<u8> {
    ExifBuilder::new()
        .ascii(TAG_MAKE, make)
        .ascii(TAG_MODEL, model)
        .short(TAG_ORIENTATION, orientation)
        .rational(TAG_X_RESOLUTION, 72, 1)
        .jpeg(256)
}

/// A JPEG with no APP1 segment at all.
pub fn bare_jpeg() -> Vec<u8> {
    vec![0xFF, 0xD8, 0xFF, 0xD9]
}
