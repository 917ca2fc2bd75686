//! Groups emitted byte ranges into contiguous memory images.

use crate::types::ByteRange;
use serde::Serialize;

/// A contiguous run of bytes starting at `base`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Image {
    pub base: u16,
    #[serde(serialize_with = "hex::serde::serialize")]
    pub bytes: Vec<u8>,
}

impl Image {
    /// One past the last address. Not wrapped, so an image that runs off
    /// the top of memory ends above `0xFFFF`.
    pub fn end(&self) -> u32 {
        self.base as u32 + self.bytes.len() as u32
    }

    /// `ADDR: BYTES` dump lines, `width` bytes per line.
    pub fn hex_lines(&self, width: usize) -> Vec<String> {
        self.bytes
            .chunks(width.max(1))
            .enumerate()
            .map(|(i, chunk)| {
                let address = self.base as usize + i * width.max(1);
                format!("{:04X}: {}", address, hex::encode_upper(chunk))
            })
            .collect()
    }
}

/// Starts a new image every time a range does not begin where the previous
/// one ended. Empty ranges are skipped.
pub fn bundle(ranges: &[ByteRange]) -> Vec<Image> {
    let mut images: Vec<Image> = Vec::new();
    for range in ranges.iter().filter(|range| !range.bytes.is_empty()) {
        match images.last_mut() {
            Some(image) if image.end() == range.address as u32 => {
                image.bytes.extend_from_slice(&range.bytes)
            }
            _ => images.push(Image {
                base: range.address,
                bytes: range.bytes.clone(),
            }),
        }
    }
    tracing::debug!(ranges = ranges.len(), images = images.len(), "bundled");
    images
}

/// Lays every image into one buffer spanning the lowest base to the highest
/// end, padding gaps with `fill`. Where images overlap the later one wins.
pub fn flatten(images: &[Image], fill: u8) -> Option<Image> {
    let base = images.iter().map(|image| image.base).min()?;
    let end = images.iter().map(Image::end).max()?;
    let mut bytes = vec![fill; (end - base as u32) as usize];
    for image in images {
        let offset = (image.base - base) as usize;
        bytes[offset..offset + image.bytes.len()].copy_from_slice(&image.bytes);
    }
    Some(Image { base, bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(address: u16, bytes: &[u8]) -> ByteRange {
        ByteRange {
            address,
            bytes: bytes.to_vec(),
            line: 1,
            label: None,
        }
    }

    #[test]
    fn adjacent_ranges_merge() {
        let images = bundle(&[range(0, &[0x3E, 0x12]), range(2, &[0x47])]);
        assert_eq!(
            images,
            vec![Image {
                base: 0,
                bytes: vec![0x3E, 0x12, 0x47]
            }]
        );
    }

    #[test]
    fn gaps_split_images() {
        let images = bundle(&[
            range(0, &[0x00]),
            range(0x200, &[0x76]),
            range(0x201, &[0xC9]),
            range(0x100, &[0x00]),
        ]);
        assert_eq!(images.len(), 3);
        assert_eq!(images[1].base, 0x200);
        assert_eq!(images[1].bytes, vec![0x76, 0xC9]);
        assert_eq!(images[2].base, 0x100);
    }

    #[test]
    fn empty_input() {
        assert!(bundle(&[]).is_empty());
        assert_eq!(flatten(&[], 0xFF), None);
    }

    #[test]
    fn flatten_pads_gaps() {
        let images = bundle(&[range(0x10, &[1, 2]), range(0x14, &[3])]);
        let flat = flatten(&images, 0xFF).unwrap();
        assert_eq!(flat.base, 0x10);
        assert_eq!(flat.bytes, vec![1, 2, 0xFF, 0xFF, 3]);
    }

    #[test]
    fn flatten_later_image_wins() {
        let images = vec![
            Image {
                base: 0,
                bytes: vec![1, 1, 1],
            },
            Image {
                base: 1,
                bytes: vec![2],
            },
        ];
        assert_eq!(flatten(&images, 0).unwrap().bytes, vec![1, 2, 1]);
    }

    #[test]
    fn hex_lines_wrap() {
        let image = Image {
            base: 0x8000,
            bytes: vec![0xAB; 5],
        };
        assert_eq!(
            image.hex_lines(4),
            vec!["8000: ABABABAB".to_string(), "8004: AB".to_string()]
        );
    }
}
