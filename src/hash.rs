//! Content hashing for change detection.
//!
//! Digests decide whether a slide is re-rendered. They are a change-detection
//! heuristic, not a security property: XXH3-128 is fast and collisions are
//! vanishingly unlikely for edits made by a human.

use std::fmt;
use std::io;

use serde::{Serialize, Serializer};
use xxhash_rust::xxh3::{xxh3_128, Xxh3};

use crate::model::SlideDocument;

/// Sample size used when hashing encoded image bytes.
pub const IMAGE_SAMPLE_SIZE: usize = 4096;

/// A 128-bit content digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    fn from_u128(value: u128) -> Self {
        Self(value.to_le_bytes())
    }

    /// Lowercase hex rendering of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Hash a string.
pub fn hash(content: &str) -> ContentHash {
    hash_bytes(content.as_bytes())
}

/// Hash a byte slice.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::from_u128(xxh3_128(data))
}

/// Hash a string, sampling head and tail once it is longer than `2 * sample_size`
/// characters.
///
/// Large inputs are reduced to the first and last `sample_size` characters plus
/// the total character count. Inputs at or below the threshold hash exactly like
/// [`hash`].
pub fn hash_sampled(content: &str, sample_size: usize) -> ContentHash {
    let total = content.chars().count();
    if total <= sample_size.saturating_mul(2) {
        return hash(content);
    }

    let head_end = byte_offset_of_char(content, sample_size);
    let tail_start = byte_offset_of_char(content, total - sample_size);

    sampled_digest(
        content[..head_end].as_bytes(),
        content[tail_start..].as_bytes(),
        total as u64,
    )
}

/// Byte-level counterpart of [`hash_sampled`], used for encoded images.
pub fn hash_bytes_sampled(data: &[u8], sample_size: usize) -> ContentHash {
    if data.len() <= sample_size.saturating_mul(2) {
        return hash_bytes(data);
    }

    sampled_digest(
        &data[..sample_size],
        &data[data.len() - sample_size..],
        data.len() as u64,
    )
}

fn sampled_digest(head: &[u8], tail: &[u8], total: u64) -> ContentHash {
    let mut hasher = Xxh3::new();
    hasher.update(head);
    hasher.update(tail);
    hasher.update(&total.to_le_bytes());
    ContentHash::from_u128(hasher.digest128())
}

fn byte_offset_of_char(content: &str, char_index: usize) -> usize {
    content
        .char_indices()
        .nth(char_index)
        .map(|(offset, _)| offset)
        .unwrap_or(content.len())
}

/// Adapter so serde can stream a document straight into the hasher.
struct HashWriter(Xxh3);

impl io::Write for HashWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Hash one slide document for the reconciliation engine.
///
/// When the slide shows a slide number its text depends on the slide's
/// position and on the deck length, so both are mixed into the digest.
pub fn hash_slide(doc: &SlideDocument, index: usize, total: usize) -> ContentHash {
    let mut writer = HashWriter(Xxh3::new());

    if serde_json::to_writer(&mut writer, doc).is_err() {
        // Serialization of plain data only fails on non-string map keys.
        writer = HashWriter(Xxh3::new());
        writer.0.update(format!("{:?}", doc).as_bytes());
    }

    if doc.slide_number.is_some() {
        writer.0.update(&(index as u64).to_le_bytes());
        writer.0.update(&(total as u64).to_le_bytes());
    }

    ContentHash::from_u128(writer.0.digest128())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BackgroundSpec, BulletItem, ContentBlock, Footnote, ImageSource, InlineSpan,
        SlideNumberSpec, TitlePrefixSpec, TransitionSpec,
    };
    use crate::style::{ClassOverride, StyleClass};
    use std::collections::HashSet;

    /// Small deterministic generator so mutations are reproducible.
    struct XorShift(u64);

    impl XorShift {
        fn next(&mut self) -> u64 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            self.0 = x;
            x
        }
    }

    fn sample_document() -> SlideDocument {
        SlideDocument {
            blocks: vec![
                ContentBlock::Heading {
                    level: 1,
                    text: "Quarterly review".to_string(),
                    spans: vec![],
                },
                ContentBlock::Paragraph {
                    text: "Revenue grew".to_string(),
                    spans: vec![InlineSpan {
                        text: "Revenue grew".to_string(),
                        bold: true,
                        ..Default::default()
                    }],
                },
                ContentBlock::Bullets {
                    ordered: false,
                    start: None,
                    items: vec![BulletItem {
                        text: "North".to_string(),
                        children: vec![BulletItem {
                            text: "Oslo".to_string(),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }],
                },
                ContentBlock::Code {
                    language: Some("rust".to_string()),
                    text: "fn main() {}".to_string(),
                },
                ContentBlock::Table {
                    headers: vec!["Region".to_string(), "Growth".to_string()],
                    rows: vec![vec!["North".to_string(), "12%".to_string()]],
                },
                ContentBlock::LinkCard {
                    url: "https://github.com/acme/report".to_string(),
                    title: Some("Report".to_string()),
                    description: Some("Full numbers".to_string()),
                },
                ContentBlock::Image {
                    source: ImageSource::Embedded {
                        data: (0..64u8).collect(),
                        mime_type: Some("image/png".to_string()),
                    },
                    alt: Some("chart".to_string()),
                },
            ],
            background: Some(BackgroundSpec {
                color: Some("#ffffff".to_string()),
                image: None,
            }),
            transition: Some(TransitionSpec {
                style: "dissolve".to_string(),
                duration_ms: 300,
            }),
            title_prefix: Some(TitlePrefixSpec {
                text: "Q3".to_string(),
            }),
            ..Default::default()
        }
    }

    const MUTATION_KINDS: u64 = 20;

    fn mutate(doc: &mut SlideDocument, rng: &mut XorShift, i: usize) {
        let tag = format!("m{}-{}", i, rng.next());
        match rng.next() % MUTATION_KINDS {
            0 => {
                if let ContentBlock::Heading { text, .. } = &mut doc.blocks[0] {
                    *text = tag;
                }
            }
            1 => {
                if let ContentBlock::Heading { level, .. } = &mut doc.blocks[0] {
                    *level = if *level == 1 { 2 } else { 1 };
                }
            }
            2 => {
                if let ContentBlock::Paragraph { spans, .. } = &mut doc.blocks[1] {
                    spans[0].italic = !spans[0].italic;
                }
            }
            3 => {
                if let ContentBlock::Bullets { items, .. } = &mut doc.blocks[2] {
                    items[0].children[0].text = tag;
                }
            }
            4 => {
                if let ContentBlock::Bullets { ordered, .. } = &mut doc.blocks[2] {
                    *ordered = !*ordered;
                }
            }
            5 => {
                if let ContentBlock::Code { language, .. } = &mut doc.blocks[3] {
                    *language = Some(tag);
                }
            }
            6 => {
                doc.style.insert(
                    StyleClass::Paragraph,
                    ClassOverride {
                        size: Some((rng.next() % 1000) as f32 + 1.0),
                        ..Default::default()
                    },
                );
            }
            7 => {
                doc.footnotes.push(Footnote {
                    label: "1".to_string(),
                    text: tag,
                });
            }
            8 => {
                if let ContentBlock::Table { rows, .. } = &mut doc.blocks[4] {
                    rows[0][1] = tag;
                }
            }
            9 => {
                if let ContentBlock::Table { headers, .. } = &mut doc.blocks[4] {
                    headers[0] = tag;
                }
            }
            10 => {
                if let ContentBlock::LinkCard { url, .. } = &mut doc.blocks[5] {
                    *url = format!("https://github.com/{}", tag);
                }
            }
            11 => {
                if let ContentBlock::LinkCard { title, .. } = &mut doc.blocks[5] {
                    *title = Some(tag);
                }
            }
            12 => {
                if let ContentBlock::LinkCard { description, .. } = &mut doc.blocks[5] {
                    *description = None;
                }
            }
            13 => {
                if let ContentBlock::Image {
                    source: ImageSource::Embedded { data, .. },
                    ..
                } = &mut doc.blocks[6]
                {
                    let at = (rng.next() % data.len() as u64) as usize;
                    data[at] ^= 1 + (rng.next() % 255) as u8;
                }
            }
            14 => {
                if let ContentBlock::Image { alt, .. } = &mut doc.blocks[6] {
                    *alt = Some(tag);
                }
            }
            15 => {
                if let Some(background) = &mut doc.background {
                    background.color = Some(format!("#{:06x}", rng.next() % 0xff_fffe));
                }
            }
            16 => {
                if let Some(background) = &mut doc.background {
                    background.image = Some(ImageSource::Remote {
                        url: format!("https://github.com/{}.png", tag),
                    });
                }
            }
            17 => {
                if let Some(transition) = &mut doc.transition {
                    transition.duration_ms = 301 + (rng.next() % 1000) as u32;
                }
            }
            18 => {
                if let Some(transition) = &mut doc.transition {
                    transition.style = tag;
                }
            }
            _ => {
                doc.title_prefix = Some(TitlePrefixSpec { text: tag });
            }
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(hash("hello world"), hash("hello world"));
        let doc = sample_document();
        assert_eq!(hash_slide(&doc, 0, 1), hash_slide(&doc.clone(), 0, 1));
    }

    #[test]
    fn test_different_inputs_differ() {
        assert_ne!(hash("hello"), hash("world"));
    }

    #[test]
    fn test_display_is_hex() {
        let s = hash("test").to_string();
        assert_eq!(s.len(), 32);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_single_field_mutations_change_digest() {
        let base = sample_document();
        let base_hash = hash_slide(&base, 0, 1);
        let mut rng = XorShift(0x9E37_79B9_7F4A_7C15);

        for i in 0..10_000 {
            let mut mutated = base.clone();
            mutate(&mut mutated, &mut rng, i);
            if mutated == base {
                continue;
            }
            assert_ne!(
                hash_slide(&mutated, 0, 1),
                base_hash,
                "mutation {} produced the base digest",
                i
            );
        }
    }

    #[test]
    fn test_distinct_texts_have_distinct_digests() {
        let digests: HashSet<_> = (0..10_000).map(|i| hash(&format!("slide {}", i))).collect();
        assert_eq!(digests.len(), 10_000);
    }

    #[test]
    fn test_sampled_equals_full_below_threshold() {
        for len in [0usize, 1, 7, 63, 64] {
            let text: String = "ab".repeat(len).chars().take(len).collect();
            assert_eq!(hash_sampled(&text, 32), hash(&text), "len {}", len);
        }

        let bytes = vec![7u8; 100];
        assert_eq!(hash_bytes_sampled(&bytes, 50), hash_bytes(&bytes));
    }

    #[test]
    fn test_sampled_ignores_middle_but_not_edges_or_length() {
        let a = format!("{}{}{}", "h".repeat(10), "x".repeat(100), "t".repeat(10));
        let b = format!("{}{}{}", "h".repeat(10), "y".repeat(100), "t".repeat(10));
        assert_eq!(hash_sampled(&a, 10), hash_sampled(&b, 10));

        let longer = format!("{}{}{}", "h".repeat(10), "x".repeat(101), "t".repeat(10));
        assert_ne!(hash_sampled(&a, 10), hash_sampled(&longer, 10));

        let new_tail = format!("{}{}{}", "h".repeat(10), "x".repeat(100), "u".repeat(10));
        assert_ne!(hash_sampled(&a, 10), hash_sampled(&new_tail, 10));
    }

    #[test]
    fn test_sampled_handles_multibyte_chars() {
        let text = "é".repeat(50);
        let sampled = hash_sampled(&text, 10);
        assert_ne!(sampled, hash(&text));
        assert_eq!(sampled, hash_sampled(&"é".repeat(50), 10));
    }

    #[test]
    fn test_slide_number_mixes_in_position() {
        let mut doc = sample_document();
        assert_eq!(hash_slide(&doc, 0, 3), hash_slide(&doc, 2, 5));

        doc.slide_number = Some(SlideNumberSpec::default());
        assert_ne!(hash_slide(&doc, 0, 3), hash_slide(&doc, 1, 3));
        assert_ne!(hash_slide(&doc, 0, 3), hash_slide(&doc, 0, 4));
    }
}
