//! Text chunking with separator-aware splitting and overlap

/// Sentence-ending punctuation, tried after coarser separators
const SENTENCE_ENDINGS: &[char] = &['.', '!', '?'];

/// Number of separator levels before the hard character cut
const SEPARATOR_LEVELS: usize = 4;

/// Splits text into bounded-size chunks with overlapping context
///
/// Separators are attempted in priority order (paragraph break, line break,
/// space, sentence-ending punctuation); a piece that no separator can bring
/// under the size bound is cut at character granularity. Sizes are measured
/// in characters and a cut never lands inside a code point.
#[derive(Debug, Clone)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters of trailing context carried into the next chunk
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; `overlap` must stay below `chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        debug_assert!(overlap < chunk_size);
        Self {
            chunk_size,
            overlap,
        }
    }

    /// Split text into ordered chunks; identical input always produces an
    /// identical sequence
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        self.split_level(text, 0, &mut chunks);
        chunks.retain(|c| !c.trim().is_empty());
        chunks
    }

    fn split_level(&self, text: &str, level: usize, out: &mut Vec<String>) {
        if char_len(text) <= self.chunk_size {
            out.push(text.to_string());
            return;
        }

        if level >= SEPARATOR_LEVELS {
            self.hard_cut(text, out);
            return;
        }

        let atoms: Vec<&str> = match level {
            0 => text.split_inclusive("\n\n").collect(),
            1 => text.split_inclusive('\n').collect(),
            2 => text.split_inclusive(' ').collect(),
            _ => text.split_inclusive(SENTENCE_ENDINGS).collect(),
        };

        if atoms.len() == 1 {
            // Separator absent; try the next finer one
            self.split_level(text, level + 1, out);
            return;
        }

        let mut current = String::new();
        for atom in atoms {
            let atom_len = char_len(atom);

            if atom_len > self.chunk_size {
                self.flush(&mut current, out);
                self.split_level(atom, level + 1, out);
                continue;
            }

            if char_len(&current) + atom_len > self.chunk_size {
                self.flush(&mut current, out);
            }

            if current.is_empty() {
                // Seed with the tail of the previous chunk, unless the seed
                // would push this chunk over the bound
                if let Some(prev) = out.last() {
                    let tail = overlap_tail(prev, self.overlap);
                    if char_len(&tail) + atom_len <= self.chunk_size {
                        current.push_str(&tail);
                    }
                }
            }

            current.push_str(atom);
        }
        self.flush(&mut current, out);
    }

    /// Emit fixed windows advancing `chunk_size - overlap` characters per step
    fn hard_cut(&self, text: &str, out: &mut Vec<String>) {
        let chars: Vec<char> = text.chars().collect();
        let stride = self.chunk_size.saturating_sub(self.overlap).max(1);

        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(chars.len());
            out.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += stride;
        }
    }

    fn flush(&self, current: &mut String, out: &mut Vec<String>) {
        if current.trim().is_empty() {
            current.clear();
        } else {
            out.push(std::mem::take(current));
        }
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Trailing `overlap` characters of a chunk
fn overlap_tail(text: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= overlap {
        return text.to_string();
    }
    chars[chars.len() - overlap..].iter().collect()
}
