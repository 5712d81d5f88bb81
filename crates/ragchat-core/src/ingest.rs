//! Turns a directory of plain-text files into indexable documents.
//!
//! Files are split on blank lines into paragraphs, which are packed into
//! chunks of at most `chunk_size` characters. A paragraph longer than a chunk
//! is split on word boundaries with `chunk_overlap` characters carried over.
//! Chunk ids are `{relative_path}:{chunk_index}`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::IngestSettings;
use crate::error::{Error, Result};
use crate::types::Document;

const EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        let s = IngestSettings::default();
        Self { chunk_size: s.chunk_size, chunk_overlap: s.chunk_overlap }
    }
}

impl From<&IngestSettings> for ChunkingConfig {
    fn from(s: &IngestSettings) -> Self {
        Self { chunk_size: s.chunk_size, chunk_overlap: s.chunk_overlap }
    }
}

#[derive(Default)]
pub struct DocumentLoader {
    chunking: ChunkingConfig,
}

impl DocumentLoader {
    pub fn new(chunking: ChunkingConfig) -> Self {
        Self { chunking }
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<Document>> {
        self.load_files(data_dir, self.list_files(data_dir))
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<Document>> {
        let mut files = self.list_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            tracing::info!(limit, "limited ingestion to first files");
        }
        self.load_files(data_dir, files)
    }

    fn load_files(&self, data_dir: &Path, files: Vec<PathBuf>) -> Result<Vec<Document>> {
        if files.is_empty() {
            tracing::warn!(dir = %data_dir.display(), "no text files found");
            return Ok(vec![]);
        }
        let mut documents = Vec::new();
        for (file_index, file_path) in files.iter().enumerate() {
            tracing::debug!(file = %file_path.display(), n = file_index + 1, of = files.len(), "processing file");
            let content = read_file_content(file_path)?;
            let relative = file_path.strip_prefix(data_dir).unwrap_or(file_path);
            documents.extend(self.chunk_file(&content, relative));
        }
        tracing::info!(files = files.len(), documents = documents.len(), "loaded documents");
        Ok(documents)
    }

    /// Chunk one file's content into documents keyed by its relative path,
    /// extension included, so `guide.txt` and `guide.md` stay distinct.
    pub fn chunk_file(&self, content: &str, relative: &Path) -> Vec<Document> {
        let category = relative
            .parent()
            .and_then(|p| p.to_str())
            .filter(|p| !p.is_empty())
            .map_or_else(|| "misc".to_string(), |p| p.replace('\\', "/"));
        let source = relative.to_string_lossy().replace('\\', "/");

        let chunks = self.chunk_text(content);
        let total = chunks.len();
        chunks
            .into_iter()
            .enumerate()
            .map(|(i, text)| {
                Document::new(format!("{source}:{i}"), text)
                    .with_meta("source", source.clone())
                    .with_meta("category", category.clone())
                    .with_meta("chunk_index", i as i64)
                    .with_meta("total_chunks", total as i64)
            })
            .collect()
    }

    /// Paragraph-packed chunks of at most `chunk_size` characters.
    pub fn chunk_text(&self, content: &str) -> Vec<String> {
        let max = self.chunking.chunk_size;
        let mut chunks = Vec::new();
        let mut current = String::new();
        for paragraph in content.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
            let para_len = paragraph.chars().count();
            if para_len > max {
                if !current.is_empty() {
                    chunks.push(std::mem::take(&mut current));
                }
                chunks.extend(self.split_with_overlap(paragraph));
                continue;
            }
            let joined_len = if current.is_empty() { para_len } else { current.chars().count() + 2 + para_len };
            if joined_len > max {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(paragraph);
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }

    fn split_with_overlap(&self, paragraph: &str) -> Vec<String> {
        let max = self.chunking.chunk_size;
        let overlap = self.chunking.chunk_overlap;
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        let mut chunks = Vec::new();
        let mut start = 0;
        while start < words.len() {
            let mut end = start;
            let mut len = 0usize;
            while end < words.len() {
                let add = words[end].chars().count() + usize::from(end > start);
                if len + add > max && end > start {
                    break;
                }
                len += add;
                end += 1;
            }
            chunks.extend(hard_wrap(&words[start..end].join(" "), max));
            if end >= words.len() {
                break;
            }
            // step back over trailing words until `overlap` characters are repeated
            let mut back = end;
            let mut carried = 0usize;
            while back > start + 1 && carried + words[back - 1].chars().count() < overlap {
                carried += words[back - 1].chars().count() + 1;
                back -= 1;
            }
            start = back;
        }
        chunks
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.extension().and_then(|s| s.to_str()).is_some_and(|ext| EXTENSIONS.contains(&ext)))
            .collect();
        files.sort();
        files
    }
}

/// A single word longer than the chunk size is cut into `max`-character pieces.
fn hard_wrap(chunk: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = chunk.chars().collect();
    if chars.len() <= max {
        return vec![chunk.to_string()];
    }
    chars.chunks(max).map(|piece| piece.iter().collect()).collect()
}

fn read_file_content(file_path: &Path) -> Result<String> {
    match fs::read_to_string(file_path) {
        Ok(content) => Ok(content),
        Err(_) => {
            let bytes = fs::read(file_path).map_err(|e| Error::Storage(format!("{}: {}", file_path.display(), e)))?;
            Ok(String::from_utf8_lossy(&bytes).to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loader(size: usize, overlap: usize) -> DocumentLoader {
        DocumentLoader::new(ChunkingConfig { chunk_size: size, chunk_overlap: overlap })
    }

    #[test]
    fn small_paragraphs_are_packed() {
        let chunks = loader(100, 10).chunk_text("alpha\n\nbravo\n\n\n\ncharlie");
        assert_eq!(chunks, vec!["alpha\n\nbravo\n\ncharlie".to_string()]);
    }

    #[test]
    fn long_paragraph_is_split_with_overlap() {
        let text = (0..40).map(|i| format!("w{i:02}")).collect::<Vec<_>>().join(" ");
        let chunks = loader(30, 8).chunk_text(&text);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.chars().count() <= 30, "chunk too long: {c}");
        }
        let second_first = chunks[1].split_whitespace().next().unwrap_or_default();
        assert!(chunks[0].contains(second_first), "second chunk repeats the tail of the first");
        assert!(chunks.last().unwrap_or(&String::new()).ends_with("w39"));
    }

    #[test]
    fn oversized_word_is_hard_wrapped() {
        let chunks = loader(5, 1).chunk_text("abcdefghij");
        assert_eq!(chunks, vec!["abcde".to_string(), "fghij".to_string()]);
    }
}
