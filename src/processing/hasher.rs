//! Content digests used to reject duplicate uploads.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

const BLOCK_SIZE: usize = 4096;

/// Hash a stream in fixed-size blocks and leave it rewound for the caller.
pub fn hash_reader<R: Read + Seek>(reader: &mut R) -> io::Result<String> {
    reader.seek(SeekFrom::Start(0))?;
    let mut hasher = Sha256::new();
    let mut block = [0_u8; BLOCK_SIZE];
    loop {
        let read = reader.read(&mut block)?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }
    reader.seek(SeekFrom::Start(0))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hash a file already in storage.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Whether `digest` appears among `existing`.
pub fn is_duplicate<I>(digest: &str, existing: I) -> bool
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    existing
        .into_iter()
        .any(|candidate| candidate.as_ref() == digest)
}

/// Return the name of the first file in `dir` whose content hashes to `digest`.
///
/// Walks every regular file on each call; there is no digest index.
pub(crate) fn find_duplicate(dir: &Path, digest: &str) -> io::Result<Option<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(error) => return Err(error),
    };

    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        if is_duplicate(digest, [hash_file(&path)?]) {
            return Ok(Some(entry.file_name().to_string_lossy().into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn hash_reader_rewinds_stream() {
        let mut cursor = Cursor::new(b"hello world".to_vec());
        cursor.set_position(5);
        let digest = hash_reader(&mut cursor).expect("hash");
        assert_eq!(cursor.position(), 0);
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn hash_reader_spans_multiple_blocks() {
        let data = vec![7_u8; BLOCK_SIZE * 2 + 17];
        let streamed = hash_reader(&mut Cursor::new(data.clone())).expect("hash");
        assert_eq!(streamed, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn is_duplicate_matches_any_entry() {
        assert!(is_duplicate("b", ["a", "b"]));
        assert!(!is_duplicate("c", ["a", "b"]));
        assert!(!is_duplicate("a", Vec::<String>::new()));
    }

    #[test]
    fn find_duplicate_ignores_file_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("first.pdf"), b"same bytes").expect("write");
        fs::write(dir.path().join("other.pdf"), b"different").expect("write");

        let digest = hash_reader(&mut Cursor::new(b"same bytes".to_vec())).expect("hash");
        let found = find_duplicate(dir.path(), &digest).expect("scan");
        assert_eq!(found.as_deref(), Some("first.pdf"));

        let missing = find_duplicate(&dir.path().join("absent"), &digest).expect("scan");
        assert!(missing.is_none());
    }
}
