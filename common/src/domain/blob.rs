use sha1::{Digest, Sha1};

/// Git blob object id of `content`, i.e. what `git hash-object` prints and
/// what GitHub reports as a file's `sha`.
pub fn git_blob_sha(content: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}
