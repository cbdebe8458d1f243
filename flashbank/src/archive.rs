use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Hex digits of the digest used for archive file names
pub const NAME_DIGITS: usize = 12;

/// Copy `image` into `dir` as `<digest prefix>.bin`. Identical images land
/// on the same name.
pub fn store(image: &Path, dir: &Path) -> Result<PathBuf> {
    let digest = digest_file(image)?;
    fs::create_dir_all(dir)
        .with_context(|| format!("creating archive directory {}", dir.display()))?;
    let dest = dir.join(format!("{}.bin", &digest[..NAME_DIGITS]));
    fs::copy(image, &dest)
        .with_context(|| format!("copying {} to {}", image.display(), dest.display()))?;
    Ok(dest)
}

/// Lowercase hex SHA-1 of a file, read in 1 MiB chunks
pub fn digest_file(path: &Path) -> Result<String> {
    let mut f = fs::File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut sha1 = Sha1::new();
    let mut buf = vec![0u8; 1 << 20];
    loop {
        let n = f
            .read(&mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }
        sha1.update(&buf[..n]);
    }
    Ok(format!("{:x}", sha1.finalize()))
}
