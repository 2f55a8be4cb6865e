// ABOUTME: Packs a workspace into the tar archive an image build consumes.
// ABOUTME: Skips VCS metadata at the workspace root.

use std::io;
use std::path::Path;

const SKIPPED: &[&str] = &[".git"];

/// Archive `root` with paths relative to it.
pub fn build_context(root: &Path) -> io::Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());
    builder.follow_symlinks(false);
    append_tree(&mut builder, root, Path::new(""))?;
    builder.into_inner()
}

fn append_tree(builder: &mut tar::Builder<Vec<u8>>, root: &Path, rel: &Path) -> io::Result<()> {
    let mut entries = std::fs::read_dir(root.join(rel))?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = entry.file_name();
        if rel.as_os_str().is_empty() && SKIPPED.iter().any(|s| name == *s) {
            continue;
        }

        let rel_path = rel.join(&name);
        if entry.file_type()?.is_dir() {
            builder.append_dir(&rel_path, entry.path())?;
            append_tree(builder, root, &rel_path)?;
        } else {
            builder.append_path_with_name(entry.path(), &rel_path)?;
        }
    }
    Ok(())
}
