use std::path::{Path, PathBuf};

use crate::error::{LoaderError, Result};

pub fn file_name(path: &Path) -> Result<&str> {
    path.file_stem()
        .ok_or_else(|| LoaderError::InvalidArgument(format!("No file stem: {}", path.display())))?
        .to_str()
        .ok_or_else(|| {
            LoaderError::InvalidArgument(format!(
                "Can't convert file stem to string: {}",
                path.display()
            ))
        })
}

pub fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

pub fn combine_path(directory: &Path, file_name: &str, extension: &str) -> PathBuf {
    directory.join(format!("{}.{}", file_name, extension))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_paths() -> Result<()> {
        let path = Path::new("assets/models/Bunny.PLY");
        assert_eq!(file_name(path)?, "Bunny");
        assert_eq!(extension(path), Some("ply".into()));
        assert_eq!(
            combine_path(Path::new("assets/models"), "Bunny", "toml"),
            PathBuf::from("assets/models/Bunny.toml")
        );
        assert!(file_name(Path::new("/")).is_err());
        Ok(())
    }
}
