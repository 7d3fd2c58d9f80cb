use std::fs;
use std::io;
use std::path::Path;

/// Reads a source file fully into memory, requiring valid UTF-8 and
/// stripping a leading byte-order mark if present.
pub fn read_source(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let text = String::from_utf8(bytes).map_err(|err| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {}", path.display(), err),
        )
    })?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

#[cfg(test)]
mod tests {
    use super::read_source;
    use std::fs;
    use std::path::PathBuf;
    use std::process;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(label: &str, bytes: &[u8]) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("wsfmt-{label}-{}-{nanos}", process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("input.ws");
        fs::write(&path, bytes).expect("write temp file");
        path
    }

    #[test]
    fn strips_utf8_bom() {
        let path = temp_file("bom", b"\xEF\xBB\xBFvar x;");
        assert_eq!(read_source(&path).expect("read"), "var x;");
    }

    #[test]
    fn plain_utf8_passes_through() {
        let path = temp_file("plain", "if (x) {}".as_bytes());
        assert_eq!(read_source(&path).expect("read"), "if (x) {}");
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let path = temp_file("bad", b"\xFFvar");
        assert!(read_source(&path).is_err());
    }
}
