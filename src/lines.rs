use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::Path,
};

/// Reads a whole text file as lines ended by `\n`, `\r\n` or a bare `\r`.
///
/// A final line without a terminator is kept, but no empty line is produced after the last
/// terminator. Blank lines in the middle are kept as empty strings.
pub fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let mut contents = String::new();
    BufReader::new(File::open(path)?).read_to_string(&mut contents)?;

    Ok(split_lines(&contents))
}

fn split_lines(contents: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut rest = contents;

    while !rest.is_empty() {
        let end = rest
            .find(|c: char| c == '\r' || c == '\n')
            .unwrap_or(rest.len());
        let (line, tail) = rest.split_at(end);
        lines.push(line.to_string());

        rest = tail
            .strip_prefix("\r\n")
            .or_else(|| tail.strip_prefix('\r'))
            .or_else(|| tail.strip_prefix('\n'))
            .unwrap_or(tail);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn line_endings() {
        assert_eq!(split_lines("010\n100\n"), vec!["010", "100"]);
        assert_eq!(split_lines("010\n100"), vec!["010", "100"]);
        assert_eq!(split_lines("010\r\n100\r\n"), vec!["010", "100"]);
        assert_eq!(split_lines("010\r100\r"), vec!["010", "100"]);
        assert_eq!(split_lines("010\r\r\n100"), vec!["010", "", "100"]);
    }

    #[test]
    fn blank_lines_are_kept() {
        assert_eq!(split_lines("a\n\nb\n"), vec!["a", "", "b"]);
        assert_eq!(split_lines("a\n\n"), vec!["a", ""]);
        assert_eq!(split_lines("\n"), vec![""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("00000001.rcd");
        fs::write(&path, b"010\n\xff\n").unwrap();

        let err = read_lines(&path).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
