use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use time::format_description::well_known::Rfc3339;

pub fn ensure_dir(p: &Path) -> Result<()> {
    std::fs::create_dir_all(p).with_context(|| format!("create_dir_all {}", p.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub async fn hash_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("read {}", path.display()))?;
    Ok(sha256_hex(&bytes))
}

/// Final path segment of a URL or filesystem path.
///
/// Query strings and fragments are not part of the name. Returns `None` when
/// the location ends in a separator or names `.`/`..`.
pub fn basename(location: &str) -> Option<&str> {
    let path = match location.find("://") {
        Some(scheme_end) => {
            let rest = &location[scheme_end + 3..];
            let rest = rest.split(['?', '#']).next().unwrap_or(rest);
            // Drop the authority; a bare host has no file name.
            match rest.find('/') {
                Some(i) => &rest[i..],
                None => return None,
            }
        }
        None => location,
    };

    let name = path.rsplit(['/', '\\']).next()?;
    match name {
        "" | "." | ".." => None,
        name => Some(name),
    }
}

/// `report.json` -> `report-1.json`; names without an extension get the
/// suffix appended.
pub fn suffixed_name(name: &str, n: usize) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}-{}{}", &name[..dot], n, &name[dot..]),
        _ => format!("{name}-{n}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basename_of_urls_and_paths() {
        assert_eq!(basename("http://host/out/a.json"), Some("a.json"));
        assert_eq!(basename("http://host:8082/out/a.json?x=1#f"), Some("a.json"));
        assert_eq!(basename("./input/test.txt"), Some("test.txt"));
        assert_eq!(basename("test.txt"), Some("test.txt"));
        assert_eq!(basename("http://host/out/"), None);
        assert_eq!(basename("http://host"), None);
        assert_eq!(basename("out/.."), None);
    }

    #[test]
    fn suffix_goes_before_extension() {
        assert_eq!(suffixed_name("a.json", 1), "a-1.json");
        assert_eq!(suffixed_name("archive.tar.gz", 2), "archive.tar-2.gz");
        assert_eq!(suffixed_name("README", 1), "README-1");
        assert_eq!(suffixed_name(".hidden", 1), ".hidden-1");
    }
}
