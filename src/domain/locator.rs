//! GitHub content locators.
//!
//! A locator names exactly one upstream document. Its cache key is the
//! canonical contents-API URL, so different spellings of the same GitHub page
//! (trailing slash, `.git` suffix, surrounding whitespace) share one entry.

use std::{borrow::Cow, fmt, str::FromStr};

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use url::Url;

use super::error::DomainError;

/// Origin used for cache keys, independent of the API host actually queried.
pub const CANONICAL_API_ORIGIN: &str = "https://api.github.com";
pub const README_FILE: &str = "README.md";
const GITHUB_HOST: &str = "github.com";

/// Bytes escaped inside one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Revision {
    /// Whatever the repository's default branch is called.
    DefaultBranch,
    Named(String),
}

impl Revision {
    /// Ref understood by the raw content host; `HEAD` follows the default branch.
    pub fn as_raw_ref(&self) -> &str {
        match self {
            Revision::DefaultBranch => "HEAD",
            Revision::Named(name) => name,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Revision::DefaultBranch => None,
            Revision::Named(name) => Some(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// `https://github.com/{owner}/{repo}`
    RepositoryReadme,
    /// `.../blob/{rev}/{path}`
    File,
    /// `.../tree/{rev}/{dir}`, resolved to `{dir}/README.md`
    DirectoryReadme,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentLocator {
    owner: String,
    repo: String,
    revision: Revision,
    path: Option<String>,
    kind: DocumentKind,
}

impl ContentLocator {
    /// Parse a GitHub web URL into a locator.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let trimmed = input.trim();
        let url = Url::parse(trimmed)
            .map_err(|_| DomainError::invalid_locator(trimmed, "not an absolute URL"))?;

        if url.scheme() != "https" || url.host_str() != Some(GITHUB_HOST) {
            return Err(DomainError::invalid_locator(
                trimmed,
                "only https://github.com URLs are supported",
            ));
        }

        let decoded = url
            .path_segments()
            .map(|segments| {
                segments
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| decode_segment(segment, trimmed))
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();
        let segments: Vec<&str> = decoded.iter().map(|segment| segment.as_ref()).collect();

        let [owner, repo, rest @ ..] = segments.as_slice() else {
            return Err(DomainError::invalid_locator(
                trimmed,
                "missing owner or repository",
            ));
        };

        let repo_name: &str = repo;
        let owner = validate_name(owner, trimmed)?;
        let repo = validate_name(repo_name.strip_suffix(".git").unwrap_or(repo_name), trimmed)?;

        match rest {
            [] => Ok(Self::repository_readme(owner, repo)),
            ["blob", revision, path @ ..] if !path.is_empty() => Ok(Self {
                owner,
                repo,
                revision: Revision::Named(revision.to_string()),
                path: Some(path.join("/")),
                kind: DocumentKind::File,
            }),
            ["tree", revision, dir @ ..] => {
                let path = if dir.is_empty() {
                    README_FILE.to_string()
                } else {
                    format!("{}/{README_FILE}", dir.join("/"))
                };
                Ok(Self {
                    owner,
                    repo,
                    revision: Revision::Named(revision.to_string()),
                    path: Some(path),
                    kind: DocumentKind::DirectoryReadme,
                })
            }
            _ => Err(DomainError::invalid_locator(
                trimmed,
                "expected /blob/<rev>/<path> or /tree/<rev>/<dir>",
            )),
        }
    }

    /// Locator for a repository README on the default branch.
    pub fn readme(owner: &str, repo: &str) -> Result<Self, DomainError> {
        let input = format!("{owner}/{repo}");
        let owner = validate_name(owner.trim(), &input)?;
        let repo = validate_name(repo.trim(), &input)?;
        Ok(Self::repository_readme(owner, repo))
    }

    fn repository_readme(owner: String, repo: String) -> Self {
        Self {
            owner,
            repo,
            revision: Revision::DefaultBranch,
            path: None,
            kind: DocumentKind::RepositoryReadme,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn revision(&self) -> &Revision {
        &self.revision
    }

    /// Repository-relative document path. `None` until upstream resolves the README.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Document path with each segment escaped for use in a URL path.
    pub fn encoded_path(&self) -> Option<String> {
        self.path.as_deref().map(encode_path)
    }

    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn title(&self) -> String {
        match self.path.as_deref() {
            Some(path) => path.rsplit('/').next().unwrap_or(path).to_string(),
            None => self.repo.clone(),
        }
    }

    pub fn cache_key(&self) -> String {
        match (self.encoded_path(), &self.revision) {
            (Some(path), Revision::Named(revision)) => format!(
                "{CANONICAL_API_ORIGIN}/repos/{}/{}/contents/{path}?ref={}",
                self.owner,
                self.repo,
                encode_path(revision)
            ),
            (Some(path), Revision::DefaultBranch) => format!(
                "{CANONICAL_API_ORIGIN}/repos/{}/{}/contents/{path}",
                self.owner, self.repo
            ),
            (None, _) => format!(
                "{CANONICAL_API_ORIGIN}/repos/{}/{}/readme",
                self.owner, self.repo
            ),
        }
    }
}

impl FromStr for ContentLocator {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ContentLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cache_key())
    }
}

/// Escape every `/`-separated segment of a repository path.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_segment<'a>(segment: &'a str, input: &str) -> Result<Cow<'a, str>, DomainError> {
    let decoded = percent_decode_str(segment)
        .decode_utf8()
        .map_err(|_| DomainError::invalid_locator(input, "path is not valid UTF-8"))?;
    if decoded.contains('/') {
        return Err(DomainError::invalid_locator(
            input,
            "path segment contains an encoded '/'",
        ));
    }
    Ok(decoded)
}

fn validate_name(candidate: &str, input: &str) -> Result<String, DomainError> {
    let valid = !candidate.is_empty()
        && candidate != "."
        && candidate != ".."
        && candidate
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'));

    if valid {
        Ok(candidate.to_string())
    } else {
        Err(DomainError::invalid_locator(
            input,
            "owner and repository may only contain ASCII letters, digits, '-', '_' or '.'",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_url_targets_default_branch_readme() {
        let locator = ContentLocator::parse("https://github.com/acme/widgets").expect("locator");

        assert_eq!(locator.kind(), DocumentKind::RepositoryReadme);
        assert_eq!(locator.revision(), &Revision::DefaultBranch);
        assert_eq!(locator.path(), None);
        assert_eq!(locator.title(), "widgets");
        assert_eq!(
            locator.cache_key(),
            "https://api.github.com/repos/acme/widgets/readme"
        );
    }

    #[test]
    fn equivalent_spellings_share_a_key() {
        let plain = ContentLocator::parse("https://github.com/acme/widgets").expect("plain");
        let slash = ContentLocator::parse(" https://github.com/acme/widgets/ ").expect("slash");
        let git = ContentLocator::parse("https://github.com/acme/widgets.git").expect("git");

        assert_eq!(plain.cache_key(), slash.cache_key());
        assert_eq!(plain.cache_key(), git.cache_key());
        assert_eq!(plain, ContentLocator::readme("acme", "widgets").expect("readme"));
    }

    #[test]
    fn blob_url_targets_a_single_file() {
        let locator =
            ContentLocator::parse("https://github.com/acme/repo/blob/main/docs/guide.md")
                .expect("locator");

        assert_eq!(locator.kind(), DocumentKind::File);
        assert_eq!(locator.revision().name(), Some("main"));
        assert_eq!(locator.path(), Some("docs/guide.md"));
        assert_eq!(locator.title(), "guide.md");
        assert_eq!(
            locator.cache_key(),
            "https://api.github.com/repos/acme/repo/contents/docs/guide.md?ref=main"
        );
    }

    #[test]
    fn tree_url_targets_directory_readme() {
        let nested = ContentLocator::parse("https://github.com/acme/repo/tree/dev/packages/core")
            .expect("nested");
        assert_eq!(nested.kind(), DocumentKind::DirectoryReadme);
        assert_eq!(nested.path(), Some("packages/core/README.md"));
        assert_eq!(nested.revision().as_raw_ref(), "dev");

        let root = ContentLocator::parse("https://github.com/acme/repo/tree/dev").expect("root");
        assert_eq!(root.path(), Some("README.md"));
    }

    #[test]
    fn rejects_foreign_hosts_and_schemes() {
        for input in [
            "http://github.com/acme/repo",
            "https://gitlab.com/acme/repo",
            "github.com/acme/repo",
            "",
        ] {
            let err = ContentLocator::parse(input).expect_err("should reject");
            assert!(matches!(err, DomainError::InvalidLocator { .. }), "{input}");
        }
    }

    #[test]
    fn rejects_incomplete_or_unsupported_paths() {
        for input in [
            "https://github.com/acme",
            "https://github.com/acme/repo/issues/4",
            "https://github.com/acme/repo/blob/main",
            "https://github.com/acme/re po",
        ] {
            assert!(ContentLocator::parse(input).is_err(), "{input}");
        }
    }

    #[test]
    fn escaped_segments_are_decoded_once() {
        let spaced = ContentLocator::parse("https://github.com/acme/repo/blob/main/docs/my%20guide.md")
            .expect("spaced");
        assert_eq!(spaced.path(), Some("docs/my guide.md"));
        assert_eq!(spaced.title(), "my guide.md");
        assert_eq!(spaced.encoded_path().as_deref(), Some("docs/my%20guide.md"));
        assert_eq!(
            spaced.cache_key(),
            "https://api.github.com/repos/acme/repo/contents/docs/my%20guide.md?ref=main"
        );

        let unicode =
            ContentLocator::parse("https://github.com/acme/repo/blob/main/%E6%96%87%E6%A1%A3.md")
                .expect("unicode");
        assert_eq!(unicode.path(), Some("文档.md"));
        assert_eq!(unicode.title(), "文档.md");

        let literal = ContentLocator::parse("https://github.com/acme/repo/blob/main/文档.md")
            .expect("literal");
        assert_eq!(literal.cache_key(), unicode.cache_key());
    }

    #[test]
    fn rejects_encoded_separators_and_invalid_utf8() {
        for input in [
            "https://github.com/acme/repo/blob/main/docs%2Fguide.md",
            "https://github.com/acme/repo/blob/main/%FF.md",
        ] {
            assert!(ContentLocator::parse(input).is_err(), "{input}");
        }
    }

    #[test]
    fn display_matches_cache_key() {
        let locator: ContentLocator = "https://github.com/acme/repo/blob/v1/README.md"
            .parse()
            .expect("locator");
        assert_eq!(locator.to_string(), locator.cache_key());
    }
}
