use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::config::Config;

/// Canonicalizes a URL the way the frontier expects: lowercase scheme
/// and host (the `url` crate already does this during parsing) and a
/// stripped fragment. Path, query, and userinfo are left exactly as
/// given — percent-encoding is not renormalized and query parameters
/// are neither sorted nor filtered, unlike a generic URL deduper. This
/// is a deliberate narrower behavior than "normalize harder": academic
/// crawl targets frequently encode meaningful state in query strings
/// (e.g. `?page=2`), and collapsing those would merge distinct pages.
pub fn normalize(url: &str) -> Result<String, url::ParseError> {
    let mut parsed = Url::parse(url)?;
    parsed.set_fragment(None);
    Ok(parsed.to_string())
}

/// `urldefrag`: removes the fragment from an already-resolved URL
/// without re-validating scheme/host. Used on the content pipeline's
/// hot path where the URL has already passed through `normalize`.
pub fn defragment(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

static EXTENSION_BLACKLIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\.(css|js|bmp|gif|jpe?g|ico|png|tiff?|mid|mp2|mp3|mp4|wav|avi|mov|mpeg|ram|m4v|mkv|ogg|ogv|pdf|ps|eps|tex|ppt|pptx|doc|docx|xls|xlsx|names|data|dat|exe|bz2|tar|msi|bin|7z|psd|dmg|iso|epub|dll|cnf|tgz|sha1|thmx|mso|arff|rtf|jar|csv|rm|smil|wmv|swf|wma|zip|rar|gz)$",
    )
    .expect("static extension blacklist regex is valid")
});

/// Admission filter for crawl targets. A URL is valid only if its
/// scheme is http(s), its host ends with one of the configured academic
/// suffixes, none of the ignore-list substrings appear in its
/// lowercased netloc/path/query, and its path doesn't end with a
/// binary/media extension.
pub fn is_valid(url: &str, cfg: &Config) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return false;
    }

    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    let path = parsed.path().to_lowercase();
    let query = parsed.query().unwrap_or("").to_lowercase();

    for needle in &cfg.ignore_list {
        let needle = needle.to_lowercase();
        if host.contains(&needle) || path.contains(&needle) || query.contains(&needle) {
            return false;
        }
    }

    if !cfg
        .allowed_suffixes
        .iter()
        .any(|suffix| host.ends_with(suffix.as_str()))
    {
        return false;
    }

    !EXTENSION_BLACKLIST.is_match(&path)
}
