//! Address canonicalization
//!
//! Context patterns are matched against `origin + path + sorted query + hash`
//! so that pattern authors never have to anticipate query parameter order.
//! Parameters are reordered by key only; values and their encoding are kept
//! byte for byte.

use url::Url;

/// Canonical form of `address`.
///
/// Absolute URLs keep their origin. Relative addresses (`/cases/321?b=2&a=1`)
/// come back as path + sorted query + fragment. Anything the URL parser
/// rejects outright is returned unchanged so it can still be matched.
pub fn canonicalize(address: &str) -> String {
    match Url::parse(address) {
        Ok(url) => {
            let origin = url.origin();
            let prefix = if origin.is_tuple() {
                origin.ascii_serialization()
            } else {
                format!("{}:", url.scheme())
            };
            assemble(&prefix, &url)
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => canonicalize_relative(address),
        Err(err) => {
            log::debug!("address `{address}` is not a URL ({err}); matching it verbatim");
            address.to_string()
        }
    }
}

fn canonicalize_relative(address: &str) -> String {
    let resolved = Url::parse("http://relative.invalid/")
        .and_then(|base| base.join(address));
    match resolved {
        Ok(url) => assemble("", &url),
        Err(err) => {
            log::debug!("relative address `{address}` did not resolve ({err}); matching it verbatim");
            address.to_string()
        }
    }
}

fn assemble(prefix: &str, url: &Url) -> String {
    let mut out = String::with_capacity(prefix.len() + url.path().len() + 16);
    out.push_str(prefix);
    out.push_str(url.path());
    if let Some(query) = url.query() {
        let sorted = sort_query(query);
        if !sorted.is_empty() {
            out.push('?');
            out.push_str(&sorted);
        }
    }
    if let Some(fragment) = url.fragment() {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Sort `a=1&b=2` style pairs by key. The sort is stable, so repeated keys
/// keep their relative order.
pub fn sort_query(query: &str) -> String {
    let mut pairs: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    pairs.sort_by(|a, b| query_key(a).cmp(query_key(b)));
    pairs.join("&")
}

fn query_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(key, _)| key)
}
