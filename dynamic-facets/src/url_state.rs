//! Facet selections carried by the page URL.
//!
//! The interface serializes its state as `key=value` pairs, in the query
//! string or the hash fragment, with facet selections written as
//! `f:<id>=[value1,value2]`. Pairs in the fragment take precedence.

use crate::error::FacetGeneratorError;
use crate::error::Result;
use crate::state::facet_state_key;
use indexmap::IndexMap;
use url::Url;

/// Every state pair of `location`, percent-decoded.
pub fn url_params(location: &str) -> Result<IndexMap<String, String>> {
    let url = Url::parse(location)?;
    let mut params: IndexMap<String, String> = url
        .query_pairs()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if let Some(fragment) = url.fragment() {
        for pair in fragment.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params.insert(decode_component(key)?, decode_component(value)?);
        }
    }
    Ok(params)
}

/// Selected values of facet `facet_id` recorded in `location`, if any.
pub fn facet_values_from_url(location: &str, facet_id: &str) -> Result<Option<Vec<String>>> {
    let params = url_params(location)?;
    params
        .get(&facet_state_key(facet_id))
        .map(|raw| parse_facet_values(raw))
        .transpose()
}

/// Parse a serialized selection: `[a,b]` or a JSON array of strings.
pub fn parse_facet_values(raw: &str) -> Result<Vec<String>> {
    let raw = raw.trim();
    if let Ok(values) = serde_json::from_str::<Vec<String>>(raw) {
        return Ok(values);
    }
    let inner = raw
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| FacetGeneratorError::UrlState(format!("expected [values], got '{raw}'")))?;
    Ok(inner
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect())
}

fn decode_component(component: &str) -> Result<String> {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|err| FacetGeneratorError::UrlState(err.to_string()))
}
